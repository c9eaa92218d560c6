//! Decoders for network registration, operator, and service-state queries.

use super::lookup;
use super::{fields, marker_payload, parse_hex, parse_int, unquote, FieldMap, FieldValue};

/// `AT+CREG?` / `AT+CGREG?` / `AT+CEREG?` → registration status plus
/// optional cell location.
///
/// The command itself names the technology domain being queried; the
/// payload is `<n>,<stat>[,<lac>,<ci>[,<AcT>]]` with LAC and CI as quoted
/// hex on this dialect.
pub fn decode_registration(command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();

    let (marker, technology) = if command.starts_with("AT+CEREG") {
        ("+CEREG:", "LTE")
    } else if command.starts_with("AT+CGREG") {
        ("+CGREG:", "UMTS")
    } else {
        ("+CREG:", "GSM")
    };
    map.insert("technology", FieldValue::Text(technology.to_string()));

    let Some(payload) = marker_payload(lines, marker) else {
        return map;
    };
    let parts = fields(payload);

    if let Some(stat) = parts.get(1).and_then(|f| parse_int(f)) {
        map.insert(
            "registration_status",
            FieldValue::Text(lookup::registration_status(stat)),
        );
    }
    // Location fields are only present when network registration
    // reporting was enabled with <n> >= 2.
    if parts.len() >= 4 {
        if let Some(lac) = parse_hex(parts[2]) {
            map.insert("lac", FieldValue::Int(lac));
        }
        if let Some(ci) = parse_hex(parts[3]) {
            map.insert("cell_id", FieldValue::Int(ci));
        }
    }
    if let Some(act) = parts.get(4).and_then(|f| parse_int(f)) {
        map.insert(
            "access_technology",
            FieldValue::Text(lookup::access_technology(act)),
        );
    }
    map
}

/// `AT+COPS?` → selection mode, operator name, access technology.
pub fn decode_operator(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let Some(payload) = marker_payload(lines, "+COPS:") else {
        return map;
    };
    let parts = fields(payload);

    if let Some(mode) = parts.first().and_then(|f| parse_int(f)) {
        map.insert("operator_mode", FieldValue::Text(lookup::operator_mode(mode)));
    }
    if let Some(name) = parts.get(2).map(|f| unquote(f)) {
        if !name.is_empty() {
            map.insert("operator", FieldValue::Text(name.to_string()));
        }
    }
    if let Some(act) = parts.get(3).and_then(|f| parse_int(f)) {
        map.insert(
            "access_technology",
            FieldValue::Text(lookup::access_technology(act)),
        );
    }
    map
}

/// `AT+CFUN?` → functionality level label.
pub fn decode_functionality(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    if let Some(fun) = marker_payload(lines, "+CFUN:")
        .and_then(|p| fields(p).first().and_then(|f| parse_int(f)))
    {
        map.insert("functionality", FieldValue::Text(lookup::functionality(fun)));
    }
    map
}

/// `AT+CGATT?` → packet service attachment label.
pub fn decode_attachment(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    if let Some(state) = marker_payload(lines, "+CGATT:")
        .and_then(|p| fields(p).first().and_then(|f| parse_int(f)))
    {
        map.insert("attachment", FieldValue::Text(lookup::attachment(state)));
    }
    map
}

/// `AT+QNWINFO` → access technology, PLMN split into MCC/MNC, band,
/// channel.
///
/// Payload: `<Act>,<oper>,<band>,<channel>`, e.g.
/// `"FDD LTE","310260","LTE BAND 4",2300`.
pub fn decode_network_info(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let Some(payload) = marker_payload(lines, "+QNWINFO:") else {
        return map;
    };
    let parts = fields(payload);

    if let Some(act) = parts.first().map(|f| unquote(f)) {
        if !act.is_empty() {
            map.insert("technology", FieldValue::Text(act.to_string()));
        }
    }
    if let Some(plmn) = parts.get(1).map(|f| unquote(f)) {
        // MCC is always three digits; the remainder is the MNC.
        if plmn.len() >= 5 && plmn.chars().all(|c| c.is_ascii_digit()) {
            if let (Ok(mcc), Ok(mnc)) = (plmn[..3].parse::<i64>(), plmn[3..].parse::<i64>()) {
                map.insert("mcc", FieldValue::Int(mcc));
                map.insert("mnc", FieldValue::Int(mnc));
            }
        }
    }
    if let Some(band) = parts.get(2).map(|f| unquote(f)) {
        if !band.is_empty() {
            map.insert("band", FieldValue::Text(band.to_string()));
        }
    }
    if let Some(channel) = parts.get(3).and_then(|f| parse_int(f)) {
        map.insert("channel", FieldValue::Int(channel));
    }
    map
}

/// `AT+QSPN` → registered service provider name.
pub fn decode_provider_name(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    if let Some(name) = marker_payload(lines, "+QSPN:")
        .and_then(|p| fields(p).first().map(|f| unquote(f).to_string()))
    {
        if !name.is_empty() {
            map.insert("provider", FieldValue::Text(name));
        }
    }
    map
}

/// `AT+CCLK?` → the modem real-time clock as reported, quotes stripped.
///
/// The value contains a comma inside the quotes, so the whole payload is
/// taken verbatim rather than split positionally.
pub fn decode_clock(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    if let Some(payload) = marker_payload(lines, "+CCLK:") {
        let clock = unquote(payload);
        if !clock.is_empty() {
            map.insert("modem_clock", FieldValue::Text(clock.to_string()));
        }
    }
    map
}

/// `AT+QLTS` → latest network-synchronized time, quotes stripped.
pub fn decode_network_time(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    if let Some(payload) = marker_payload(lines, "+QLTS:") {
        let time = unquote(payload);
        if !time.is_empty() {
            map.insert("network_time", FieldValue::Text(time.to_string()));
        }
    }
    map
}

#[cfg(test)]
mod tests {
    use super::super::decode;

    #[test]
    fn test_creg_minimal() {
        let map = decode("AT+CREG?", "+CREG: 0,1\r\nOK\r\n");
        assert_eq!(map["technology"].as_text(), Some("GSM"));
        assert_eq!(
            map["registration_status"].as_text(),
            Some("Registered, home network")
        );
        assert!(!map.contains_key("lac"));
        assert!(!map.contains_key("cell_id"));
    }

    #[test]
    fn test_cereg_with_location() {
        let map = decode("AT+CEREG?", "+CEREG: 2,1,\"5C21\",\"A12B01\",7\r\nOK\r\n");
        assert_eq!(map["technology"].as_text(), Some("LTE"));
        assert_eq!(map["lac"].as_int(), Some(0x5C21));
        assert_eq!(map["cell_id"].as_int(), Some(0xA12B01));
        assert_eq!(map["access_technology"].as_text(), Some("E-UTRAN"));
    }

    #[test]
    fn test_cgreg_roaming() {
        let map = decode("AT+CGREG?", "+CGREG: 0,5\r\nOK\r\n");
        assert_eq!(map["technology"].as_text(), Some("UMTS"));
        assert_eq!(
            map["registration_status"].as_text(),
            Some("Registered, roaming")
        );
    }

    #[test]
    fn test_unknown_registration_code_preserved() {
        let map = decode("AT+CREG?", "+CREG: 0,11\r\nOK\r\n");
        assert_eq!(map["registration_status"].as_text(), Some("Unknown (11)"));
    }

    #[test]
    fn test_cops() {
        let map = decode("AT+COPS?", "+COPS: 0,0,\"T-Mobile USA\",7\r\nOK\r\n");
        assert_eq!(map["operator_mode"].as_text(), Some("Automatic"));
        assert_eq!(map["operator"].as_text(), Some("T-Mobile USA"));
        assert_eq!(map["access_technology"].as_text(), Some("E-UTRAN"));
    }

    #[test]
    fn test_cops_deregistered_short() {
        let map = decode("AT+COPS?", "+COPS: 2\r\nOK\r\n");
        assert_eq!(map["operator_mode"].as_text(), Some("Deregistered"));
        assert!(!map.contains_key("operator"));
    }

    #[test]
    fn test_cfun_and_cgatt() {
        let map = decode("AT+CFUN?", "+CFUN: 1\r\nOK\r\n");
        assert_eq!(map["functionality"].as_text(), Some("Full functionality"));

        let map = decode("AT+CGATT?", "+CGATT: 1\r\nOK\r\n");
        assert_eq!(map["attachment"].as_text(), Some("Attached"));
    }

    #[test]
    fn test_qnwinfo() {
        let map = decode(
            "AT+QNWINFO",
            "+QNWINFO: \"FDD LTE\",\"310260\",\"LTE BAND 4\",2300\r\nOK\r\n",
        );
        assert_eq!(map["technology"].as_text(), Some("FDD LTE"));
        assert_eq!(map["mcc"].as_int(), Some(310));
        assert_eq!(map["mnc"].as_int(), Some(260));
        assert_eq!(map["band"].as_text(), Some("LTE BAND 4"));
        assert_eq!(map["channel"].as_int(), Some(2300));
    }

    #[test]
    fn test_qspn() {
        let map = decode(
            "AT+QSPN",
            "+QSPN: \"T-Mobile\",\"T-Mobile\",\"\",0,\"310260\"\r\nOK\r\n",
        );
        assert_eq!(map["provider"].as_text(), Some("T-Mobile"));
    }

    #[test]
    fn test_clock_keeps_embedded_comma() {
        let map = decode("AT+CCLK?", "+CCLK: \"24/05/06,12:30:45-20\"\r\nOK\r\n");
        assert_eq!(map["modem_clock"].as_text(), Some("24/05/06,12:30:45-20"));
    }

    #[test]
    fn test_qlts() {
        let map = decode("AT+QLTS", "+QLTS: \"2024/05/06,19:30:45+32,0\"\r\nOK\r\n");
        assert_eq!(map["network_time"].as_text(), Some("2024/05/06,19:30:45+32,0"));
    }
}

//! GNSS decoders: NMEA sentences fetched over the AT port, the GNSS
//! configuration read-back, and the positioning power state.

use super::lookup;
use super::{fields, marker_payload, parse_float, parse_int, unquote, FieldMap, FieldValue};

const KNOTS_TO_KMH: f64 = 1.852;

/// NMEA `ddmm.mmmm` (or `dddmm.mmmm`) plus hemisphere → signed decimal
/// degrees. Anything malformed yields `None`.
fn parse_coordinate(value: &str, hemisphere: &str) -> Option<f64> {
    let dot = value.find('.')?;
    if dot < 3 {
        return None;
    }
    let degrees: f64 = value[..dot - 2].parse().ok()?;
    let minutes: f64 = value[dot - 2..].parse().ok()?;
    let magnitude = degrees + minutes / 60.0;
    match hemisphere {
        "N" | "E" => Some(magnitude),
        "S" | "W" => Some(-magnitude),
        _ => None,
    }
}

/// `AT+QGPSGNMEA="..."` → position fields from the returned sentence.
///
/// GGA contributes position, fix quality, satellite count, and altitude;
/// RMC contributes position, ground speed, and course (only when its
/// status flag reports a valid fix). Other sentence types are ignored.
pub fn decode_gnmea(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let Some(payload) = marker_payload(lines, "+QGPSGNMEA:") else {
        return map;
    };
    // Drop the trailing `*<checksum>` before splitting.
    let sentence = payload.split('*').next().unwrap_or(payload);
    let parts = fields(sentence);

    let Some(talker) = parts.first() else {
        return map;
    };
    // `$GPGGA`, `$GNRMC`, ...: the sentence type is the last three chars.
    let Some(kind) = talker
        .strip_prefix('$')
        .filter(|t| t.len() >= 5)
        .map(|t| &t[t.len() - 3..])
    else {
        return map;
    };

    match kind {
        "GGA" => {
            if let (Some(lat_f), Some(lat_h)) = (parts.get(2), parts.get(3)) {
                if let Some(lat) = parse_coordinate(lat_f, lat_h) {
                    map.insert("latitude", FieldValue::Float(lat));
                }
            }
            if let (Some(lon_f), Some(lon_h)) = (parts.get(4), parts.get(5)) {
                if let Some(lon) = parse_coordinate(lon_f, lon_h) {
                    map.insert("longitude", FieldValue::Float(lon));
                }
            }
            if let Some(quality) = parts.get(6).and_then(|f| parse_int(f)) {
                map.insert("fix_quality", FieldValue::Int(quality));
            }
            if let Some(sats) = parts.get(7).and_then(|f| parse_int(f)) {
                map.insert("satellites", FieldValue::Int(sats));
            }
            if let Some(alt) = parts.get(9).and_then(|f| parse_float(f)) {
                map.insert("altitude", FieldValue::Float(alt));
            }
        }
        "RMC" => {
            // Status "A" is a valid fix; "V" is a void sentence.
            if parts.get(2).copied() != Some("A") {
                return map;
            }
            if let (Some(lat_f), Some(lat_h)) = (parts.get(3), parts.get(4)) {
                if let Some(lat) = parse_coordinate(lat_f, lat_h) {
                    map.insert("latitude", FieldValue::Float(lat));
                }
            }
            if let (Some(lon_f), Some(lon_h)) = (parts.get(5), parts.get(6)) {
                if let Some(lon) = parse_coordinate(lon_f, lon_h) {
                    map.insert("longitude", FieldValue::Float(lon));
                }
            }
            if let Some(knots) = parts.get(7).and_then(|f| parse_float(f)) {
                map.insert("speed_kmh", FieldValue::Float(knots * KNOTS_TO_KMH));
            }
            if let Some(course) = parts.get(8).and_then(|f| parse_float(f)) {
                map.insert("course", FieldValue::Float(course));
            }
        }
        _ => {}
    }
    map
}

/// Map a QGPSCFG setting name to its record key. Settings outside the
/// managed vocabulary are not recorded.
fn gps_config_key(setting: &str) -> Option<&'static str> {
    Some(match setting {
        "outport" => "gnss_outport",
        "nmeasrc" => "gnss_nmea_source",
        "gpsnmeatype" => "gnss_gps_nmea_type",
        "glonassnmeatype" => "gnss_glonass_nmea_type",
        "galileonmeatype" => "gnss_galileo_nmea_type",
        "beidounmeatype" => "gnss_beidou_nmea_type",
        "gsvextnmeatype" => "gnss_gsv_extended",
        "gnssconfig" => "gnss_constellations",
        "autogps" => "gnss_auto_start",
        "agpsposmode" => "gnss_agps_mode",
        "fixfreq" => "gnss_fix_frequency",
        "1pps" => "gnss_one_pps",
        "gnssrawdata" => "gnss_raw_data",
        _ => return None,
    })
}

/// `AT+QGPSCFG="<setting>"` → one `gnss_*` configuration field.
///
/// Payload: `"<setting>",<value>`; multi-valued settings (raw data
/// config) keep the remainder verbatim as text.
pub fn decode_gps_config(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let Some(payload) = marker_payload(lines, "+QGPSCFG:") else {
        return map;
    };
    let Some((setting, rest)) = payload.split_once(',') else {
        return map;
    };
    let Some(key) = gps_config_key(unquote(setting.trim())) else {
        return map;
    };

    let rest = rest.trim();
    let value = if let Some(n) = parse_int(rest) {
        FieldValue::Int(n)
    } else {
        FieldValue::Text(unquote(rest).to_string())
    };
    map.insert(key, value);
    map
}

/// `AT+QGPS?` → positioning power state label.
pub fn decode_gps_power(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    if let Some(state) = marker_payload(lines, "+QGPS:")
        .and_then(|p| fields(p).first().and_then(|f| parse_int(f)))
    {
        map.insert("gnss_power", FieldValue::Text(lookup::gnss_power(state)));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::super::decode;
    use super::*;

    #[test]
    fn test_coordinate_conversion() {
        let lat = parse_coordinate("4042.6142", "N").unwrap();
        assert!((lat - 40.710_236).abs() < 1e-5);
        let lon = parse_coordinate("07400.4168", "W").unwrap();
        assert!((lon + 74.006_946).abs() < 1e-5);
        assert_eq!(parse_coordinate("", "N"), None);
        assert_eq!(parse_coordinate("4042.6142", "Q"), None);
    }

    #[test]
    fn test_gga_sentence() {
        let raw = "+QGPSGNMEA: $GPGGA,172814.0,4042.6142,N,07400.4168,W,1,08,1.2,12.5,M,-34.0,M,,*57\r\nOK\r\n";
        let map = decode("AT+QGPSGNMEA=\"GGA\"", raw);
        assert!(matches!(map["latitude"], FieldValue::Float(v) if v > 40.0 && v < 41.0));
        assert!(matches!(map["longitude"], FieldValue::Float(v) if v < -73.0 && v > -75.0));
        assert_eq!(map["fix_quality"].as_int(), Some(1));
        assert_eq!(map["satellites"].as_int(), Some(8));
        assert_eq!(map["altitude"], FieldValue::Float(12.5));
    }

    #[test]
    fn test_gga_without_fix_omits_position() {
        let raw = "+QGPSGNMEA: $GPGGA,,,,,,0,00,,,M,,M,,*66\r\nOK\r\n";
        let map = decode("AT+QGPSGNMEA=\"GGA\"", raw);
        assert!(!map.contains_key("latitude"));
        assert_eq!(map["fix_quality"].as_int(), Some(0));
    }

    #[test]
    fn test_rmc_sentence() {
        let raw = "+QGPSGNMEA: $GNRMC,172814.0,A,4042.6142,N,07400.4168,W,12.4,89.6,060524,,,A*55\r\nOK\r\n";
        let map = decode("AT+QGPSGNMEA=\"RMC\"", raw);
        assert!(map.contains_key("latitude"));
        assert!(matches!(map["speed_kmh"], FieldValue::Float(v) if (v - 22.9648).abs() < 1e-3));
        assert_eq!(map["course"], FieldValue::Float(89.6));
    }

    #[test]
    fn test_rmc_void_is_dropped() {
        let raw = "+QGPSGNMEA: $GNRMC,172814.0,V,,,,,,,060524,,,N*55\r\nOK\r\n";
        let map = decode("AT+QGPSGNMEA=\"RMC\"", raw);
        assert!(map.is_empty());
    }

    #[test]
    fn test_gps_config_numeric_and_text() {
        let map = decode("AT+QGPSCFG=\"nmeasrc\"", "+QGPSCFG: \"nmeasrc\",1\r\nOK\r\n");
        assert_eq!(map["gnss_nmea_source"].as_int(), Some(1));

        let map = decode(
            "AT+QGPSCFG=\"outport\"",
            "+QGPSCFG: \"outport\",\"usbnmea\"\r\nOK\r\n",
        );
        assert_eq!(map["gnss_outport"].as_text(), Some("usbnmea"));
    }

    #[test]
    fn test_gps_raw_data_config_kept_verbatim() {
        let map = decode(
            "AT+QGPSCFG=\"gnssrawdata\"",
            "+QGPSCFG: \"gnssrawdata\",31,0\r\nOK\r\n",
        );
        assert_eq!(map["gnss_raw_data"].as_text(), Some("31,0"));
    }

    #[test]
    fn test_unmanaged_gps_setting_ignored() {
        let map = decode(
            "AT+QGPSCFG=\"estimation_error\"",
            "+QGPSCFG: \"estimation_error\",3\r\nOK\r\n",
        );
        assert!(map.is_empty());
    }

    #[test]
    fn test_gps_power() {
        let map = decode("AT+QGPS?", "+QGPS: 1\r\nOK\r\n");
        assert_eq!(map["gnss_power"].as_text(), Some("On"));
    }
}

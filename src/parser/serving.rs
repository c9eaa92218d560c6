//! Decoders for the engineering-mode serving-cell and neighbour-cell
//! queries (`AT+QENG=...`).
//!
//! The serving-cell layout depends on the reported RAT; the LTE layout is
//! decoded in full, other RATs degrade to the common MCC/MNC/LAC/cell-id
//! prefix. Neighbour cells arrive one per line and accumulate into an
//! ordered list under a single field.

use super::{fields, marker_payload, parse_hex, parse_int, unquote, FieldMap, FieldValue, NeighborCell};

/// LTE downlink bandwidth code → MHz.
fn lte_bandwidth_mhz(code: i64) -> Option<f64> {
    match code {
        0 => Some(1.4),
        1 => Some(3.0),
        2 => Some(5.0),
        3 => Some(10.0),
        4 => Some(15.0),
        5 => Some(20.0),
        _ => None,
    }
}

/// `AT+QENG="servingcell"` → serving-cell identity and measurements.
///
/// LTE payload:
/// `"servingcell",<state>,"LTE",<is_tdd>,<mcc>,<mnc>,<cellid>,<pcid>,
/// <earfcn>,<band>,<ul_bw>,<dl_bw>,<tac>,<rsrp>,<rsrq>,<rssi>,<sinr>,<srxlev>`
/// with cell id and TAC in hex.
pub fn decode_serving_cell(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let Some(payload) = lines
        .iter()
        .filter(|l| l.contains("servingcell"))
        .find_map(|l| marker_payload(std::slice::from_ref(l), "+QENG:"))
    else {
        return map;
    };
    let parts = fields(payload);
    if parts.first().map(|f| unquote(f)) != Some("servingcell") {
        return map;
    }

    let Some(rat) = parts.get(2).map(|f| unquote(f)) else {
        return map;
    };
    map.insert("technology", FieldValue::Text(rat.to_string()));

    if rat == "LTE" {
        if let Some(mcc) = parts.get(4).and_then(|f| parse_int(f)) {
            map.insert("mcc", FieldValue::Int(mcc));
        }
        if let Some(mnc) = parts.get(5).and_then(|f| parse_int(f)) {
            map.insert("mnc", FieldValue::Int(mnc));
        }
        if let Some(ci) = parts.get(6).and_then(|f| parse_hex(f)) {
            map.insert("cell_id", FieldValue::Int(ci));
        }
        if let Some(pcid) = parts.get(7).and_then(|f| parse_int(f)) {
            map.insert("pcid", FieldValue::Int(pcid));
        }
        if let Some(earfcn) = parts.get(8).and_then(|f| parse_int(f)) {
            map.insert("channel", FieldValue::Int(earfcn));
        }
        if let Some(band) = parts.get(9).and_then(|f| parse_int(f)) {
            map.insert("band", FieldValue::Text(format!("LTE BAND {band}")));
        }
        if let Some(mhz) = parts.get(11).and_then(|f| parse_int(f)).and_then(lte_bandwidth_mhz) {
            map.insert("bandwidth", FieldValue::Float(mhz));
        }
        if let Some(tac) = parts.get(12).and_then(|f| parse_hex(f)) {
            map.insert("tac", FieldValue::Int(tac));
        }
        if let Some(rsrp) = parts.get(13).and_then(|f| parse_int(f)) {
            map.insert("rsrp", FieldValue::Int(rsrp));
        }
        if let Some(rsrq) = parts.get(14).and_then(|f| parse_int(f)) {
            map.insert("rsrq", FieldValue::Int(rsrq));
        }
        if let Some(rssi) = parts.get(15).and_then(|f| parse_int(f)) {
            map.insert("rssi", FieldValue::Int(rssi));
        }
        if let Some(sinr) = parts.get(16).and_then(|f| parse_int(f)) {
            map.insert("sinr", FieldValue::Int(sinr));
        }
    } else {
        // GSM/WCDMA share a <mcc>,<mnc>,<lac>,<cellid> prefix at index 3.
        if let Some(mcc) = parts.get(3).and_then(|f| parse_int(f)) {
            map.insert("mcc", FieldValue::Int(mcc));
        }
        if let Some(mnc) = parts.get(4).and_then(|f| parse_int(f)) {
            map.insert("mnc", FieldValue::Int(mnc));
        }
        if let Some(lac) = parts.get(5).and_then(|f| parse_hex(f)) {
            map.insert("lac", FieldValue::Int(lac));
        }
        if let Some(ci) = parts.get(6).and_then(|f| parse_hex(f)) {
            map.insert("cell_id", FieldValue::Int(ci));
        }
    }
    map
}

/// `AT+QENG="neighbourcell"` → ordered neighbour-cell list.
///
/// One sub-record per response line, tagged with its access technology
/// and relation to the serving cell, attached under `neighbor_cells` as a
/// list rather than flattened.
pub fn decode_neighbour_cells(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let mut cells = Vec::new();

    for line in lines {
        let Some(payload) = marker_payload(std::slice::from_ref(line), "+QENG:") else {
            continue;
        };
        let parts = fields(payload);
        let Some(kind) = parts.first().map(|f| unquote(f)) else {
            continue;
        };
        if !kind.starts_with("neighbourcell") {
            continue;
        }

        let relation = match kind {
            "neighbourcell intra" => "intra",
            "neighbourcell inter" => "inter",
            _ => "other",
        };
        let technology = parts
            .get(1)
            .map(|f| unquote(f).to_string())
            .unwrap_or_default();

        // "<kind>","<rat>",<channel>,<pcid>,<rsrq>,<rsrp>,<rssi>,...
        cells.push(NeighborCell {
            relation: relation.to_string(),
            technology,
            channel: parts.get(2).and_then(|f| parse_int(f)),
            pcid: parts.get(3).and_then(|f| parse_int(f)),
            rsrq: parts.get(4).and_then(|f| parse_int(f)),
            rsrp: parts.get(5).and_then(|f| parse_int(f)),
            rssi: parts.get(6).and_then(|f| parse_int(f)),
        });
    }

    if !cells.is_empty() {
        map.insert("neighbor_cells", FieldValue::Cells(cells));
    }
    map
}

#[cfg(test)]
mod tests {
    use super::super::decode;
    use super::*;

    const LTE_SERVING: &str = "+QENG: \"servingcell\",\"NOCONN\",\"LTE\",\"FDD\",310,260,\
A12B01,187,2300,4,3,3,5C21,-97,-11,-64,15,28\r\nOK\r\n";

    #[test]
    fn test_lte_serving_cell() {
        let map = decode("AT+QENG=\"servingcell\"", LTE_SERVING);
        assert_eq!(map["technology"].as_text(), Some("LTE"));
        assert_eq!(map["mcc"].as_int(), Some(310));
        assert_eq!(map["mnc"].as_int(), Some(260));
        assert_eq!(map["cell_id"].as_int(), Some(0x00A1_2B01));
        assert_eq!(map["pcid"].as_int(), Some(187));
        assert_eq!(map["channel"].as_int(), Some(2300));
        assert_eq!(map["band"].as_text(), Some("LTE BAND 4"));
        assert_eq!(map["bandwidth"], FieldValue::Float(10.0));
        assert_eq!(map["tac"].as_int(), Some(0x5C21));
        assert_eq!(map["rsrp"].as_int(), Some(-97));
        assert_eq!(map["rsrq"].as_int(), Some(-11));
        assert_eq!(map["rssi"].as_int(), Some(-64));
        assert_eq!(map["sinr"].as_int(), Some(15));
    }

    #[test]
    fn test_gsm_serving_cell_partial() {
        let raw = "+QENG: \"servingcell\",\"NOCONN\",\"GSM\",310,260,5C21,A12B,33,95,-,-61,255,255,0,38,38,1\r\nOK\r\n";
        let map = decode("AT+QENG=\"servingcell\"", raw);
        assert_eq!(map["technology"].as_text(), Some("GSM"));
        assert_eq!(map["mcc"].as_int(), Some(310));
        assert_eq!(map["lac"].as_int(), Some(0x5C21));
        assert_eq!(map["cell_id"].as_int(), Some(0xA12B));
        assert!(!map.contains_key("rsrp"));
    }

    #[test]
    fn test_serving_cell_truncated_is_partial() {
        let map = decode(
            "AT+QENG=\"servingcell\"",
            "+QENG: \"servingcell\",\"SEARCH\",\"LTE\",\"FDD\",310\r\nOK\r\n",
        );
        assert_eq!(map["technology"].as_text(), Some("LTE"));
        assert!(!map.contains_key("mcc"));
        assert!(!map.contains_key("cell_id"));
    }

    #[test]
    fn test_neighbour_cells_ordered_and_tagged() {
        let raw = "+QENG: \"neighbourcell intra\",\"LTE\",2300,187,-11,-95,-63,12,6,4,10\r\n\
+QENG: \"neighbourcell inter\",\"LTE\",5110,32,-14,-102,-71,0,5,3,9\r\nOK\r\n";
        let map = decode("AT+QENG=\"neighbourcell\"", raw);
        let FieldValue::Cells(cells) = &map["neighbor_cells"] else {
            panic!("expected cell list");
        };
        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].relation, "intra");
        assert_eq!(cells[0].channel, Some(2300));
        assert_eq!(cells[0].rsrp, Some(-95));
        assert_eq!(cells[1].relation, "inter");
        assert_eq!(cells[1].pcid, Some(32));
        assert_eq!(cells[1].technology, "LTE");
    }

    #[test]
    fn test_no_neighbours_is_empty_map() {
        let map = decode("AT+QENG=\"neighbourcell\"", "OK\r\n");
        assert!(map.is_empty());
    }

    #[test]
    fn test_neighbour_line_with_dashes_keeps_parsable_fields() {
        let raw = "+QENG: \"neighbourcell intra\",\"LTE\",2300,-,-,-,-\r\nOK\r\n";
        let map = decode("AT+QENG=\"neighbourcell\"", raw);
        let FieldValue::Cells(cells) = &map["neighbor_cells"] else {
            panic!("expected cell list");
        };
        assert_eq!(cells[0].channel, Some(2300));
        assert_eq!(cells[0].pcid, None);
        assert_eq!(cells[0].rsrp, None);
    }
}

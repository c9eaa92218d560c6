//! Signal-quality decoders.
//!
//! Raw vendor units are converted to physical units with the documented
//! linear transforms; both the raw and the derived value are kept under
//! distinct field names so the sink preserves what the device actually
//! reported.

use super::{fields, marker_payload, parse_int, unquote, FieldMap, FieldValue};

/// CSQ reports 99 when the measurement is unavailable.
const CSQ_UNKNOWN: i64 = 99;

/// QCSQ reports 255 for an unavailable SINR sample.
const SINR_UNKNOWN: i64 = 255;

/// `AT+CSQ` → `rssi_raw`, `rssi`, `ber`.
///
/// The raw RSSI index maps to dBm as `-113 + 2 * raw`. The unknown
/// sentinel is not transformed: `rssi` becomes the literal text
/// `"unknown"` while `rssi_raw` keeps the sentinel.
pub fn decode_signal_quality(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let Some(payload) = marker_payload(lines, "+CSQ:") else {
        return map;
    };
    let parts = fields(payload);

    if let Some(raw) = parts.first().and_then(|f| parse_int(f)) {
        map.insert("rssi_raw", FieldValue::Int(raw));
        if raw == CSQ_UNKNOWN {
            map.insert("rssi", FieldValue::Text("unknown".to_string()));
        } else {
            map.insert("rssi", FieldValue::Int(-113 + 2 * raw));
        }
    }
    if let Some(ber) = parts.get(1).and_then(|f| parse_int(f)) {
        if ber != CSQ_UNKNOWN {
            map.insert("ber", FieldValue::Int(ber));
        }
    }
    map
}

/// `AT+QCSQ` → per-RAT extended signal quality.
///
/// The payload layout depends on the reported system mode:
/// `"LTE",<rssi>,<rsrp>,<sinr>,<rsrq>` for LTE, a single RSSI for
/// GSM/WCDMA, nothing for `NOSERVICE`. LTE SINR arrives in fifths of a
/// dB offset by 20 (`sinr = raw / 5 - 20`).
pub fn decode_extended_signal(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let Some(payload) = marker_payload(lines, "+QCSQ:") else {
        return map;
    };
    let parts = fields(payload);
    let Some(sysmode) = parts.first().map(|f| unquote(f)) else {
        return map;
    };

    match sysmode {
        "LTE" => {
            if let Some(rssi) = parts.get(1).and_then(|f| parse_int(f)) {
                map.insert("rssi", FieldValue::Int(rssi));
            }
            if let Some(rsrp) = parts.get(2).and_then(|f| parse_int(f)) {
                map.insert("rsrp", FieldValue::Int(rsrp));
            }
            if let Some(raw) = parts.get(3).and_then(|f| parse_int(f)) {
                map.insert("sinr_raw", FieldValue::Int(raw));
                if raw != SINR_UNKNOWN {
                    map.insert("sinr", FieldValue::Float(raw as f64 / 5.0 - 20.0));
                }
            }
            if let Some(rsrq) = parts.get(4).and_then(|f| parse_int(f)) {
                map.insert("rsrq", FieldValue::Int(rsrq));
            }
        }
        "GSM" | "WCDMA" => {
            if let Some(rssi) = parts.get(1).and_then(|f| parse_int(f)) {
                map.insert("rssi", FieldValue::Int(rssi));
            }
        }
        // NOSERVICE or an undocumented mode: nothing measurable.
        _ => {}
    }
    map
}

//! Decoders for static modem and SIM identity queries.
//!
//! These responses carry their payload on a bare line (manufacturer,
//! model, IMSI, …) or behind a `+CMD:` marker depending on firmware; both
//! shapes are accepted.

use super::{fields, marker_payload, unquote, FieldMap, FieldValue};

/// First line of the response, with an optional `marker` prefix stripped.
/// Lines carrying the error token are ignored.
fn bare_payload(lines: &[String], marker: &str) -> Option<String> {
    let line = lines.iter().find(|l| !l.contains("ERROR"))?;
    let payload = line
        .split_once(marker)
        .map_or(line.as_str(), |(_, rest)| rest)
        .trim();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}

fn single_text(lines: &[String], marker: &str, key: &'static str) -> FieldMap {
    let mut map = FieldMap::new();
    if let Some(value) = bare_payload(lines, marker) {
        map.insert(key, FieldValue::Text(value));
    }
    map
}

/// `AT+CGMI` → `manufacturer`.
pub fn decode_manufacturer(_command: &str, lines: &[String]) -> FieldMap {
    single_text(lines, "+CGMI:", "manufacturer")
}

/// `AT+CGMM` → `model`.
pub fn decode_model(_command: &str, lines: &[String]) -> FieldMap {
    single_text(lines, "+CGMM:", "model")
}

/// `AT+CGMR` → `firmware`.
pub fn decode_firmware(_command: &str, lines: &[String]) -> FieldMap {
    single_text(lines, "+CGMR:", "firmware")
}

/// `AT+CGSN` → `serial_number` (IMEI on this dialect).
pub fn decode_serial_number(_command: &str, lines: &[String]) -> FieldMap {
    single_text(lines, "+CGSN:", "serial_number")
}

/// `AT+CPIN?` → `sim_status` (e.g. `READY`, `SIM PIN`).
pub fn decode_sim_status(_command: &str, lines: &[String]) -> FieldMap {
    single_text(lines, "+CPIN:", "sim_status")
}

/// `AT+QCCID` → `iccid`.
pub fn decode_iccid(_command: &str, lines: &[String]) -> FieldMap {
    single_text(lines, "+QCCID:", "iccid")
}

/// `AT+CIMI` → `imsi`. The IMSI is a bare digit string; anything else on
/// the line means the SIM did not answer and the field is omitted.
pub fn decode_imsi(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    if let Some(line) = lines
        .iter()
        .find(|l| !l.is_empty() && l.chars().all(|c| c.is_ascii_digit()))
    {
        map.insert("imsi", FieldValue::Text(line.clone()));
    }
    map
}

/// `AT+QMBNCFG="List"` → `carrier_profiles`, one entry per profile line.
///
/// Response lines look like
/// `+QMBNCFG: "List",0,1,1,"ROW_Generic_3GPP",0x0501081F,201901141`;
/// the entry keeps the profile name and selection flags.
pub fn decode_carrier_profiles(_command: &str, lines: &[String]) -> FieldMap {
    let mut map = FieldMap::new();
    let mut profiles = Vec::new();

    for line in lines {
        let Some(payload) = marker_payload(std::slice::from_ref(line), "+QMBNCFG:") else {
            continue;
        };
        let parts = fields(payload);
        // "List",<index>,<selected>,<activated>,<name>,...
        if parts.len() >= 5 && unquote(parts[0]) == "List" {
            profiles.push(unquote(parts[4]).to_string());
        }
    }

    if !profiles.is_empty() {
        map.insert("carrier_profiles", FieldValue::List(profiles));
    }
    map
}

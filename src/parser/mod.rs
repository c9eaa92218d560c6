//! Response parser: per-command decoders turning vendor AT response text
//! into typed field maps.
//!
//! Decoding is a pure function of `(command, raw_text)`. A dispatcher
//! selects the decoder from a lookup table keyed by command prefix,
//! resolved once at startup; unmatched commands yield an empty map rather
//! than failing. Decoders are defensive throughout: short or malformed
//! field lists produce partial results, and unparsable numerics are simply
//! omitted — a decoder never returns an error.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;

pub mod gnss;
pub mod identity;
pub mod lookup;
pub mod network;
pub mod serving;
pub mod signal;

/// A scalar or structured value produced by a decoder.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Free-form or labelled text.
    Text(String),
    /// Integral value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Ordered list of strings (e.g. carrier profiles).
    List(Vec<String>),
    /// Ordered list of neighbour-cell sub-records.
    Cells(Vec<NeighborCell>),
}

impl FieldValue {
    /// Text content, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integral content, if this is an integer value.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            FieldValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Render for a CSV cell. Structured values serialize to compact JSON.
    pub fn to_cell(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(n) => n.to_string(),
            FieldValue::Float(f) => format!("{f}"),
            FieldValue::List(items) => items.join(";"),
            FieldValue::Cells(cells) => {
                serde_json::to_string(cells).unwrap_or_else(|_| String::new())
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Int(n)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        FieldValue::Float(f)
    }
}

/// One neighbour-cell measurement from an `AT+QENG="neighbourcell"` line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NeighborCell {
    /// Relation to the serving cell: `intra` or `inter` frequency.
    pub relation: String,
    /// Access technology reported for the cell.
    pub technology: String,
    /// Channel number (EARFCN/UARFCN/ARFCN).
    pub channel: Option<i64>,
    /// Physical cell id.
    pub pcid: Option<i64>,
    /// Reference signal received quality, dB.
    pub rsrq: Option<i64>,
    /// Reference signal received power, dBm.
    pub rsrp: Option<i64>,
    /// Received signal strength, dBm.
    pub rssi: Option<i64>,
}

/// Mapping from logical field name to value, one per decoded response.
pub type FieldMap = BTreeMap<&'static str, FieldValue>;

type DecoderFn = fn(&str, &[String]) -> FieldMap;

/// Decoder lookup table, longest prefix first. Resolved once; the
/// dispatcher walks it in order and takes the first prefix match.
static DECODERS: Lazy<Vec<(&'static str, DecoderFn)>> = Lazy::new(|| {
    let mut table: Vec<(&'static str, DecoderFn)> = vec![
        ("AT+QENG=\"servingcell\"", serving::decode_serving_cell),
        ("AT+QENG=\"neighbourcell\"", serving::decode_neighbour_cells),
        ("AT+QGPSGNMEA", gnss::decode_gnmea),
        ("AT+QGPSCFG", gnss::decode_gps_config),
        ("AT+QGPS?", gnss::decode_gps_power),
        ("AT+QMBNCFG", identity::decode_carrier_profiles),
        ("AT+QNWINFO", network::decode_network_info),
        ("AT+QCCID", identity::decode_iccid),
        ("AT+QCSQ", signal::decode_extended_signal),
        ("AT+QSPN", network::decode_provider_name),
        ("AT+QLTS", network::decode_network_time),
        ("AT+CGMI", identity::decode_manufacturer),
        ("AT+CGMM", identity::decode_model),
        ("AT+CGMR", identity::decode_firmware),
        ("AT+CGSN", identity::decode_serial_number),
        ("AT+CGREG", network::decode_registration),
        ("AT+CEREG", network::decode_registration),
        ("AT+CGATT", network::decode_attachment),
        ("AT+CPIN", identity::decode_sim_status),
        ("AT+CIMI", identity::decode_imsi),
        ("AT+CREG", network::decode_registration),
        ("AT+CFUN", network::decode_functionality),
        ("AT+CCLK", network::decode_clock),
        ("AT+COPS", network::decode_operator),
        ("AT+CSQ", signal::decode_signal_quality),
    ];
    // Longest prefix first so e.g. AT+QGPSCFG never falls through to AT+QGPS?.
    table.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    table
});

/// Decode a raw response for the command that produced it.
///
/// Pure and side-effect-free: identical inputs always yield identical
/// maps. Commands with no registered decoder return an empty map.
pub fn decode(command: &str, raw: &str) -> FieldMap {
    let command = command.trim();
    let lines = response_lines(command, raw);

    for (prefix, decoder) in DECODERS.iter() {
        if command.starts_with(prefix) {
            return decoder(command, &lines);
        }
    }
    FieldMap::new()
}

/// Shared preprocessing: split into non-empty trimmed lines, drop a
/// leading echo of the sent command, drop a trailing bare `OK`.
fn response_lines(command: &str, raw: &str) -> Vec<String> {
    let mut lines: Vec<String> = raw
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect();

    if lines.first().map(String::as_str) == Some(command) {
        lines.remove(0);
    }
    if lines.last().map(String::as_str) == Some("OK") {
        lines.pop();
    }
    lines
}

/// Find the payload of the first line containing `marker`, i.e. the text
/// after the marker, trimmed. Decoders use this to locate their response
/// line regardless of surrounding URCs.
pub(crate) fn marker_payload<'a>(lines: &'a [String], marker: &str) -> Option<&'a str> {
    lines
        .iter()
        .find_map(|line| line.split_once(marker).map(|(_, rest)| rest.trim()))
}

/// Split a payload into comma-separated positional fields, trimmed.
pub(crate) fn fields(payload: &str) -> Vec<&str> {
    payload.split(',').map(str::trim).collect()
}

/// Strip surrounding double quotes from a field.
pub(crate) fn unquote(field: &str) -> &str {
    field.trim_matches('"')
}

/// Parse a possibly quoted hex field (the dialect reports LAC/CI/TAC as
/// quoted hex). Returns `None` on anything unparsable.
pub(crate) fn parse_hex(field: &str) -> Option<i64> {
    let s = unquote(field).trim_start_matches("0x");
    if s.is_empty() {
        return None;
    }
    i64::from_str_radix(s, 16).ok()
}

/// Parse a decimal integer field, quoted or not.
pub(crate) fn parse_int(field: &str) -> Option<i64> {
    unquote(field).parse::<i64>().ok()
}

/// Parse a float field, quoted or not.
pub(crate) fn parse_float(field: &str) -> Option<f64> {
    unquote(field).parse::<f64>().ok()
}

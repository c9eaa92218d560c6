//! Accumulating telemetry records.
//!
//! Two accumulators sit between the parser and the sinks:
//! [`ModemInfoRecord`] collects one-time/static facts about the modem and
//! SIM, and [`SampleRecord`] models the most-recent-known-state of every
//! dynamic telemetry field. Both are plain owned values threaded through
//! the scheduler, so they stay independently testable and single-writer.

use crate::parser::{FieldMap, FieldValue};
use chrono::{Local, SecondsFormat};
use serde_json::{Map, Value};

/// Fixed field vocabulary of the sample sink, in column order. Decoders
/// only ever produce keys from this list (or the `gnss_*`/identity keys
/// that live in the modem-info document instead).
pub const SAMPLE_FIELDS: [&str; 35] = [
    "timestamp",
    "latitude",
    "longitude",
    "altitude",
    "speed_kmh",
    "course",
    "fix_quality",
    "satellites",
    "mcc",
    "mnc",
    "lac",
    "tac",
    "cell_id",
    "pcid",
    "channel",
    "band",
    "bandwidth",
    "technology",
    "access_technology",
    "registration_status",
    "operator",
    "operator_mode",
    "provider",
    "rssi",
    "rssi_raw",
    "ber",
    "rsrp",
    "rsrq",
    "sinr",
    "sinr_raw",
    "functionality",
    "attachment",
    "modem_clock",
    "network_time",
    "neighbor_cells",
];

/// Fields any one of which, together with a timestamp, makes a sample
/// worth persisting.
const ANCHOR_FIELDS: [&str; 5] = ["cell_id", "rssi", "latitude", "lac", "operator"];

/// Most-recent-known-state of the dynamic telemetry fields.
///
/// Values persist across polling rounds until overwritten; persisting a
/// row never clears the accumulator.
#[derive(Debug, Default)]
pub struct SampleRecord {
    fields: FieldMap,
}

impl SampleRecord {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a decoded field map, stamping the merge time.
    ///
    /// Monotonic: keys absent from `map` are left untouched. An empty map
    /// neither merges nor refreshes the timestamp. Returns whether
    /// anything was merged.
    pub fn merge(&mut self, map: FieldMap) -> bool {
        if map.is_empty() {
            return false;
        }
        self.fields.insert(
            "timestamp",
            FieldValue::Text(Local::now().to_rfc3339_opts(SecondsFormat::Millis, false)),
        );
        for (key, value) in map {
            self.fields.insert(key, value);
        }
        true
    }

    /// Whether the record holds enough to persist: a timestamp plus at
    /// least one anchor field.
    pub fn is_complete(&self) -> bool {
        self.fields.contains_key("timestamp")
            && ANCHOR_FIELDS.iter().any(|f| self.fields.contains_key(f))
    }

    /// Look up one field.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Number of populated fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether no field has been populated yet.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Render one CSV row over the fixed vocabulary, unpopulated columns
    /// empty.
    pub fn to_row(&self) -> Vec<String> {
        SAMPLE_FIELDS
            .iter()
            .map(|field| {
                self.fields
                    .get(field)
                    .map(FieldValue::to_cell)
                    .unwrap_or_default()
            })
            .collect()
    }
}

/// One-time/static modem and SIM facts.
///
/// Updated monotonically: later merges only add or overwrite keys. The
/// caller flushes the whole document to the sink whenever a merge
/// reports a change.
#[derive(Debug, Default)]
pub struct ModemInfoRecord {
    fields: FieldMap,
}

impl ModemInfoRecord {
    /// An empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge a decoded field map. Returns whether any key was added or
    /// its value actually changed.
    pub fn merge(&mut self, map: FieldMap) -> bool {
        let mut changed = false;
        for (key, value) in map {
            if self.fields.get(key) != Some(&value) {
                self.fields.insert(key, value);
                changed = true;
            }
        }
        changed
    }

    /// Look up one field.
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// Reported manufacturer, if collected.
    pub fn manufacturer(&self) -> Option<&str> {
        self.fields.get("manufacturer").and_then(FieldValue::as_text)
    }

    /// Reported model, if collected.
    pub fn model(&self) -> Option<&str> {
        self.fields.get("model").and_then(FieldValue::as_text)
    }

    /// Whether nothing has been collected yet.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// The whole record as a JSON document, with an update timestamp.
    pub fn to_document(&self) -> Value {
        let mut doc = Map::new();
        doc.insert(
            "updated_at".to_string(),
            Value::String(Local::now().to_rfc3339_opts(SecondsFormat::Secs, false)),
        );
        for (key, value) in &self.fields {
            let json = serde_json::to_value(value).unwrap_or(Value::Null);
            doc.insert((*key).to_string(), json);
        }
        Value::Object(doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_merge_is_monotonic() {
        let mut sample = SampleRecord::new();
        let mut first = FieldMap::new();
        first.insert("rssi", FieldValue::Int(-73));
        first.insert("operator", FieldValue::Text("T-Mobile".into()));
        assert!(sample.merge(first));

        let mut second = FieldMap::new();
        second.insert("rssi", FieldValue::Int(-71));
        assert!(sample.merge(second));

        // Overwritten key takes the new value; untouched key survives.
        assert_eq!(sample.get("rssi").and_then(FieldValue::as_int), Some(-71));
        assert_eq!(
            sample.get("operator").and_then(FieldValue::as_text),
            Some("T-Mobile")
        );
    }

    #[test]
    fn test_empty_merge_does_not_stamp() {
        let mut sample = SampleRecord::new();
        assert!(!sample.merge(FieldMap::new()));
        assert!(sample.is_empty());
        assert!(!sample.is_complete());
    }

    #[test]
    fn test_completeness_requires_anchor() {
        let mut sample = SampleRecord::new();
        let mut map = FieldMap::new();
        map.insert("ber", FieldValue::Int(3));
        sample.merge(map);
        // Timestamp alone with a non-anchor field is not enough.
        assert!(!sample.is_complete());

        let mut map = FieldMap::new();
        map.insert("rssi", FieldValue::Int(-73));
        sample.merge(map);
        assert!(sample.is_complete());
    }

    #[test]
    fn test_row_covers_fixed_vocabulary() {
        let mut sample = SampleRecord::new();
        let mut map = FieldMap::new();
        map.insert("cell_id", FieldValue::Int(0xA12B01));
        sample.merge(map);

        let row = sample.to_row();
        assert_eq!(row.len(), SAMPLE_FIELDS.len());
        let cell_idx = SAMPLE_FIELDS.iter().position(|f| *f == "cell_id").unwrap();
        assert_eq!(row[cell_idx], (0xA12B01 as i64).to_string());
        let lat_idx = SAMPLE_FIELDS.iter().position(|f| *f == "latitude").unwrap();
        assert_eq!(row[lat_idx], "");
    }

    #[test]
    fn test_modem_info_change_detection() {
        let mut info = ModemInfoRecord::new();
        let mut map = FieldMap::new();
        map.insert("manufacturer", FieldValue::Text("Quectel".into()));
        assert!(info.merge(map.clone()));
        // Re-supplying the same value is not a change.
        assert!(!info.merge(map));

        let mut map = FieldMap::new();
        map.insert("firmware", FieldValue::Text("EG25GGBR07A08M2G".into()));
        assert!(info.merge(map));
        assert_eq!(info.manufacturer(), Some("Quectel"));
    }

    #[test]
    fn test_modem_info_document_shape() {
        let mut info = ModemInfoRecord::new();
        let mut map = FieldMap::new();
        map.insert("model", FieldValue::Text("EG25".into()));
        map.insert(
            "carrier_profiles",
            FieldValue::List(vec!["ROW_Generic_3GPP".into()]),
        );
        info.merge(map);

        let doc = info.to_document();
        assert_eq!(doc["model"], "EG25");
        assert!(doc["carrier_profiles"].is_array());
        assert!(doc["updated_at"].is_string());
    }
}

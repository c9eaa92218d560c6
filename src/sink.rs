//! Telemetry sinks: the sample CSV and the modem-info JSON document.
//!
//! The CSV carries the fixed sample vocabulary as its column set, one
//! whole row appended per persisted sample and flushed immediately, so an
//! interrupted session never leaves a truncated row. The modem-info
//! document is rewritten whole on every change.

use crate::config::OutputSettings;
use crate::records::{ModemInfoRecord, SampleRecord, SAMPLE_FIELDS};
use anyhow::{Context, Result};
use chrono::Local;
use log::{debug, info};
use std::fs::File;
use std::path::{Path, PathBuf};

fn session_stamp() -> String {
    Local::now().format("%Y%m%d_%H%M%S").to_string()
}

fn prepare_path(settings: &OutputSettings, base: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(&settings.data_dir).with_context(|| {
        format!(
            "Failed to create output directory at {}",
            settings.data_dir.display()
        )
    })?;
    Ok(settings.data_dir.join(format!("{}_{}", session_stamp(), base)))
}

/// Append-only CSV sink for persisted samples.
pub struct SampleSink {
    path: PathBuf,
    writer: Option<csv::Writer<File>>,
    rows: u64,
}

impl SampleSink {
    /// Create the session's CSV file and write the header row.
    pub fn create(settings: &OutputSettings) -> Result<Self> {
        let path = prepare_path(settings, &settings.sample_filename)?;
        let file = File::create(&path)
            .with_context(|| format!("Failed to create sample CSV at {}", path.display()))?;
        let mut writer = csv::Writer::from_writer(file);
        writer
            .write_record(SAMPLE_FIELDS)
            .context("Failed to write sample CSV header")?;
        writer.flush().context("Failed to flush sample CSV header")?;

        info!("Sample sink: {}", path.display());
        Ok(Self {
            path,
            writer: Some(writer),
            rows: 0,
        })
    }

    /// Append one whole row for the record's current state, flushed
    /// before returning.
    pub fn append(&mut self, record: &SampleRecord) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer
                .write_record(record.to_row())
                .with_context(|| format!("Failed to append sample row to {}", self.path.display()))?;
            writer
                .flush()
                .with_context(|| format!("Failed to flush sample CSV at {}", self.path.display()))?;
            self.rows += 1;
            debug!("Persisted sample row {}", self.rows);
        }
        Ok(())
    }

    /// Rows appended so far.
    pub fn rows(&self) -> u64 {
        self.rows
    }

    /// Where this sink writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush and close. Idempotent; appends after close are dropped.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer
                .flush()
                .with_context(|| format!("Failed to flush sample CSV at {}", self.path.display()))?;
            info!("Sample sink closed after {} rows", self.rows);
        }
        Ok(())
    }
}

/// Whole-document JSON sink for the modem-info record.
pub struct ModemInfoSink {
    path: PathBuf,
}

impl ModemInfoSink {
    /// Choose the session's document path; nothing is written until the
    /// record first changes.
    pub fn create(settings: &OutputSettings) -> Result<Self> {
        let path = prepare_path(settings, &settings.modem_info_filename)?;
        info!("Modem-info sink: {}", path.display());
        Ok(Self { path })
    }

    /// Rewrite the whole document from the record's current state.
    pub fn write(&self, record: &ModemInfoRecord) -> Result<()> {
        let text = serde_json::to_string_pretty(&record.to_document())
            .context("Failed to serialize modem info")?;
        std::fs::write(&self.path, text)
            .with_context(|| format!("Failed to write modem info at {}", self.path.display()))?;
        debug!("Modem-info document updated");
        Ok(())
    }

    /// Where this sink writes.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{FieldMap, FieldValue};

    fn output_in(dir: &Path) -> OutputSettings {
        OutputSettings {
            data_dir: dir.to_path_buf(),
            ..OutputSettings::default()
        }
    }

    #[test]
    fn test_sample_sink_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SampleSink::create(&output_in(dir.path())).unwrap();

        let mut sample = SampleRecord::new();
        let mut map = FieldMap::new();
        map.insert("rssi", FieldValue::Int(-73));
        map.insert("operator", FieldValue::Text("T-Mobile".into()));
        sample.merge(map);
        sink.append(&sample).unwrap();
        sink.close().unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("timestamp,"));
        assert_eq!(header.split(',').count(), SAMPLE_FIELDS.len());
        let row = lines.next().unwrap();
        assert!(row.contains("-73"));
        assert!(row.contains("T-Mobile"));
        assert_eq!(sink.rows(), 1);
    }

    #[test]
    fn test_sample_sink_unused_columns_left_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = SampleSink::create(&output_in(dir.path())).unwrap();

        let mut sample = SampleRecord::new();
        let mut map = FieldMap::new();
        map.insert("cell_id", FieldValue::Int(42));
        sample.merge(map);
        sink.append(&sample).unwrap();
        sink.close().unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let row = content.lines().nth(1).unwrap();
        // Every column present, almost all empty.
        assert_eq!(row.split(',').count(), SAMPLE_FIELDS.len());
    }

    #[test]
    fn test_modem_info_document_rewrite() {
        let dir = tempfile::tempdir().unwrap();
        let sink = ModemInfoSink::create(&output_in(dir.path())).unwrap();

        let mut info = ModemInfoRecord::new();
        let mut map = FieldMap::new();
        map.insert("manufacturer", FieldValue::Text("Quectel".into()));
        info.merge(map);
        sink.write(&info).unwrap();

        let mut map = FieldMap::new();
        map.insert("model", FieldValue::Text("EG25".into()));
        info.merge(map);
        sink.write(&info).unwrap();

        let doc: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(sink.path()).unwrap()).unwrap();
        assert_eq!(doc["manufacturer"], "Quectel");
        assert_eq!(doc["model"], "EG25");
    }
}

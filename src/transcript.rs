//! Verbatim protocol transcript.
//!
//! Every command sent to the modem and every raw response received is
//! recorded with a timestamp, independent of the structured log. The
//! transcript is the primary artifact for offline protocol debugging, so
//! entries are flushed as they are written; an interrupted session never
//! loses more than the line in flight.

use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Sink for the raw request/response stream.
pub trait Transcript: Send {
    /// Record a command as transmitted.
    fn record_sent(&mut self, command: &str) -> Result<()>;

    /// Record a raw response as received.
    fn record_received(&mut self, response: &str) -> Result<()>;

    /// Flush and close the sink. Idempotent.
    fn close(&mut self) -> Result<()>;
}

fn timestamp() -> String {
    Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string()
}

/// File-backed transcript, one line per direction:
/// `<timestamp> >>> <command>` / `<timestamp> <<< <response>`.
pub struct FileTranscript {
    path: PathBuf,
    file: Option<File>,
}

impl FileTranscript {
    /// Create the transcript file, truncating any previous content.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("Failed to create transcript at {}", path.display()))?;
        log::info!("Transcript: {}", path.display());
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    fn write_line(&mut self, direction: &str, text: &str) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            // Multi-line responses stay on one transcript line so each entry
            // pairs with exactly one timestamp.
            let flat = text.replace('\r', "\\r").replace('\n', "\\n");
            writeln!(file, "{} {} {}", timestamp(), direction, flat)
                .and_then(|()| file.flush())
                .with_context(|| {
                    format!("Failed to write transcript at {}", self.path.display())
                })?;
        }
        Ok(())
    }
}

impl Transcript for FileTranscript {
    fn record_sent(&mut self, command: &str) -> Result<()> {
        self.write_line(">>>", command)
    }

    fn record_received(&mut self, response: &str) -> Result<()> {
        self.write_line("<<<", response)
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut file) = self.file.take() {
            file.flush()
                .with_context(|| format!("Failed to flush transcript at {}", self.path.display()))?;
        }
        Ok(())
    }
}

impl Drop for FileTranscript {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// In-memory transcript for tests.
#[derive(Default)]
pub struct MemoryTranscript {
    /// `(direction, text)` entries in record order.
    pub entries: Vec<(String, String)>,
}

impl MemoryTranscript {
    /// An empty recorder.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transcript for MemoryTranscript {
    fn record_sent(&mut self, command: &str) -> Result<()> {
        self.entries.push((">>>".to_string(), command.to_string()));
        Ok(())
    }

    fn record_received(&mut self, response: &str) -> Result<()> {
        self.entries.push(("<<<".to_string(), response.to_string()));
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

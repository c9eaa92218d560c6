//! Optional gpsd position source.
//!
//! A background task holds a TCP connection to gpsd in JSON watch mode
//! and caches the latest TPV fix. The scheduler samples that cache once
//! per tick; the source being absent, unreachable, or fixless is always
//! tolerated — position fields are simply missing from the samples.

use crate::config::GpsdSettings;
use crate::parser::{FieldMap, FieldValue};
use log::{debug, info, warn};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

const WATCH_COMMAND: &str = "?WATCH={\"enable\":true,\"json\":true};\n";
const RECONNECT_DELAY: Duration = Duration::from_secs(10);
const MPS_TO_KMH: f64 = 3.6;

/// One position fix from gpsd.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    /// Latitude in decimal degrees.
    pub latitude: f64,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Altitude in meters, when reported.
    pub altitude: Option<f64>,
    /// Ground speed in km/h, when reported.
    pub speed_kmh: Option<f64>,
}

impl Fix {
    /// Render as decoder-style fields for merging into a sample.
    pub fn to_fields(&self) -> FieldMap {
        let mut map = FieldMap::new();
        map.insert("latitude", FieldValue::Float(self.latitude));
        map.insert("longitude", FieldValue::Float(self.longitude));
        if let Some(alt) = self.altitude {
            map.insert("altitude", FieldValue::Float(alt));
        }
        if let Some(speed) = self.speed_kmh {
            map.insert("speed_kmh", FieldValue::Float(speed));
        }
        map
    }
}

/// One line of gpsd's JSON stream; only TPV reports carry a position.
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    lat: Option<f64>,
    lon: Option<f64>,
    alt: Option<f64>,
    /// Meters per second.
    speed: Option<f64>,
}

/// Cached-latest-fix client for a gpsd daemon.
pub struct GpsdSource {
    rx: watch::Receiver<Option<Fix>>,
    task: JoinHandle<()>,
}

impl GpsdSource {
    /// Start the background watcher, or `None` when gpsd is disabled in
    /// settings. Connection failures are retried in the background and
    /// never surface to the caller.
    pub fn start(settings: &GpsdSettings) -> Option<Self> {
        if !settings.enabled {
            return None;
        }
        let endpoint = format!("{}:{}", settings.host, settings.port);
        let (tx, rx) = watch::channel(None);

        let task = tokio::spawn(async move {
            loop {
                match watch_gpsd(&endpoint, &tx).await {
                    Ok(()) => debug!("gpsd stream at {endpoint} ended"),
                    Err(e) => warn!("gpsd at {endpoint} unavailable: {e:#}"),
                }
                sleep(RECONNECT_DELAY).await;
            }
        });

        info!(
            "gpsd position source enabled at {}:{}",
            settings.host, settings.port
        );
        Some(Self { rx, task })
    }

    /// The most recent fix, if any has arrived.
    pub fn latest_fix(&self) -> Option<Fix> {
        *self.rx.borrow()
    }

    /// Stop the background watcher.
    pub fn stop(&self) {
        self.task.abort();
    }
}

impl Drop for GpsdSource {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn watch_gpsd(endpoint: &str, tx: &watch::Sender<Option<Fix>>) -> anyhow::Result<()> {
    let mut stream = TcpStream::connect(endpoint).await?;
    stream.write_all(WATCH_COMMAND.as_bytes()).await?;
    info!("Connected to gpsd at {endpoint}");

    let mut lines = BufReader::new(stream).lines();
    while let Some(line) = lines.next_line().await? {
        if let Some(fix) = parse_report(&line) {
            // Send failure means the receiver is gone; stop watching.
            if tx.send(Some(fix)).is_err() {
                break;
            }
        }
    }
    Ok(())
}

/// Extract a fix from one stream line; non-TPV classes and TPV reports
/// without a 2D position yield `None`.
fn parse_report(line: &str) -> Option<Fix> {
    let report: GpsdReport = serde_json::from_str(line).ok()?;
    if report.class != "TPV" {
        return None;
    }
    Some(Fix {
        latitude: report.lat?,
        longitude: report.lon?,
        altitude: report.alt,
        speed_kmh: report.speed.map(|s| s * MPS_TO_KMH),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tpv_report_parsed() {
        let line = r#"{"class":"TPV","device":"/dev/ttyACM0","mode":3,"lat":40.7102,"lon":-74.0069,"alt":12.5,"speed":6.4}"#;
        let fix = parse_report(line).unwrap();
        assert_eq!(fix.latitude, 40.7102);
        assert_eq!(fix.longitude, -74.0069);
        assert_eq!(fix.altitude, Some(12.5));
        assert!((fix.speed_kmh.unwrap() - 23.04).abs() < 1e-9);
    }

    #[test]
    fn test_non_tpv_and_fixless_reports_ignored() {
        assert!(parse_report(r#"{"class":"VERSION","release":"3.22"}"#).is_none());
        assert!(parse_report(r#"{"class":"TPV","mode":1}"#).is_none());
        assert!(parse_report("not json").is_none());
    }

    #[test]
    fn test_fix_to_fields() {
        let fix = Fix {
            latitude: 40.71,
            longitude: -74.0,
            altitude: None,
            speed_kmh: Some(23.0),
        };
        let map = fix.to_fields();
        assert_eq!(map["latitude"], FieldValue::Float(40.71));
        assert!(!map.contains_key("altitude"));
        assert_eq!(map["speed_kmh"], FieldValue::Float(23.0));
    }

    #[tokio::test]
    async fn test_disabled_source_is_none() {
        let settings = GpsdSettings {
            enabled: false,
            ..GpsdSettings::default()
        };
        assert!(GpsdSource::start(&settings).is_none());
    }
}

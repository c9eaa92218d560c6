//! Smart configuration engine: check-set-verify with minimal writes.
//!
//! The modem stores configuration in non-volatile memory with finite
//! write endurance, so re-sending every setting on every run is exactly
//! what this engine avoids. Each managed setting runs
//! `Query → Parse → Compare → (Set | Skip)`: the write-form command is
//! only issued when the current value differs from the desired one, or
//! when the current value cannot be read — an unreadable setting is not
//! proof of correctness.
//!
//! The desired configuration is a YAML document with `basic`, `network`,
//! and `gnss` groups. A setting absent from the document is not managed
//! at all; the engine never invents defaults.

use crate::error::{AppResult, ScoutError};
use crate::executor::CommandExecutor;
use log::{error, info, warn};
use regex::Regex;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Desired modem configuration, loaded once per run and immutable for
/// its duration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DesiredConfig {
    /// Basic modem behavior.
    #[serde(default)]
    pub basic: BasicConfig,
    /// Network scanning and registration behavior.
    #[serde(default)]
    pub network: NetworkConfig,
    /// GNSS subsystem configuration.
    #[serde(default)]
    pub gnss: GnssConfig,
}

/// `basic` group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasicConfig {
    /// Error reporting verbosity (`AT+CMEE`).
    pub error_reporting: Option<i64>,
    /// Automatic time zone update mode (`AT+CTZU`).
    pub time_zone_update: Option<i64>,
}

/// `network` group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    /// Clear the forbidden-PLMN list when it has entries.
    #[serde(default)]
    pub clear_forbidden_plmn: bool,
    /// RSSI display in operator scans (`AT+QOPSCFG="displayrssi"`).
    pub display_rssi_in_scan: Option<i64>,
    /// Bandwidth display in operator scans (`AT+QOPSCFG="displaybw"`).
    pub display_bandwidth_in_scan: Option<i64>,
}

/// `gnss` group. Parameters are only touched when `enabled` is true.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GnssConfig {
    /// Whether to manage the GNSS subsystem at all.
    #[serde(default)]
    pub enabled: bool,
    /// NMEA output port (`"outport"`).
    pub output_port: Option<String>,
    /// NMEA-over-AT availability (`"nmeasrc"`).
    pub nmea_source: Option<i64>,
    /// GPS NMEA sentence mask (`"gpsnmeatype"`).
    pub gps_nmea_type: Option<i64>,
    /// GLONASS NMEA sentence mask (`"glonassnmeatype"`).
    pub glonass_nmea_type: Option<i64>,
    /// Galileo NMEA sentence mask (`"galileonmeatype"`).
    pub galileo_nmea_type: Option<i64>,
    /// BeiDou NMEA sentence mask (`"beidounmeatype"`).
    pub beidou_nmea_type: Option<i64>,
    /// Extended GSV sentences (`"gsvextnmeatype"`).
    pub gsv_extended_nmea: Option<i64>,
    /// Constellation selection (`"gnssconfig"`).
    pub gnss_config: Option<i64>,
    /// Start GNSS automatically at module boot (`"autogps"`).
    pub auto_gps: Option<i64>,
    /// AGPS positioning mode (`"agpsposmode"`).
    pub agps_position_mode: Option<i64>,
    /// NMEA output frequency in Hz (`"fixfreq"`).
    pub fix_frequency: Option<i64>,
    /// 1PPS output (`"1pps"`).
    pub one_pps: Option<i64>,
    /// Raw measurement output, verbatim parameter list (`"gnssrawdata"`).
    pub raw_data_config: Option<String>,
}

impl DesiredConfig {
    /// Load the document from a YAML file. Missing or invalid documents
    /// are a typed error, fatal only to the configuration run itself.
    pub fn load<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ScoutError::DesiredConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&text).map_err(|e| {
            ScoutError::DesiredConfig(format!("invalid YAML in {}: {e}", path.display()))
        })
    }
}

/// A desired value with its comparison type.
#[derive(Debug, Clone, PartialEq)]
enum Desired {
    Int(i64),
    Text(String),
}

impl fmt::Display for Desired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Desired::Int(n) => write!(f, "{n}"),
            Desired::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Per-run outcome counters. Every setting transition increments exactly
/// one of changed/skipped/failed alongside checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigStats {
    /// Settings examined.
    pub checked: u32,
    /// Write-form commands issued and accepted.
    pub changed: u32,
    /// Settings already at the desired value; no write issued.
    pub skipped: u32,
    /// Query or write failures.
    pub failed: u32,
}

impl ConfigStats {
    /// Share of checked settings that needed no write, as a percentage.
    /// This is the avoided non-volatile write wear.
    pub fn efficiency_percent(&self) -> f64 {
        if self.checked == 0 {
            0.0
        } else {
            f64::from(self.skipped) / f64::from(self.checked) * 100.0
        }
    }

    /// Whether every checked setting was applied or already correct.
    pub fn all_applied(&self) -> bool {
        self.failed == 0
    }
}

/// Extract the first capture group of `pattern` from `raw` as an
/// integer. Any parse failure means "current value unknown".
fn extract_int(raw: &str, pattern: &str) -> Option<i64> {
    let re = Regex::new(pattern).ok()?;
    re.captures(raw)?.get(1)?.as_str().parse().ok()
}

/// The check-set-verify engine over one loaded desired configuration.
pub struct SmartConfigurator {
    desired: DesiredConfig,
    stats: ConfigStats,
}

impl SmartConfigurator {
    /// Build an engine for one configuration run.
    pub fn new(desired: DesiredConfig) -> Self {
        Self {
            desired,
            stats: ConfigStats::default(),
        }
    }

    /// Outcome counters so far.
    pub fn stats(&self) -> ConfigStats {
        self.stats
    }

    /// Apply the whole document: basic, network, then the GNSS batch.
    /// Returns whether every managed setting ended up applied or already
    /// correct.
    pub async fn apply(&mut self, executor: &mut CommandExecutor) -> bool {
        info!("Starting smart configuration (only deltas are written)");

        let basic = self.desired.basic.clone();
        let network = self.desired.network.clone();
        let gnss = self.desired.gnss.clone();

        self.apply_basic(executor, &basic).await;
        self.apply_network(executor, &network).await;
        let gnss_restored = self.apply_gnss(executor, &gnss).await;

        self.log_summary();
        self.stats.all_applied() && gnss_restored
    }

    async fn apply_basic(&mut self, executor: &mut CommandExecutor, basic: &BasicConfig) {
        if let Some(v) = basic.error_reporting {
            self.check_set_numeric(executor, "AT+CMEE", v).await;
        }
        if let Some(v) = basic.time_zone_update {
            self.check_set_numeric(executor, "AT+CTZU", v).await;
        }
    }

    async fn apply_network(&mut self, executor: &mut CommandExecutor, network: &NetworkConfig) {
        if network.clear_forbidden_plmn {
            self.clear_fplmn(executor).await;
        }
        if let Some(v) = network.display_rssi_in_scan {
            self.check_set_qopscfg(executor, "displayrssi", v).await;
        }
        if let Some(v) = network.display_bandwidth_in_scan {
            self.check_set_qopscfg(executor, "displaybw", v).await;
        }
    }

    /// GNSS parameters are configured as a batch: positioning is powered
    /// off first (parameters are rejected while it runs) and powered
    /// back on unconditionally at the end, even when parameter changes
    /// failed. Leaving positioning off is worse than a partially-applied
    /// configuration. Returns whether positioning came back on.
    async fn apply_gnss(&mut self, executor: &mut CommandExecutor, gnss: &GnssConfig) -> bool {
        if !gnss.enabled {
            info!("GNSS disabled in desired configuration, leaving it unmanaged");
            return true;
        }

        if !executor.execute("AT+QGPSEND").await.success {
            warn!("Failed to power off GNSS before configuration");
        }

        let mut settings: Vec<(&'static str, Desired)> = Vec::new();
        if let Some(v) = &gnss.output_port {
            settings.push(("outport", Desired::Text(v.clone())));
        }
        if let Some(v) = gnss.nmea_source {
            settings.push(("nmeasrc", Desired::Int(v)));
        }
        if let Some(v) = gnss.gps_nmea_type {
            settings.push(("gpsnmeatype", Desired::Int(v)));
        }
        if let Some(v) = gnss.glonass_nmea_type {
            settings.push(("glonassnmeatype", Desired::Int(v)));
        }
        if let Some(v) = gnss.galileo_nmea_type {
            settings.push(("galileonmeatype", Desired::Int(v)));
        }
        if let Some(v) = gnss.beidou_nmea_type {
            settings.push(("beidounmeatype", Desired::Int(v)));
        }
        if let Some(v) = gnss.gsv_extended_nmea {
            settings.push(("gsvextnmeatype", Desired::Int(v)));
        }
        if let Some(v) = gnss.gnss_config {
            settings.push(("gnssconfig", Desired::Int(v)));
        }
        if let Some(v) = gnss.auto_gps {
            settings.push(("autogps", Desired::Int(v)));
        }
        if let Some(v) = gnss.agps_position_mode {
            settings.push(("agpsposmode", Desired::Int(v)));
        }
        if let Some(v) = gnss.fix_frequency {
            settings.push(("fixfreq", Desired::Int(v)));
        }
        if let Some(v) = gnss.one_pps {
            settings.push(("1pps", Desired::Int(v)));
        }

        for (setting, desired) in settings {
            self.check_set_qgpscfg(executor, setting, &desired).await;
        }
        if let Some(raw) = &gnss.raw_data_config {
            self.check_set_raw_data(executor, raw).await;
        }

        if executor.execute("AT+QGPS=1").await.success {
            info!("GNSS powered back on");
            true
        } else {
            error!("Failed to power GNSS back on after configuration");
            false
        }
    }

    /// `AT+<verb>?` / `AT+<verb>=<n>` settings.
    async fn check_set_numeric(
        &mut self,
        executor: &mut CommandExecutor,
        base: &str,
        desired: i64,
    ) -> bool {
        self.stats.checked += 1;

        let result = executor.execute(&format!("{base}?")).await;
        if !result.success {
            error!("Failed to query {base}");
            self.stats.failed += 1;
            return false;
        }

        let marker = base.trim_start_matches("AT");
        let pattern = format!(r"{}:\s*(\d+)", regex::escape(marker));
        let current = extract_int(&result.raw, &pattern);
        self.settle(executor, base, current.map(Desired::Int), &Desired::Int(desired), |v| {
            format!("{base}={v}")
        })
        .await
    }

    /// `AT+QOPSCFG="<param>"` settings.
    async fn check_set_qopscfg(
        &mut self,
        executor: &mut CommandExecutor,
        param: &str,
        desired: i64,
    ) -> bool {
        self.stats.checked += 1;

        let result = executor.execute(&format!("AT+QOPSCFG=\"{param}\"")).await;
        if !result.success {
            error!("Failed to query QOPSCFG {param}");
            self.stats.failed += 1;
            return false;
        }

        let pattern = format!(r#"\+QOPSCFG:\s*"{}",\s*(\d+)"#, regex::escape(param));
        let current = extract_int(&result.raw, &pattern);
        self.settle(executor, param, current.map(Desired::Int), &Desired::Int(desired), |v| {
            format!("AT+QOPSCFG=\"{param}\",{v}")
        })
        .await
    }

    /// `AT+QGPSCFG="<setting>"` parameters, string- or integer-valued.
    async fn check_set_qgpscfg(
        &mut self,
        executor: &mut CommandExecutor,
        setting: &str,
        desired: &Desired,
    ) -> bool {
        self.stats.checked += 1;

        let result = executor.execute(&format!("AT+QGPSCFG=\"{setting}\"")).await;
        if !result.success {
            error!("Failed to query QGPSCFG {setting}");
            self.stats.failed += 1;
            return false;
        }

        let current = match desired {
            Desired::Int(_) => {
                let pattern = format!(r#"\+QGPSCFG:\s*"{}",\s*(\d+)"#, regex::escape(setting));
                extract_int(&result.raw, &pattern).map(Desired::Int)
            }
            Desired::Text(_) => {
                // The value may arrive quoted or bare depending on firmware.
                let pattern = format!(
                    r#"\+QGPSCFG:\s*"{}",\s*(?:"([^"]*)"|([^,\s\r\n]*))"#,
                    regex::escape(setting)
                );
                Regex::new(&pattern)
                    .ok()
                    .and_then(|re| {
                        re.captures(&result.raw).and_then(|caps| {
                            caps.get(1)
                                .or_else(|| caps.get(2))
                                .map(|m| m.as_str().to_string())
                        })
                    })
                    .map(Desired::Text)
            }
        };

        self.settle(executor, setting, current, desired, |v| match desired {
            Desired::Text(_) => format!("AT+QGPSCFG=\"{setting}\",\"{v}\""),
            Desired::Int(_) => format!("AT+QGPSCFG=\"{setting}\",{v}"),
        })
        .await
    }

    /// `gnssrawdata` takes multiple parameters, so current and desired
    /// compare as the verbatim parameter list.
    async fn check_set_raw_data(&mut self, executor: &mut CommandExecutor, desired: &str) -> bool {
        self.stats.checked += 1;

        let result = executor.execute("AT+QGPSCFG=\"gnssrawdata\"").await;
        if !result.success {
            error!("Failed to query QGPSCFG gnssrawdata");
            self.stats.failed += 1;
            return false;
        }

        let current = Regex::new(r#"\+QGPSCFG:\s*"gnssrawdata",\s*(.+)"#)
            .ok()
            .and_then(|re| {
                re.captures(&result.raw)
                    .and_then(|caps| caps.get(1))
                    .map(|m| m.as_str().lines().next().unwrap_or("").trim().to_string())
            });

        self.settle(
            executor,
            "gnssrawdata",
            current.map(Desired::Text),
            &Desired::Text(desired.to_string()),
            |v| format!("AT+QGPSCFG=\"gnssrawdata\",{v}"),
        )
        .await
    }

    /// The forbidden-PLMN list has no scalar compare: it is "dirty" when
    /// the list query reports any entry, and clearing is the write.
    async fn clear_fplmn(&mut self, executor: &mut CommandExecutor) -> bool {
        self.stats.checked += 1;

        let result = executor.execute("AT+QFPLMNCFG=\"list\"").await;
        if !result.success {
            error!("Failed to query the forbidden-PLMN list");
            self.stats.failed += 1;
            return false;
        }

        if !result.raw.contains("+QFPLMNCFG:") {
            info!("Forbidden-PLMN list already empty, skipping clear");
            self.stats.skipped += 1;
            return true;
        }

        info!("Forbidden-PLMN list has entries, clearing");
        if executor
            .execute("AT+QFPLMNCFG=\"Delete\",\"all\"")
            .await
            .success
        {
            self.stats.changed += 1;
            true
        } else {
            error!("Failed to clear the forbidden-PLMN list");
            self.stats.failed += 1;
            false
        }
    }

    /// Shared Compare → (Set | Skip) tail of the state machine.
    async fn settle<F>(
        &mut self,
        executor: &mut CommandExecutor,
        name: &str,
        current: Option<Desired>,
        desired: &Desired,
        set_command: F,
    ) -> bool
    where
        F: Fn(&Desired) -> String,
    {
        match &current {
            Some(value) if value == desired => {
                info!("{name} already set to {desired}, skipping");
                self.stats.skipped += 1;
                return true;
            }
            Some(value) => info!("Changing {name} from {value} to {desired}"),
            // An unreadable current value proceeds to Set: inability to
            // read is not proof of correctness.
            None => {
                warn!("Could not parse current value for {name}, setting anyway");
            }
        }

        if executor.execute(&set_command(desired)).await.success {
            self.stats.changed += 1;
            true
        } else {
            error!("Failed to configure {name}");
            self.stats.failed += 1;
            false
        }
    }

    fn log_summary(&self) {
        let s = &self.stats;
        info!("Smart configuration summary:");
        info!("  settings checked: {}", s.checked);
        info!("  settings changed: {}", s.changed);
        info!("  settings skipped (already correct): {}", s.skipped);
        info!("  settings failed: {}", s.failed);
        info!(
            "Flash wear reduction: {:.1}% of settings skipped",
            s.efficiency_percent()
        );
    }
}

/// Load the desired configuration and apply it in one call.
pub async fn run(executor: &mut CommandExecutor, config_path: &Path) -> AppResult<ConfigStats> {
    let desired = DesiredConfig::load(config_path)?;
    let mut configurator = SmartConfigurator::new(desired);
    configurator.apply(executor).await;
    Ok(configurator.stats())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExecutorSettings;
    use crate::transcript::MemoryTranscript;
    use crate::transport::MockTransport;
    use std::time::Duration;

    fn no_retry_settings() -> ExecutorSettings {
        ExecutorSettings {
            command_delay: Duration::from_millis(1),
            idle_gap: Duration::from_millis(1),
            retry_count: 0,
        }
    }

    async fn connected_executor(mock: &MockTransport) -> CommandExecutor {
        let mut executor = CommandExecutor::new(
            Box::new(mock.clone()),
            Box::new(MemoryTranscript::new()),
            &no_retry_settings(),
        );
        executor.connect().await.unwrap();
        executor
    }

    fn desired_yaml(yaml: &str) -> DesiredConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[tokio::test]
    async fn test_matching_value_is_skipped_without_set() {
        let mock = MockTransport::new();
        mock.respond_to("AT+CMEE?", "+CMEE: 2\r\nOK\r\n");
        let mut executor = connected_executor(&mock).await;

        let mut configurator =
            SmartConfigurator::new(desired_yaml("basic:\n  error_reporting: 2\n"));
        assert!(configurator.apply(&mut executor).await);

        // No write-form command was ever issued.
        assert_eq!(mock.write_count("AT+CMEE="), 0);
        assert_eq!(
            configurator.stats(),
            ConfigStats {
                checked: 1,
                skipped: 1,
                ..ConfigStats::default()
            }
        );
    }

    #[tokio::test]
    async fn test_differing_value_is_set() {
        let mock = MockTransport::new();
        mock.respond_to("AT+CTZU?", "+CTZU: 0\r\nOK\r\n");
        mock.respond_to("AT+CTZU=3", "OK\r\n");
        let mut executor = connected_executor(&mock).await;

        let mut configurator =
            SmartConfigurator::new(desired_yaml("basic:\n  time_zone_update: 3\n"));
        assert!(configurator.apply(&mut executor).await);

        assert_eq!(mock.write_count("AT+CTZU=3"), 1);
        assert_eq!(configurator.stats().changed, 1);
    }

    #[tokio::test]
    async fn test_unparsable_current_value_proceeds_to_set() {
        let mock = MockTransport::new();
        mock.respond_to("AT+CMEE?", "mangled response\r\nOK\r\n");
        mock.respond_to("AT+CMEE=2", "OK\r\n");
        let mut executor = connected_executor(&mock).await;

        let mut configurator =
            SmartConfigurator::new(desired_yaml("basic:\n  error_reporting: 2\n"));
        configurator.apply(&mut executor).await;

        // Not silently abandoned: the set was issued.
        assert_eq!(mock.write_count("AT+CMEE=2"), 1);
        assert_eq!(configurator.stats().changed, 1);
        assert_eq!(configurator.stats().skipped, 0);
    }

    #[tokio::test]
    async fn test_unmanaged_settings_are_never_touched() {
        let mock = MockTransport::new();
        let mut executor = connected_executor(&mock).await;

        let mut configurator = SmartConfigurator::new(DesiredConfig::default());
        assert!(configurator.apply(&mut executor).await);

        assert!(mock.writes().is_empty());
        assert_eq!(configurator.stats().checked, 0);
    }

    #[tokio::test]
    async fn test_qopscfg_already_correct_is_skipped() {
        let mock = MockTransport::new();
        mock.respond_to(
            "AT+QOPSCFG=\"displayrssi\"",
            "+QOPSCFG: \"displayrssi\",1\r\nOK\r\n",
        );
        let mut executor = connected_executor(&mock).await;

        let mut configurator =
            SmartConfigurator::new(desired_yaml("network:\n  display_rssi_in_scan: 1\n"));
        configurator.apply(&mut executor).await;

        assert_eq!(configurator.stats().skipped, 1);
        assert_eq!(mock.write_count("AT+QOPSCFG=\"displayrssi\","), 0);
    }

    #[tokio::test]
    async fn test_fplmn_cleared_only_when_populated() {
        let mock = MockTransport::new();
        mock.respond_to(
            "AT+QFPLMNCFG=\"list\"",
            "+QFPLMNCFG: \"46000\"\r\n+QFPLMNCFG: \"46002\"\r\nOK\r\n",
        );
        mock.respond_to("AT+QFPLMNCFG=\"Delete\"", "OK\r\n");
        let mut executor = connected_executor(&mock).await;

        let mut configurator =
            SmartConfigurator::new(desired_yaml("network:\n  clear_forbidden_plmn: true\n"));
        configurator.apply(&mut executor).await;
        assert_eq!(mock.write_count("AT+QFPLMNCFG=\"Delete\",\"all\""), 1);
        assert_eq!(configurator.stats().changed, 1);

        // Empty list: no clear issued.
        let mock = MockTransport::new();
        mock.respond_to("AT+QFPLMNCFG=\"list\"", "OK\r\n");
        let mut executor = connected_executor(&mock).await;
        let mut configurator =
            SmartConfigurator::new(desired_yaml("network:\n  clear_forbidden_plmn: true\n"));
        configurator.apply(&mut executor).await;
        assert_eq!(mock.write_count("AT+QFPLMNCFG=\"Delete\",\"all\""), 0);
        assert_eq!(configurator.stats().skipped, 1);
    }

    #[tokio::test]
    async fn test_gnss_batch_brackets_power_even_on_failure() {
        let mock = MockTransport::new();
        mock.respond_to("AT+QGPSEND", "OK\r\n");
        // Set form registered before query form so the longer prefix wins.
        mock.respond_to("AT+QGPSCFG=\"nmeasrc\",", "ERROR\r\n");
        mock.respond_to("AT+QGPSCFG=\"nmeasrc\"", "+QGPSCFG: \"nmeasrc\",0\r\nOK\r\n");
        mock.respond_to("AT+QGPS=1", "OK\r\n");
        let mut executor = connected_executor(&mock).await;

        let mut configurator = SmartConfigurator::new(desired_yaml(
            "gnss:\n  enabled: true\n  nmea_source: 1\n",
        ));
        let ok = configurator.apply(&mut executor).await;

        assert!(!ok);
        assert_eq!(configurator.stats().failed, 1);
        // Power-off first, power-on unconditionally last.
        let writes = mock.writes();
        assert_eq!(writes.first().map(String::as_str), Some("AT+QGPSEND"));
        assert_eq!(writes.last().map(String::as_str), Some("AT+QGPS=1"));
    }

    #[tokio::test]
    async fn test_gnss_text_setting_quoted_response() {
        let mock = MockTransport::new();
        mock.respond_to("AT+QGPSEND", "OK\r\n");
        mock.respond_to(
            "AT+QGPSCFG=\"outport\"",
            "+QGPSCFG: \"outport\",\"usbnmea\"\r\nOK\r\n",
        );
        mock.respond_to("AT+QGPS=1", "OK\r\n");
        let mut executor = connected_executor(&mock).await;

        let mut configurator = SmartConfigurator::new(desired_yaml(
            "gnss:\n  enabled: true\n  output_port: usbnmea\n",
        ));
        assert!(configurator.apply(&mut executor).await);
        assert_eq!(configurator.stats().skipped, 1);
        assert_eq!(mock.write_count("AT+QGPSCFG=\"outport\",\""), 0);
    }

    #[tokio::test]
    async fn test_raw_data_config_verbatim_compare() {
        let mock = MockTransport::new();
        mock.respond_to("AT+QGPSEND", "OK\r\n");
        mock.respond_to(
            "AT+QGPSCFG=\"gnssrawdata\"",
            "+QGPSCFG: \"gnssrawdata\",31,0\r\nOK\r\n",
        );
        mock.respond_to("AT+QGPS=1", "OK\r\n");
        let mut executor = connected_executor(&mock).await;

        let mut configurator = SmartConfigurator::new(desired_yaml(
            "gnss:\n  enabled: true\n  raw_data_config: \"31,0\"\n",
        ));
        assert!(configurator.apply(&mut executor).await);
        assert_eq!(configurator.stats().skipped, 1);
    }

    #[test]
    fn test_load_missing_document_is_typed_error() {
        let err = DesiredConfig::load("/nonexistent/modem_config.yaml").unwrap_err();
        assert!(matches!(err, ScoutError::DesiredConfig(_)));
    }

    #[test]
    fn test_load_invalid_yaml_is_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        std::fs::write(&path, "basic: [unclosed").unwrap();
        let err = DesiredConfig::load(&path).unwrap_err();
        assert!(matches!(err, ScoutError::DesiredConfig(_)));
    }

    #[test]
    fn test_efficiency_ratio() {
        let stats = ConfigStats {
            checked: 10,
            skipped: 7,
            changed: 2,
            failed: 1,
        };
        assert!((stats.efficiency_percent() - 70.0).abs() < f64::EPSILON);
        assert!(!stats.all_applied());
    }
}

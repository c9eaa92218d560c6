//! Polling scheduler: session lifecycle and cadenced command dispatch.
//!
//! The poller owns the executor, the accumulator records, and the sinks,
//! and drives everything from a single task: the transport is
//! half-duplex, so commands are strictly sequential and parsing happens
//! inline after each response. Cancellation is cooperative — a shutdown
//! flag checked between ticks and between individual commands — and
//! shutdown always closes the transport and the sinks.

use crate::config::{IdentityPolicy, IdentitySettings, Settings};
use crate::error::{AppResult, ScoutError};
use crate::executor::CommandExecutor;
use crate::location::GpsdSource;
use crate::parser::{self, FieldMap, FieldValue};
use crate::records::{ModemInfoRecord, SampleRecord};
use crate::sink::{ModemInfoSink, SampleSink};
use anyhow::Result;
use log::{info, warn};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

/// Session lifecycle of the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    /// No transport session.
    Disconnected,
    /// Transport open, bootstrap not yet complete.
    Connected,
    /// Bootstrap and identity check done; trusted to poll.
    Verified,
    /// Cadenced polling in progress.
    SteadyPolling,
    /// Cleanup in progress or complete.
    ShuttingDown,
}

/// Run the one-time identity check against the configured allow-lists.
///
/// Returns the decoded identity fields for the modem-info record. Under
/// the `warn` policy a mismatch only logs; under `enforce` it is an
/// error the caller treats as fatal for the session.
pub async fn verify_identity(
    executor: &mut CommandExecutor,
    identity: &IdentitySettings,
) -> AppResult<FieldMap> {
    let mut map = FieldMap::new();
    for cmd in ["AT+CGMI", "AT+CGMM"] {
        let result = executor.execute(cmd).await;
        if result.success {
            map.append(&mut parser::decode(cmd, &result.raw));
        }
    }

    let manufacturer = map
        .get("manufacturer")
        .and_then(FieldValue::as_text)
        .unwrap_or("");
    let model = map.get("model").and_then(FieldValue::as_text).unwrap_or("");

    let listed = |value: &str, list: &[String]| {
        let value = value.to_lowercase();
        list.iter().any(|item| value.contains(&item.to_lowercase()))
    };

    if listed(manufacturer, &identity.manufacturers) && listed(model, &identity.models) {
        info!("Verified modem: {manufacturer} {model}");
        return Ok(map);
    }

    let description = format!("manufacturer '{manufacturer}', model '{model}'");
    match identity.policy {
        IdentityPolicy::Warn => {
            warn!("Device identity not on the allow-list ({description}); continuing with degraded confidence");
            Ok(map)
        }
        IdentityPolicy::Enforce => Err(ScoutError::IdentityMismatch(description)),
    }
}

fn due(last: Option<Instant>, now: Instant, interval: Duration) -> bool {
    last.map_or(true, |t| now.duration_since(t) >= interval)
}

/// The polling scheduler.
pub struct Poller {
    settings: Settings,
    executor: CommandExecutor,
    sample_sink: SampleSink,
    info_sink: ModemInfoSink,
    gpsd: Option<GpsdSource>,
    shutdown: watch::Receiver<bool>,
    state: PollerState,
    modem_info: ModemInfoRecord,
    sample: SampleRecord,
    sample_dirty: bool,
}

impl Poller {
    /// Assemble a poller over an executor, the telemetry sinks, and an
    /// optional position source.
    pub fn new(
        settings: Settings,
        executor: CommandExecutor,
        sample_sink: SampleSink,
        info_sink: ModemInfoSink,
        gpsd: Option<GpsdSource>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            settings,
            executor,
            sample_sink,
            info_sink,
            gpsd,
            shutdown,
            state: PollerState::Disconnected,
            modem_info: ModemInfoRecord::new(),
            sample: SampleRecord::new(),
            sample_dirty: false,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> PollerState {
        self.state
    }

    /// The sample CSV sink.
    pub fn sample_sink(&self) -> &SampleSink {
        &self.sample_sink
    }

    /// The modem-info document sink.
    pub fn info_sink(&self) -> &ModemInfoSink {
        &self.info_sink
    }

    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Continuous operation: establish the session, poll on cadence until
    /// the shutdown flag is raised, then tear everything down.
    pub async fn run(&mut self) -> Result<()> {
        if let Err(e) = self.start_session().await {
            self.shutdown_session().await;
            return Err(e);
        }
        let result = self.steady_loop().await;
        self.shutdown_session().await;
        result
    }

    /// One-shot operation: establish the session, run every cadence group
    /// exactly once, persist, and tear down. Used for scripted sampling.
    pub async fn run_once(&mut self) -> Result<()> {
        if let Err(e) = self.start_session().await {
            self.shutdown_session().await;
            return Err(e);
        }
        self.state = PollerState::SteadyPolling;

        let groups = self.settings.commands.clone();
        for (name, commands) in [
            ("fast_loop", &groups.fast_loop),
            ("medium_loop", &groups.medium_loop),
            ("slow_loop", &groups.slow_loop),
        ] {
            if self.shutdown_requested() {
                break;
            }
            self.run_sample_group(name, commands).await;
        }
        self.merge_location();
        let result = self.persist_sample();
        self.shutdown_session().await;
        result
    }

    /// Connect, bootstrap, verify identity, and run the one-time groups.
    async fn start_session(&mut self) -> Result<()> {
        self.executor.connect().await?;
        self.state = PollerState::Connected;
        self.executor.initialize().await?;

        let identity = verify_identity(&mut self.executor, &self.settings.identity).await?;
        if self.modem_info.merge(identity) {
            self.flush_modem_info();
        }
        self.state = PollerState::Verified;

        let groups = self.settings.commands.clone();
        self.run_setup_group(&groups.setup).await;
        self.collect_info_group("modem_info", &groups.modem_info).await;
        self.collect_info_group("gnss_info", &groups.gnss_info).await;
        self.collect_info_group("network_info", &groups.network_info)
            .await;
        Ok(())
    }

    /// The cadenced loop. Each tick runs every group whose interval has
    /// elapsed, in fast → medium → slow order, merges a position fix,
    /// persists when warranted, and sleeps the tick quantum.
    async fn steady_loop(&mut self) -> Result<()> {
        self.state = PollerState::SteadyPolling;
        info!(
            "Steady polling: fast {:?} / medium {:?} / slow {:?}",
            self.settings.intervals.fast,
            self.settings.intervals.medium,
            self.settings.intervals.slow
        );

        let intervals = self.settings.intervals.clone();
        let groups = self.settings.commands.clone();
        let mut fast_last: Option<Instant> = None;
        let mut medium_last: Option<Instant> = None;
        let mut slow_last: Option<Instant> = None;

        while !self.shutdown_requested() {
            let now = Instant::now();

            if due(fast_last, now, intervals.fast) {
                self.run_sample_group("fast_loop", &groups.fast_loop).await;
                fast_last = Some(now);
            }
            if !self.shutdown_requested() && due(medium_last, now, intervals.medium) {
                self.run_sample_group("medium_loop", &groups.medium_loop)
                    .await;
                medium_last = Some(now);
            }
            if !self.shutdown_requested() && due(slow_last, now, intervals.slow) {
                self.run_sample_group("slow_loop", &groups.slow_loop).await;
                slow_last = Some(now);
            }

            self.merge_location();
            self.persist_sample()?;
            sleep(intervals.tick).await;
        }
        Ok(())
    }

    /// One-time configuration writes. Individual failures are logged and
    /// the rest of the group still runs.
    async fn run_setup_group(&mut self, commands: &[String]) -> (usize, usize) {
        let mut success = 0;
        for cmd in commands {
            if self.shutdown_requested() {
                break;
            }
            if self.executor.execute(cmd).await.success {
                success += 1;
            } else {
                warn!("Setup command failed: {cmd}");
            }
        }
        if !commands.is_empty() {
            info!("Modem setup completed: {success}/{}", commands.len());
        }
        (success, commands.len())
    }

    /// Run a one-time query group into the modem-info record, flushing
    /// the document if anything changed.
    async fn collect_info_group(&mut self, name: &str, commands: &[String]) -> (usize, usize) {
        let mut success = 0;
        let mut changed = false;
        for cmd in commands {
            if self.shutdown_requested() {
                break;
            }
            let result = self.executor.execute(cmd).await;
            if result.success {
                success += 1;
                changed |= self.modem_info.merge(parser::decode(cmd, &result.raw));
            } else {
                warn!("Info command failed: {cmd}");
            }
        }
        if changed {
            self.flush_modem_info();
        }
        if !commands.is_empty() {
            info!("{name} collection completed: {success}/{}", commands.len());
        }
        (success, commands.len())
    }

    /// Run one cadence group into the sample record.
    async fn run_sample_group(&mut self, name: &str, commands: &[String]) -> (usize, usize) {
        let mut success = 0;
        for cmd in commands {
            if self.shutdown_requested() {
                break;
            }
            let result = self.executor.execute(cmd).await;
            if result.success {
                success += 1;
                if self.sample.merge(parser::decode(cmd, &result.raw)) {
                    self.sample_dirty = true;
                }
            } else {
                warn!(
                    "Command '{cmd}' failed after {} attempts",
                    result.attempts
                );
            }
        }
        if !commands.is_empty() {
            info!("{name} completed: {success}/{}", commands.len());
        }
        (success, commands.len())
    }

    /// Merge the latest external position fix, when one is available.
    /// Absence of the source or of a fix is not an error.
    fn merge_location(&mut self) {
        if let Some(fix) = self.gpsd.as_ref().and_then(GpsdSource::latest_fix) {
            if self.sample.merge(fix.to_fields()) {
                self.sample_dirty = true;
            }
        }
    }

    /// Append a row when the sample changed this round and holds enough
    /// to be worth keeping. The accumulator itself is never cleared.
    fn persist_sample(&mut self) -> Result<()> {
        if self.sample_dirty && self.sample.is_complete() {
            self.sample_sink.append(&self.sample)?;
            self.sample_dirty = false;
        }
        Ok(())
    }

    fn flush_modem_info(&mut self) {
        if let Err(e) = self.info_sink.write(&self.modem_info) {
            warn!("Failed to write modem-info document: {e:#}");
        }
    }

    /// Guaranteed teardown: position source stopped, sample sink flushed
    /// and closed, transport disconnected, transcript closed.
    async fn shutdown_session(&mut self) {
        self.state = PollerState::ShuttingDown;
        if let Some(gpsd) = &self.gpsd {
            gpsd.stop();
        }
        if let Err(e) = self.sample_sink.close() {
            warn!("Failed to close sample sink: {e:#}");
        }
        if let Err(e) = self.executor.disconnect().await {
            warn!("Failed to disconnect cleanly: {e:#}");
        }
        info!("Session closed");
    }
}

//! Core library for the cellscout survey logger.
//!
//! cellscout talks to a cellular modem over a serial AT-command link to
//! gather network, SIM, and GNSS telemetry while mobile, and to
//! idempotently apply a desired modem configuration with minimal
//! non-volatile writes. The library is organized around three engines —
//! the command executor, the response parser, and the smart
//! configuration engine — driven by a cadenced polling scheduler.

pub mod commands;
pub mod config;
pub mod error;
pub mod executor;
pub mod location;
pub mod parser;
pub mod records;
pub mod scheduler;
pub mod sink;
pub mod smart_config;
pub mod transcript;
pub mod transport;

pub use config::Settings;
pub use error::{AppResult, ScoutError};
pub use executor::{CommandExecutor, CommandResult};
pub use records::{ModemInfoRecord, SampleRecord};
pub use scheduler::{Poller, PollerState};

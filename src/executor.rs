//! Command executor: the request/response protocol engine.
//!
//! Sends one AT command line at a time over the transport, waits out a
//! settle delay, then drains the response with an idle-detection read loop:
//! bytes are collected until no new bytes arrive within the idle gap. The
//! transport is half-duplex and responses carry no correlation tags, so
//! strict ordering here is what ties a response to its request.
//!
//! A response containing the device error token (`ERROR`) is classified as
//! a failure; transport-level errors are treated identically for retry
//! purposes. Retries are ordinary iteration returning an explicit
//! [`CommandResult`], never exception-driven control flow.

use crate::config::ExecutorSettings;
use crate::error::ScoutError;
use crate::transcript::Transcript;
use crate::transport::Transport;
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::time::Duration;
use tokio::time::sleep;

/// Device-reported error token, independent of which command was sent.
const ERROR_TOKEN: &str = "ERROR";

/// Bootstrap sequence: liveness probe, echo off, verbose error mode.
/// All three must succeed before any other command is trusted.
const BOOTSTRAP_COMMANDS: [&str; 3] = ["AT", "ATE0", "AT+CMEE=2"];

/// Outcome of executing one command, retries included.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// False when retries were exhausted or every attempt carried the
    /// device error token.
    pub success: bool,
    /// Raw response text from the last attempt (or the transport error
    /// message when no response was received).
    pub raw: String,
    /// Number of transmission attempts made (at most `retries + 1`).
    pub attempts: u32,
}

/// Serial AT command executor with bounded retry.
///
/// Owns the transport exclusively; no command is sent before the previous
/// command's response window completes.
pub struct CommandExecutor {
    transport: Box<dyn Transport>,
    transcript: Box<dyn Transcript>,
    command_delay: Duration,
    idle_gap: Duration,
    retry_count: u32,
}

impl CommandExecutor {
    /// Build an executor over a transport and transcript sink.
    pub fn new(
        transport: Box<dyn Transport>,
        transcript: Box<dyn Transcript>,
        settings: &ExecutorSettings,
    ) -> Self {
        Self {
            transport,
            transcript,
            command_delay: settings.command_delay,
            idle_gap: settings.idle_gap,
            retry_count: settings.retry_count,
        }
    }

    /// Open the transport.
    pub async fn connect(&mut self) -> Result<()> {
        self.transport.connect().await?;
        info!("Connected to modem on {}", self.transport.describe());
        Ok(())
    }

    /// Close the transport and the transcript sink.
    pub async fn disconnect(&mut self) -> Result<()> {
        if self.transport.is_connected() {
            self.transport.disconnect().await?;
            info!("Disconnected from modem");
        }
        self.transcript.close()
    }

    /// Whether the transport is currently open.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Send one command and collect its response window.
    ///
    /// The command is `\r`-terminated if not already. After the settle
    /// delay, available bytes are drained repeatedly with a short pause
    /// between passes; the response is complete once a pass finds nothing.
    async fn send_command(&mut self, command: &str) -> Result<String> {
        if !self.transport.is_connected() {
            return Err(ScoutError::NotConnected.into());
        }

        let line = if command.ends_with('\r') {
            command.to_string()
        } else {
            format!("{command}\r")
        };

        self.transcript.record_sent(command.trim())?;
        self.transport
            .write(line.as_bytes())
            .await
            .with_context(|| format!("Failed to send command '{}'", command.trim()))?;
        debug!("Sent command: {}", command.trim());

        sleep(self.command_delay).await;

        let mut response: Vec<u8> = Vec::new();
        loop {
            let chunk = self
                .transport
                .read_available()
                .await
                .with_context(|| format!("Failed to read response to '{}'", command.trim()))?;
            if chunk.is_empty() {
                break;
            }
            response.extend_from_slice(&chunk);
            // More bytes may still be in flight.
            sleep(self.idle_gap).await;
        }

        let text = String::from_utf8_lossy(&response).to_string();
        self.transcript.record_received(text.trim())?;
        debug!("Received response: {}", text.trim());
        Ok(text)
    }

    /// Execute a command with the configured retry bound.
    pub async fn execute(&mut self, command: &str) -> CommandResult {
        self.execute_with_retries(command, self.retry_count).await
    }

    /// Execute a command, retrying up to `retries` times after a failed
    /// attempt. Makes at most `retries + 1` transmission attempts.
    pub async fn execute_with_retries(&mut self, command: &str, retries: u32) -> CommandResult {
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.send_command(command).await {
                Ok(response) => {
                    if response.contains(ERROR_TOKEN) {
                        warn!(
                            "Command '{}' returned error (attempt {attempt}): {}",
                            command.trim(),
                            response.trim()
                        );
                        if attempt <= retries {
                            sleep(self.command_delay).await;
                            continue;
                        }
                        return CommandResult {
                            success: false,
                            raw: response,
                            attempts: attempt,
                        };
                    }
                    return CommandResult {
                        success: true,
                        raw: response,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    warn!(
                        "Error executing command '{}' (attempt {attempt}): {e:#}",
                        command.trim()
                    );
                    if attempt <= retries {
                        sleep(self.command_delay).await;
                        continue;
                    }
                    return CommandResult {
                        success: false,
                        raw: format!("{e:#}"),
                        attempts: attempt,
                    };
                }
            }
        }
    }

    /// Run the fixed bootstrap sequence. Failure here means the session
    /// cannot be trusted and is terminal for the caller.
    pub async fn initialize(&mut self) -> Result<()> {
        for cmd in BOOTSTRAP_COMMANDS {
            let result = self.execute(cmd).await;
            if !result.success {
                return Err(ScoutError::InitFailed {
                    command: cmd.to_string(),
                    response: result.raw.trim().to_string(),
                }
                .into());
            }
        }
        info!("Modem initialized");
        Ok(())
    }
}

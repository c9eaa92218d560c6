//! Serial transport for the modem's AT interface.
//!
//! Wraps the `serialport` crate and provides async I/O by running the
//! blocking serial operations on Tokio's blocking task executor. The port
//! lives behind `Arc<Mutex<…>>` so each blocking closure can take it for
//! the duration of one operation.

use crate::config::SerialSettings;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::debug;
use serialport::SerialPort;
use std::io::Read;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::Transport;

/// RS-232/USB-serial transport to the modem.
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    read_timeout: Duration,
    port: Option<Arc<Mutex<Box<dyn SerialPort>>>>,
}

impl SerialTransport {
    /// Create an unconnected transport from settings.
    pub fn new(settings: &SerialSettings) -> Self {
        Self {
            port_name: settings.port.clone(),
            baud_rate: settings.baud_rate,
            read_timeout: settings.read_timeout,
            port: None,
        }
    }

    fn port_handle(&self) -> Result<Arc<Mutex<Box<dyn SerialPort>>>> {
        self.port
            .as_ref()
            .cloned()
            .ok_or_else(|| anyhow!("Serial port '{}' not open", self.port_name))
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn connect(&mut self) -> Result<()> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .timeout(self.read_timeout)
            .open()
            .with_context(|| {
                format!(
                    "Failed to open serial port '{}' at {} baud",
                    self.port_name, self.baud_rate
                )
            })?;

        self.port = Some(Arc::new(Mutex::new(port)));
        debug!(
            "Serial port '{}' opened at {} baud",
            self.port_name, self.baud_rate
        );

        // Stale bytes from before the session would otherwise be attributed
        // to the first command's response.
        self.clear_input().await
    }

    async fn disconnect(&mut self) -> Result<()> {
        if self.port.take().is_some() {
            debug!("Serial port '{}' closed", self.port_name);
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let port = self.port_handle()?;
        let buf = bytes.to_vec();

        tokio::task::spawn_blocking(move || {
            use std::io::Write;
            let mut guard = port.blocking_lock();
            guard
                .write_all(&buf)
                .context("Failed to write to serial port")?;
            guard.flush().context("Failed to flush serial port")
        })
        .await
        .context("Serial I/O task panicked")?
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        let port = self.port_handle()?;

        tokio::task::spawn_blocking(move || -> Result<Vec<u8>> {
            let mut guard = port.blocking_lock();
            let available = guard
                .bytes_to_read()
                .context("Failed to query serial input buffer")? as usize;
            if available == 0 {
                return Ok(Vec::new());
            }

            let mut buf = vec![0u8; available];
            let mut read = 0;
            while read < available {
                match guard.read(&mut buf[read..]) {
                    Ok(0) => break,
                    Ok(n) => read += n,
                    Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
                    Err(e) => return Err(anyhow!("Serial read error: {}", e)),
                }
            }
            buf.truncate(read);
            Ok(buf)
        })
        .await
        .context("Serial I/O task panicked")?
    }

    async fn clear_input(&mut self) -> Result<()> {
        let port = self.port_handle()?;

        tokio::task::spawn_blocking(move || {
            let guard = port.blocking_lock();
            guard
                .clear(serialport::ClearBuffer::Input)
                .context("Failed to clear serial input buffer")
        })
        .await
        .context("Serial I/O task panicked")?
    }

    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port_name, self.baud_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_unconnected() {
        let settings = SerialSettings {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            read_timeout: Duration::from_millis(100),
        };
        let transport = SerialTransport::new(&settings);
        assert!(!transport.is_connected());
        assert_eq!(transport.describe(), "/dev/ttyUSB0 @ 115200 baud");
    }

    #[tokio::test]
    async fn test_operations_require_open_port() {
        let mut transport = SerialTransport::new(&SerialSettings::default());
        assert!(transport.write(b"AT\r").await.is_err());
        assert!(transport.read_available().await.is_err());
        // Disconnecting an unopened transport is a no-op.
        assert!(transport.disconnect().await.is_ok());
    }
}

//! Byte-oriented transport to the modem.
//!
//! The executor treats the transport as an opaque byte stream with write
//! and "bytes available" semantics; framing (line termination, response
//! quiescence) is the executor's concern. The trait seam exists so tests
//! can substitute a scripted mock for the real serial port.

use anyhow::Result;
use async_trait::async_trait;

pub mod mock;
pub mod serial;

pub use mock::MockTransport;
pub use serial::SerialTransport;

/// A half-duplex byte channel to the device.
#[async_trait]
pub trait Transport: Send {
    /// Open the channel. Pending input from before the session is discarded.
    async fn connect(&mut self) -> Result<()>;

    /// Close the channel. Idempotent.
    async fn disconnect(&mut self) -> Result<()>;

    /// Whether the channel is currently open.
    fn is_connected(&self) -> bool;

    /// Write raw bytes.
    async fn write(&mut self, bytes: &[u8]) -> Result<()>;

    /// Read and return every byte currently available, without waiting for
    /// more. Returns an empty buffer when nothing is pending.
    async fn read_available(&mut self) -> Result<Vec<u8>>;

    /// Discard any pending input.
    async fn clear_input(&mut self) -> Result<()>;

    /// Human-readable endpoint description for logs.
    fn describe(&self) -> String;
}

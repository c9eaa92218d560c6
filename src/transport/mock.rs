//! A mock transport with scripted responses, for tests.
//!
//! Responses can be enqueued in write order or registered against a command
//! prefix. Every write is recorded so tests can assert on transmission
//! counts (e.g. that the smart configurator issued no write-form command).

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::Transport;

#[derive(Default)]
struct Inner {
    connected: bool,
    /// Everything written, one entry per `write` call, trailing CR stripped.
    writes: Vec<String>,
    /// Responses consumed in write order, ahead of prefix responders.
    queue: VecDeque<String>,
    /// `(command prefix, response)` pairs consulted when the queue is empty.
    responders: Vec<(String, String)>,
    /// Bytes waiting to be drained by `read_available`.
    pending: Vec<u8>,
    /// When set, the next `write` fails with this message.
    fail_next_write: Option<String>,
}

/// Scripted in-memory transport. Clones share state, so tests keep a clone
/// for inspection after handing the transport to the executor.
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
    /// A new, disconnected mock with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        #[allow(clippy::unwrap_used)]
        self.inner.lock().unwrap()
    }

    /// Queue a response for the next unmatched write.
    pub fn enqueue_response(&self, response: &str) {
        self.lock().queue.push_back(response.to_string());
    }

    /// Respond with `response` whenever a written command starts with
    /// `prefix` (first match wins, after the queue is exhausted).
    pub fn respond_to(&self, prefix: &str, response: &str) {
        self.lock()
            .responders
            .push((prefix.to_string(), response.to_string()));
    }

    /// Make the next write fail with a transport error.
    pub fn fail_next_write(&self, message: &str) {
        self.lock().fail_next_write = Some(message.to_string());
    }

    /// Every command written so far, in order.
    pub fn writes(&self) -> Vec<String> {
        self.lock().writes.clone()
    }

    /// Number of writes whose command starts with `prefix`.
    pub fn write_count(&self, prefix: &str) -> usize {
        self.lock()
            .writes
            .iter()
            .filter(|w| w.starts_with(prefix))
            .count()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn connect(&mut self) -> Result<()> {
        let mut inner = self.lock();
        inner.connected = true;
        inner.pending.clear();
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.lock().connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(anyhow!("mock transport not connected"));
        }
        if let Some(msg) = inner.fail_next_write.take() {
            return Err(anyhow!(msg));
        }

        let command = String::from_utf8_lossy(bytes)
            .trim_end_matches(['\r', '\n'])
            .to_string();

        let response = inner.queue.pop_front().or_else(|| {
            inner
                .responders
                .iter()
                .find(|(prefix, _)| command.starts_with(prefix.as_str()))
                .map(|(_, resp)| resp.clone())
        });

        inner.writes.push(command);
        if let Some(resp) = response {
            inner.pending.extend_from_slice(resp.as_bytes());
        }
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        let mut inner = self.lock();
        if !inner.connected {
            return Err(anyhow!("mock transport not connected"));
        }
        Ok(std::mem::take(&mut inner.pending))
    }

    async fn clear_input(&mut self) -> Result<()> {
        self.lock().pending.clear();
        Ok(())
    }

    fn describe(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_responses_in_order() {
        let mock = MockTransport::new();
        mock.enqueue_response("OK\r\n");
        mock.enqueue_response("ERROR\r\n");

        let mut transport = mock.clone();
        transport.connect().await.unwrap();
        transport.write(b"AT\r").await.unwrap();
        assert_eq!(transport.read_available().await.unwrap(), b"OK\r\n");
        transport.write(b"AT+BAD\r").await.unwrap();
        assert_eq!(transport.read_available().await.unwrap(), b"ERROR\r\n");
        // Drained: nothing further pending.
        assert!(transport.read_available().await.unwrap().is_empty());

        assert_eq!(mock.writes(), vec!["AT", "AT+BAD"]);
    }

    #[tokio::test]
    async fn test_prefix_responder() {
        let mock = MockTransport::new();
        mock.respond_to("AT+CSQ", "+CSQ: 20,3\r\nOK\r\n");

        let mut transport = mock.clone();
        transport.connect().await.unwrap();
        transport.write(b"AT+CSQ\r").await.unwrap();
        let bytes = transport.read_available().await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("+CSQ: 20,3"));
        assert_eq!(mock.write_count("AT+CSQ"), 1);
    }
}

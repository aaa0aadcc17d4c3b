//! Scripted in-memory transport.
//!
//! A [`MockTransport`] plays back device replies for an ordered script of
//! expected inputs. Each scripted reply may be split into several chunks;
//! one chunk is returned per read, which exercises partial-read handling.
//! Clones share state, so a test can keep a handle after moving the
//! transport into a session and inspect what was sent.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};

use super::{Transport, trailing_line};
use crate::error::{Result, TransportError};

const WINDOW: usize = 1000;

#[derive(Debug)]
struct Exchange {
    input: String,
    reply: Vec<Bytes>,
}

#[derive(Debug, Default)]
struct MockState {
    script: VecDeque<Exchange>,
    pending: VecDeque<Bytes>,
    sent: Vec<String>,
    window: BytesMut,
    disconnected: bool,
}

/// A scripted transport for testing sessions without a device.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    /// Create a transport with no prompt seen yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that has already read `prompt` (the login banner).
    pub fn with_prompt(prompt: &str) -> Self {
        let transport = Self::new();
        transport
            .lock()
            .window
            .extend_from_slice(format!("\r\n{prompt}").as_bytes());
        transport
    }

    /// Expect `input` next and reply with `chunks`, one chunk per read.
    pub fn expect(self, input: &str, chunks: &[&str]) -> Self {
        self.lock().script.push_back(Exchange {
            input: input.to_string(),
            reply: chunks
                .iter()
                .map(|c| Bytes::copy_from_slice(c.as_bytes()))
                .collect(),
        });
        self
    }

    /// Expect `command`, echo it, print `body` and finish with `prompt`.
    pub fn respond(self, command: &str, body: &str, prompt: &str) -> Self {
        let reply = format!("{command}\r\n{body}{prompt}");
        self.expect(command, &[reply.as_str()])
    }

    /// Expect `input` and send nothing back.
    pub fn expect_silent(self, input: &str) -> Self {
        self.expect(input, &[])
    }

    /// Everything written so far, one entry per send, line ending removed.
    pub fn sent(&self) -> Vec<String> {
        self.lock().sent.clone()
    }

    /// Number of scripted exchanges not yet consumed.
    pub fn remaining(&self) -> usize {
        self.lock().script.len()
    }

    /// Simulate the peer going away.
    pub fn disconnect(&self) {
        self.lock().disconnected = true;
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let mut state = self.lock();
        if state.disconnected {
            return Err(TransportError::Disconnected.into());
        }

        let input = String::from_utf8_lossy(data)
            .trim_end_matches(['\r', '\n'])
            .to_string();
        state.sent.push(input.clone());

        match state.script.pop_front() {
            Some(exchange) if exchange.input == input => {
                state.pending.extend(exchange.reply);
            }
            Some(exchange) => panic!(
                "mock transport expected {:?}, got {:?}",
                exchange.input, input
            ),
            None => panic!("mock transport got unscripted input {:?}", input),
        }
        Ok(())
    }

    async fn read_until_quiet(&mut self, timeout: Duration) -> Result<Bytes> {
        let mut state = self.lock();
        if state.disconnected {
            return Err(TransportError::Disconnected.into());
        }

        let chunk = state
            .pending
            .pop_front()
            .ok_or(TransportError::Timeout(timeout))?;

        state.window.extend_from_slice(&chunk);
        if state.window.len() > WINDOW {
            let excess = state.window.len() - WINDOW;
            state.window.advance(excess);
        }
        Ok(chunk)
    }

    fn is_connected(&self) -> bool {
        !self.lock().disconnected
    }

    fn current_prompt(&self) -> Option<Bytes> {
        trailing_line(&self.lock().window).map(Bytes::copy_from_slice)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_err;

    use super::*;
    use crate::error::Error;

    #[tokio::test]
    async fn test_scripted_exchange() {
        let mut transport = MockTransport::with_prompt("router>")
            .expect("show clock", &["show clock\r\n", "10:01\r\nrouter>"]);
        let handle = transport.clone();

        assert_eq!(handle.current_prompt().as_deref(), Some(&b"router>"[..]));

        transport.send(b"show clock\n").await.unwrap();
        let first = transport.read_until_quiet(Duration::from_secs(1)).await.unwrap();
        assert_eq!(&first[..], b"show clock\r\n");
        assert!(handle.current_prompt().is_none());

        transport.read_until_quiet(Duration::from_secs(1)).await.unwrap();
        assert_eq!(handle.current_prompt().as_deref(), Some(&b"router>"[..]));
        assert_eq!(handle.sent(), vec!["show clock"]);
        assert_eq!(handle.remaining(), 0);
    }

    #[tokio::test]
    async fn test_read_without_output_times_out() {
        let mut transport = MockTransport::new();
        let err = assert_err!(transport.read_until_quiet(Duration::from_millis(5)).await);
        assert!(matches!(err, Error::Transport(TransportError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_disconnect() {
        let mut transport = MockTransport::with_prompt("router>");
        transport.disconnect();
        assert!(!transport.is_connected());
        assert!(transport.send(b"show clock\n").await.is_err());
    }
}

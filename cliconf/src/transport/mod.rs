//! Transport collaborator: raw byte I/O with a device shell.
//!
//! The session core never speaks SSH itself. It drives anything that
//! implements [`Transport`]; [`SshTransport`] is the russh-backed
//! implementation and [`mock::MockTransport`] a scripted one for tests.

pub mod config;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
mod ssh;

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;

pub use config::{AuthMethod, HostKeyVerification, SshConfig};
pub use ssh::SshTransport;

use crate::error::Result;

/// Byte-stream access to one interactive device shell.
///
/// Exactly one request/response exchange is in flight at a time; the session
/// owns its transport exclusively.
pub trait Transport: Send {
    /// Write bytes to the shell.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Block until at least one byte arrives and then no more arrive for the
    /// transport's quiescence interval.
    ///
    /// Fails with `TransportError::Timeout` if nothing arrives within
    /// `timeout`, and `TransportError::Disconnected` if the peer went away.
    fn read_until_quiet(&mut self, timeout: Duration)
    -> impl Future<Output = Result<Bytes>> + Send;

    /// Whether the transport still considers the session connected.
    fn is_connected(&self) -> bool;

    /// Best-effort probe of the last known prompt: the trailing line of the
    /// most recent read, without sending anything.
    fn current_prompt(&self) -> Option<Bytes>;
}

/// The trailing line of `window`, or `None` if it is empty or ends in a
/// line break (output still streaming, no prompt visible).
pub(crate) fn trailing_line(window: &[u8]) -> Option<&[u8]> {
    let start = memchr::memrchr2(b'\n', b'\r', window).map_or(0, |p| p + 1);
    let line = &window[start..];
    if line.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        Some(line)
    }
}

//! Error types for cliconf.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::channel::ErrorKind;
use crate::driver::SessionState;

/// Main error type for cliconf operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session protocol errors (commands, prompts, privilege)
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Device profile errors
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
}

impl Error {
    /// True if the device rejected or flagged a command.
    pub fn is_command_error(&self) -> bool {
        matches!(self, Error::Session(SessionError::Command { .. }))
    }

    /// True if the session can no longer be trusted without re-establishing
    /// the prompt (timeout) or at all (connection lost).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Session(SessionError::PromptTimeout(_))
                | Error::Session(SessionError::ConnectionLost { .. })
                | Error::Transport(TransportError::Disconnected)
        )
    }
}

/// Transport layer errors (SSH connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Host not present in known_hosts under strict checking
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Reading or writing known_hosts failed
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// No bytes arrived before the deadline
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session protocol errors raised by the executor, state machine and
/// transaction runner.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The device rejected or flagged a command.
    #[error("Command '{command}' failed ({kind}): {message}")]
    Command {
        command: String,
        kind: ErrorKind,
        message: String,
    },

    /// No settled prompt within the deadline; session health is unknown.
    #[error("No prompt within {0:?}")]
    PromptTimeout(Duration),

    /// Transport disconnected or the prompt cannot be identified at all.
    #[error("Connection lost: {reason}")]
    ConnectionLost { reason: String },

    /// A transition did not reach the expected privilege level.
    #[error("Unable to reach {target} mode, at prompt [{prompt}]: {message}")]
    PrivilegeEscalation {
        target: SessionState,
        prompt: String,
        message: String,
    },

    /// Unsupported argument supplied by the caller.
    #[error("Invalid parameter: {message}")]
    InvalidParameter { message: String },

    /// Requested mode (e.g. check mode) is not supported.
    #[error("Unsupported mode: {message}")]
    UnsupportedMode { message: String },

    /// Shell-open setup could not be confirmed.
    #[error("Session setup failed: {message}")]
    SessionSetup { message: String },

    /// Capability document could not be encoded.
    #[error("Failed to encode capabilities: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Device profile (pattern table) errors.
#[derive(Error, Debug)]
pub enum ProfileError {
    /// A pattern in the profile failed to compile
    #[error("Invalid pattern in '{field}': {source}")]
    InvalidPattern {
        field: String,
        #[source]
        source: regex::Error,
    },

    /// No profile registered for the device family
    #[error("Unknown device family: {name}")]
    UnknownFamily { name: String },

    /// A profile for this family/version pair already exists
    #[error("Profile '{name}' (version '{version}') already registered")]
    AlreadyRegistered { name: String, version: String },

    /// Profile document could not be parsed
    #[error("Failed to parse profile document: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Result type alias using cliconf's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        let timeout: Error = SessionError::PromptTimeout(Duration::from_secs(1)).into();
        assert!(timeout.is_fatal());
        assert!(!timeout.is_command_error());

        let rejected: Error = SessionError::Command {
            command: "shw version".into(),
            kind: ErrorKind::CommandRejected,
            message: "% Unknown command".into(),
        }
        .into();
        assert!(rejected.is_command_error());
        assert!(!rejected.is_fatal());
    }

    #[test]
    fn test_error_display() {
        let err: Error = SessionError::InvalidParameter {
            message: "fetching configuration from archive is not supported".into(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "Session error: Invalid parameter: fetching configuration from archive is not supported"
        );
    }
}

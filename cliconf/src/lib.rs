//! # cliconf
//!
//! Async CLI-session automation core for network devices.
//!
//! cliconf drives an interactive device shell over a plain byte stream: it
//! finds prompt boundaries, tells error output from success, moves the
//! session between privilege levels, applies configuration change-sets and
//! parses device facts out of free-text output.
//!
//! ## Features
//!
//! - Async SSH transport via russh, or any type implementing [`Transport`]
//! - Tail-window prompt matching with ANSI stripping
//! - Case-insensitive, ordered error signatures
//! - Unprivileged / privileged / config / config-subsection state machine
//! - Transactions that enter configuration mode once and abort on first
//!   failure
//! - Device-family pattern tables as data, keyed by firmware version
//! - Structured session events through an injected [`EventSink`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use cliconf::{Cliconf, SessionBuilder, TerminalHooks};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), cliconf::Error> {
//!     let mut device = SessionBuilder::new("192.168.1.1")
//!         .username("admin")
//!         .password("secret")
//!         .connect()
//!         .await?;
//!
//!     let config = device.get_config("running").await?;
//!     println!("{}", config.result);
//!
//!     device.on_unbecome().await?;
//!     device.into_transport().close().await?;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod driver;
pub mod error;
pub mod events;
pub mod platform;
pub mod transport;

// Re-export main types for convenience
pub use channel::{ErrorClassifier, ErrorKind, Prompt, PromptMatcher};
pub use driver::{
    Cliconf, Command, CommandExecutor, CommandResult, DeviceInfo, EditResult, SessionBuilder,
    SessionConfig, SessionState, SessionStateMachine, TerminalHooks, Transaction,
};
pub use error::{Error, Result};
pub use events::{EventSink, LogSink, NullSink, SessionEvent};
pub use platform::vendors::mpos::Mpos;
pub use platform::{ProfileRegistry, ProfileSpec, TerminalProfile};
pub use transport::{AuthMethod, SshConfig, SshTransport, Transport};

//! Session driver: command execution, privilege transitions, transactions
//! and device facts.
//!
//! Device families expose two interfaces to the automation runner:
//! [`Cliconf`] for the operations it asks for, and [`TerminalHooks`] for the
//! session lifecycle around them.

mod builder;
mod command;
mod config;
mod executor;
mod facts;
mod privilege;
pub(crate) mod response;
mod transaction;

pub use builder::SessionBuilder;
pub use command::Command;
pub use config::SessionConfig;
pub use executor::CommandExecutor;
pub use facts::{DeviceInfo, FactExtractor, NOT_AVAILABLE};
pub use privilege::{SessionState, SessionStateMachine};
pub use response::CommandResult;
pub use transaction::{EditResult, Transaction, TransactionRunner};

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use secrecy::SecretString;
use serde::Serialize;

use crate::error::{Error, Result, SessionError};

/// Which stored configuration to print.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Running,
    Startup,
}

impl FromStr for ConfigSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "running" => Ok(ConfigSource::Running),
            "startup" => Ok(ConfigSource::Startup),
            other => Err(SessionError::InvalidParameter {
                message: format!("fetching configuration from {} is not supported", other),
            }
            .into()),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Running => f.write_str("running"),
            ConfigSource::Startup => f.write_str("startup"),
        }
    }
}

/// What a device family can and cannot do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceOperations {
    pub supports_commit: bool,
    pub supports_check_mode: bool,
    pub supports_rollback: bool,
    pub supports_replace: bool,
    pub supports_onbox_diff: bool,
    pub supports_sendonly: bool,
}

/// Capability document returned by [`Cliconf::get_capabilities`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capabilities {
    pub rpc: Vec<&'static str>,
    pub network_api: &'static str,
    pub device_info: DeviceInfo,
    pub device_operations: DeviceOperations,
}

impl Capabilities {
    /// Operations every cliconf family answers.
    pub const RPC: [&'static str; 5] = [
        "get_config",
        "edit_config",
        "get_capabilities",
        "get",
        "get_device_info",
    ];

    pub fn new(device_info: DeviceInfo, device_operations: DeviceOperations) -> Self {
        Self {
            rpc: Self::RPC.to_vec(),
            network_api: "cliconf",
            device_info,
            device_operations,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SessionError::Encode(e).into())
    }
}

/// Operations a device family offers to the automation runner.
pub trait Cliconf: Send {
    /// Query and parse device identity. Never cached.
    fn get_device_info(&mut self) -> impl Future<Output = Result<DeviceInfo>> + Send;

    /// Print the `running` or `startup` configuration.
    ///
    /// Any other source fails with `SessionError::InvalidParameter` before
    /// anything is sent.
    fn get_config(&mut self, source: &str) -> impl Future<Output = Result<CommandResult>> + Send;

    /// Apply a configuration change-set.
    ///
    /// `commit = false` fails with `SessionError::UnsupportedMode`.
    fn edit_config(
        &mut self,
        candidate: Vec<Command>,
        commit: bool,
    ) -> impl Future<Output = Result<EditResult>> + Send;

    /// Run a single informational command.
    fn get(&mut self, command: Command) -> impl Future<Output = Result<CommandResult>> + Send;

    /// JSON-encoded [`Capabilities`].
    fn get_capabilities(&mut self) -> impl Future<Output = Result<String>> + Send;
}

/// Session lifecycle hooks invoked by the runner.
pub trait TerminalHooks: Send {
    /// Prepare a freshly opened shell, e.g. disable paging.
    ///
    /// Fails with `SessionError::SessionSetup` if that cannot be confirmed.
    fn on_open_shell(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Escalate to privileged mode.
    fn on_become(
        &mut self,
        password: Option<&SecretString>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Drop privileges. A hung session with no prompt is left alone.
    fn on_unbecome(&mut self) -> impl Future<Output = Result<()>> + Send;
}

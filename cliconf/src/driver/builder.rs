//! Builder for opening device sessions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use secrecy::SecretString;

use super::config::SessionConfig;
use super::TerminalHooks;
use crate::error::Result;
use crate::events::{EventSink, LogSink};
use crate::platform::ProfileRegistry;
use crate::platform::vendors::mpos::{self, Mpos};
use crate::transport::{AuthMethod, HostKeyVerification, SshConfig, SshTransport, Transport};

/// Builder for MPOS device sessions.
///
/// # Example
///
/// ```rust,no_run
/// use cliconf::{Cliconf, SessionBuilder};
///
/// # async fn example() -> Result<(), cliconf::Error> {
/// let mut device = SessionBuilder::new("192.168.1.1")
///     .username("admin")
///     .password("secret")
///     .enable_secret("enable-secret")
///     .connect()
///     .await?;
///
/// let info = device.get_device_info().await?;
/// println!("{} {:?}", info.network_os, info.version);
/// # Ok(())
/// # }
/// ```
pub struct SessionBuilder {
    host: String,
    port: u16,
    username: String,
    auth: AuthMethod,
    enable_secret: Option<SecretString>,
    registry: Option<ProfileRegistry>,
    firmware_version: Option<String>,
    session: SessionConfig,
    connect_timeout: Duration,
    terminal_width: u32,
    terminal_height: u32,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    sink: Arc<dyn EventSink>,
}

impl SessionBuilder {
    /// Create a new builder for the specified host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: 22,
            username: String::new(),
            auth: AuthMethod::None,
            enable_secret: None,
            registry: None,
            firmware_version: None,
            session: SessionConfig::default(),
            connect_timeout: Duration::from_secs(30),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
            sink: Arc::new(LogSink),
        }
    }

    /// Set the SSH port (default: 22).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set password authentication.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.auth = AuthMethod::password(password);
        self
    }

    /// Set private key authentication.
    pub fn private_key(mut self, key_path: impl Into<PathBuf>) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: None,
        };
        self
    }

    /// Set private key authentication with passphrase.
    pub fn private_key_with_passphrase(
        mut self,
        key_path: impl Into<PathBuf>,
        passphrase: impl Into<String>,
    ) -> Self {
        self.auth = AuthMethod::PrivateKey {
            path: key_path.into(),
            passphrase: Some(SecretString::from(passphrase.into())),
        };
        self
    }

    /// Password for `enable` when an operation has to escalate.
    pub fn enable_secret(mut self, secret: impl Into<String>) -> Self {
        self.enable_secret = Some(SecretString::from(secret.into()));
        self
    }

    /// Look profiles up in `registry` instead of the built-in one.
    pub fn registry(mut self, registry: ProfileRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Firmware version used to pick a version-specific profile.
    pub fn firmware_version(mut self, version: impl Into<String>) -> Self {
        self.firmware_version = Some(version.into());
        self
    }

    /// Command timing and buffering.
    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session = config;
        self
    }

    /// Deadline for a settled prompt after each command.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.session.timeout = timeout;
        self
    }

    /// SSH connect and inactivity timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set terminal dimensions.
    pub fn terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    pub fn known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Where session events go (default: the `log` facade).
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Connect over SSH and prepare the shell.
    pub async fn connect(mut self) -> Result<Mpos<SshTransport>> {
        let ssh = SshConfig {
            port: self.port,
            timeout: self.connect_timeout,
            terminal_width: self.terminal_width,
            terminal_height: self.terminal_height,
            host_key_verification: std::mem::take(&mut self.host_key_verification),
            known_hosts_path: self.known_hosts_path.take(),
            ..SshConfig::new(
                self.host.as_str(),
                self.username.as_str(),
                std::mem::replace(&mut self.auth, AuthMethod::None),
            )
        };
        let transport = SshTransport::connect(ssh).await?;
        self.open(transport).await
    }

    /// Build a session on an already connected transport and prepare the
    /// shell.
    pub async fn open<T: Transport>(self, transport: T) -> Result<Mpos<T>> {
        let registry = self.registry.unwrap_or_else(ProfileRegistry::with_builtin);
        let profile = registry.lookup(mpos::FAMILY, self.firmware_version.as_deref())?;
        debug!(
            "opening {} session on {} with profile {:?}",
            profile.family(),
            self.host,
            profile.version()
        );

        let mut device = Mpos::new(transport, profile, self.session, self.sink)
            .with_enable_secret(self.enable_secret);
        device.on_open_shell().await?;
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;
    use crate::error::{Error, ProfileError};
    use crate::events::NullSink;
    use crate::transport::mock::MockTransport;

    #[tokio::test]
    async fn test_open_runs_shell_setup() {
        let transport = MockTransport::with_prompt("r1>").respond("more off", "", "r1>");
        let handle = transport.clone();

        let device = assert_ok!(
            SessionBuilder::new("r1")
                .event_sink(Arc::new(NullSink))
                .open(transport)
                .await
        );
        assert_eq!(device.profile().family(), "mpos");
        assert_eq!(handle.sent(), vec!["more off"]);
    }

    #[tokio::test]
    async fn test_open_with_versioned_profile() {
        let mut spec = mpos::spec();
        spec.version = "9.1".to_string();
        spec.paging_command = "terminal length 0".to_string();
        let mut registry = ProfileRegistry::with_builtin();
        assert_ok!(registry.register(spec));

        let transport = MockTransport::with_prompt("r1>").respond("terminal length 0", "", "r1>");
        let device = assert_ok!(
            SessionBuilder::new("r1")
                .registry(registry)
                .firmware_version("9.1.4")
                .event_sink(Arc::new(NullSink))
                .open(transport)
                .await
        );
        assert_eq!(device.profile().version(), "9.1");
    }

    #[tokio::test]
    async fn test_open_without_profile() {
        let Err(err) = SessionBuilder::new("r1")
            .registry(ProfileRegistry::new())
            .open(MockTransport::with_prompt("r1>"))
            .await
        else {
            panic!("expected an unknown family error");
        };
        assert!(matches!(
            err,
            Error::Profile(ProfileError::UnknownFamily { .. })
        ));
    }
}

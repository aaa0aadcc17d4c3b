//! MPOS device session: the [`Cliconf`] operations and [`TerminalHooks`].

use std::sync::Arc;

use log::{debug, info};
use secrecy::SecretString;

use crate::driver::{
    Capabilities, Cliconf, Command, CommandExecutor, CommandResult, ConfigSource, DeviceInfo,
    DeviceOperations, EditResult, FactExtractor, SessionConfig, SessionStateMachine,
    TerminalHooks, Transaction, TransactionRunner,
};
use crate::error::{Result, SessionError};
use crate::events::EventSink;
use crate::platform::TerminalProfile;
use crate::transport::Transport;

const OPERATIONS: DeviceOperations = DeviceOperations {
    supports_commit: false,
    supports_check_mode: false,
    supports_rollback: false,
    supports_replace: false,
    supports_onbox_diff: false,
    supports_sendonly: true,
};

/// One MPOS device session over an exclusively owned transport.
pub struct Mpos<T> {
    session: SessionStateMachine<T>,
    profile: Arc<TerminalProfile>,
    facts: FactExtractor,
}

impl<T: Transport> Mpos<T> {
    /// Wire up a session on an already open shell. Nothing is sent.
    pub fn new(
        transport: T,
        profile: Arc<TerminalProfile>,
        config: SessionConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        let executor = CommandExecutor::new(
            transport,
            profile.prompt_matcher(config.search_depth),
            profile.error_classifier(),
            config,
            sink.clone(),
        );
        let session = SessionStateMachine::new(
            executor,
            profile.commands().clone(),
            profile.password_prompt().clone(),
            sink,
        );
        let facts = profile.fact_extractor();
        Self {
            session,
            profile,
            facts,
        }
    }

    /// Password used when an operation has to escalate on its own.
    pub fn with_enable_secret(mut self, secret: Option<SecretString>) -> Self {
        self.session.set_enable_secret(secret);
        self
    }

    pub fn profile(&self) -> &TerminalProfile {
        &self.profile
    }

    pub fn session(&self) -> &SessionStateMachine<T> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionStateMachine<T> {
        &mut self.session
    }

    /// Give the transport back, e.g. to close it.
    pub fn into_transport(self) -> T {
        self.session.into_executor().into_transport()
    }
}

impl<T: Transport> Cliconf for Mpos<T> {
    async fn get_device_info(&mut self) -> Result<DeviceInfo> {
        self.facts
            .get_device_info(self.session.executor_mut())
            .await
    }

    async fn get_config(&mut self, source: &str) -> Result<CommandResult> {
        let source: ConfigSource = source.parse()?;
        self.session.ensure_operational_context().await?;

        let command = self.profile.config_commands().for_source(source).to_string();
        debug!("fetching {} configuration", source);
        self.session.executor_mut().run(&command).await
    }

    async fn edit_config(&mut self, candidate: Vec<Command>, commit: bool) -> Result<EditResult> {
        let transaction = Transaction::new(candidate, commit);
        transaction.ensure_commit()?;
        self.session.ensure_operational_context().await?;

        let end = self.profile.end_marker().to_string();
        let comment = self.profile.comment_marker().to_string();
        TransactionRunner::new(&mut self.session, end, comment)
            .run(&transaction)
            .await
    }

    async fn get(&mut self, command: Command) -> Result<CommandResult> {
        self.session.executor_mut().execute(&command).await
    }

    async fn get_capabilities(&mut self) -> Result<String> {
        let device_info = self.get_device_info().await?;
        Capabilities::new(device_info, OPERATIONS).to_json()
    }
}

impl<T: Transport> TerminalHooks for Mpos<T> {
    async fn on_open_shell(&mut self) -> Result<()> {
        let paging = self.profile.paging_command().to_string();
        match self.session.executor_mut().run(&paging).await {
            Ok(_) => {
                info!("{} shell ready", self.profile.family());
                Ok(())
            }
            Err(e) => Err(SessionError::SessionSetup {
                message: format!("unable to set {}: {}", paging, e),
            }
            .into()),
        }
    }

    async fn on_become(&mut self, password: Option<&SecretString>) -> Result<()> {
        self.session.become_privileged(password).await
    }

    async fn on_unbecome(&mut self) -> Result<()> {
        self.session.unbecome().await.map(|_| ())
    }
}

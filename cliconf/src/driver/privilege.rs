//! Privilege state tracking and transitions.
//!
//! The current state is always derived from the latest prompt the transport
//! saw; nothing is cached across reads.
//!
//! ```text
//! ┌──────────────┐  enable   ┌────────────┐  configure terminal  ┌──────────┐  interface ..  ┌───────────┐
//! │ Unprivileged ├───────────► Privileged ├──────────────────────► Config   ├────────────────► ConfigSub │
//! │      >       │  disable  │     #      │         end          │(config)# │     exit       │(config-*)#│
//! └──────────────┘◄──────────┴────────────┘◄─────────────────────┴──────────┘◄───────────────┴───────────┘
//! ```

use std::fmt;
use std::sync::Arc;

use log::debug;
use regex::bytes::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::command::Command;
use super::executor::CommandExecutor;
use crate::channel::Prompt;
use crate::error::{Error, Result, SessionError};
use crate::events::{EventSink, SessionEvent};
use crate::platform::ModeCommands;
use crate::transport::Transport;

/// Upper bound on `exit`s sent to unwind nested configuration contexts.
const MAX_CONTEXT_DEPTH: usize = 4;

/// Privilege level of the session, inferred from the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SessionState {
    /// `router>`
    Unprivileged,
    /// `router#`
    Privileged,
    /// `router(config)#`
    Config,
    /// `router(config-if)#` and deeper
    ConfigSub,
}

impl SessionState {
    pub fn is_config(self) -> bool {
        matches!(self, SessionState::Config | SessionState::ConfigSub)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unprivileged => "unprivileged",
            SessionState::Privileged => "privileged",
            SessionState::Config => "config",
            SessionState::ConfigSub => "config-subsection",
        };
        f.write_str(name)
    }
}

/// Drives privilege transitions on one device session.
///
/// Owns the [`CommandExecutor`] and with it the transport, so at most one
/// exchange is ever in flight.
pub struct SessionStateMachine<T> {
    executor: CommandExecutor<T>,
    commands: ModeCommands,
    password_prompt: Regex,
    enable_secret: Option<SecretString>,
    sink: Arc<dyn EventSink>,
}

impl<T: Transport> SessionStateMachine<T> {
    pub fn new(
        executor: CommandExecutor<T>,
        commands: ModeCommands,
        password_prompt: Regex,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            executor,
            commands,
            password_prompt,
            enable_secret: None,
            sink,
        }
    }

    /// Password used when a baseline normalization has to escalate.
    pub fn set_enable_secret(&mut self, secret: Option<SecretString>) {
        self.enable_secret = secret;
    }

    pub fn executor(&self) -> &CommandExecutor<T> {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut CommandExecutor<T> {
        &mut self.executor
    }

    pub fn into_executor(self) -> CommandExecutor<T> {
        self.executor
    }

    pub fn commands(&self) -> &ModeCommands {
        &self.commands
    }

    /// The latest settled prompt, if one can be identified.
    pub fn prompt(&self) -> Option<Prompt> {
        self.executor.current_prompt()
    }

    /// Classify a prompt into a session state.
    pub fn state_of(&self, prompt: &Prompt) -> SessionState {
        let matcher = self.executor.matcher();
        if matcher.is_config_subsection(prompt) {
            SessionState::ConfigSub
        } else if matcher.is_config_prompt(prompt) {
            SessionState::Config
        } else if prompt.is_privileged() {
            SessionState::Privileged
        } else {
            SessionState::Unprivileged
        }
    }

    /// Current state.
    ///
    /// # Errors
    ///
    /// `SessionError::ConnectionLost` if the transport is disconnected or no
    /// prompt can be identified.
    pub fn state(&self) -> Result<SessionState> {
        let prompt = self.require_prompt()?;
        Ok(self.state_of(&prompt))
    }

    /// Escalate to privileged mode, answering a password challenge if
    /// `password` is given.
    ///
    /// A no-op if the prompt already ends in `#`.
    pub async fn become_privileged(&mut self, password: Option<&SecretString>) -> Result<()> {
        let before = self.state()?;
        if before != SessionState::Unprivileged {
            return Ok(());
        }

        let mut command = Command::new(self.commands.enable.as_str());
        if let Some(password) = password {
            command = command
                .with_prompt(self.password_prompt.as_str())
                .map_err(|e| self.escalation_error(SessionState::Privileged, e.to_string()))?
                .with_answer(password.expose_secret())
                .with_prompt_retry_check(true);
        }

        match self.executor.execute(&command).await {
            Ok(_) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => return Err(self.escalation_error(SessionState::Privileged, e.to_string())),
        }

        let after = self.prompt();
        if !after.as_ref().is_some_and(Prompt::is_privileged) {
            return Err(self.escalation_error(
                SessionState::Privileged,
                "failed to elevate privilege to enable mode".to_string(),
            ));
        }

        self.transitioned(before, SessionState::Privileged);
        Ok(())
    }

    /// Drop back to unprivileged mode.
    ///
    /// With no identifiable prompt the session is treated as already hung up
    /// and nothing is sent; `Ok(None)` is returned.
    pub async fn unbecome(&mut self) -> Result<Option<SessionState>> {
        let Some(prompt) = self.prompt() else {
            debug!("no prompt available, treating session as disconnected");
            return Ok(None);
        };

        let before = self.state_of(&prompt);
        if before.is_config() {
            self.executor.run(&self.commands.end).await?;
            self.executor.run(&self.commands.disable).await?;
        } else if before == SessionState::Privileged {
            self.executor.run(&self.commands.disable).await?;
        } else {
            return Ok(Some(before));
        }

        let after = self.state()?;
        self.transitioned(before, after);
        Ok(Some(after))
    }

    /// Enter configuration mode from wherever the session is.
    ///
    /// A no-op at the top-level `(config)#` prompt. Nested contexts are left
    /// with `end` first so the change-set starts from a clean context.
    pub async fn enter_config(&mut self) -> Result<()> {
        let before = self.state()?;
        match before {
            SessionState::Config => return Ok(()),
            SessionState::ConfigSub => {
                self.executor.run(&self.commands.end).await?;
            }
            SessionState::Unprivileged => {
                let secret = self.enable_secret.take();
                let escalated = self.become_privileged(secret.as_ref()).await;
                self.enable_secret = secret;
                escalated?;
            }
            SessionState::Privileged => {}
        }

        let configure = self.commands.configure.clone();
        self.executor.run(&configure).await?;

        let after = self.state()?;
        if !after.is_config() {
            return Err(self.escalation_error(
                SessionState::Config,
                format!("'{}' did not enter configuration mode", configure),
            ));
        }
        self.transitioned(before, after);
        Ok(())
    }

    /// Leave configuration mode with `end`. A no-op outside of it.
    pub async fn exit_config(&mut self) -> Result<()> {
        let before = self.state()?;
        if !before.is_config() {
            return Ok(());
        }

        self.executor.run(&self.commands.end).await?;

        let after = self.state()?;
        if after.is_config() {
            return Err(self.escalation_error(
                SessionState::Privileged,
                format!("'{}' did not leave configuration mode", self.commands.end),
            ));
        }
        self.transitioned(before, after);
        Ok(())
    }

    /// Normalize the session into privileged operational mode before a
    /// read-only command, whatever the current nesting depth.
    ///
    /// Configuration contexts are unwound with `exit`; an unprivileged
    /// session is escalated with `enable`. Already privileged is a no-op.
    pub async fn ensure_operational_context(&mut self) -> Result<()> {
        let before = self.state()?;
        let mut state = before;

        let mut exits = 0;
        while state.is_config() && exits < MAX_CONTEXT_DEPTH {
            debug!("in config mode, sending {:?}", self.commands.exit);
            self.executor.run(&self.commands.exit).await?;
            state = self.state()?;
            exits += 1;
        }

        if state == SessionState::Unprivileged {
            let secret = self.enable_secret.take();
            let escalated = self.become_privileged(secret.as_ref()).await;
            self.enable_secret = secret;
            escalated?;
            return Ok(());
        }

        if state.is_config() {
            return Err(self.escalation_error(
                SessionState::Privileged,
                format!("still in configuration mode after {} exits", exits),
            ));
        }

        self.transitioned(before, state);
        Ok(())
    }

    fn require_prompt(&self) -> Result<Prompt> {
        if !self.executor.is_connected() {
            return Err(SessionError::ConnectionLost {
                reason: "transport reports the session as not connected".to_string(),
            }
            .into());
        }
        self.prompt().ok_or_else(|| {
            SessionError::ConnectionLost {
                reason: "cli prompt is not identified from the last received response window"
                    .to_string(),
            }
            .into()
        })
    }

    fn transitioned(&self, from: SessionState, to: SessionState) {
        if from != to {
            self.sink.emit(SessionEvent::StateChanged { from, to });
        }
    }

    fn escalation_error(&self, target: SessionState, message: String) -> Error {
        SessionError::PrivilegeEscalation {
            target,
            prompt: self
                .prompt()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default(),
            message,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::driver::SessionConfig;
    use crate::events::{NullSink, RecordingSink};
    use crate::platform::vendors::mpos;
    use crate::transport::mock::MockTransport;

    fn session(transport: MockTransport, sink: Arc<dyn EventSink>) -> SessionStateMachine<MockTransport> {
        let profile = mpos::profile();
        let config = SessionConfig::default();
        let executor = CommandExecutor::new(
            transport,
            profile.prompt_matcher(config.search_depth),
            profile.error_classifier(),
            config,
            sink.clone(),
        );
        SessionStateMachine::new(
            executor,
            profile.commands().clone(),
            profile.password_prompt().clone(),
            sink,
        )
    }

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn test_state_from_prompt() {
        let cases = [
            ("router>", SessionState::Unprivileged),
            ("router#", SessionState::Privileged),
            ("router(config)#", SessionState::Config),
            ("router(config-if)#", SessionState::ConfigSub),
            ("router(config-if-vlan)#", SessionState::ConfigSub),
        ];
        for (prompt, expected) in cases {
            let sm = session(MockTransport::with_prompt(prompt), Arc::new(NullSink));
            assert_eq!(assert_ok!(sm.state()), expected, "prompt {prompt}");
        }
    }

    #[test]
    fn test_state_without_prompt_is_connection_lost() {
        let sm = session(MockTransport::new(), Arc::new(NullSink));
        let err = assert_err!(sm.state());
        assert!(matches!(err, Error::Session(SessionError::ConnectionLost { .. })));
    }

    #[tokio::test]
    async fn test_become_with_password() {
        let transport = MockTransport::with_prompt("router>")
            .expect("enable", &["enable\r\nPassword: "])
            .expect("s3cret", &["\r\nrouter#"]);
        let handle = transport.clone();
        let sink = RecordingSink::new();
        let mut sm = session(transport, Arc::new(sink.clone()));

        assert_ok!(sm.become_privileged(Some(&secret("s3cret"))).await);
        assert_eq!(assert_ok!(sm.state()), SessionState::Privileged);
        assert_eq!(handle.sent(), vec!["enable", "s3cret"]);
        assert!(sink.events().contains(&SessionEvent::StateChanged {
            from: SessionState::Unprivileged,
            to: SessionState::Privileged,
        }));
    }

    #[tokio::test]
    async fn test_become_without_password() {
        let transport = MockTransport::with_prompt("router>").respond("enable", "", "router#");
        let mut sm = session(transport, Arc::new(NullSink));
        assert_ok!(sm.become_privileged(None).await);
        assert_eq!(assert_ok!(sm.state()), SessionState::Privileged);
    }

    #[tokio::test]
    async fn test_become_noop_when_privileged() {
        let transport = MockTransport::with_prompt("router#");
        let handle = transport.clone();
        let mut sm = session(transport, Arc::new(NullSink));

        assert_ok!(sm.become_privileged(Some(&secret("s3cret"))).await);
        assert!(handle.sent().is_empty());
    }

    #[tokio::test]
    async fn test_become_bad_password() {
        let transport = MockTransport::with_prompt("router>")
            .expect("enable", &["enable\r\nPassword: "])
            .expect("wrong", &["\r\n% Bad passwords\r\nrouter>"]);
        let mut sm = session(transport, Arc::new(NullSink));

        let err = assert_err!(sm.become_privileged(Some(&secret("wrong"))).await);
        match err {
            Error::Session(SessionError::PrivilegeEscalation { target, prompt, .. }) => {
                assert_eq!(target, SessionState::Privileged);
                assert_eq!(prompt, "router>");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_become_timeout_stays_fatal() {
        let transport = MockTransport::with_prompt("router>").expect("enable", &["enable\r\n"]);
        let mut sm = session(transport, Arc::new(NullSink));

        let err = assert_err!(sm.become_privileged(None).await);
        assert!(matches!(err, Error::Session(SessionError::PromptTimeout(_))));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_become_on_dropped_connection_stays_fatal() {
        let transport = MockTransport::with_prompt("router>");
        transport.disconnect();
        let mut sm = session(transport, Arc::new(NullSink));

        let err = assert_err!(sm.become_privileged(Some(&secret("s3cret"))).await);
        assert!(err.is_fatal());
        assert!(!matches!(
            err,
            Error::Session(SessionError::PrivilegeEscalation { .. })
        ));
    }

    #[tokio::test]
    async fn test_become_still_unprivileged() {
        let transport = MockTransport::with_prompt("router>").respond("enable", "", "router>");
        let mut sm = session(transport, Arc::new(NullSink));

        let err = assert_err!(sm.become_privileged(None).await);
        assert!(matches!(
            err,
            Error::Session(SessionError::PrivilegeEscalation { .. })
        ));
    }

    #[tokio::test]
    async fn test_unbecome_from_config() {
        let transport = MockTransport::with_prompt("router(config-if)#")
            .respond("end", "", "router#")
            .respond("disable", "", "router>");
        let handle = transport.clone();
        let mut sm = session(transport, Arc::new(NullSink));

        let state = assert_ok!(sm.unbecome().await);
        assert_eq!(state, Some(SessionState::Unprivileged));
        assert_eq!(handle.sent(), vec!["end", "disable"]);
    }

    #[tokio::test]
    async fn test_unbecome_from_privileged() {
        let transport = MockTransport::with_prompt("router#").respond("disable", "", "router>");
        let handle = transport.clone();
        let mut sm = session(transport, Arc::new(NullSink));

        assert_eq!(
            assert_ok!(sm.unbecome().await),
            Some(SessionState::Unprivileged)
        );
        assert_eq!(handle.sent(), vec!["disable"]);
    }

    #[tokio::test]
    async fn test_unbecome_noop_cases() {
        let unprivileged = MockTransport::with_prompt("router>");
        let handle = unprivileged.clone();
        let mut sm = session(unprivileged, Arc::new(NullSink));
        assert_eq!(
            assert_ok!(sm.unbecome().await),
            Some(SessionState::Unprivileged)
        );
        assert!(handle.sent().is_empty());

        // Hung session: no prompt, nothing sent, no error
        let hung = MockTransport::new();
        let handle = hung.clone();
        let mut sm = session(hung, Arc::new(NullSink));
        assert_eq!(assert_ok!(sm.unbecome().await), None);
        assert!(handle.sent().is_empty());
    }

    #[tokio::test]
    async fn test_ensure_operational_context_is_idempotent() {
        let transport = MockTransport::with_prompt("router>").respond("enable", "", "router#");
        let handle = transport.clone();
        let mut sm = session(transport, Arc::new(NullSink));

        assert_ok!(sm.ensure_operational_context().await);
        assert_ok!(sm.ensure_operational_context().await);
        assert_eq!(handle.sent(), vec!["enable"]);
    }

    #[tokio::test]
    async fn test_ensure_operational_context_unwinds_nesting() {
        let transport = MockTransport::with_prompt("router(config-if)#")
            .respond("exit", "", "router(config)#")
            .respond("exit", "", "router#");
        let handle = transport.clone();
        let mut sm = session(transport, Arc::new(NullSink));

        assert_ok!(sm.ensure_operational_context().await);
        assert_eq!(assert_ok!(sm.state()), SessionState::Privileged);
        assert_eq!(handle.sent(), vec!["exit", "exit"]);
    }

    #[tokio::test]
    async fn test_ensure_operational_context_uses_enable_secret() {
        let transport = MockTransport::with_prompt("router>")
            .expect("enable", &["enable\r\nPassword: "])
            .expect("s3cret", &["\r\nrouter#"]);
        let mut sm = session(transport, Arc::new(NullSink));
        sm.set_enable_secret(Some(secret("s3cret")));

        assert_ok!(sm.ensure_operational_context().await);
        assert_eq!(assert_ok!(sm.state()), SessionState::Privileged);
    }

    #[tokio::test]
    async fn test_ensure_operational_context_without_prompt() {
        let mut sm = session(MockTransport::new(), Arc::new(NullSink));
        let err = assert_err!(sm.ensure_operational_context().await);
        assert!(matches!(err, Error::Session(SessionError::ConnectionLost { .. })));
    }

    #[tokio::test]
    async fn test_enter_and_exit_config() {
        let transport = MockTransport::with_prompt("router#")
            .respond("configure terminal", "", "router(config)#")
            .respond("end", "", "router#");
        let handle = transport.clone();
        let mut sm = session(transport, Arc::new(NullSink));

        assert_ok!(sm.enter_config().await);
        assert_eq!(assert_ok!(sm.state()), SessionState::Config);
        // Already there: nothing more is sent
        assert_ok!(sm.enter_config().await);

        assert_ok!(sm.exit_config().await);
        assert_eq!(assert_ok!(sm.state()), SessionState::Privileged);
        assert_ok!(sm.exit_config().await);

        assert_eq!(handle.sent(), vec!["configure terminal", "end"]);
    }

    #[tokio::test]
    async fn test_enter_config_rejected() {
        let transport = MockTransport::with_prompt("router#").respond(
            "configure terminal",
            "% Error: configuration locked by another session\r\n",
            "router#",
        );
        let mut sm = session(transport, Arc::new(NullSink));

        let err = assert_err!(sm.enter_config().await);
        assert!(err.is_command_error());
    }
}

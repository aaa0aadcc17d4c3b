//! Configuration change-sets applied inside one configuration context.

use serde::Serialize;

use super::command::Command;
use super::privilege::SessionStateMachine;
use super::response::CommandResult;
use crate::error::{Result, SessionError};
use crate::events::SessionEvent;
use crate::transport::Transport;

/// An ordered batch of configuration commands.
#[derive(Debug)]
pub struct Transaction {
    commands: Vec<Command>,
    commit: bool,
}

impl Transaction {
    pub fn new<I, C>(commands: I, commit: bool) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Command>,
    {
        Self {
            commands: commands.into_iter().map(Into::into).collect(),
            commit,
        }
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn commit(&self) -> bool {
        self.commit
    }

    /// Fails with `SessionError::UnsupportedMode` unless committing.
    pub fn ensure_commit(&self) -> Result<()> {
        if self.commit {
            return Ok(());
        }
        Err(SessionError::UnsupportedMode {
            message: "check mode is not supported".to_string(),
        }
        .into())
    }
}

/// What a committed transaction sent and got back, in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct EditResult {
    pub request: Vec<String>,
    pub response: Vec<CommandResult>,
}

/// Applies a [`Transaction`] on a session.
///
/// Enters configuration mode once, dispatches every non-control line and
/// leaves with `end`. The first failure aborts the batch and is returned
/// as-is; the session is left wherever the failure happened.
pub struct TransactionRunner<'a, T> {
    session: &'a mut SessionStateMachine<T>,
    end_marker: String,
    comment_marker: String,
}

impl<'a, T: Transport> TransactionRunner<'a, T> {
    pub fn new(
        session: &'a mut SessionStateMachine<T>,
        end_marker: impl Into<String>,
        comment_marker: impl Into<String>,
    ) -> Self {
        Self {
            session,
            end_marker: end_marker.into(),
            comment_marker: comment_marker.into(),
        }
    }

    /// Lines that are recorded as control and never sent.
    pub fn is_control(&self, line: &str) -> bool {
        let line = line.trim();
        line.is_empty() || line == self.end_marker || line.starts_with(&self.comment_marker)
    }

    /// # Errors
    ///
    /// `SessionError::UnsupportedMode` before anything is sent if the
    /// transaction is not committing; otherwise the first failure from
    /// entering configuration mode or from a dispatched command.
    pub async fn run(&mut self, transaction: &Transaction) -> Result<EditResult> {
        transaction.ensure_commit()?;
        self.session.enter_config().await?;

        let mut result = EditResult::default();
        for command in transaction.commands() {
            if self.is_control(command.text()) {
                self.session
                    .executor()
                    .sink()
                    .emit(SessionEvent::CommandSkipped {
                        command: command.text().to_string(),
                    });
                continue;
            }

            let response = self.session.executor_mut().execute(command).await?;
            result.request.push(command.text().to_string());
            result.response.push(response);
        }

        self.session.exit_config().await?;
        Ok(result)
    }
}

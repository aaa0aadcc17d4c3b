//! Single-command execution: send, answer secondary prompts, collect output
//! up to a settled prompt, classify.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use secrecy::ExposeSecret;
use tokio::time::Instant;

use super::command::Command;
use super::config::SessionConfig;
use super::response::{CommandResult, normalize_output};
use crate::channel::{ErrorClassifier, ErrorKind, PatternBuffer, Prompt, PromptMatcher};
use crate::error::{Error, Result, SessionError, TransportError};
use crate::events::{EventSink, SessionEvent};
use crate::transport::Transport;

/// Runs one command at a time over an exclusively owned transport.
///
/// The executor keeps no results; each [`CommandResult`] is handed to the
/// caller. Taking `&mut self` for every exchange serializes sends.
pub struct CommandExecutor<T> {
    transport: T,
    matcher: PromptMatcher,
    classifier: ErrorClassifier,
    config: SessionConfig,
    sink: Arc<dyn EventSink>,
}

impl<T: Transport> CommandExecutor<T> {
    pub fn new(
        transport: T,
        matcher: PromptMatcher,
        classifier: ErrorClassifier,
        config: SessionConfig,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            transport,
            matcher,
            classifier,
            config,
            sink,
        }
    }

    pub fn matcher(&self) -> &PromptMatcher {
        &self.matcher
    }

    pub fn classifier(&self) -> &ErrorClassifier {
        &self.classifier
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give the transport back, e.g. to close it.
    pub fn into_transport(self) -> T {
        self.transport
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// The prompt the transport last saw, if it parses as one.
    pub fn current_prompt(&self) -> Option<Prompt> {
        let line = self.transport.current_prompt()?;
        let mut clean = PatternBuffer::new(line.len());
        clean.extend(&line);
        self.matcher.match_prompt(clean.as_slice())
    }

    /// Execute a command and wait for the device to return to a prompt.
    ///
    /// # Errors
    ///
    /// - `SessionError::ConnectionLost` if the transport is not connected
    /// - `SessionError::PromptTimeout` if no prompt settles within the
    ///   configured timeout
    /// - `SessionError::Command` if the output carries an error signature or
    ///   a scripted answer is rejected
    pub async fn execute(&mut self, command: &Command) -> Result<CommandResult> {
        if !self.transport.is_connected() {
            return Err(SessionError::ConnectionLost {
                reason: format!("transport disconnected before sending '{}'", command.text()),
            }
            .into());
        }

        let start = Instant::now();
        self.write_line(command.text(), command.newline()).await?;
        self.sink.emit(SessionEvent::CommandSent {
            command: command.text().to_string(),
        });

        if command.is_sendonly() {
            return Ok(CommandResult::sent(command.text()));
        }

        let deadline = start + self.config.timeout;
        let mut buffer = PatternBuffer::new(self.config.search_depth);
        let max_answers = command.max_answers();
        let mut answered = 0;
        let mut answer_mark = 0;

        let prompt = loop {
            let chunk = self.read(deadline).await?;
            buffer.extend(&chunk);

            if max_answers > 0 {
                if let Some(matched) = self.secondary_prompt(command, &buffer, answer_mark) {
                    if answered == max_answers {
                        let message = format!("answer to prompt '{}' was not accepted", matched);
                        return Err(self.fail(command, ErrorKind::AnswerRejected, message));
                    }
                    if let Some(answer) = command.answer() {
                        self.write_line(answer.expose_secret(), true).await?;
                    }
                    answered += 1;
                    answer_mark = buffer.len();
                    self.sink.emit(SessionEvent::AnswerSent { prompt: matched });
                    continue;
                }
            }

            if let Some(prompt) = self.matcher.match_prompt(buffer.as_slice()) {
                break prompt;
            }
        };

        let raw = buffer.as_str_lossy().into_owned();
        let result = normalize_output(&raw, command.text());

        if let Some(failure) = self.classifier.find(result.as_bytes(), command.check_all()) {
            return Err(self.fail(command, failure.kind, failure.message));
        }

        self.sink.emit(SessionEvent::PromptSettled {
            prompt: prompt.as_str().to_string(),
        });

        Ok(CommandResult::new(
            command.text(),
            result,
            raw,
            prompt.as_str(),
            start.elapsed(),
        ))
    }

    /// Send a plain command line, e.g. a mode change.
    pub async fn run(&mut self, text: &str) -> Result<CommandResult> {
        self.execute(&Command::new(text)).await
    }

    async fn write_line(&mut self, text: &str, newline: bool) -> Result<()> {
        let mut payload = Vec::with_capacity(text.len() + self.config.line_ending.len());
        payload.extend_from_slice(text.as_bytes());
        if newline {
            payload.extend_from_slice(self.config.line_ending.as_bytes());
        }
        self.transport.send(&payload).await
    }

    async fn read(&mut self, deadline: Instant) -> Result<Bytes> {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining == Duration::ZERO {
            return Err(SessionError::PromptTimeout(self.config.timeout).into());
        }

        match self.transport.read_until_quiet(remaining).await {
            Err(Error::Transport(TransportError::Timeout(_))) => {
                Err(SessionError::PromptTimeout(self.config.timeout).into())
            }
            Err(Error::Transport(TransportError::Disconnected)) => {
                Err(SessionError::ConnectionLost {
                    reason: "transport disconnected while waiting for prompt".to_string(),
                }
                .into())
            }
            other => other,
        }
    }

    /// The secondary prompt text if it appears after `mark`.
    fn secondary_prompt(
        &self,
        command: &Command,
        buffer: &PatternBuffer,
        mark: usize,
    ) -> Option<String> {
        let pattern = command.prompt()?;
        pattern
            .find(buffer.tail_from(mark))
            .map(|m| String::from_utf8_lossy(m.as_bytes()).trim().to_string())
    }

    fn fail(&self, command: &Command, kind: ErrorKind, message: String) -> Error {
        self.sink.emit(SessionEvent::CommandFailed {
            command: command.text().to_string(),
            kind,
            message: message.clone(),
        });
        SessionError::Command {
            command: command.text().to_string(),
            kind,
            message,
        }
        .into()
    }
}

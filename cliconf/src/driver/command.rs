//! Command value object.

use std::fmt;

use regex::bytes::Regex;
use secrecy::SecretString;

/// A single command to send to the device.
///
/// Built once per invocation with the `with_*` methods and then only read.
/// A command may carry a secondary prompt (e.g. a password request) and the
/// answer to send when it appears.
///
/// # Example
///
/// ```rust
/// use cliconf::Command;
///
/// let cmd = Command::new("copy running-config startup-config")
///     .with_prompt(r"\[[Yy]/[Nn]\]\s*$")
///     .unwrap()
///     .with_answer("y");
/// assert_eq!(cmd.text(), "copy running-config startup-config");
/// ```
pub struct Command {
    text: String,
    prompt: Option<Regex>,
    answer: Option<SecretString>,
    prompt_retry_check: bool,
    sendonly: bool,
    newline: bool,
    check_all: bool,
}

impl Command {
    /// A plain command: newline appended, output collected up to the prompt.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            prompt: None,
            answer: None,
            prompt_retry_check: false,
            sendonly: false,
            newline: true,
            check_all: false,
        }
    }

    /// Watch for `pattern` before the final prompt and answer it.
    pub fn with_prompt(mut self, pattern: &str) -> Result<Self, regex::Error> {
        self.prompt = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Answer to send when the secondary prompt appears.
    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = Some(SecretString::from(answer.into()));
        self
    }

    /// Answer once more if the secondary prompt reappears after answering.
    pub fn with_prompt_retry_check(mut self, retry: bool) -> Self {
        self.prompt_retry_check = retry;
        self
    }

    /// Send and return immediately without collecting output.
    pub fn send_only(mut self) -> Self {
        self.sendonly = true;
        self
    }

    /// Do not append the line ending.
    pub fn without_newline(mut self) -> Self {
        self.newline = false;
        self
    }

    /// Check every error signature against the whole output.
    pub fn with_check_all(mut self, check_all: bool) -> Self {
        self.check_all = check_all;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn prompt(&self) -> Option<&Regex> {
        self.prompt.as_ref()
    }

    pub fn answer(&self) -> Option<&SecretString> {
        self.answer.as_ref()
    }

    pub fn prompt_retry_check(&self) -> bool {
        self.prompt_retry_check
    }

    pub fn is_sendonly(&self) -> bool {
        self.sendonly
    }

    pub fn newline(&self) -> bool {
        self.newline
    }

    pub fn check_all(&self) -> bool {
        self.check_all
    }

    /// How many times the secondary prompt may be answered.
    pub(crate) fn max_answers(&self) -> usize {
        match (&self.prompt, &self.answer) {
            (Some(_), Some(_)) if self.prompt_retry_check => 2,
            (Some(_), Some(_)) => 1,
            _ => 0,
        }
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("text", &self.text)
            .field("prompt", &self.prompt.as_ref().map(Regex::as_str))
            .field("answer", &self.answer.as_ref().map(|_| "<hidden>"))
            .field("prompt_retry_check", &self.prompt_retry_check)
            .field("sendonly", &self.sendonly)
            .field("newline", &self.newline)
            .field("check_all", &self.check_all)
            .finish()
    }
}

impl From<&str> for Command {
    fn from(text: &str) -> Self {
        Command::new(text)
    }
}

impl From<String> for Command {
    fn from(text: String) -> Self {
        Command::new(text)
    }
}

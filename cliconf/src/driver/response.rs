//! Result type for command execution.

use std::time::Duration;

use serde::Serialize;

/// Output of one successfully executed command.
///
/// Failures never produce a `CommandResult`; they surface as
/// `SessionError::Command` from the executor instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// The command that was executed.
    pub command: String,

    /// The command output with the echo and trailing prompt removed.
    pub result: String,

    /// Everything read for this command, echo and prompt included.
    pub raw_result: String,

    /// The prompt that settled the command, empty for send-only commands.
    pub prompt: String,

    /// Time from send to settled prompt.
    pub elapsed: Duration,
}

impl CommandResult {
    pub fn new(
        command: impl Into<String>,
        result: impl Into<String>,
        raw_result: impl Into<String>,
        prompt: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            command: command.into(),
            result: result.into(),
            raw_result: raw_result.into(),
            prompt: prompt.into(),
            elapsed,
        }
    }

    /// Result for a send-only command: nothing was read.
    pub fn sent(command: impl Into<String>) -> Self {
        Self::new(command, "", "", "", Duration::ZERO)
    }

    /// Get the result lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.result.lines()
    }

    /// Check if the result contains a substring.
    pub fn contains(&self, pattern: &str) -> bool {
        self.result.contains(pattern)
    }

    pub fn is_empty(&self) -> bool {
        self.result.trim().is_empty()
    }
}

impl std::fmt::Display for CommandResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.result)
    }
}

/// Strip the command echo from the front and the prompt line from the end.
pub(crate) fn normalize_output(raw: &str, command: &str) -> String {
    let output = raw
        .trim_start_matches(['\r', '\n'])
        .strip_prefix(command)
        .unwrap_or(raw)
        .trim_start_matches(['\r', '\n']);

    let body = match output.rfind('\n') {
        Some(pos) => &output[..pos],
        // Only the prompt is left
        None => "",
    };
    body.trim_end_matches(['\r', '\n']).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_echo_and_prompt() {
        let raw = "show hostname\r\nLocal hostname my-router\r\nmy-router#";
        assert_eq!(
            normalize_output(raw, "show hostname"),
            "Local hostname my-router"
        );
    }

    #[test]
    fn test_normalize_prompt_only() {
        assert_eq!(normalize_output("end\r\nrouter#", "end"), "");
    }

    #[test]
    fn test_normalize_without_echo() {
        let raw = "\r\nline one\r\nline two\r\nrouter>";
        assert_eq!(normalize_output(raw, "secret"), "line one\r\nline two");
    }

    #[test]
    fn test_result_helpers() {
        let result = CommandResult::new(
            "show version",
            "Software Version : 9.1.2\nHardware Model : MP1800",
            "",
            "router#",
            Duration::from_millis(12),
        );
        assert_eq!(result.lines().count(), 2);
        assert!(result.contains("9.1.2"));
        assert!(!result.is_empty());
        assert!(CommandResult::sent("more off").is_empty());
    }
}

//! Error signature matching over command output.

use std::fmt;

use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

/// Label for a known device failure signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Generic `% Error` output
    Generic,
    /// Bad or missing passwords
    Authentication,
    /// Refused, unroutable or closed connections
    Connectivity,
    /// Account locked by the login-secure service
    AccountLocked,
    /// Command not recognised by the CLI parser
    CommandRejected,
    /// A scripted answer to a secondary prompt was not accepted
    AnswerRejected,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Generic => "error",
            ErrorKind::Authentication => "authentication failure",
            ErrorKind::Connectivity => "connectivity failure",
            ErrorKind::AccountLocked => "account locked",
            ErrorKind::CommandRejected => "command rejected",
            ErrorKind::AnswerRejected => "answer rejected",
        };
        f.write_str(label)
    }
}

/// A signature hit: which kind, and the output line it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMatch {
    pub kind: ErrorKind,
    pub message: String,
}

/// Ordered table of failure signatures. First match wins.
///
/// Patterns are compiled case-insensitively by the profile loader, so
/// `BAD PASSWORDS` and `bad passwords` classify the same way.
#[derive(Debug, Clone)]
pub struct ErrorClassifier {
    signatures: Vec<(ErrorKind, Regex)>,
}

impl ErrorClassifier {
    pub fn new(signatures: Vec<(ErrorKind, Regex)>) -> Self {
        Self { signatures }
    }

    /// Classify output as an error, or `None` for success.
    pub fn classify(&self, buffer: &[u8]) -> Option<ErrorKind> {
        self.find(buffer, false).map(|m| m.kind)
    }

    /// Find the first failure in `buffer`.
    ///
    /// By default output is scanned line by line and the first line carrying
    /// any signature is reported. With `check_all`, every signature is run
    /// against the entire buffer in table order, so text that spans lines or
    /// trails legitimate output is still caught.
    pub fn find(&self, buffer: &[u8], check_all: bool) -> Option<ErrorMatch> {
        if check_all {
            return self.signatures.iter().find_map(|(kind, re)| {
                re.find(buffer).map(|m| ErrorMatch {
                    kind: *kind,
                    message: line_around(buffer, m.start(), m.end()),
                })
            });
        }

        buffer
            .split(|b| *b == b'\n')
            .find_map(|line| {
                self.signatures
                    .iter()
                    .find(|(_, re)| re.is_match(line))
                    .map(|(kind, _)| ErrorMatch {
                        kind: *kind,
                        message: String::from_utf8_lossy(line).trim().to_string(),
                    })
            })
    }

    /// Every signature that matches anywhere in `buffer`, in table order.
    pub fn find_all(&self, buffer: &[u8]) -> Vec<ErrorKind> {
        self.signatures
            .iter()
            .filter(|(_, re)| re.is_match(buffer))
            .map(|(kind, _)| *kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

/// The full line(s) containing `buffer[start..end]`, trimmed.
fn line_around(buffer: &[u8], start: usize, end: usize) -> String {
    let line_start = memchr::memrchr(b'\n', &buffer[..start]).map_or(0, |p| p + 1);
    let line_end = memchr::memchr(b'\n', &buffer[end..]).map_or(buffer.len(), |p| end + p);
    String::from_utf8_lossy(&buffer[line_start..line_end])
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> ErrorClassifier {
        let sig = |kind, pattern: &str| (kind, Regex::new(&format!("(?i){pattern}")).unwrap());
        ErrorClassifier::new(vec![
            sig(ErrorKind::Generic, r"% ?Error"),
            sig(ErrorKind::Authentication, r"Bad passwords|Login invalid|No password set"),
            sig(
                ErrorKind::Connectivity,
                r"Connection refused|No route to host|Connection closed",
            ),
            sig(ErrorKind::AccountLocked, r"locked by login-secure service"),
            sig(ErrorKind::CommandRejected, r"Invalid input detected at|Unknown command"),
        ])
    }

    #[test]
    fn test_success_output() {
        let c = classifier();
        assert_eq!(c.classify(b"Software Version : 9.1.2\r\nUptime 3 days"), None);
        assert_eq!(c.classify(b""), None);
    }

    #[test]
    fn test_case_insensitive() {
        let c = classifier();
        assert_eq!(c.classify(b"BAD PASSWORDS"), Some(ErrorKind::Authentication));
        assert_eq!(c.classify(b"bad passwords"), Some(ErrorKind::Authentication));
        assert_eq!(c.classify(b"% error: bad mask"), Some(ErrorKind::Generic));
    }

    #[test]
    fn test_each_signature() {
        let c = classifier();
        assert_eq!(c.classify(b"%Error opening tftp"), Some(ErrorKind::Generic));
        assert_eq!(c.classify(b"% Login invalid"), Some(ErrorKind::Authentication));
        assert_eq!(c.classify(b"No route to host"), Some(ErrorKind::Connectivity));
        assert_eq!(
            c.classify(b"User admin locked by login-secure service"),
            Some(ErrorKind::AccountLocked)
        );
        assert_eq!(
            c.classify(b"% Invalid input detected at '^' marker."),
            Some(ErrorKind::CommandRejected)
        );
    }

    #[test]
    fn test_first_failing_line_reported() {
        let output = b"interface eth9\r\n          ^\r\n% Unknown command.\r\n% Error: retry\r\n";
        let m = classifier().find(output, false).unwrap();
        assert_eq!(m.kind, ErrorKind::CommandRejected);
        assert_eq!(m.message, "% Unknown command.");
    }

    #[test]
    fn test_check_all_uses_table_order() {
        let output = b"% Unknown command.\r\n% Error: retry\r\n";
        let m = classifier().find(output, true).unwrap();
        assert_eq!(m.kind, ErrorKind::Generic);
        assert_eq!(m.message, "% Error: retry");
    }

    #[test]
    fn test_find_all() {
        let output = b"Connection closed by peer\r\n% Error\r\n";
        assert_eq!(
            classifier().find_all(output),
            vec![ErrorKind::Generic, ErrorKind::Connectivity]
        );
    }
}

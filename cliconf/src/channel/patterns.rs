//! Prompt detection over the tail of accumulated output.

use std::fmt;

use regex::bytes::Regex;
use serde::Serialize;

/// Trailing prompt character, which encodes the privilege level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Terminator {
    /// `>` prompt
    Unprivileged,
    /// `#` prompt
    Privileged,
}

impl Terminator {
    fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b'#' => Some(Terminator::Privileged),
            b'>' => Some(Terminator::Unprivileged),
            _ => None,
        }
    }

    /// The prompt character itself.
    pub fn as_char(self) -> char {
        match self {
            Terminator::Privileged => '#',
            Terminator::Unprivileged => '>',
        }
    }
}

/// A settled shell prompt captured from the end of device output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    raw: String,
    terminator: Terminator,
    depth: usize,
}

impl Prompt {
    /// Parse a prompt line, e.g. `router(config-if)#`.
    ///
    /// Returns `None` if the trimmed line does not end in `#` or `>`.
    pub fn parse(line: &[u8]) -> Option<Self> {
        let text = String::from_utf8_lossy(line);
        let raw = text.trim();
        let terminator = Terminator::from_byte(*raw.as_bytes().last()?)?;
        let depth = memchr::memchr_iter(b'(', raw.as_bytes()).count();
        Some(Self {
            raw: raw.to_string(),
            terminator,
            depth,
        })
    }

    /// The prompt text, trimmed of surrounding whitespace and line breaks.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn terminator(&self) -> Terminator {
        self.terminator
    }

    /// Number of parenthesized context segments, e.g. 1 for `r(config)#`.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn is_privileged(&self) -> bool {
        self.terminator == Terminator::Privileged
    }

    /// The hostname-like token in front of any context segments.
    pub fn hostname(&self) -> &str {
        let end = self
            .raw
            .find('(')
            .unwrap_or(self.raw.len() - 1);
        &self.raw[..end]
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Classifies the end of accumulated output as a shell prompt or not.
///
/// Patterns are tried in order against the tail window; the first one that
/// matches at the very end of the buffer wins. The matcher has no state, so
/// it is safe to call speculatively on every partial read. Callers are
/// responsible for read quiescence: a line that may still grow is matched
/// as-is.
#[derive(Debug, Clone)]
pub struct PromptMatcher {
    patterns: Vec<Regex>,
    config_pattern: Regex,
    search_depth: usize,
}

impl PromptMatcher {
    pub fn new(patterns: Vec<Regex>, config_pattern: Regex, search_depth: usize) -> Self {
        Self {
            patterns,
            config_pattern,
            search_depth,
        }
    }

    /// Return the prompt at the end of `buffer`, or `None` while output is
    /// still streaming.
    pub fn match_prompt(&self, buffer: &[u8]) -> Option<Prompt> {
        let mut start = buffer.len().saturating_sub(self.search_depth);
        // A window that cuts into a line must not treat the cut as a line start.
        if start > 0 && !matches!(buffer[start - 1], b'\r' | b'\n') {
            start += memchr::memchr2(b'\r', b'\n', &buffer[start..])?;
        }
        let tail = &buffer[start..];
        self.patterns
            .iter()
            .filter_map(|pattern| pattern.find(tail))
            .find_map(|m| Prompt::parse(m.as_bytes()))
    }

    /// True if the buffer currently ends in a prompt.
    pub fn is_match(&self, buffer: &[u8]) -> bool {
        self.match_prompt(buffer).is_some()
    }

    /// True if the prompt has the `<name>(config...)#` shape.
    pub fn is_config_prompt(&self, prompt: &Prompt) -> bool {
        self.config_pattern.is_match(prompt.as_str().as_bytes())
    }

    /// True if the prompt is a nested configuration context such as
    /// `(config-if)`, as opposed to the top-level `(config)`.
    pub fn is_config_subsection(&self, prompt: &Prompt) -> bool {
        self.is_config_prompt(prompt) && prompt.as_str().contains("(config-")
    }

    pub fn search_depth(&self) -> usize {
        self.search_depth
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> PromptMatcher {
        matcher_with_depth(1000)
    }

    fn matcher_with_depth(search_depth: usize) -> PromptMatcher {
        PromptMatcher::new(
            vec![
                Regex::new(r"(?:\A|[\r\n])[\w+\-.:/\[\]]+(?:\([^)\r\n]+\)){0,3}[>#] ?\z").unwrap(),
            ],
            Regex::new(r"^.+\(config(-.*)?\)#$").unwrap(),
            search_depth,
        )
    }

    #[test]
    fn test_unprivileged_prompt() {
        let prompt = matcher().match_prompt(b"show clock\r\n10:01\r\nrouter>").unwrap();
        assert_eq!(prompt.as_str(), "router>");
        assert_eq!(prompt.terminator(), Terminator::Unprivileged);
        assert_eq!(prompt.depth(), 0);
        assert_eq!(prompt.hostname(), "router");
    }

    #[test]
    fn test_privileged_prompt_with_trailing_space() {
        let prompt = matcher().match_prompt(b"\r\nrouter# ").unwrap();
        assert_eq!(prompt.as_str(), "router#");
        assert!(prompt.is_privileged());
    }

    #[test]
    fn test_nested_context_depth() {
        let prompt = matcher()
            .match_prompt(b"\r\nsw-1(config)(config-if)(config-if-sub)#")
            .unwrap();
        assert_eq!(prompt.depth(), 3);
        assert_eq!(prompt.hostname(), "sw-1");
    }

    #[test]
    fn test_no_match_while_streaming() {
        let m = matcher();
        assert!(m.match_prompt(b"").is_none());
        assert!(m.match_prompt(b"router#show run\r\n").is_none());
        assert!(m.match_prompt(b"Building configuration...").is_none());
        assert!(m.match_prompt(b"\r\nPassword: ").is_none());
    }

    #[test]
    fn test_terminator_follows_last_line() {
        let m = matcher();
        // Earlier prompts in the buffer do not count, only the trailing line.
        assert!(m.match_prompt(b"router>enable\r\nrouter#").unwrap().is_privileged());
        assert!(!m.match_prompt(b"router#disable\r\nrouter>").unwrap().is_privileged());
    }

    #[test]
    fn test_window_inside_long_line_is_not_a_prompt() {
        let m = matcher_with_depth(20);
        let mut buffer = b"show run\r\n".to_vec();
        buffer.extend(std::iter::repeat_n(b'a', 40));
        buffer.push(b'#');
        assert!(m.match_prompt(&buffer).is_none());

        assert!(m.match_prompt(b"show run\r\nrouter#").is_some());
        assert!(m.match_prompt(b"a long banner line\r\nrouter#").is_some());
    }

    #[test]
    fn test_mid_line_hash_is_not_a_prompt() {
        assert!(matcher().match_prompt(b"\r\nremark see ticket #").is_none());
    }

    #[test]
    fn test_is_config_prompt() {
        let m = matcher();
        let config = m.match_prompt(b"\r\nrouter(config)#").unwrap();
        let sub = m.match_prompt(b"\r\nrouter(config-if)#").unwrap();
        let other = m.match_prompt(b"\r\nrouter(vlan)#").unwrap();
        let exec = m.match_prompt(b"\r\nrouter#").unwrap();

        assert!(m.is_config_prompt(&config));
        assert!(!m.is_config_subsection(&config));
        assert!(m.is_config_prompt(&sub));
        assert!(m.is_config_subsection(&sub));
        assert!(!m.is_config_prompt(&other));
        assert!(!m.is_config_prompt(&exec));
    }

    #[test]
    fn test_tail_window_only() {
        let m = PromptMatcher::new(
            vec![Regex::new(r"(?:\A|[\r\n])\w+# ?\z").unwrap()],
            Regex::new(r"\(config").unwrap(),
            8,
        );
        let mut data = vec![b'x'; 50];
        data.extend_from_slice(b"\nrtr#");
        assert!(m.is_match(&data));
    }
}

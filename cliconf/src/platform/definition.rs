//! Device-family profiles: every pattern and command string a session needs,
//! as swappable data.

use std::fmt;

use regex::bytes::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::channel::{ErrorClassifier, ErrorKind, PromptMatcher};
use crate::driver::{ConfigSource, FactExtractor};
use crate::error::{ProfileError, Result};

/// Uncompiled profile, as written in code or loaded from JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSpec {
    /// Device family name, e.g. `mpos`.
    pub family: String,

    /// Firmware version prefix this profile applies to. Empty for the family
    /// default.
    #[serde(default)]
    pub version: String,

    /// Constant `network_os` identifier reported in device facts.
    pub network_os: String,

    /// Prompt grammar, tried in order against the tail of output.
    pub prompt_patterns: Vec<String>,

    /// Matches a whole `<name>(config...)#` prompt.
    pub config_prompt: String,

    /// Secondary prompt answered with the enable password.
    pub password_prompt: String,

    /// Failure signatures in precedence order. Compiled case-insensitively.
    pub error_signatures: Vec<SignatureSpec>,

    pub commands: ModeCommands,

    /// Sent once when the shell opens.
    pub paging_command: String,

    /// Transaction lines equal to this are control and not dispatched.
    pub end_marker: String,

    /// Transaction lines starting with this are comments.
    pub comment_marker: String,

    pub facts: FactRules,

    pub config_commands: ConfigCommands,
}

/// One labelled failure signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureSpec {
    pub kind: ErrorKind,
    pub pattern: String,
}

impl SignatureSpec {
    pub fn new(kind: ErrorKind, pattern: impl Into<String>) -> Self {
        Self {
            kind,
            pattern: pattern.into(),
        }
    }
}

/// Commands that move the session between privilege states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeCommands {
    pub enable: String,
    pub disable: String,
    pub configure: String,
    pub end: String,
    pub exit: String,
}

/// How device facts are queried and parsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactRules {
    pub version_command: String,
    pub hostname_command: String,
    /// Capture group 1 is the version token.
    pub version_pattern: String,
    /// Capture group 1 is the model.
    pub model_pattern: String,
    /// Literal prefix of the hostname query's output.
    pub hostname_prefix: String,
}

/// Commands that print a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigCommands {
    pub running: String,
    pub startup: String,
}

impl ConfigCommands {
    pub fn for_source(&self, source: ConfigSource) -> &str {
        match source {
            ConfigSource::Running => &self.running,
            ConfigSource::Startup => &self.startup,
        }
    }
}

/// A compiled [`ProfileSpec`].
///
/// Cheap to share behind an `Arc`; matchers and classifiers handed out to
/// sessions are clones of the compiled tables.
#[derive(Clone)]
pub struct TerminalProfile {
    spec: ProfileSpec,
    prompt_patterns: Vec<Regex>,
    config_prompt: Regex,
    password_prompt: Regex,
    signatures: Vec<(ErrorKind, Regex)>,
    version_pattern: regex::Regex,
    model_pattern: regex::Regex,
}

impl TerminalProfile {
    /// Compile every pattern in `spec`.
    ///
    /// # Errors
    ///
    /// `ProfileError::InvalidPattern` naming the offending field.
    pub fn from_spec(spec: ProfileSpec) -> Result<Self> {
        let prompt_patterns = spec
            .prompt_patterns
            .iter()
            .enumerate()
            .map(|(i, p)| compile(&format!("prompt_patterns[{i}]"), p))
            .collect::<Result<Vec<_>>>()?;

        let signatures = spec
            .error_signatures
            .iter()
            .enumerate()
            .map(|(i, sig)| {
                RegexBuilder::new(&sig.pattern)
                    .case_insensitive(true)
                    .build()
                    .map(|re| (sig.kind, re))
                    .map_err(|source| invalid(&format!("error_signatures[{i}]"), source))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            config_prompt: compile("config_prompt", &spec.config_prompt)?,
            password_prompt: compile("password_prompt", &spec.password_prompt)?,
            version_pattern: regex::Regex::new(&spec.facts.version_pattern)
                .map_err(|e| invalid("facts.version_pattern", e))?,
            model_pattern: regex::Regex::new(&spec.facts.model_pattern)
                .map_err(|e| invalid("facts.model_pattern", e))?,
            prompt_patterns,
            signatures,
            spec,
        })
    }

    pub fn spec(&self) -> &ProfileSpec {
        &self.spec
    }

    pub fn family(&self) -> &str {
        &self.spec.family
    }

    pub fn version(&self) -> &str {
        &self.spec.version
    }

    pub fn network_os(&self) -> &str {
        &self.spec.network_os
    }

    pub fn prompt_matcher(&self, search_depth: usize) -> PromptMatcher {
        PromptMatcher::new(
            self.prompt_patterns.clone(),
            self.config_prompt.clone(),
            search_depth,
        )
    }

    pub fn error_classifier(&self) -> ErrorClassifier {
        ErrorClassifier::new(self.signatures.clone())
    }

    pub fn fact_extractor(&self) -> FactExtractor {
        let facts = &self.spec.facts;
        FactExtractor::new(
            self.spec.network_os.as_str(),
            facts.version_command.as_str(),
            facts.hostname_command.as_str(),
            self.version_pattern.clone(),
            self.model_pattern.clone(),
            facts.hostname_prefix.as_str(),
        )
    }

    pub fn password_prompt(&self) -> &Regex {
        &self.password_prompt
    }

    pub fn commands(&self) -> &ModeCommands {
        &self.spec.commands
    }

    pub fn paging_command(&self) -> &str {
        &self.spec.paging_command
    }

    pub fn end_marker(&self) -> &str {
        &self.spec.end_marker
    }

    pub fn comment_marker(&self) -> &str {
        &self.spec.comment_marker
    }

    pub fn config_commands(&self) -> &ConfigCommands {
        &self.spec.config_commands
    }
}

impl fmt::Debug for TerminalProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalProfile")
            .field("family", &self.spec.family)
            .field("version", &self.spec.version)
            .field("prompt_patterns", &self.prompt_patterns.len())
            .field("signatures", &self.signatures.len())
            .finish()
    }
}

fn compile(field: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|source| invalid(field, source))
}

fn invalid(field: &str, source: regex::Error) -> crate::Error {
    ProfileError::InvalidPattern {
        field: field.to_string(),
        source,
    }
    .into()
}

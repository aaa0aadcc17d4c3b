//! Session timing and buffering configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for command execution on one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Deadline for a settled prompt after sending a command, in seconds
    /// when deserialized.
    #[serde(with = "duration_secs")]
    pub timeout: Duration,

    /// Search depth for prompt matching, in bytes from the end of output.
    pub search_depth: usize,

    /// Appended to each command unless the command disables it.
    pub line_ending: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
            line_ending: "\n".to_string(),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

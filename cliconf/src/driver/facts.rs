//! Device facts parsed from free-text command output.

use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::executor::CommandExecutor;
use crate::error::Result;
use crate::transport::Transport;

/// Placeholder for a field the device output did not carry.
pub const NOT_AVAILABLE: &str = "NA";

/// Structured device identity.
///
/// Only `network_os` is always set. The other fields stay unset when the
/// version query returned nothing, and are then omitted when serialized.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub network_os: String,

    #[serde(
        rename = "network_os_version",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub version: Option<String>,

    #[serde(
        rename = "network_os_model",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub model: Option<String>,

    #[serde(
        rename = "network_os_hostname",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub hostname: Option<String>,
}

impl DeviceInfo {
    pub fn new(network_os: impl Into<String>) -> Self {
        Self {
            network_os: network_os.into(),
            ..Default::default()
        }
    }
}

/// Line-oriented fact parser for one device family.
///
/// Parsing never fails: a miss yields [`NOT_AVAILABLE`].
#[derive(Debug, Clone)]
pub struct FactExtractor {
    network_os: String,
    version_command: String,
    hostname_command: String,
    version_pattern: Regex,
    model_pattern: Regex,
    hostname_prefix: String,
}

impl FactExtractor {
    /// `version_pattern` and `model_pattern` are matched against each
    /// trimmed line; capture group 1 is the value.
    pub fn new(
        network_os: impl Into<String>,
        version_command: impl Into<String>,
        hostname_command: impl Into<String>,
        version_pattern: Regex,
        model_pattern: Regex,
        hostname_prefix: impl Into<String>,
    ) -> Self {
        Self {
            network_os: network_os.into(),
            version_command: version_command.into(),
            hostname_command: hostname_command.into(),
            version_pattern,
            model_pattern,
            hostname_prefix: hostname_prefix.into(),
        }
    }

    pub fn network_os(&self) -> &str {
        &self.network_os
    }

    pub fn extract_version(&self, text: &str) -> String {
        first_capture(&self.version_pattern, text)
    }

    pub fn extract_model(&self, text: &str) -> String {
        first_capture(&self.model_pattern, text)
    }

    /// Strip the literal hostname banner prefix, if present, and trim.
    pub fn extract_hostname(&self, text: &str) -> String {
        let text = text.trim();
        text.strip_prefix(self.hostname_prefix.as_str())
            .unwrap_or(text)
            .trim()
            .to_string()
    }

    /// Query version and hostname and assemble a fresh [`DeviceInfo`].
    pub async fn get_device_info<T: Transport>(
        &self,
        executor: &mut CommandExecutor<T>,
    ) -> Result<DeviceInfo> {
        let mut info = DeviceInfo::new(self.network_os.as_str());

        let version = executor.run(&self.version_command).await?;
        let hostname = executor.run(&self.hostname_command).await?;

        let data = version.result.trim();
        if data.is_empty() {
            debug!("'{}' returned no output", self.version_command);
            return Ok(info);
        }

        info.version = Some(self.extract_version(data));
        info.model = Some(self.extract_model(data));
        info.hostname = Some(self.extract_hostname(&hostname.result));
        Ok(info)
    }
}

fn first_capture(pattern: &Regex, text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find_map(|line| pattern.captures(line))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio_test::assert_ok;

    use super::*;
    use crate::driver::SessionConfig;
    use crate::events::NullSink;
    use crate::platform::vendors::mpos;
    use crate::transport::mock::MockTransport;

    const SHOW_VERSION: &str = "\
Maipu Operating System Software\r
Software Version : 9.1.2(integrity)\r
Hardware Model    :  MP1800-10\r
Uptime is 0 days 2 hours\r
";

    fn extractor() -> FactExtractor {
        mpos::profile().fact_extractor()
    }

    #[test]
    fn test_extract_version() {
        let facts = extractor();
        assert_eq!(facts.extract_version("Software Version   :   9.1.2\n"), "9.1.2");
        assert_eq!(facts.extract_version("software version: 9.2.0\n"), "9.2.0");
        assert_eq!(facts.extract_version(SHOW_VERSION), "9.1.2(integrity)");
        assert_eq!(facts.extract_version("no such field"), "NA");
    }

    #[test]
    fn test_extract_model() {
        let facts = extractor();
        assert_eq!(facts.extract_model(SHOW_VERSION), "MP1800-10");
        assert_eq!(facts.extract_model("Hardware Model\tMP2900 Series"), "MP2900 Series");
        assert_eq!(facts.extract_model("Hardware Model"), "NA");
        assert_eq!(facts.extract_model("no such field"), "NA");
    }

    #[test]
    fn test_extract_hostname() {
        let facts = extractor();
        assert_eq!(facts.extract_hostname("Local hostname my-router\n"), "my-router");
        // No prefix: trimmed only
        assert_eq!(facts.extract_hostname("  core-1 \r\n"), "core-1");
    }

    #[test]
    fn test_device_info_serialization() {
        let info = DeviceInfo {
            network_os: "mpos".to_string(),
            version: Some("9.1.2".to_string()),
            model: Some("NA".to_string()),
            hostname: Some("r1".to_string()),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["network_os"], "mpos");
        assert_eq!(json["network_os_version"], "9.1.2");
        assert_eq!(json["network_os_model"], "NA");
        assert_eq!(json["network_os_hostname"], "r1");

        let bare = serde_json::to_string(&DeviceInfo::new("mpos")).unwrap();
        assert_eq!(bare, r#"{"network_os":"mpos"}"#);
    }

    fn executor(transport: MockTransport) -> CommandExecutor<MockTransport> {
        let profile = mpos::profile();
        let config = SessionConfig::default();
        CommandExecutor::new(
            transport,
            profile.prompt_matcher(config.search_depth),
            profile.error_classifier(),
            config,
            Arc::new(NullSink),
        )
    }

    #[tokio::test]
    async fn test_get_device_info() {
        let transport = MockTransport::with_prompt("r1#")
            .respond("show version", SHOW_VERSION, "r1#")
            .respond("show hostname", "Local hostname r1\r\n", "r1#");
        let mut exec = executor(transport);

        let info = assert_ok!(extractor().get_device_info(&mut exec).await);
        assert_eq!(info.network_os, "mpos");
        assert_eq!(info.version.as_deref(), Some("9.1.2(integrity)"));
        assert_eq!(info.model.as_deref(), Some("MP1800-10"));
        assert_eq!(info.hostname.as_deref(), Some("r1"));
    }

    #[tokio::test]
    async fn test_get_device_info_empty_version() {
        let transport = MockTransport::with_prompt("r1#")
            .respond("show version", "", "r1#")
            .respond("show hostname", "Local hostname r1\r\n", "r1#");
        let handle = transport.clone();
        let mut exec = executor(transport);

        let info = assert_ok!(extractor().get_device_info(&mut exec).await);
        assert_eq!(info, DeviceInfo::new("mpos"));
        assert_eq!(handle.sent(), vec!["show version", "show hostname"]);
    }
}

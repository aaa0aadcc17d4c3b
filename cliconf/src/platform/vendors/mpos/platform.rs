//! Maipu MPOS profile.
//!
//! MPOS uses an IOS-like CLI:
//! - `router>` user exec, `router#` privileged exec
//! - `router(config)#` global configuration, `router(config-if)#` and
//!   friends for nested contexts
//! - `enable` / `disable`, `configure terminal` / `end`
//! - `show hostname` prints `Local hostname <name>`

use crate::channel::ErrorKind;
use crate::platform::{
    ConfigCommands, FactRules, ModeCommands, ProfileSpec, SignatureSpec, TerminalProfile,
};

pub const FAMILY: &str = "mpos";

/// The uncompiled MPOS profile.
pub fn spec() -> ProfileSpec {
    ProfileSpec {
        family: FAMILY.to_string(),
        version: String::new(),
        network_os: FAMILY.to_string(),
        // Hostname-like token, up to three context groups, `>` or `#`,
        // alone on the last line.
        prompt_patterns: vec![
            r"(?:\A|[\r\n])[\w+\-.:/\[\]]+(?:\([^)\r\n]+\)){0,3}[>#] ?\z".to_string(),
        ],
        config_prompt: r"^.+\(config(-.*)?\)#$".to_string(),
        password_prompt: r"(?i)[\r\n]?.*password: ?$".to_string(),
        error_signatures: vec![
            SignatureSpec::new(ErrorKind::Generic, r"% ?Error"),
            SignatureSpec::new(
                ErrorKind::Authentication,
                r"Bad passwords|Login invalid|No password set",
            ),
            SignatureSpec::new(
                ErrorKind::Connectivity,
                r"Connection refused|No route to host|Connection closed",
            ),
            SignatureSpec::new(ErrorKind::AccountLocked, r"locked by login-secure service"),
            SignatureSpec::new(
                ErrorKind::CommandRejected,
                r"Invalid input detected at|Unknown command",
            ),
        ],
        commands: ModeCommands {
            enable: "enable".to_string(),
            disable: "disable".to_string(),
            configure: "configure terminal".to_string(),
            end: "end".to_string(),
            exit: "exit".to_string(),
        },
        paging_command: "more off".to_string(),
        end_marker: "end".to_string(),
        comment_marker: "!".to_string(),
        facts: FactRules {
            version_command: "show version".to_string(),
            hostname_command: "show hostname".to_string(),
            version_pattern: r"(?i)^Software Version\s*:\s*(\S+)".to_string(),
            model_pattern: r"(?i)^Hardware Model\s*:?\s*(\S.*?)\s*$".to_string(),
            hostname_prefix: "Local hostname ".to_string(),
        },
        config_commands: ConfigCommands {
            running: "show running-config".to_string(),
            startup: "show startup-config".to_string(),
        },
    }
}

/// The compiled MPOS profile.
pub fn profile() -> TerminalProfile {
    TerminalProfile::from_spec(spec()).expect("built-in MPOS profile compiles")
}

//! Maipu MPOS example
//!
//! Connects to an MPOS device, reads its facts and running configuration,
//! and optionally applies a small configuration change-set.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example mpos_device -- --host r1 --user admin --password secret
//! ```
//!
//! Escalate with an enable password and set an interface description:
//! ```bash
//! cargo run --example mpos_device -- --host r1 --user admin --password secret \
//!     --enable-secret s3cret --describe eth0 "uplink to core"
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use cliconf::transport::HostKeyVerification;
use cliconf::{Cliconf, Command, SessionBuilder, TerminalHooks};
use secrecy::SecretString;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    println!("=== cliconf MPOS Example ===\n");
    println!("Connecting to {}:{}...", args.host, args.port);

    let mut builder = SessionBuilder::new(&args.host)
        .port(args.port)
        .username(&args.user)
        .timeout(Duration::from_secs(args.timeout))
        .connect_timeout(Duration::from_secs(args.timeout))
        .host_key_verification(HostKeyVerification::Disabled);

    if let Some(password) = &args.password {
        builder = builder.password(password);
    } else if let Some(key_path) = &args.key {
        builder = builder.private_key(key_path);
    } else {
        eprintln!("Error: Must provide either --password or --key");
        std::process::exit(1);
    }
    if let Some(secret) = &args.enable_secret {
        builder = builder.enable_secret(secret);
    }

    let mut device = builder.connect().await?;
    println!("Connected!\n");

    if let Some(prompt) = device.session().prompt() {
        println!("Prompt: {} ({})\n", prompt, device.session().state()?);
    }

    // --- Facts ---
    println!("--- Device Info ---\n");
    let info = device.get_device_info().await?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    println!();

    // --- Privileged ---
    let secret = args.enable_secret.clone().map(SecretString::from);
    device.on_become(secret.as_ref()).await?;

    println!("--- Running Configuration ---\n");
    let config = device.get_config("running").await?;
    let lines: Vec<&str> = config.lines().take(20).collect();
    println!("{}", lines.join("\n"));
    if config.lines().count() > 20 {
        println!("... (truncated)");
    }
    println!();

    // --- Change-set ---
    if let Some((interface, description)) = &args.describe {
        println!("--- Edit Config ---\n");
        let candidate = vec![
            Command::from(format!("interface {}", interface)),
            Command::from(format!("description {}", description)),
            Command::from("end"),
        ];
        match device.edit_config(candidate, true).await {
            Ok(result) => {
                for (request, response) in result.request.iter().zip(&result.response) {
                    println!("> {} ({:?})", request, response.elapsed);
                }
            }
            Err(e) => eprintln!("Change-set aborted: {}", e),
        }
        println!();
    }

    // --- Capabilities ---
    println!("--- Capabilities ---\n");
    println!("{}", device.get_capabilities().await?);

    // Clean up
    println!("\n--- Cleanup ---\n");
    device.on_unbecome().await?;
    device.into_transport().close().await?;
    println!("Done!");

    Ok(())
}

/// Simple argument parser
struct Args {
    host: String,
    port: u16,
    user: String,
    password: Option<String>,
    key: Option<PathBuf>,
    enable_secret: Option<String>,
    timeout: u64,
    describe: Option<(String, String)>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut parsed = Self {
            host: "localhost".to_string(),
            port: 22,
            user: env::var("USER").unwrap_or_else(|_| "admin".to_string()),
            password: None,
            key: None,
            enable_secret: None,
            timeout: 30,
            describe: None,
        };

        let mut i = 1;
        while i < args.len() {
            let value = args.get(i + 1).cloned();
            match args[i].as_str() {
                "--host" | "-h" => parsed.host = value.unwrap_or(parsed.host),
                "--port" | "-p" => {
                    parsed.port = value.and_then(|v| v.parse().ok()).unwrap_or(22);
                }
                "--user" | "-u" => parsed.user = value.unwrap_or(parsed.user),
                "--password" | "-P" => parsed.password = value,
                "--key" | "-k" => parsed.key = value.map(PathBuf::from),
                "--enable-secret" | "-e" => parsed.enable_secret = value,
                "--timeout" | "-t" => {
                    parsed.timeout = value.and_then(|v| v.parse().ok()).unwrap_or(30);
                }
                "--describe" | "-d" => {
                    parsed.describe = value.zip(args.get(i + 2).cloned());
                    i += 1;
                }
                "--help" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {
                    i += 1;
                    continue;
                }
            }
            i += 2;
        }

        parsed
    }

    fn print_help() {
        println!(
            r#"cliconf MPOS example

Reads facts and configuration from a Maipu MPOS device.

USAGE:
    cargo run --example mpos_device -- [OPTIONS]

OPTIONS:
    -h, --host <HOST>             Target host [default: localhost]
    -p, --port <PORT>             SSH port [default: 22]
    -u, --user <USER>             Username [default: $USER]
    -P, --password <PASS>         Password for authentication
    -k, --key <PATH>              Path to SSH private key
    -e, --enable-secret <PASS>    Password for enable
    -t, --timeout <SECS>          Command and connect timeout [default: 30]
    -d, --describe <IF> <TEXT>    Set an interface description
    --help                        Print this help message
"#
        );
    }
}

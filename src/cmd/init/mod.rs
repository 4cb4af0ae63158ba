//! `shadowtee init`: generate a starter configuration file.
//!
//! Builds a sample [`Config`] with one primary and one secondary and
//! writes it in the requested format. Existing files are never
//! overwritten.

mod serialize;

use std::path::PathBuf;

use crate::cli::{ConfigFormat, InitArgs};
use crate::config::model::{BackendConfig, Config};
use crate::error::ShadowteeError;

pub fn execute(args: &InitArgs) -> Result<(), ShadowteeError> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(format!("shadowtee.{}", args.format.extension())));

    if output.exists() {
        return Err(ShadowteeError::FileExists { path: output });
    }

    let content = render(&starter_config(), &args.format)?;
    std::fs::write(&output, content)?;
    println!("Created {}", output.display());
    Ok(())
}

fn starter_config() -> Config {
    let mut config = Config::with_primary("http://localhost:8080");
    config.secondaries.push(BackendConfig {
        timeout: Some(1000),
        ..BackendConfig::new("http://localhost:8081")
    });
    config.mirror.methods = Some("GET|HEAD".into());
    config
}

fn render(config: &Config, format: &ConfigFormat) -> Result<String, ShadowteeError> {
    let body = serialize::serialize_config(config, format)?;
    Ok(match format {
        ConfigFormat::Json => body,
        ConfigFormat::Yaml | ConfigFormat::Toml => format!("{HEADER}{body}"),
    })
}

const HEADER: &str = "\
# shadowtee config
#
# The primary answers clients. Secondaries receive copies of the same
# requests and their responses are discarded.
#
# Optional keys and their defaults:
#   mirror.percent: 100            share of requests mirrored (0-100)
#   mirror.methods: unset          e.g. \"GET|POST\", unset mirrors all
#   defaults.primary_timeout: 3000
#   defaults.secondary_timeout: 1000
#   defaults.forward_client_ip: false
#   defaults.close_connections: false
#   primary.rewrite_host: false    send the backend's host:port as Host
#   debug: false                   log failed secondary requests

";

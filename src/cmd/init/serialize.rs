//! Serialize a [`Config`] struct to the chosen output format.

use crate::cli::ConfigFormat;
use crate::config::model::Config;
use crate::error::ShadowteeError;

fn encode_error(e: impl std::fmt::Display) -> ShadowteeError {
    ShadowteeError::Io(std::io::Error::other(e.to_string()))
}

/// Serialize a `Config` to a formatted string in the given format.
pub fn serialize_config(config: &Config, format: &ConfigFormat) -> Result<String, ShadowteeError> {
    match format {
        #[cfg(feature = "yaml")]
        ConfigFormat::Yaml => serde_yml::to_string(config).map_err(encode_error),

        #[cfg(not(feature = "yaml"))]
        ConfigFormat::Yaml => Err(ShadowteeError::UnsupportedFormat("yaml".into())),

        ConfigFormat::Json => serde_json::to_string_pretty(config)
            .map(|mut s| {
                s.push('\n');
                s
            })
            .map_err(encode_error),

        #[cfg(feature = "toml")]
        ConfigFormat::Toml => toml::to_string_pretty(config).map_err(encode_error),

        #[cfg(not(feature = "toml"))]
        ConfigFormat::Toml => Err(ShadowteeError::UnsupportedFormat("toml".into())),
    }
}

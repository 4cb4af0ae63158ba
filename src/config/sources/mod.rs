//! Concrete config file sources.
//!
//! [`yaml`], [`json`] and [`toml`] build a [`FileSource`] with the
//! matching deserializer, each gated by its feature flag.
//! [`parse_config_str`] parses in-memory content for `validate`.

pub mod file_source;

use std::path::PathBuf;

use crate::config::model::Config;
use crate::error::ShadowteeError;
use file_source::FileSource;

#[cfg(feature = "yaml")]
#[must_use]
pub fn yaml(path: PathBuf) -> FileSource {
    FileSource::new(path, "yaml", |content| Ok(serde_yml::from_str(content)?))
}

#[cfg(feature = "json")]
#[must_use]
pub fn json(path: PathBuf) -> FileSource {
    FileSource::new(path, "json", |content| Ok(serde_json::from_str(content)?))
}

#[cfg(feature = "toml")]
#[must_use]
pub fn toml(path: PathBuf) -> FileSource {
    FileSource::new(path, "toml", |content| Ok(::toml::from_str(content)?))
}

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, ShadowteeError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| ShadowteeError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| ShadowteeError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => ::toml::from_str(content).map_err(|e| ShadowteeError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(ShadowteeError::UnsupportedFormat(other.to_string())),
    }
}

//! Configuration loading and validation.
//!
//! Submodules provide the data model ([`model`]), validation logic
//! ([`validation`]) and the file-format sources ([`sources`]). The
//! resolved config is read once at startup and never changes afterwards.

pub mod model;
pub mod sources;
pub mod validation;

use std::path::{Path, PathBuf};

use crate::error::ShadowteeError;
use model::Config;
use sources::file_source::FileSource;

/// File names looked up in the working directory when no `--config` is given.
pub const AUTO_DETECT_CANDIDATES: &[&str] = &[
    "shadowtee.yaml",
    "shadowtee.yml",
    "shadowtee.json",
    "shadowtee.toml",
];

/// Pick the file source for `path` based on its extension.
pub fn file_source(path: &Path) -> Result<FileSource, ShadowteeError> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");

    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => Ok(sources::yaml(path.to_path_buf())),

        #[cfg(feature = "json")]
        "json" => Ok(sources::json(path.to_path_buf())),

        #[cfg(feature = "toml")]
        "toml" => Ok(sources::toml(path.to_path_buf())),

        other => Err(ShadowteeError::UnsupportedFormat(other.to_string())),
    }
}

/// Find a config file: the explicit path if given, else the first
/// auto-detect candidate present in `dir`.
pub async fn locate(explicit: Option<&Path>, dir: &Path) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    for name in AUTO_DETECT_CANDIDATES {
        let path = dir.join(name);
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::info!(path = %path.display(), "auto-detected config file");
            return Some(path);
        }
    }

    None
}

/// Load the config file at `path`. The result is not validated yet.
pub async fn load_file(path: &Path) -> Result<Config, ShadowteeError> {
    file_source(path)?.load().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_extension_is_unsupported() {
        let err = file_source(Path::new("shadowtee.ini")).unwrap_err();
        assert!(matches!(err, ShadowteeError::UnsupportedFormat(ref e) if e == "ini"));
    }

    #[tokio::test]
    async fn explicit_path_wins_over_detection() {
        let found = locate(Some(Path::new("/etc/custom.yaml")), Path::new("/nonexistent")).await;
        assert_eq!(found, Some(PathBuf::from("/etc/custom.yaml")));
    }

    #[tokio::test]
    async fn nothing_detected_in_empty_dir() {
        let dir = std::env::temp_dir().join(format!("shadowtee-locate-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        assert_eq!(locate(None, &dir).await, None);
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}

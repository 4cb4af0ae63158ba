//! Generic async file-based config source.
//!
//! [`FileSource`] accepts a deserialization function at construction
//! time and reads the file asynchronously via Tokio. Validation happens
//! later, once command-line overrides have been applied.

use std::path::PathBuf;

use crate::config::model::Config;
use crate::error::ShadowteeError;

type Deserialize = fn(&str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: Deserialize,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, deserialize: Deserialize) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    async fn read_content(&self) -> Result<String, ShadowteeError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ShadowteeError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                ShadowteeError::Io(e)
            }
        })
    }

    pub async fn load(&self) -> Result<Config, ShadowteeError> {
        let content = self.read_content().await?;

        (self.deserialize)(&content).map_err(|e| ShadowteeError::ConfigParse {
            path: self.path.display().to_string(),
            source: e,
        })
    }
}

#[cfg(all(test, feature = "yaml"))]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("shadowtee-{}-{name}", std::process::id()))
    }

    #[tokio::test]
    async fn loads_yaml() {
        let path = temp_path("ok.yaml");
        tokio::fs::write(
            &path,
            "primary:\n  url: \"http://localhost:8080\"\nsecondaries:\n  - url: \"localhost:8081\"\n",
        )
        .await
        .unwrap();

        let source = crate::config::sources::yaml(path.clone());
        let config = source.load().await.unwrap();
        assert_eq!(source.name(), "yaml");
        assert_eq!(config.secondaries.len(), 1);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn missing_file_is_reported() {
        let source = crate::config::sources::yaml(temp_path("missing.yaml"));
        let err = source.load().await.unwrap_err();
        assert!(matches!(err, ShadowteeError::ConfigFileNotFound { .. }));
    }

    #[tokio::test]
    async fn invalid_values_load_unvalidated() {
        let path = temp_path("bad.yaml");
        tokio::fs::write(&path, "primary:\n  url: \"ftp://localhost:21\"\n")
            .await
            .unwrap();

        let config = crate::config::sources::yaml(path.clone())
            .load()
            .await
            .unwrap();
        assert_eq!(config.primary.url, "ftp://localhost:21");
        assert!(crate::config::validation::validate(&config).is_err());

        let _ = tokio::fs::remove_file(&path).await;
    }
}

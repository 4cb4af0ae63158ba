//! Unified error types for shadowtee.
//!
//! Defines [`ShadowteeError`] (startup, config and CLI failures) and
//! [`ValidationError`] for config validation failures. Both use
//! `thiserror` for `Display` and `Error` derives. Error messages
//! include contextual hints to guide the user toward a fix. Failures of
//! individual outbound requests live in
//! [`DispatchError`](crate::proxy::dispatch::DispatchError).

use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub section: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "  {}: {}: {}", self.section, self.field, self.message)?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " ({suggestion})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

fn format_errors(errors: &[ValidationError]) -> String {
    use std::fmt::Write;
    let mut buf = String::new();
    for (i, e) in errors.iter().enumerate() {
        if i > 0 {
            buf.push('\n');
        }
        // write! to String is infallible (only fails on OOM which is unrecoverable)
        let _ = write!(buf, "{e}");
    }
    buf
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ShadowteeError {
    #[error("No config source found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error("Config file not found: {}", path.display())]
    ConfigFileNotFound { path: PathBuf },

    #[error("Config parse error in {path}:\n  {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Config validation failed:\n{}", format_errors(.errors))]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Invalid address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Invalid backend '{url}': {message}")]
    InvalidBackend { url: String, message: String },

    #[error("Invalid method pattern '{pattern}': {source}")]
    MethodPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("Failed to load TLS certificate {} and key {}: {source}", cert.display(), key.display())]
    Tls {
        cert: PathBuf,
        key: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {}", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_render_one_per_line() {
        let err = ShadowteeError::ConfigValidation {
            errors: vec![
                ValidationError {
                    section: "primary".into(),
                    field: "url".into(),
                    message: "bad".into(),
                    suggestion: None,
                },
                ValidationError {
                    section: "mirror".into(),
                    field: "percent".into(),
                    message: "out of range".into(),
                    suggestion: Some("use 0 to 100".into()),
                },
            ],
        };

        let rendered = err.to_string();
        assert!(rendered.contains("  primary: url: bad\n"));
        assert!(rendered.ends_with("  mirror: percent: out of range (use 0 to 100)"));
    }
}

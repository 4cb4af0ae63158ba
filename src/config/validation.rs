//! Configuration validation with detailed error reporting.
//!
//! The [`validate`] function checks a parsed [`Config`] for malformed
//! backend addresses, zero timeouts, an out-of-range mirror percentage
//! and a method pattern that does not compile. Returns every
//! [`ValidationError`] found, each with an optional suggestion.

use super::model::{BackendConfig, Config};
use crate::error::ValidationError;
use crate::proxy::filter::MethodFilter;
use crate::proxy::target::parse_backend_url;

/// Validate a single backend address. Returns `Ok(())` or a human-readable error.
pub fn validate_backend_url(url: &str) -> Result<(), String> {
    parse_backend_url(url).map(|_| ())
}

/// Validate the mirror percentage. Returns `Ok(())` or a human-readable error.
pub fn validate_percent(percent: f64) -> Result<(), String> {
    if percent.is_finite() && (0.0..=100.0).contains(&percent) {
        Ok(())
    } else {
        Err(format!("{percent} is outside 0.0 to 100.0"))
    }
}

fn validate_backend(section: &str, backend: &BackendConfig, errors: &mut Vec<ValidationError>) {
    if let Err(msg) = validate_backend_url(&backend.url) {
        let suggestion = backend
            .url
            .split_once("://")
            .and_then(|(_, rest)| rest.split_once('/'))
            .map(|(authority, _)| format!("did you mean '{authority}'?"));
        errors.push(ValidationError {
            section: section.to_string(),
            field: "url".into(),
            message: msg,
            suggestion,
        });
    }

    if backend.timeout == Some(0) {
        errors.push(ValidationError {
            section: section.to_string(),
            field: "timeout".into(),
            message: "timeout must be greater than 0".into(),
            suggestion: None,
        });
    }
}

pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_backend("primary", &config.primary, &mut errors);

    for (i, secondary) in config.secondaries.iter().enumerate() {
        validate_backend(&format!("secondaries[{i}]"), secondary, &mut errors);
    }

    if let Err(msg) = validate_percent(config.mirror.percent) {
        errors.push(ValidationError {
            section: "mirror".into(),
            field: "percent".into(),
            message: msg,
            suggestion: Some("use 100 to mirror everything, 0 to mirror nothing".into()),
        });
    }

    if let Err(e) = MethodFilter::new(config.mirror.methods.as_deref()) {
        errors.push(ValidationError {
            section: "mirror".into(),
            field: "methods".into(),
            message: e.to_string(),
            suggestion: Some("separate methods with '|', e.g. 'GET|POST'".into()),
        });
    }

    for (field, value) in [
        ("primary_timeout", config.defaults.primary_timeout),
        ("secondary_timeout", config.defaults.secondary_timeout),
    ] {
        if value == 0 {
            errors.push(ValidationError {
                section: "defaults".into(),
                field: field.into(),
                message: "timeout must be greater than 0".into(),
                suggestion: None,
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[must_use]
pub fn format_validation_report(path: &str, config: &Config) -> String {
    let mut lines = vec![format!(
        "  1 primary, {} secondaries\n",
        config.secondaries.len()
    )];

    lines.push(format!(
        "  primary    {}  timeout {}ms{}",
        config.primary.url,
        config.primary_timeout(),
        if config.primary.rewrite_host {
            ", rewrite host"
        } else {
            ""
        }
    ));
    for secondary in &config.secondaries {
        lines.push(format!(
            "  secondary  {}  timeout {}ms{}",
            secondary.url,
            config.secondary_timeout(secondary),
            if secondary.rewrite_host {
                ", rewrite host"
            } else {
                ""
            }
        ));
    }
    lines.push(format!(
        "  mirroring  {}% of {}",
        config.mirror.percent,
        config.mirror.methods.as_deref().unwrap_or("all methods")
    ));

    format!("{} is valid\n{}", path, lines.join("\n"))
}

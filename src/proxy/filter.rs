//! Method eligibility for secondary mirroring.

use regex::Regex;

use crate::error::ShadowteeError;

/// Restricts which HTTP methods are mirrored. Primaries ignore it.
#[derive(Debug, Clone, Default)]
pub struct MethodFilter {
    pattern: Option<Regex>,
}

impl MethodFilter {
    /// Compile `pattern` (e.g. `GET|POST`), matched against the whole method name.
    pub fn new(pattern: Option<&str>) -> Result<Self, ShadowteeError> {
        let pattern = pattern
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| {
                Regex::new(&format!("^(?:{p})$")).map_err(|source| ShadowteeError::MethodPattern {
                    pattern: p.to_string(),
                    source,
                })
            })
            .transpose()?;
        Ok(Self { pattern })
    }

    #[must_use]
    pub fn eligible(&self, method: &str) -> bool {
        self.pattern.as_ref().map_or(true, |re| re.is_match(method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_pattern_allows_everything() {
        let filter = MethodFilter::new(None).unwrap();
        assert!(filter.eligible("GET"));
        assert!(filter.eligible("DELETE"));
        assert!(filter.eligible("PROPFIND"));
    }

    #[test]
    fn blank_pattern_allows_everything() {
        assert!(MethodFilter::new(Some("  ")).unwrap().eligible("PATCH"));
    }

    #[test]
    fn alternation_pattern() {
        let filter = MethodFilter::new(Some("GET|POST")).unwrap();
        assert!(filter.eligible("GET"));
        assert!(filter.eligible("POST"));
        assert!(!filter.eligible("DELETE"));
        assert!(!filter.eligible("PUT"));
    }

    #[test]
    fn pattern_must_cover_whole_method() {
        let filter = MethodFilter::new(Some("GET")).unwrap();
        assert!(!filter.eligible("GETX"));
        assert!(!filter.eligible("FORGET"));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let err = MethodFilter::new(Some("GET|(")).unwrap_err();
        assert!(err.to_string().contains("GET|("));
    }
}

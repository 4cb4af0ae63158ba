//! Backend addressing and per-clone target resolution.
//!
//! A [`Backend`] is the immutable, startup-resolved form of a
//! [`BackendConfig`]: scheme, `host:port`, timeout and the host-rewrite
//! flag. [`resolve`] points a [`RequestClone`] at one backend.

use std::fmt;
use std::time::Duration;

use axum::http::header::HOST;
use axum::http::{HeaderValue, Uri};

use super::clone::RequestClone;
use crate::config::model::BackendConfig;
use crate::error::ShadowteeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Https => "https",
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub scheme: Scheme,
    pub host_port: String,
    pub timeout: Duration,
    pub rewrite_host: bool,
}

impl Backend {
    pub fn from_config(config: &BackendConfig, timeout_ms: u64) -> Result<Self, ShadowteeError> {
        let (scheme, host_port) =
            parse_backend_url(&config.url).map_err(|message| ShadowteeError::InvalidBackend {
                url: config.url.clone(),
                message,
            })?;

        Ok(Self {
            scheme,
            host_port,
            timeout: Duration::from_millis(timeout_ms),
            rewrite_host: config.rewrite_host,
        })
    }

    /// `scheme://host:port`, used for log attribution.
    #[must_use]
    pub fn origin(&self) -> String {
        format!("{}://{}", self.scheme, self.host_port)
    }
}

/// Split a backend address into scheme and `host[:port]`.
///
/// Accepts `http://host:port`, `https://host` and bare `host:port`.
/// Anything past the authority other than a lone `/` is rejected.
pub fn parse_backend_url(raw: &str) -> Result<(Scheme, String), String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("address cannot be empty".into());
    }

    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };

    let parsed = url::Url::parse(&with_scheme).map_err(|e| format!("not a valid address ({e})"))?;

    let scheme = match parsed.scheme() {
        "http" => Scheme::Http,
        "https" => Scheme::Https,
        other => return Err(format!("unsupported scheme '{other}' (expected http or https)")),
    };

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| "missing host".to_string())?;

    if parsed.path() != "/" || parsed.query().is_some() || parsed.fragment().is_some() {
        return Err("must not contain a path, query or fragment".into());
    }

    // `Url` drops the port when it is the scheme default; keep what was written.
    let host_port = match parsed.port() {
        Some(port) => format!("{host}:{port}"),
        None if has_explicit_port(trimmed) => {
            let port = parsed.port_or_known_default().unwrap_or(80);
            format!("{host}:{port}")
        }
        None => host.to_string(),
    };

    Ok((scheme, host_port))
}

fn has_explicit_port(raw: &str) -> bool {
    let authority = raw.split("://").last().unwrap_or(raw);
    let authority = authority.split('/').next().unwrap_or(authority);
    match authority.rfind(']') {
        Some(end) => authority[end..].contains(':'),
        None => authority.contains(':'),
    }
}

/// Point `clone` at `backend`, keeping its path and query.
///
/// The Host header is replaced only when the backend asks for it;
/// otherwise the client's original virtual host reaches the backend.
pub fn resolve(clone: &mut RequestClone, backend: &Backend) -> Result<(), axum::http::Error> {
    let path_and_query = clone
        .uri
        .path_and_query()
        .map_or("/", axum::http::uri::PathAndQuery::as_str);

    let uri = Uri::builder()
        .scheme(backend.scheme.as_str())
        .authority(backend.host_port.as_str())
        .path_and_query(path_and_query)
        .build()?;
    clone.uri = uri;

    if backend.rewrite_host {
        let value = HeaderValue::from_str(&backend.host_port)?;
        clone.headers.insert(HOST, value);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, Method, Version};
    use bytes::Bytes;

    fn backend(url: &str, rewrite_host: bool) -> Backend {
        let mut config = BackendConfig::new(url);
        config.rewrite_host = rewrite_host;
        Backend::from_config(&config, 1000).unwrap()
    }

    fn clone_for(uri: &str, host: &str) -> RequestClone {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, host.parse().unwrap());
        RequestClone {
            method: Method::GET,
            uri: uri.parse().unwrap(),
            version: Version::HTTP_11,
            headers,
            body: Bytes::new(),
        }
    }

    #[test]
    fn parses_scheme_and_host_port() {
        assert_eq!(
            parse_backend_url("http://localhost:8080").unwrap(),
            (Scheme::Http, "localhost:8080".into())
        );
        assert_eq!(
            parse_backend_url("https://shadow.internal").unwrap(),
            (Scheme::Https, "shadow.internal".into())
        );
        assert_eq!(
            parse_backend_url("localhost:8081").unwrap(),
            (Scheme::Http, "localhost:8081".into())
        );
    }

    #[test]
    fn keeps_explicit_default_port() {
        assert_eq!(
            parse_backend_url("http://backend:80").unwrap(),
            (Scheme::Http, "backend:80".into())
        );
        assert_eq!(
            parse_backend_url("[::1]:9000").unwrap(),
            (Scheme::Http, "[::1]:9000".into())
        );
    }

    #[test]
    fn rejects_bad_addresses() {
        assert!(parse_backend_url("").is_err());
        assert!(parse_backend_url("ftp://host:21").unwrap_err().contains("unsupported scheme"));
        assert!(parse_backend_url("http://host:80/prefix").unwrap_err().contains("path"));
    }

    #[test]
    fn resolve_rewrites_destination_and_keeps_host() {
        let mut clone = clone_for("/search?q=rust", "www.example.com");
        resolve(&mut clone, &backend("http://10.0.0.5:8080", false)).unwrap();

        assert_eq!(clone.uri.to_string(), "http://10.0.0.5:8080/search?q=rust");
        assert_eq!(clone.headers.get(HOST).unwrap(), "www.example.com");
    }

    #[test]
    fn resolve_rewrites_host_when_configured() {
        let mut clone = clone_for("/", "www.example.com");
        resolve(&mut clone, &backend("https://shadow:8443", true)).unwrap();

        assert_eq!(clone.uri.to_string(), "https://shadow:8443/");
        assert_eq!(clone.headers.get(HOST).unwrap(), "shadow:8443");
    }

    #[test]
    fn origin_includes_scheme() {
        assert_eq!(backend("localhost:8081", false).origin(), "http://localhost:8081");
    }
}

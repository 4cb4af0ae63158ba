//! Forwarded-identity headers and hop-by-hop stripping.
//!
//! [`enrich_forwarded_headers`] extends the `X-Forwarded-For` and RFC 7239
//! `Forwarded` chains with the caller's address. It runs once per request,
//! before cloning, so every copy carries the same chain. Prior hops are
//! never replaced.

use std::sync::LazyLock;

use axum::http::{HeaderMap, HeaderName, HeaderValue};

pub static X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub static FORWARDED: HeaderName = HeaderName::from_static("forwarded");

static HOP_BY_HOP: LazyLock<Vec<HeaderName>> = LazyLock::new(|| {
    [
        "connection",
        "keep-alive",
        "transfer-encoding",
        "te",
        "trailer",
        "upgrade",
        "proxy-authorization",
        "proxy-authenticate",
    ]
    .iter()
    .filter_map(|name| name.parse::<HeaderName>().ok())
    .collect()
});

/// Strip connection-level headers that belong to a single hop.
///
/// Applied to outbound requests (each leg frames its own body) and to the
/// primary's response before it is relayed.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
}

/// Client IP from a peer address such as `192.168.0.1:80` or `[::1]:443`.
///
/// An address without a port separator is used verbatim.
#[must_use]
pub fn client_ip(remote_addr: &str) -> &str {
    match remote_addr.rfind(':') {
        Some(idx) => {
            let host = &remote_addr[..idx];
            host.strip_prefix('[')
                .and_then(|h| h.strip_suffix(']'))
                .unwrap_or(host)
        }
        None => {
            tracing::warn!(
                remote_addr = %remote_addr,
                "peer address has no port, using it verbatim as client IP"
            );
            remote_addr
        }
    }
}

/// Append the caller to `X-Forwarded-For` and `Forwarded`.
pub fn enrich_forwarded_headers(headers: &mut HeaderMap, remote_addr: &str) {
    let ip = client_ip(remote_addr);

    append_chain(headers, &X_FORWARDED_FOR, ip);
    append_chain(headers, &FORWARDED, &format!("for={ip}"));
}

/// Extend a comma-separated chain, folding repeated header lines first.
fn append_chain(headers: &mut HeaderMap, name: &HeaderName, entry: &str) {
    let existing: Vec<&str> = headers
        .get_all(name)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    let chain = if existing.is_empty() {
        entry.to_string()
    } else {
        format!("{}, {entry}", existing.join(", "))
    };

    match HeaderValue::from_str(&chain) {
        Ok(val) => {
            headers.insert(name.clone(), val);
        }
        Err(e) => {
            tracing::warn!(header = %name, error = %e, "could not extend forwarding chain");
        }
    }
}

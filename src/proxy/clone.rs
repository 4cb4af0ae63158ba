//! Request duplication.
//!
//! The inbound body is drained once into a single buffer; every
//! [`RequestClone`] then gets its own handle to that immutable buffer,
//! so clones can be consumed in any order, on any task, without
//! observing each other.

use axum::body::Body;
use axum::http::header::CONTENT_LENGTH;
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue, Method, Uri, Version};
use bytes::{Bytes, BytesMut};
use http_body_util::{BodyExt, LengthLimitError};

/// One independently owned copy of an inbound request.
#[derive(Debug, Clone)]
pub struct RequestClone {
    pub method: Method,
    pub uri: Uri,
    pub version: Version,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RequestClone {
    /// Request line used by the `| A |` / `| B |` log lines.
    #[must_use]
    pub fn request_line(&self) -> String {
        let path = self
            .uri
            .path_and_query()
            .map_or_else(|| self.uri.path(), axum::http::uri::PathAndQuery::as_str);
        format!("{} {} {:?}", self.method, path, self.version)
    }
}

/// The inbound body went past the server's body size limit.
#[derive(Debug, thiserror::Error)]
#[error("request body exceeds the size limit ({buffered} bytes read)")]
pub struct BodyTooLarge {
    pub buffered: usize,
}

/// Drain `body` completely, keeping whatever arrived before a read error.
///
/// A broken stream is logged and the partial buffer is returned. Hitting
/// the body size limit is not a read failure: nothing may be forwarded,
/// so it is reported as [`BodyTooLarge`].
pub async fn read_body(mut body: Body) -> Result<Bytes, BodyTooLarge> {
    let mut buf = BytesMut::new();
    while let Some(frame) = body.frame().await {
        match frame {
            Ok(frame) => {
                if let Ok(data) = frame.into_data() {
                    buf.extend_from_slice(&data);
                }
            }
            Err(e) if exceeds_limit(&e) => {
                return Err(BodyTooLarge {
                    buffered: buf.len(),
                });
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    buffered = buf.len(),
                    "failed to read request body, cloning what was received"
                );
                break;
            }
        }
    }
    Ok(buf.freeze())
}

/// Whether `LengthLimitError` appears anywhere in the error's source chain.
fn exceeds_limit(error: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(error);
    while let Some(err) = current {
        if err.is::<LengthLimitError>() {
            return true;
        }
        current = err.source();
    }
    false
}

/// Produce `count` independent copies of a request whose body was already drained.
///
/// `Content-Length` on each copy reflects the bytes actually buffered.
#[must_use]
pub fn clone_request(parts: &Parts, body: &Bytes, count: usize) -> Vec<RequestClone> {
    let mut headers = parts.headers.clone();
    if !body.is_empty() || headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
    }

    (0..count)
        .map(|_| RequestClone {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            version: parts.version,
            headers: headers.clone(),
            body: body.clone(),
        })
        .collect()
}

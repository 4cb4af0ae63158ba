//! Writing the primary's response back to the client.

use axum::body::Body;
use axum::http::header::CONNECTION;
use axum::http::{HeaderValue, StatusCode};
use axum::response::Response;

use super::dispatch::DispatchResponse;
use super::headers::strip_hop_by_hop;

/// Relay a successful primary response: status, every header value, body.
///
/// Only connection-level headers of the upstream hop are dropped; repeated
/// header lines such as `Set-Cookie` are preserved as sent.
#[must_use]
pub fn relay(upstream: DispatchResponse, close_connection: bool) -> Response {
    let DispatchResponse {
        status,
        mut headers,
        body,
    } = upstream;
    strip_hop_by_hop(&mut headers);
    if close_connection {
        headers.insert(CONNECTION, HeaderValue::from_static("close"));
    }

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Response used when the primary produced nothing to relay.
///
/// No upstream bytes exist, so nothing is fabricated beyond an empty
/// `502 Bad Gateway`.
#[must_use]
pub fn primary_unavailable(close_connection: bool) -> Response {
    empty(StatusCode::BAD_GATEWAY, close_connection)
}

/// Response for a request whose body went past the size limit. No lane
/// was dispatched.
#[must_use]
pub fn body_too_large(close_connection: bool) -> Response {
    empty(StatusCode::PAYLOAD_TOO_LARGE, close_connection)
}

fn empty(status: StatusCode, close_connection: bool) -> Response {
    let mut response = Response::new(Body::empty());
    *response.status_mut() = status;
    if close_connection {
        response
            .headers_mut()
            .insert(CONNECTION, HeaderValue::from_static("close"));
    }
    response
}

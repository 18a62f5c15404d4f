//! Per-request correlation ids.
//!
//! A caller-supplied `x-request-id` is kept when it is short printable
//! ASCII; anything else is replaced by a fresh UUID. The id is attached to
//! the request extensions, the tracing span that wraps the handler, and the
//! response headers.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use axum::middleware::Next;
use axum::response::Response;
use tracing::Instrument;
use uuid::Uuid;

pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const MAX_INBOUND_LEN: usize = 128;

#[derive(Debug, Clone)]
pub struct RequestId(pub String);

pub async fn request_id_middleware(mut request: Request<Body>, next: Next) -> Response {
    let id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(accept_inbound)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    request.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(X_REQUEST_ID.clone(), value);
    }
    response
}

fn accept_inbound(raw: &str) -> Option<String> {
    let ok = !raw.is_empty()
        && raw.len() <= MAX_INBOUND_LEN
        && raw.bytes().all(|b| b.is_ascii_graphic());
    ok.then(|| raw.to_string())
}

//! Error-to-HTTP response conversion.
//!
//! Client errors render as `{"error": message}`. Server errors render as
//! `{"error": context, "details": message}`, where the context names the
//! operation that failed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

/// Context label for failed conversions.
pub const CONVERSION_FAILED: &str = "Conversion failed";
/// Context label for failed lookups.
pub const LOOKUP_FAILED: &str = "Lookup failed";

/// Wrapper so we can implement `IntoResponse` for [`hc_core::Error`].
pub struct AppError {
    inner: hc_core::Error,
    context: &'static str,
    request_id: Option<String>,
}

impl AppError {
    pub fn new(inner: hc_core::Error, context: &'static str) -> Self {
        Self {
            inner,
            context,
            request_id: None,
        }
    }

    pub fn conversion(inner: hc_core::Error) -> Self {
        Self::new(inner, CONVERSION_FAILED)
    }

    pub fn lookup(inner: hc_core::Error) -> Self {
        Self::new(inner, LOOKUP_FAILED)
    }

    pub fn with_request_id(mut self, id: String) -> Self {
        self.request_id = Some(id);
        self
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.inner.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let body = if status.is_server_error() {
            tracing::error!(
                status = %status,
                code = self.inner.code(),
                request_id = self.request_id.as_deref().unwrap_or("-"),
                error = %self.inner,
                "{}",
                self.context
            );
            json!({
                "error": self.context,
                "details": self.inner.details(),
            })
        } else {
            json!({ "error": self.inner.to_string() })
        };

        (status, axum::Json(body)).into_response()
    }
}

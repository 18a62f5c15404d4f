//! Stream cache route handlers.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Extension, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::AppContext;
use crate::error::AppError;
use crate::middleware::request_id::RequestId;

/// Successful conversion response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub stream_url: String,
}

/// Query parameters for the lookup endpoint.
#[derive(Debug, Deserialize)]
pub struct LookupParams {
    #[serde(rename = "videoUrl", default)]
    pub video_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResponse {
    pub stream_url: String,
    pub artifact_key: String,
    pub exists: bool,
}

/// Pull `videoUrl` out of a JSON body. A missing body, malformed JSON, or a
/// missing or non-string field all yield an empty URL, which then fails
/// validation like any other bad URL.
fn video_url(payload: Result<Json<Value>, JsonRejection>) -> String {
    match payload {
        Ok(Json(body)) => body
            .get("videoUrl")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Err(rejection) => {
            tracing::debug!("Unreadable request body: {rejection}");
            String::new()
        }
    }
}

/// Same treatment for the lookup query string: a query that does not
/// deserialize counts as an empty URL.
fn lookup_url(params: Result<Query<LookupParams>, QueryRejection>) -> String {
    match params {
        Ok(Query(params)) => params.video_url,
        Err(rejection) => {
            tracing::debug!("Unreadable query string: {rejection}");
            String::new()
        }
    }
}

/// POST /api/cache
pub async fn convert(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<ConvertResponse>, AppError> {
    let url = video_url(payload);

    let outcome = ctx
        .converter
        .convert(&url)
        .await
        .map_err(|e| AppError::conversion(e).with_request_id(request_id))?;

    Ok(Json(ConvertResponse {
        stream_url: outcome.stream_url,
    }))
}

/// GET /api/cache?videoUrl=
pub async fn lookup(
    State(ctx): State<AppContext>,
    Extension(RequestId(request_id)): Extension<RequestId>,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> Result<Json<LookupResponse>, AppError> {
    let url = lookup_url(params);

    let outcome = ctx
        .converter
        .lookup(&url)
        .await
        .map_err(|e| AppError::lookup(e).with_request_id(request_id))?;

    Ok(Json(LookupResponse {
        stream_url: outcome.stream_url,
        artifact_key: outcome.artifact_key,
        exists: outcome.exists,
    }))
}

//! Input sanitization for JSON request bodies.
//!
//! A typed recursive visitor over the closed `serde_json::Value` variant:
//! only string leaves are rewritten, structure and non-string scalars pass
//! through untouched. Applied as middleware so handlers only ever see
//! entity-escaped text.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use crate::error::AppError;
use crate::http::server::AppState;

/// HTML-entity-escape the five dangerous characters.
pub fn escape_str(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            other => out.push(other),
        }
    }
    out
}

/// Recursively escape every string leaf of a JSON value. Object keys are
/// left alone: they are schema, not user text.
pub fn sanitize_value(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(escape_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize_value).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, inner)| (key, sanitize_value(inner)))
                .collect(),
        ),
        scalar => scalar,
    }
}

/// Middleware that buffers the body (bounded), sanitizes it when it parses
/// as JSON, and forwards everything else untouched. Malformed JSON is left
/// for the handler's extractor to reject with its own 400.
pub async fn sanitize_body_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let limit = state.config.listener.max_body_bytes;
    let (parts, body) = request.into_parts();

    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return AppError::Validation("request body too large".into()).into_response();
        }
    };

    let bytes = match serde_json::from_slice::<Value>(&bytes) {
        Ok(value) => match serde_json::to_vec(&sanitize_value(value)) {
            Ok(sanitized) => Bytes::from(sanitized),
            Err(_) => bytes,
        },
        Err(_) => bytes,
    };

    let request = Request::from_parts(parts, Body::from(bytes));
    next.run(request).await
}

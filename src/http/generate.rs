//! Public link-generation endpoint.
//!
//! Validates the request, builds the deep link, seals the PII payload, and
//! persists the sealed record. The plaintext phone and message never touch
//! the store.

use std::net::SocketAddr;

use axum::{
    extract::{ConnectInfo, State},
    http::{header, HeaderMap},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::AppError;
use crate::http::server::AppState;
use crate::http::validate::{validate_message, validate_phone};
use crate::store::NewRecord;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub phone: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub link: String,
}

/// Build the `wa.me` deep link, URL-encoding the optional message.
fn build_link(phone: &str, message: &str) -> Result<url::Url, AppError> {
    let digits = phone.trim_start_matches('+');
    let mut link = url::Url::parse(&format!("https://wa.me/{digits}"))
        .map_err(|_| AppError::Validation("Invalid phone number.".into()))?;
    if !message.trim().is_empty() {
        link.query_pairs_mut().append_pair("text", message);
    }
    Ok(link)
}

pub async fn generate(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    Json(request): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    validate_phone(&request.phone)?;
    validate_message(&request.message)?;

    let link = build_link(&request.phone, &request.message)?;

    let pii = json!({ "phone": request.phone, "message": request.message }).to_string();
    let sealed = state.codec.seal(&pii)?;

    let ip = addr.ip().to_string();
    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok());

    let id = state.store.insert_record(NewRecord {
        sealed,
        ip_address: &ip,
        user_agent,
        link: link.as_str(),
        created_at: Utc::now().timestamp(),
    })?;

    tracing::info!(record_id = id, "link generated");

    Ok(Json(GenerateResponse {
        link: link.into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_without_message_has_no_query() {
        let link = build_link("+15551234567", "").unwrap();
        assert_eq!(link.as_str(), "https://wa.me/15551234567");
    }

    #[test]
    fn message_is_url_encoded() {
        let link = build_link("+15551234567", "hello there & more").unwrap();
        assert_eq!(
            link.as_str(),
            "https://wa.me/15551234567?text=hello+there+%26+more"
        );
    }

    #[test]
    fn whitespace_only_message_is_dropped() {
        let link = build_link("+15551234567", "   ").unwrap();
        assert!(link.query().is_none());
    }
}

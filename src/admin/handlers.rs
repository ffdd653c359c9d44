//! Admin endpoint handlers.

use axum::{
    extract::{Extension, Query, State},
    http::{header, HeaderMap},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::admin::auth::CurrentAdmin;
use crate::crypto::password::verify_password;
use crate::error::AppError;
use crate::http::server::AppState;
use crate::session::{clear_session_cookie, session_cookie, session_id_from_headers};
use crate::store::BlockEntry;

/// Placeholder shown when a stored payload no longer opens (anonymized or
/// corrupted rows are an expected steady state, not an error).
const REDACTED: &str = "[encrypted]";

const DAY_SECS: i64 = 24 * 60 * 60;

fn rfc3339(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| timestamp.to_string())
}

// --- Login / logout ---

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, AppError> {
    if request.username.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation("Username and password required".into()));
    }

    let admin = state
        .store
        .admin_by_username(&request.username)?
        .filter(|admin| verify_password(&request.password, &admin.password_hash))
        .ok_or(AppError::InvalidCredentials)?;

    // Fresh session on every login; the pre-auth session (if any) stays
    // untouched and simply expires.
    let session_id = state.sessions.create();
    state.sessions.update(&session_id, |session| {
        session.admin_id = Some(admin.id);
        session.admin_username = Some(admin.username.clone());
    });
    let csrf_token = state
        .csrf
        .rotate(&session_id)
        .ok_or(AppError::Unauthorized)?;

    tracing::info!(username = %admin.username, "admin login");

    let cookie = session_cookie(&session_id, state.sessions.ttl());
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "message": "Login successful", "csrfToken": csrf_token })),
    )
        .into_response())
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = session_id_from_headers(&headers) {
        state.sessions.destroy(&session_id);
    }
    (
        [(header::SET_COOKIE, clear_session_cookie())],
        Json(json!({ "message": "Logged out" })),
    )
        .into_response()
}

// --- Analytics ---

#[derive(Debug, Serialize)]
pub struct AnalyticsSummary {
    pub total_requests: i64,
    pub today_requests: i64,
    pub week_requests: i64,
    pub active_blocks: i64,
}

pub async fn analytics(State(state): State<AppState>) -> Result<Json<AnalyticsSummary>, AppError> {
    let now = Utc::now().timestamp();
    Ok(Json(AnalyticsSummary {
        total_requests: state.store.count_records()?,
        today_requests: state.store.count_records_since(now - DAY_SECS)?,
        week_requests: state.store.count_records_since(now - 7 * DAY_SECS)?,
        active_blocks: state.store.count_active_blocks(now)?,
    }))
}

// --- Request logs ---

#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub id: i64,
    pub phone: String,
    pub message: String,
    pub ip_address: String,
    pub user_agent: Option<String>,
    pub link: String,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogEntry>,
    pub pagination: Pagination,
}

pub async fn logs(
    State(state): State<AppState>,
    Query(query): Query<LogsQuery>,
) -> Result<Json<LogsResponse>, AppError> {
    let page = query.page.unwrap_or(1).max(1);
    let limit = query.limit.unwrap_or(20).clamp(1, 100);
    // Widen before multiplying: the client controls both factors.
    let offset = i64::from(page - 1) * i64::from(limit);

    let records = state.store.record_page(limit, offset)?;
    let total = state.store.count_records()?;

    let logs = records
        .into_iter()
        .map(|record| {
            // Anonymized and corrupted rows surface as redacted, never as
            // an error and never as partial plaintext.
            let (phone, message) = state
                .codec
                .open(&record.sealed)
                .ok()
                .and_then(|plaintext| {
                    let value: serde_json::Value = serde_json::from_str(&plaintext).ok()?;
                    Some((
                        value.get("phone")?.as_str()?.to_string(),
                        value.get("message")?.as_str().unwrap_or_default().to_string(),
                    ))
                })
                .unwrap_or_else(|| (REDACTED.to_string(), REDACTED.to_string()));

            LogEntry {
                id: record.id,
                phone,
                message,
                ip_address: record.ip_address,
                user_agent: record.user_agent,
                link: record.link,
                created_at: rfc3339(record.created_at),
            }
        })
        .collect();

    Ok(Json(LogsResponse {
        logs,
        pagination: Pagination {
            page,
            limit,
            total,
            total_pages: (total + i64::from(limit) - 1) / i64::from(limit),
        },
    }))
}

// --- Block list management ---

#[derive(Debug, Serialize)]
pub struct BlockedIpEntry {
    pub id: i64,
    pub ip_address: String,
    pub reason: String,
    pub blocked_at: String,
    pub expires_at: Option<String>,
    pub is_manual: bool,
}

impl From<BlockEntry> for BlockedIpEntry {
    fn from(entry: BlockEntry) -> Self {
        Self {
            id: entry.id,
            ip_address: entry.ip_address,
            reason: entry.reason,
            blocked_at: rfc3339(entry.blocked_at),
            expires_at: entry.expires_at.map(rfc3339),
            is_manual: entry.is_manual,
        }
    }
}

pub async fn blocked_ips(
    State(state): State<AppState>,
) -> Result<Json<Vec<BlockedIpEntry>>, AppError> {
    let now = Utc::now().timestamp();
    let entries = state.store.list_active_blocks(now)?;
    Ok(Json(entries.into_iter().map(Into::into).collect()))
}

#[derive(Debug, Deserialize)]
pub struct BlockIpRequest {
    #[serde(default)]
    pub ip: String,
    pub reason: Option<String>,
}

pub async fn block_ip(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Json(request): Json<BlockIpRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ip = request.ip.trim();
    if ip.is_empty() {
        return Err(AppError::Validation("IP address required".into()));
    }

    let reason = request
        .reason
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .unwrap_or("Manually blocked by admin");
    state
        .store
        .insert_manual_block(ip, reason, Utc::now().timestamp())?;

    tracing::info!(%ip, admin = %admin.username, "manual block added");
    Ok(Json(json!({ "message": format!("IP {ip} blocked") })))
}

#[derive(Debug, Deserialize)]
pub struct UnblockIpRequest {
    #[serde(default)]
    pub ip: String,
}

pub async fn unblock_ip(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
    Json(request): Json<UnblockIpRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let ip = request.ip.trim();
    if ip.is_empty() {
        return Err(AppError::Validation("IP address required".into()));
    }

    state.store.remove_block(ip)?;
    tracing::info!(%ip, admin = %admin.username, "block removed");
    Ok(Json(json!({ "message": format!("IP {ip} unblocked") })))
}

// --- On-demand anonymization ---

pub async fn purge_logs(
    State(state): State<AppState>,
    Extension(admin): Extension<CurrentAdmin>,
) -> Result<Json<serde_json::Value>, AppError> {
    let affected = state.anonymizer.sweep(Utc::now().timestamp())?;
    tracing::info!(affected, admin = %admin.username, "on-demand anonymization");
    Ok(Json(json!({
        "message": format!(
            "Anonymized {affected} records older than {} days",
            state.anonymizer.retention_days()
        )
    })))
}

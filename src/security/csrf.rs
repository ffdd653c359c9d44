//! Double-submit CSRF protection.
//!
//! A per-session random token must arrive both in server-held session state
//! and in the `X-CSRF-Token` request header. A cross-origin attacker can
//! trigger requests but cannot read or set the header, so a match proves the
//! request came from the page that fetched the token. Verification fails
//! closed: missing session, missing header, and mismatch are all the same
//! rejection, leaking nothing about which check failed.

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

use crate::error::AppError;
use crate::http::server::AppState;
use crate::session::{session_id_from_headers, SessionStore};

/// Header carrying the client-submitted token.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Token entropy in bytes (256 bits).
const TOKEN_LEN: usize = 32;

/// Per-session anti-forgery token issuance and verification.
#[derive(Clone)]
pub struct CsrfGuard {
    sessions: SessionStore,
}

impl CsrfGuard {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }

    /// Return the session's token, minting one on first retrieval. `None`
    /// if the session does not exist or has expired.
    pub fn issue(&self, session_id: &str) -> Option<String> {
        let session = self.sessions.get(session_id)?;
        if let Some(token) = session.csrf_token {
            return Some(token);
        }

        let token = generate_token();
        let bound = token.clone();
        self.sessions
            .update(session_id, move |s| s.csrf_token = Some(bound))
            .then_some(token)
    }

    /// Replace the session's token. Called on login so a pre-auth token
    /// never carries into the authenticated session.
    pub fn rotate(&self, session_id: &str) -> Option<String> {
        let token = generate_token();
        let bound = token.clone();
        self.sessions
            .update(session_id, move |s| s.csrf_token = Some(bound))
            .then_some(token)
    }

    /// Verify a state-changing request. Every failure mode collapses into
    /// the single `CsrfRejected` error.
    pub fn verify(
        &self,
        session_id: Option<&str>,
        supplied: Option<&str>,
    ) -> Result<(), AppError> {
        let held = session_id
            .and_then(|id| self.sessions.get(id))
            .and_then(|session| session.csrf_token);

        match (held, supplied) {
            (Some(held), Some(supplied))
                if bool::from(held.as_bytes().ct_eq(supplied.as_bytes())) =>
            {
                Ok(())
            }
            _ => Err(AppError::CsrfRejected),
        }
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_LEN];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

/// Middleware enforcing the double-submit check on non-safe methods. Safe
/// methods pass through; the login bootstrap endpoint is simply never
/// layered with this middleware.
pub async fn csrf_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_safe_method(request.method()) {
        return next.run(request).await;
    }

    let session_id = session_id_from_headers(request.headers());
    let supplied = request
        .headers()
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);

    if let Err(rejected) = state
        .csrf
        .verify(session_id.as_deref(), supplied.as_deref())
    {
        tracing::debug!(
            path = %request.uri().path(),
            "state-changing request rejected by CSRF guard"
        );
        return rejected.into_response();
    }

    next.run(request).await
}

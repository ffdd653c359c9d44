//! HTTP server setup and middleware wiring.
//!
//! # Responsibilities
//! - Build the shared `AppState` handed to every handler and middleware
//! - Compose the request pipeline: block-list/rate-limit check, then CSRF,
//!   in front of the state-changing handlers
//! - Serve with graceful shutdown on the broadcast signal
//!
//! # Design Decisions
//! - Components receive the store handle at construction, not globally
//! - Guard ordering lives here, in one place, not spread across handlers
//! - The deny path resolves before any handler runs

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin;
use crate::config::AppConfig;
use crate::crypto::SealedCodec;
use crate::maintenance::anonymize::Anonymizer;
use crate::security::csrf::csrf_middleware;
use crate::security::headers::apply_security_headers;
use crate::security::rate_limit::rate_limit_middleware;
use crate::security::sanitize::sanitize_body_middleware;
use crate::security::{CsrfGuard, SlidingWindowLimiter};
use crate::session::{session_cookie, session_id_from_headers, SessionStore};
use crate::store::Store;

/// Application state injected into handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Store,
    pub codec: Arc<SealedCodec>,
    pub sessions: SessionStore,
    pub limiter: Arc<SlidingWindowLimiter>,
    pub csrf: CsrfGuard,
    pub anonymizer: Arc<Anonymizer>,
}

impl AppState {
    /// Wire every component onto one store handle.
    pub fn new(config: Arc<AppConfig>, store: Store, encryption_key: [u8; 32]) -> Self {
        let sessions = SessionStore::new(Duration::from_secs(config.session.ttl_secs));
        let limiter = Arc::new(SlidingWindowLimiter::new(
            store.clone(),
            config.rate_limit.clone(),
        ));
        let csrf = CsrfGuard::new(sessions.clone());
        let anonymizer = Arc::new(Anonymizer::new(store.clone(), config.retention.days));

        Self {
            config,
            store,
            codec: Arc::new(SealedCodec::new(encryption_key)),
            sessions,
            limiter,
            csrf,
            anonymizer,
        }
    }
}

/// HTTP server for the service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: build_router(state),
        }
    }

    /// Serve until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the router with the full guard pipeline.
fn build_router(state: AppState) -> Router {
    let request_timeout = Duration::from_secs(state.config.listener.request_timeout_secs);

    // Outermost layer runs first: rate limiting decides admission before the
    // CSRF guard ever sees the request.
    let generate = post(crate::http::generate::generate)
        .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    let api = Router::new()
        .route("/csrf-token", get(issue_csrf_token))
        .route("/generate", generate)
        .nest("/admin", admin::admin_router(state.clone()))
        .fallback(api_not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            sanitize_body_middleware,
        ));

    let router = Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout)),
        )
        .with_state(state);

    apply_security_headers(router)
}

/// GET /api/csrf-token: establish (or reuse) a session and return its
/// token, minting the token lazily on first retrieval.
async fn issue_csrf_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let existing = session_id_from_headers(&headers)
        .filter(|id| state.sessions.get(id).is_some());
    let is_new = existing.is_none();
    let session_id = existing.unwrap_or_else(|| state.sessions.create());

    let Some(token) = state.csrf.issue(&session_id) else {
        // Session vanished between lookup and issue; treat as a server fault.
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "internal server error" })),
        )
            .into_response();
    };

    let body = Json(json!({ "csrfToken": token }));
    if is_new {
        let cookie = session_cookie(&session_id, state.sessions.ttl());
        ([(axum::http::header::SET_COOKIE, cookie)], body).into_response()
    } else {
        body.into_response()
    }
}

async fn api_not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found" })),
    )
        .into_response()
}

//! Administrative API.
//!
//! Login precedes session establishment and therefore sits outside both
//! guards; everything else requires an authenticated session, and every
//! state-changing route additionally passes the CSRF check.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use crate::http::server::AppState;
use crate::security::csrf::csrf_middleware;

use self::auth::require_admin;
use self::handlers::*;

pub fn admin_router(state: AppState) -> Router<AppState> {
    let protected = Router::new()
        .route("/analytics", get(analytics))
        .route("/logs", get(logs))
        .route("/blocked-ips", get(blocked_ips))
        .route("/block-ip", post(block_ip))
        .route("/unblock-ip", post(unblock_ip))
        .route("/logs/purge", delete(purge_logs))
        .layer(middleware::from_fn_with_state(state.clone(), csrf_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .route("/login", post(login))
        .route(
            "/logout",
            post(logout).layer(middleware::from_fn_with_state(state, csrf_middleware)),
        )
        .merge(protected)
}

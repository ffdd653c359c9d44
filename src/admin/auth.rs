//! Admin session authentication middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::http::server::AppState;
use crate::session::session_id_from_headers;

/// Identity of the authenticated admin, attached for downstream handlers.
#[derive(Clone, Debug)]
pub struct CurrentAdmin {
    pub admin_id: i64,
    pub username: String,
    pub session_id: String,
}

/// Reject requests without a live admin session. One uniform 401 for a
/// missing cookie, an unknown session, and a session without a login.
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let authenticated = session_id_from_headers(request.headers()).and_then(|session_id| {
        let session = state.sessions.get(&session_id)?;
        let admin_id = session.admin_id?;
        Some(CurrentAdmin {
            admin_id,
            username: session.admin_username.unwrap_or_default(),
            session_id,
        })
    });

    match authenticated {
        Some(admin) => {
            request.extensions_mut().insert(admin);
            next.run(request).await
        }
        None => AppError::Unauthorized.into_response(),
    }
}

//! In-process session store with TTL semantics.
//!
//! A plain key-value abstraction: the CSRF guard and admin auth only go
//! through [`SessionStore`], so a persistent backend could replace the
//! DashMap without touching either. Expired entries answer as absent
//! immediately; the cleanup sweep prunes them from memory.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::header::{HeaderMap, COOKIE};
use dashmap::DashMap;
use uuid::Uuid;

/// Session cookie name.
pub const SESSION_COOKIE: &str = "sid";

/// Server-held per-session state.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub admin_id: Option<i64>,
    pub admin_username: Option<String>,
    pub csrf_token: Option<String>,
}

#[derive(Debug, Clone)]
struct Entry {
    session: Session,
    expires_at: Instant,
}

/// Thread-safe TTL map of session id → session state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<DashMap<String, Entry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Create an empty session and return its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().simple().to_string();
        self.inner.insert(
            id.clone(),
            Entry {
                session: Session::default(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        id
    }

    /// Snapshot of a live session. Expired sessions answer as absent.
    pub fn get(&self, id: &str) -> Option<Session> {
        let entry = self.inner.get(id)?;
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.inner.remove(id);
            return None;
        }
        Some(entry.session.clone())
    }

    /// Mutate a live session in place. Returns false if it does not exist
    /// or has expired.
    pub fn update<F>(&self, id: &str, mutate: F) -> bool
    where
        F: FnOnce(&mut Session),
    {
        let Some(mut entry) = self.inner.get_mut(id) else {
            return false;
        };
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.inner.remove(id);
            return false;
        }
        mutate(&mut entry.session);
        true
    }

    /// Destroy a session (logout, or session end).
    pub fn destroy(&self, id: &str) {
        self.inner.remove(id);
    }

    /// Drop expired entries. Called by the periodic cleanup task.
    pub fn prune_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| entry.expires_at > now);
        before - self.inner.len()
    }

    /// Session lifetime, for cookie max-age.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

/// Extract the session id from a request's `Cookie` header.
pub fn session_id_from_headers(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == SESSION_COOKIE).then(|| value.to_string())
    })
}

/// Build the `Set-Cookie` value binding a session to the client.
pub fn session_cookie(id: &str, ttl: Duration) -> String {
    format!(
        "{SESSION_COOKIE}={id}; HttpOnly; SameSite=Strict; Path=/; Max-Age={}",
        ttl.as_secs()
    )
}

/// Build the `Set-Cookie` value that clears the session cookie.
pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; HttpOnly; SameSite=Strict; Path=/; Max-Age=0")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn create_get_update_destroy() {
        let store = SessionStore::new(Duration::from_secs(60));
        let id = store.create();

        assert!(store.get(&id).unwrap().admin_id.is_none());
        assert!(store.update(&id, |s| s.admin_id = Some(7)));
        assert_eq!(store.get(&id).unwrap().admin_id, Some(7));

        store.destroy(&id);
        assert!(store.get(&id).is_none());
        assert!(!store.update(&id, |s| s.admin_id = None));
    }

    #[test]
    fn expired_sessions_answer_as_absent() {
        let store = SessionStore::new(Duration::ZERO);
        let id = store.create();
        assert!(store.get(&id).is_none());
    }

    #[test]
    fn prune_drops_only_expired_entries() {
        let expired = SessionStore::new(Duration::ZERO);
        expired.create();
        expired.create();
        assert_eq!(expired.prune_expired(), 2);

        let live = SessionStore::new(Duration::from_secs(60));
        live.create();
        assert_eq!(live.prune_expired(), 0);
    }

    #[test]
    fn cookie_parsing_finds_sid_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; sid=abc123; lang=en"),
        );
        assert_eq!(session_id_from_headers(&headers).unwrap(), "abc123");

        headers.insert(COOKIE, HeaderValue::from_static("theme=dark"));
        assert!(session_id_from_headers(&headers).is_none());
    }
}

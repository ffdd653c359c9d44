//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::sync::Arc;

use linkgate::config::AppConfig;
use linkgate::crypto::password::hash_password;
use linkgate::store::Store;
use linkgate::{AppState, HttpServer, Shutdown};

/// Fixed encryption key for tests.
pub const TEST_KEY: [u8; 32] = [0x42; 32];

pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Store,
    pub shutdown: Shutdown,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    #[allow(dead_code)]
    pub fn seed_admin(&self, username: &str, password: &str) {
        self.store
            .upsert_admin(username, &hash_password(password), 0)
            .unwrap();
    }
}

/// Start a full server on an ephemeral port against an in-memory store.
pub async fn spawn_app(mutate: impl FnOnce(&mut AppConfig)) -> TestApp {
    let mut config = AppConfig::default();
    mutate(&mut config);

    let store = Store::open_in_memory().unwrap();
    let state = AppState::new(Arc::new(config), store.clone(), TEST_KEY);
    let shutdown = Shutdown::new();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(state);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    TestApp {
        addr,
        store,
        shutdown,
    }
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("reqwest client")
}

/// Establish a session via GET /api/csrf-token. Returns the `sid=...`
/// cookie pair and the issued token.
#[allow(dead_code)]
pub async fn csrf_session(client: &reqwest::Client, app: &TestApp) -> (String, String) {
    let response = client
        .get(app.url("/api/csrf-token"))
        .send()
        .await
        .expect("csrf-token request");
    assert_eq!(response.status(), 200);

    let cookie = response
        .headers()
        .get("set-cookie")
        .expect("session cookie")
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();

    let body: serde_json::Value = response.json().await.unwrap();
    let token = body["csrfToken"].as_str().expect("csrfToken").to_string();
    (cookie, token)
}

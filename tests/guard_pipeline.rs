//! End-to-end tests for the public endpoint guard pipeline: session/token
//! bootstrap, CSRF enforcement, rate limiting, and auto-blocking.

mod common;

use common::{client, csrf_session, spawn_app};
use linkgate::crypto::SealedCodec;
use linkgate::security::csrf::CSRF_HEADER;
use serde_json::json;

#[tokio::test]
async fn csrf_token_reuses_the_session_on_subsequent_calls() {
    let app = spawn_app(|_| {}).await;
    let client = client();

    let first = client
        .get(app.url("/api/csrf-token"))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    let cookie = first
        .headers()
        .get("set-cookie")
        .unwrap()
        .to_str()
        .unwrap()
        .split(';')
        .next()
        .unwrap()
        .to_string();
    assert!(cookie.starts_with("sid="));
    let first_token = first.json::<serde_json::Value>().await.unwrap()["csrfToken"]
        .as_str()
        .unwrap()
        .to_string();

    // Same cookie: same token, no new session cookie.
    let second = client
        .get(app.url("/api/csrf-token"))
        .header("cookie", &cookie)
        .send()
        .await
        .unwrap();
    assert!(second.headers().get("set-cookie").is_none());
    let second_token = second.json::<serde_json::Value>().await.unwrap()["csrfToken"]
        .as_str()
        .unwrap()
        .to_string();
    assert_eq!(first_token, second_token);

    app.shutdown.trigger();
}

#[tokio::test]
async fn generate_rejects_missing_or_forged_tokens() {
    let app = spawn_app(|_| {}).await;
    let client = client();
    let (cookie, _token) = csrf_session(&client, &app).await;

    // No session, no header.
    let response = client
        .post(app.url("/api/generate"))
        .json(&json!({ "phone": "+15551234567" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    // Session cookie but a forged token.
    let response = client
        .post(app.url("/api/generate"))
        .header("cookie", &cookie)
        .header(CSRF_HEADER, "0".repeat(64))
        .json(&json!({ "phone": "+15551234567" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Invalid or missing CSRF token");

    assert_eq!(app.store.count_records().unwrap(), 0);
    app.shutdown.trigger();
}

#[tokio::test]
async fn generate_with_valid_token_seals_and_stores_the_request() {
    let app = spawn_app(|_| {}).await;
    let client = client();
    let (cookie, token) = csrf_session(&client, &app).await;

    let response = client
        .post(app.url("/api/generate"))
        .header("cookie", &cookie)
        .header(CSRF_HEADER, &token)
        .header("user-agent", "integration-test")
        .json(&json!({ "phone": "+15551234567", "message": "hello world" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("x-ratelimit-limit").unwrap(),
        "50"
    );
    assert!(response.headers().contains_key("x-ratelimit-remaining"));

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["link"], "https://wa.me/15551234567?text=hello+world");

    // The stored row carries only the sealed payload; plaintext comes back
    // through the codec.
    let records = app.store.record_page(10, 0).unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.ip_address, "127.0.0.1");
    assert_eq!(record.user_agent.as_deref(), Some("integration-test"));
    assert!(!record.sealed.ciphertext.contains("5551234567"));

    let codec = SealedCodec::new(common::TEST_KEY);
    let plaintext = codec.open(&record.sealed).unwrap();
    let pii: serde_json::Value = serde_json::from_str(&plaintext).unwrap();
    assert_eq!(pii["phone"], "+15551234567");
    assert_eq!(pii["message"], "hello world");

    app.shutdown.trigger();
}

#[tokio::test]
async fn generate_escapes_markup_in_the_message() {
    let app = spawn_app(|_| {}).await;
    let client = client();
    let (cookie, token) = csrf_session(&client, &app).await;

    let response = client
        .post(app.url("/api/generate"))
        .header("cookie", &cookie)
        .header(CSRF_HEADER, &token)
        .json(&json!({ "phone": "+15551234567", "message": "<b>hi</b>" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let codec = SealedCodec::new(common::TEST_KEY);
    let record = app.store.record_page(1, 0).unwrap().remove(0);
    let pii: serde_json::Value =
        serde_json::from_str(&codec.open(&record.sealed).unwrap()).unwrap();
    assert_eq!(pii["message"], "&lt;b&gt;hi&lt;/b&gt;");

    app.shutdown.trigger();
}

#[tokio::test]
async fn invalid_phone_is_rejected_before_anything_is_stored() {
    let app = spawn_app(|_| {}).await;
    let client = client();
    let (cookie, token) = csrf_session(&client, &app).await;

    let response = client
        .post(app.url("/api/generate"))
        .header("cookie", &cookie)
        .header(CSRF_HEADER, &token)
        .json(&json!({ "phone": "not-a-number" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    assert_eq!(app.store.count_records().unwrap(), 0);

    app.shutdown.trigger();
}

#[tokio::test]
async fn quota_breach_returns_429_then_the_block_holds() {
    let app = spawn_app(|config| {
        config.rate_limit.max_requests = 3;
    })
    .await;
    let client = client();
    let (cookie, token) = csrf_session(&client, &app).await;

    for _ in 0..3 {
        let response = client
            .post(app.url("/api/generate"))
            .header("cookie", &cookie)
            .header(CSRF_HEADER, &token)
            .json(&json!({ "phone": "+15551234567" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
    }

    // The breaching request is rate limited and promotes to a block.
    let response = client
        .post(app.url("/api/generate"))
        .header("cookie", &cookie)
        .header(CSRF_HEADER, &token)
        .json(&json!({ "phone": "+15551234567" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 429);
    assert_eq!(response.headers().get("retry-after").unwrap(), "3600");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["retryAfter"], 3600);

    // Subsequent requests hit the block entry, not the counter.
    let response = client
        .post(app.url("/api/generate"))
        .header("cookie", &cookie)
        .header(CSRF_HEADER, &token)
        .json(&json!({ "phone": "+15551234567" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Access denied. Your IP address has been blocked.");

    app.shutdown.trigger();
}

#[tokio::test]
async fn security_headers_are_present_on_every_response() {
    let app = spawn_app(|_| {}).await;
    let client = client();

    let response = client
        .get(app.url("/api/csrf-token"))
        .send()
        .await
        .unwrap();
    let headers = response.headers();
    assert_eq!(headers.get("x-content-type-options").unwrap(), "nosniff");
    assert_eq!(headers.get("x-frame-options").unwrap(), "DENY");
    assert!(headers.contains_key("content-security-policy"));

    app.shutdown.trigger();
}

#[tokio::test]
async fn unknown_api_routes_return_json_404() {
    let app = spawn_app(|_| {}).await;
    let client = client();

    let response = client
        .get(app.url("/api/no-such-route"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Not found");

    app.shutdown.trigger();
}

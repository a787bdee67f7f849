use std::sync::Arc;

use axum::{
    body::{Body, BodyDataStream},
    http::{header, Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use futures_util::StreamExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use marina_api::middleware::SessionClaims;
use marina_api::{app, AppState, AuthConfig, Backends};
use marina_store::app_config::BusinessRules;
use marina_store::{ChangeHub, InMemoryStore, LocalObjectStore};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
    _media: tempfile::TempDir,
}

async fn test_app() -> TestApp {
    let hub = Arc::new(ChangeHub::default());
    let store = Arc::new(InMemoryStore::new(hub.clone()));
    let media = tempfile::tempdir().unwrap();
    let objects = Arc::new(LocalObjectStore::new(media.path(), "http://localhost:8080/media"));

    let state = AppState::new(
        Backends::in_memory(store.clone(), objects),
        hub,
        None,
        AuthConfig {
            secret: SECRET.to_string(),
            admin_role: "admin".to_string(),
        },
        BusinessRules::default(),
        1024,
    );

    TestApp {
        router: app(state),
        store,
        _media: media,
    }
}

fn token_for(user: Uuid) -> String {
    let claims = SessionClaims {
        sub: user.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn admin_token(app: &TestApp) -> String {
    let admin = Uuid::new_v4();
    app.store.grant_role(admin, "admin").await;
    token_for(admin)
}

fn days_from_now(days: i64) -> String {
    (Utc::now().date_naive() + Duration::days(days)).to_string()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn empty_request(method: &str, uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn multipart_request(uri: &str, token: &str, content_type: &str, file: &[u8]) -> Request<Body> {
    let boundary = "marina-boundary";
    let mut body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pool.png\"\r\nContent-Type: {ct}\r\n\r\n",
        b = boundary,
        ct = content_type
    )
    .into_bytes();
    body.extend_from_slice(file);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap()
}

/// Open an SSE stream; the subscription is live once this returns.
async fn open_stream(router: &Router, uri: &str, token: Option<&str>) -> BodyDataStream {
    let response = router
        .clone()
        .oneshot(empty_request("GET", uri, token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/event-stream"
    );
    response.into_body().into_data_stream()
}

/// Next complete SSE frame, waiting at most two seconds.
async fn next_frame(stream: &mut BodyDataStream) -> String {
    let mut buffer = String::new();
    while !buffer.contains("\n\n") {
        let chunk = tokio::time::timeout(std::time::Duration::from_secs(2), stream.next())
            .await
            .expect("no SSE frame within timeout")
            .expect("stream ended")
            .unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
    }
    buffer
}

fn booking_body(check_in: &str, check_out: &str) -> Value {
    json!({
        "name": "Mario Rossi",
        "email": "mario@example.com",
        "guests": 2,
        "check_in": check_in,
        "check_out": check_out,
    })
}

// ============================================================================
// Booking intake
// ============================================================================

#[tokio::test]
async fn test_submit_booking_creates_pending() {
    let app = test_app().await;
    let (status, body) = send(
        &app.router,
        json_request("POST", "/v1/bookings", None, booking_body(&days_from_now(10), &days_from_now(15))),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["status"], "pending");
    assert_eq!(body["available_actions"], json!(["confirm", "reject"]));
    assert_eq!(body["check_in"], days_from_now(10));
}

#[tokio::test]
async fn test_submit_rejects_inverted_dates_without_writing() {
    let app = test_app().await;
    let (status, body) = send(
        &app.router,
        json_request("POST", "/v1/bookings", None, booking_body(&days_from_now(10), &days_from_now(9))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "check-out must be after check-in");

    let token = admin_token(&app).await;
    let (_, list) = send(&app.router, empty_request("GET", "/v1/admin/bookings", Some(&token))).await;
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn test_submit_rejects_guest_count() {
    let app = test_app().await;
    let mut body = booking_body(&days_from_now(3), &days_from_now(5));
    body["guests"] = json!(11);

    let (status, _) = send(&app.router, json_request("POST", "/v1/bookings", None, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_submit_reports_first_failed_rule_as_json() {
    let app = test_app().await;

    // Missing name and dates: dates are checked first
    let (status, body) = send(
        &app.router,
        json_request("POST", "/v1/bookings", None, json!({"email": "mario@example.com", "guests": 2})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "select check-in and check-out dates");

    let mut body = booking_body(&days_from_now(3), &days_from_now(5));
    body["guests"] = json!(99999999999u64);
    let (status, body) = send(&app.router, json_request("POST", "/v1/bookings", None, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "guests must be between 1 and 10");
}

#[tokio::test]
async fn test_unreadable_bodies_are_json_400() {
    let app = test_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/v1/bookings")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());

    let request = Request::builder()
        .method("POST")
        .uri("/v1/bookings")
        .body(Body::from(booking_body(&days_from_now(3), &days_from_now(5)).to_string()))
        .unwrap();
    let (status, body) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_path_and_query_are_json_400() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    for uri in [
        "/v1/admin/availability/2025-13-40/toggle",
        "/v1/admin/bookings/not-a-uuid/confirm",
    ] {
        let (status, body) = send(&app.router, empty_request("POST", uri, Some(&token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }

    for uri in ["/v1/admin/bookings?status=bogus", "/v1/availability?from=yesterday"] {
        let (status, body) = send(&app.router, empty_request("GET", uri, Some(&token))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
        assert!(body["error"].is_string(), "{}", uri);
    }
}

// ============================================================================
// Admin boundary
// ============================================================================

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = test_app().await;
    let (status, _) = send(&app.router, empty_request("GET", "/v1/admin/bookings", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app.router, empty_request("GET", "/v1/admin/bookings", Some("garbage"))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_admin_is_told_to_sign_out() {
    let app = test_app().await;
    let token = token_for(Uuid::new_v4());

    let (status, body) = send(&app.router, empty_request("GET", "/v1/admin/stats", Some(&token))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["sign_out"], true);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_confirm_then_reject_conflicts() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    let (_, created) = send(
        &app.router,
        json_request("POST", "/v1/bookings", None, booking_body(&days_from_now(20), &days_from_now(23))),
    )
    .await;
    let id = created["id"].as_str().unwrap().to_string();

    let (status, confirmed) = send(
        &app.router,
        empty_request("POST", &format!("/v1/admin/bookings/{}/confirm", id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(confirmed["status"], "confirmed");
    assert_eq!(confirmed["available_actions"], json!([]));

    let (status, _) = send(
        &app.router,
        empty_request("POST", &format!("/v1/admin/bookings/{}/reject", id), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Nights of the confirmed stay are now blocked
    let (_, availability) = send(
        &app.router,
        empty_request(
            "GET",
            &format!("/v1/availability?from={}&to={}", days_from_now(19), days_from_now(25)),
            None,
        ),
    )
    .await;
    assert_eq!(
        availability["blocked_dates"],
        json!([days_from_now(20), days_from_now(21), days_from_now(22)])
    );

    let (_, stats) = send(&app.router, empty_request("GET", "/v1/admin/stats", Some(&token))).await;
    assert_eq!(stats, json!({"pending": 0, "confirmed": 1, "rejected": 0, "blocked_days": 3}));
}

#[tokio::test]
async fn test_unknown_booking_is_404() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let (status, _) = send(
        &app.router,
        empty_request("POST", &format!("/v1/admin/bookings/{}/confirm", Uuid::new_v4()), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_filters_by_status() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    for offset in [5, 30] {
        send(
            &app.router,
            json_request(
                "POST",
                "/v1/bookings",
                None,
                booking_body(&days_from_now(offset), &days_from_now(offset + 2)),
            ),
        )
        .await;
    }

    let (_, pending) = send(&app.router, empty_request("GET", "/v1/admin/bookings?status=pending", Some(&token))).await;
    assert_eq!(pending.as_array().unwrap().len(), 2);

    let (_, rejected) = send(&app.router, empty_request("GET", "/v1/admin/bookings?status=rejected", Some(&token))).await;
    assert_eq!(rejected, json!([]));

    let (status, _) = send(&app.router, empty_request("GET", "/v1/admin/bookings?status=bogus", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_toggle_date_round_trip() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let date = days_from_now(7);
    let uri = format!("/v1/admin/availability/{}/toggle", date);

    let (status, first) = send(&app.router, empty_request("POST", &uri, Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["is_blocked"], true);

    let (_, second) = send(&app.router, empty_request("POST", &uri, Some(&token))).await;
    assert_eq!(second["is_blocked"], false);

    let today = Utc::now().date_naive().to_string();
    let (status, _) = send(
        &app.router,
        empty_request("POST", &format!("/v1/admin/availability/{}/toggle", today), Some(&token)),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Content
// ============================================================================

#[tokio::test]
async fn test_content_defaults_and_patch() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    let (status, doc) = send(&app.router, empty_request("GET", "/v1/content/home", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(doc["hero"]["title"].is_string());

    let (status, saved) = send(
        &app.router,
        json_request(
            "PATCH",
            "/v1/admin/content/home",
            Some(&token),
            json!({"path": "hero.title", "value": "Benvenuti"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(saved["updated_by"].is_string());

    let (_, title) = send(&app.router, empty_request("GET", "/v1/content/home?path=hero.title", None)).await;
    assert_eq!(title, json!("Benvenuti"));
}

#[tokio::test]
async fn test_content_errors() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    let (status, _) = send(&app.router, empty_request("GET", "/v1/content/footer", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app.router,
        json_request(
            "PATCH",
            "/v1/admin/content/home",
            Some(&token),
            json!({"path": "hero..title", "value": "x"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        json_request("PUT", "/v1/admin/content/booking", Some(&token), json!({"title": 42})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_image_upload_writes_url() {
    let app = test_app().await;
    let token = admin_token(&app).await;

    let boundary = "marina-boundary";
    let body = format!(
        "--{b}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"pool.PNG\"\r\nContent-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
        b = boundary
    );
    let request = Request::builder()
        .method("POST")
        .uri("/v1/admin/content/home/images?path=hero.image")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", boundary),
        )
        .body(Body::from(body))
        .unwrap();

    let (status, uploaded) = send(&app.router, request).await;
    assert_eq!(status, StatusCode::OK);
    let url = uploaded["url"].as_str().unwrap();
    assert!(url.starts_with("http://localhost:8080/media/"));
    assert!(url.ends_with(".png"));

    let (_, image) = send(&app.router, empty_request("GET", "/v1/content/home?path=hero.image", None)).await;
    assert_eq!(image, json!(url));
}

#[tokio::test]
async fn test_upload_only_targets_image_fields() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let (_, before) = send(&app.router, empty_request("GET", "/v1/content/home?path=hero.title", None)).await;

    let (status, body) = send(
        &app.router,
        multipart_request(
            "/v1/admin/content/home/images?path=hero.title",
            &token,
            "image/png",
            b"PNGDATA",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("hero.title"));

    let (_, after) = send(&app.router, empty_request("GET", "/v1/content/home?path=hero.title", None)).await;
    assert_eq!(after, before);
}

#[tokio::test]
async fn test_oversized_uploads_are_413() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let uri = "/v1/admin/content/home/images?path=hero.image";

    // Over the configured file limit but within the body limit
    let (status, body) = send(
        &app.router,
        multipart_request(uri, &token, "image/png", &vec![0u8; 2048]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());

    // Over the request body limit
    let (status, body) = send(
        &app.router,
        multipart_request(uri, &token, "image/png", &vec![0u8; 256 * 1024]),
    )
    .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].is_string());
}

// ============================================================================
// Change streams
// ============================================================================

#[tokio::test]
async fn test_content_stream_only_sends_its_section() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let mut stream = open_stream(&app.router, "/v1/content/home/stream", None).await;

    send(
        &app.router,
        json_request(
            "PATCH",
            "/v1/admin/content/gallery",
            Some(&token),
            json!({"path": "title", "value": "La Villa"}),
        ),
    )
    .await;
    send(
        &app.router,
        json_request(
            "PATCH",
            "/v1/admin/content/home",
            Some(&token),
            json!({"path": "hero.title", "value": "Benvenuti"}),
        ),
    )
    .await;

    let frame = next_frame(&mut stream).await;
    assert!(frame.contains("event: change"), "{}", frame);
    assert!(frame.contains("id: 2"), "{}", frame);
    assert!(frame.contains(r#""key":"home""#), "{}", frame);
    assert!(!frame.contains("gallery"), "{}", frame);
}

#[tokio::test]
async fn test_content_stream_unknown_section_is_404() {
    let app = test_app().await;
    let (status, body) = send(&app.router, empty_request("GET", "/v1/content/footer/stream", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_bookings_stream_requires_admin() {
    let app = test_app().await;

    let (status, _) = send(&app.router, empty_request("GET", "/v1/admin/bookings/stream", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let guest = token_for(Uuid::new_v4());
    let (status, body) = send(
        &app.router,
        empty_request("GET", "/v1/admin/bookings/stream", Some(&guest)),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["sign_out"], true);
}

#[tokio::test]
async fn test_bookings_stream_sends_new_requests() {
    let app = test_app().await;
    let token = admin_token(&app).await;
    let mut stream = open_stream(&app.router, "/v1/admin/bookings/stream", Some(&token)).await;

    let (_, created) = send(
        &app.router,
        json_request("POST", "/v1/bookings", None, booking_body(&days_from_now(10), &days_from_now(12))),
    )
    .await;

    let frame = next_frame(&mut stream).await;
    assert!(frame.contains("event: change"), "{}", frame);
    assert!(frame.contains("id: 1"), "{}", frame);
    assert!(frame.contains(r#""table":"bookings""#), "{}", frame);
    assert!(frame.contains(created["id"].as_str().unwrap()), "{}", frame);
}

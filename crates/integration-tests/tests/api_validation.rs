//! Request validation through the full API router.
//!
//! Every request here is rejected before any database or provider call, so
//! these tests run without external services.

use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use clients_finder_integration_tests::offline_app;
use serde_json::{Value, json};
use tower::ServiceExt;

async fn call(request: Request<Body>) -> (StatusCode, Value) {
    let response = offline_app()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("valid request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("valid request")
}

fn error_message(body: &Value) -> &str {
    body["error"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn test_liveness_needs_no_database() {
    let response = offline_app()
        .oneshot(get("/health"))
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key(header::CONTENT_TYPE));
}

// ============================================================================
// Outreach
// ============================================================================

#[tokio::test]
async fn test_send_email_requires_fields() {
    let (status, body) = call(json_request(
        "POST",
        "/api/send-email",
        &json!({ "to": "owner@example.com", "body": "Namaste" }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("subject"));
}

#[tokio::test]
async fn test_send_email_rejects_invalid_recipient() {
    let (status, body) = call(json_request(
        "POST",
        "/api/send-email",
        &json!({ "to": "owner.example.com", "subject": "Hi", "body": "Hi" }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("Invalid email address"));
}

#[tokio::test]
async fn test_send_email_without_transport_is_unavailable() {
    let (status, body) = call(json_request(
        "POST",
        "/api/send-email",
        &json!({ "to": "owner@example.com", "subject": "Hi", "body": "Hi", "useBrevo": true }),
    ))
    .await;

    // Brevo is not configured either, so the send falls back to SMTP.
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_message(&body), "SMTP is not configured");
}

#[tokio::test]
async fn test_template_send_requires_client() {
    let (status, body) = call(json_request(
        "POST",
        "/api/send-email",
        &json!({ "to": "owner@example.com", "templateId": 3 }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("clientId"));
}

// ============================================================================
// Clients and notes
// ============================================================================

#[tokio::test]
async fn test_status_update_rejects_unknown_status() {
    for body in [json!({ "status": "ARCHIVED" }), json!({})] {
        let (status, _) = call(json_request("PATCH", "/api/clients/7", &body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn test_note_content_required() {
    let (status, body) = call(json_request(
        "POST",
        "/api/clients/7/notes",
        &json!({ "content": "   " }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Note content is required");
}

#[tokio::test]
async fn test_non_numeric_client_id_is_rejected() {
    let (status, body) = call(get("/api/clients/not-a-number")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_malformed_query_is_json_error() {
    let (status, body) = call(get("/api/clients?limit=ten")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_truncated_body_is_json_error() {
    let request = Request::builder()
        .method("PATCH")
        .uri("/api/clients/1")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"status": "LEA"#))
        .expect("valid request");

    let (status, body) = call(request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_wrong_field_type_is_bad_request() {
    let (status, body) = call(json_request(
        "POST",
        "/api/send-email",
        &json!({ "to": 5, "subject": "Hi", "body": "Hi" }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).contains("invalid type"));
}

// ============================================================================
// Templates and target types
// ============================================================================

#[tokio::test]
async fn test_template_list_rejects_unknown_target_type() {
    let (status, body) = call(get("/api/templates?targetType=SOMETIMES")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Invalid targetType");
}

#[tokio::test]
async fn test_template_create_requires_fields() {
    let (status, body) = call(json_request(
        "POST",
        "/api/templates",
        &json!({ "name": "Intro", "subject": "Hello {{CLIENT_NAME}}" }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error_message(&body).starts_with("Missing required fields"));
}

#[tokio::test]
async fn test_target_type_name_required() {
    let (status, body) = call(json_request(
        "POST",
        "/api/target-types",
        &json!({ "name": "  ", "color": "#10B981" }),
    ))
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Missing required field: name");
}

// ============================================================================
// Providers not configured
// ============================================================================

#[tokio::test]
async fn test_geocode_validates_address_before_provider() {
    let (status, body) = call(json_request(
        "POST",
        "/api/clients/geocode",
        &json!({ "address": "" }),
    ))
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_message(&body), "Address is required");

    let (status, body) = call(json_request(
        "POST",
        "/api/clients/geocode",
        &json!({ "address": "Thamel, Kathmandu" }),
    ))
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_message(&body), "Geoapify is not configured");
}

#[tokio::test]
async fn test_ingestion_needs_geoapify() {
    let (status, _) = call(json_request("POST", "/api/clients/auto-fetch", &json!({}))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, _) = call(get(
        "/api/clients/search?lat=27.7172&lon=85.324&category=catering.cafe",
    ))
    .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_upload_needs_storage() {
    let boundary = "clients-finder-boundary";
    let body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"logo.png\"\r\n\
         Content-Type: image/png\r\n\r\nPNGDATA\r\n--{boundary}--\r\n"
    );
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("valid request");

    let (status, body) = call(request).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(error_message(&body), "S3 storage is not configured");
}

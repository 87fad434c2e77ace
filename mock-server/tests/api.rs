use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, app_with_state, MockState, ROUTES};
use serde_json::Value;
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes: bytes::Bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn json_request(uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn bearer(uri: &str, token: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {token}"))
        .body(String::new())
        .unwrap()
}

const ANA: &str = r#"{"email":"Ana@Example.com","username":"ana","password":"pw"}"#;

// --- health ---

#[tokio::test]
async fn health_is_ok() {
    let resp = app().oneshot(get("/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn every_listed_route_is_served() {
    for (method, path) in ROUTES {
        let uri = path
            .replace("{isbn}", "9780441013593")
            .replace("{format}", "Paperback")
            .replace("{author}", "Frank%20Herbert");
        let request = Request::builder()
            .method(*method)
            .uri(&uri)
            .header(http::header::CONTENT_TYPE, "application/json")
            .body("{}".to_string())
            .unwrap();
        let status = app().oneshot(request).await.unwrap().status();
        assert_ne!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_ne!(status, StatusCode::METHOD_NOT_ALLOWED, "{method} {uri}");
    }
}

// --- register ---

#[tokio::test]
async fn register_returns_201_with_tokens() {
    let resp = app().oneshot(json_request("/auth/register", ANA)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["user"]["email"], "ana@example.com");
    assert!(body["user"].get("password").is_none());
    assert!(body["tokens"]["access_token"].as_str().unwrap().starts_with("access-"));
    assert!(body["tokens"]["refresh_token"].as_str().unwrap().starts_with("refresh-"));
    assert!(body["tokens"]["access_expires_at_utc"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn register_missing_fields_returns_400() {
    let resp = app()
        .oneshot(json_request("/auth/register", r#"{"email":"a@b.c"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn register_duplicate_returns_409() {
    let db = Arc::new(MockState::seeded());
    let first = app_with_state(db.clone())
        .oneshot(json_request("/auth/register", ANA))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = app_with_state(db)
        .oneshot(json_request("/auth/register", ANA))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

// --- login / refresh / profile ---

#[tokio::test]
async fn login_accepts_username_or_email() {
    let db = Arc::new(MockState::seeded());
    app_with_state(db.clone())
        .oneshot(json_request("/auth/register", ANA))
        .await
        .unwrap();

    for who in ["ana", "ana@example.com"] {
        let body = format!(r#"{{"email":"{who}","username":"{who}","password":"pw"}}"#);
        let resp = app_with_state(db.clone())
            .oneshot(json_request("/auth/login", &body))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "login as {who}");
    }

    let resp = app_with_state(db)
        .oneshot(json_request("/auth/login", r#"{"email":"ana","username":"ana","password":"wrong"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_and_profile_flow() {
    let db = Arc::new(MockState::seeded());
    let resp = app_with_state(db.clone())
        .oneshot(json_request("/auth/register", ANA))
        .await
        .unwrap();
    let tokens = body_json(resp).await["tokens"].clone();
    let refresh_token = tokens["refresh_token"].as_str().unwrap();

    let resp = app_with_state(db.clone())
        .oneshot(json_request(
            "/auth/refresh",
            &format!(r#"{{"refresh_token":"{refresh_token}"}}"#),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let refreshed = body_json(resp).await;
    assert!(refreshed.get("refresh_token").is_none());
    let access = refreshed["access_token"].as_str().unwrap().to_string();
    assert_ne!(access, tokens["access_token"].as_str().unwrap());

    let resp = app_with_state(db.clone())
        .oneshot(bearer("/api/profile", &access))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["user"]["username"], "ana");

    let recorded = db.recorded();
    assert_eq!(recorded.len(), 3);
    assert_eq!(recorded[2].path, "/api/profile");
    assert_eq!(recorded[2].authorization.as_deref(), Some(format!("Bearer {access}").as_str()));
}

#[tokio::test]
async fn refresh_unknown_token_returns_401() {
    let resp = app()
        .oneshot(json_request("/auth/refresh", r#"{"refresh_token":"forged"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn profile_without_token_returns_401() {
    let resp = app().oneshot(get("/api/profile")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let resp = app().oneshot(bearer("/api/profile", "nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- catalog ---

#[tokio::test]
async fn books_are_served_as_xml() {
    let resp = app().oneshot(get("/api/books")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(http::header::CONTENT_TYPE).unwrap(),
        "application/xml"
    );
    let xml = body_text(resp).await;
    assert!(xml.starts_with("<?xml"));
    assert_eq!(xml.matches("<book ").count(), 3);
    assert!(xml.contains(r#"<book isbn="9780441013593"><title>Dune</title>"#));
}

#[tokio::test]
async fn books_filters_match_or_404() {
    let resp = app().oneshot(get("/api/books/isbn/9780547928227")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_text(resp).await.matches("<book ").count(), 1);

    let resp = app().oneshot(get("/api/books/author/frank%20herbert")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_text(resp).await.contains("Dune"));

    let resp = app().oneshot(get("/api/books/format/vinyl")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(body_text(resp).await.contains("<message>"));
}

#[tokio::test]
async fn catalog_outage_returns_500() {
    let db = Arc::new(MockState::seeded());
    db.set_catalog_down(true);
    let resp = app_with_state(db.clone()).oneshot(get("/api/books")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

    db.set_catalog_down(false);
    let resp = app_with_state(db).oneshot(get("/api/books")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

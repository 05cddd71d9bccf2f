use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header::{CONTENT_TYPE, LOCATION}, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::ServiceExt;
use tower_sessions::{MemoryStore, SessionManagerLayer};

use crate::{
    auth::{Clients, PrivilegePolicy},
    config::Config,
    db, router, AppState,
};

const FIREFOX: &str = "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0";

struct Everyone;

impl PrivilegePolicy for Everyone {
    fn is_privileged(&self, _email: Option<&str>) -> bool {
        true
    }
}

async fn state() -> AppState {
    let config = Config { admin_email: Some("owner@example.com".to_owned()), ..Config::default() };
    AppState::new(&config, db::memory_pool().await, Clients::default())
}

fn app(app_state: AppState) -> Router {
    router(app_state).layer(SessionManagerLayer::new(MemoryStore::default()))
}

fn form(uri: &str, ip: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .header("x-forwarded-for", ip)
        .header("user-agent", FIREFOX)
        .body(Body::from(body.to_owned()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

async fn post_comment(app: &Router, ip: &str, nickname: &str) -> (StatusCode, Value) {
    let body = format!("nickname={nickname}&password=pw1234&content=hello&project_slug=portfolio");
    send(app, form("/comments", ip, &body)).await
}

#[tokio::test]
async fn test_post_then_list() {
    let app = app(state().await);

    let (status, body) = post_comment(&app, "198.51.100.1", "visitor").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, page) = send(&app, get("/comments?project_slug=portfolio")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["has_more"], false);
    assert_eq!(page["roots"].as_array().unwrap().len(), 1);
    assert_eq!(page["replies"].as_array().unwrap().len(), 0);

    let root = &page["roots"][0];
    assert_eq!(root["nickname"], "visitor");
    assert_eq!(root["browser"], "Firefox 121.0");
    assert!(root.get("password").is_none());
    assert!(root.get("ip_address").is_none());
}

#[tokio::test]
async fn test_reply_shows_up_under_root() {
    let app = app(state().await);
    let (_, body) = post_comment(&app, "198.51.100.1", "visitor").await;
    let root_id = body["id"].as_str().unwrap().to_owned();

    let reply = format!("nickname=replier&password=pw&content=thanks&project_slug=portfolio&parent_id={root_id}");
    let (status, _) = send(&app, form("/comments", "198.51.100.2", &reply)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = send(&app, get("/comments?project_slug=portfolio&page=1&page_size=5&sort=asc")).await;
    assert_eq!(page["roots"].as_array().unwrap().len(), 1);
    assert_eq!(page["replies"][0]["parent_id"], root_id.as_str());
}

#[tokio::test]
async fn test_validation_errors_are_bad_requests() {
    let app = app(state().await);
    let (status, body) = post_comment(&app, "198.51.100.1", "abcdefghijk").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Nicknames can be at most 10 characters");
}

#[tokio::test]
async fn test_reply_to_missing_parent_is_a_storage_error() {
    let app = app(state().await);
    let orphan = format!("nickname=orphan&password=pw&content=hi&project_slug=portfolio&parent_id={}", uuid::Uuid::now_v7());

    let (status, body) = send(&app, form("/comments", "198.51.100.1", &orphan)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().ends_with("(787)"));
}

#[tokio::test]
async fn test_logout_only_redirects_on_site() {
    let app = app(state().await);
    for (return_url, expected) in [
        ("/comments", "/comments"),
        ("//evil.example/phish", "/"),
        ("/%5Cevil.example", "/"),
        ("https://evil.example", "/"),
    ] {
        let response = app.clone().oneshot(get(&format!("/logout?return_url={return_url}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], expected, "return_url={return_url}");
    }
}

#[tokio::test]
async fn test_flood_control_over_http() {
    let app = app(state().await);
    for nickname in ["one", "two", "three"] {
        let (status, _) = post_comment(&app, "203.0.113.9, 10.0.0.1", nickname).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, body) = post_comment(&app, "203.0.113.9", "four").await;
    assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_duplicate_and_reserved_nicknames() {
    let app = app(state().await);
    post_comment(&app, "198.51.100.1", "visitor").await;

    let (status, _) = post_comment(&app, "198.51.100.2", "visitor").await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = post_comment(&app, "198.51.100.3", "admin").await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_delete_checks_password() {
    let app = app(state().await);
    let (_, body) = post_comment(&app, "198.51.100.1", "visitor").await;
    let id = body["id"].as_str().unwrap().to_owned();
    let uri = format!("/comments/{id}/delete");

    let (status, body) = send(&app, form(&uri, "198.51.100.1", "password=nope")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Password does not match");

    let (status, body) = send(&app, form(&uri, "198.51.100.1", "password=pw1234")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, page) = send(&app, get("/comments?project_slug=portfolio")).await;
    assert_eq!(page["roots"][0]["is_deleted"], true);
    assert_eq!(page["roots"][0]["nickname"], "Unknown");
}

#[tokio::test]
async fn test_delete_unknown_comment() {
    let app = app(state().await);
    let (status, _) = send(&app, form("/comments/nothing-here/delete", "198.51.100.1", "password=x")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_listing_requires_privilege() {
    let app_state = state().await;
    let anonymous = app(app_state.clone());

    let (status, _) = send(&anonymous, get("/admin/comments")).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, session) = send(&anonymous, get("/session")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(session["admin"], false);
    assert_eq!(session["email"], Value::Null);

    post_comment(&anonymous, "198.51.100.1", "visitor").await;

    let admin = app(AppState { policy: Arc::new(Everyone), ..app_state });
    let (status, all) = send(&admin, get("/admin/comments")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all[0]["nickname"], "visitor");
    assert_eq!(all[0]["ip_address"], "198.51.100.1");
    assert!(all[0].get("password").is_none());
}

#[tokio::test]
async fn test_admin_posts_under_admin_nickname() {
    let app_state = state().await;
    let admin = app(AppState { policy: Arc::new(Everyone), ..app_state });

    let (status, _) = post_comment(&admin, "198.51.100.1", "admin").await;
    assert_eq!(status, StatusCode::OK);

    let (_, page) = send(&admin, get("/comments?project_slug=portfolio")).await;
    assert_eq!(page["roots"][0]["nickname"], crate::config::DEFAULT_ADMIN_NICKNAME);
}

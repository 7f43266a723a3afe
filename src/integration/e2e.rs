//! End-to-end integration tests
//!
//! Requests go through the full router: body collection, dispatch, binding
//! resolution, handler loading and the cache.

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use tower::util::ServiceExt;

use crate::config::Binding;
use crate::integration::fixtures::{shout_init_count, TestSite};

async fn get(app: &Router, uri: &str) -> Response {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn shout_bindings() -> Vec<Binding> {
    vec![
        Binding::new("/shout/", "shout.toml"),
        Binding::new("/shout/raw/", "raw.toml"),
        Binding::new("/api/", "api.toml"),
    ]
}

fn site_with_modules() -> TestSite {
    let site = TestSite::new();
    site.manifest("shout", "shout")
        .manifest("raw", "passthrough")
        .manifest("api", "api");
    site
}

#[tokio::test]
async fn test_serves_raw_file() {
    let site = TestSite::new();
    site.resource("css/site.css", "body { color: red }");
    let app = site.app(vec![]);

    let response = get(&app, "/css/site.css").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "text/css");
    assert_eq!(response.headers()[header::CACHE_CONTROL], "max-age=60");
    assert_eq!(body_text(response).await, "body { color: red }");
}

#[tokio::test]
async fn test_directory_index_fallback() {
    let site = TestSite::new();
    site.resource("index.html", "home");
    site.resource("docs/index.html", "plain docs");
    let app = site.app(vec![]);

    assert_eq!(body_text(get(&app, "/").await).await, "home");
    assert_eq!(body_text(get(&app, "/docs/").await).await, "plain docs");

    // Template index takes precedence once it exists
    site.resource("docs/index.tmpl", "template docs");
    assert_eq!(body_text(get(&app, "/docs").await).await, "template docs");
}

#[tokio::test]
async fn test_unbound_missing_is_not_found() {
    let site = TestSite::new();
    site.resource("empty/.keep", "");
    let app = site.app(vec![]);

    assert_eq!(get(&app, "/nope.html").await.status(), StatusCode::NOT_FOUND);
    // Directory with no index
    assert_eq!(get(&app, "/empty/").await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_traversal_rejected_even_if_target_exists() {
    let site = TestSite::new();
    std::fs::write(site.outside().join("secret.txt"), "secret").unwrap();
    let app = site.app(vec![]);

    for uri in ["/../secret.txt", "/%2e%2e/secret.txt", "/a/../../secret.txt"] {
        let response = get(&app, uri).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert!(!body_text(response).await.contains("secret"));
    }
}

#[tokio::test]
async fn test_virtual_api_requests() {
    let site = site_with_modules();
    let app = site.app(shout_bindings());

    let response = get(&app, "/api/magicNumber").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "42");

    let response = get(&app, "/api/").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "HELLO FROM AN API FUNCTION!");
}

#[tokio::test]
async fn test_declining_handler_without_status_is_empty_ok() {
    let site = site_with_modules();
    site.resource("api/readme.txt", "docs for the api");
    let app = site.app(shout_bindings());

    let response = get(&app, "/api/readme.txt").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "");
}

#[tokio::test]
async fn test_most_specific_binding_wins() {
    let site = site_with_modules();
    site.resource("shout/hello.txt", "hello");
    site.resource("shout/raw/hello.txt", "hello");
    site.resource("shout_other/hello.txt", "hello");
    let app = site.app(shout_bindings());

    assert_eq!(body_text(get(&app, "/shout/hello.txt").await).await, "HELLO");
    // Pass-through binding opts the subtree out of the parent handler
    assert_eq!(body_text(get(&app, "/shout/raw/hello.txt").await).await, "hello");
    // A shared leading string is not a shared path segment
    assert_eq!(body_text(get(&app, "/shout_other/hello.txt").await).await, "hello");

    assert_eq!(
        body_text(get(&app, "/shout/nowhere").await).await,
        "VIRTUAL /shout/nowhere"
    );
    assert_eq!(
        get(&app, "/shout/raw/nowhere").await.status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn test_load_error_is_retried() {
    let site = TestSite::new();
    let app = site.app(vec![Binding::new("/late/", "late.toml")]);

    let response = get(&app, "/late/x").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    site.manifest("late", "shout");
    let response = get(&app, "/late/x").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "VIRTUAL /late/x");
}

#[tokio::test]
async fn test_invalid_handler_keeps_failing() {
    let site = TestSite::new();
    site.manifest("broken", "broken");
    let app = site.app(vec![Binding::new("/broken/", "broken.toml")]);

    for _ in 0..2 {
        assert_eq!(
            get(&app, "/broken/x").await.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
    assert_eq!(shout_init_count(&site), 0);
}

#[tokio::test]
async fn test_concurrent_first_requests_init_once() {
    let site = site_with_modules();
    site.resource("shout/a.txt", "a");
    let app = site.app(shout_bindings());

    let mut tasks = Vec::new();
    for i in 0..32 {
        let app = app.clone();
        let uri = if i % 2 == 0 { "/shout/a.txt" } else { "/shout/virtual" };
        tasks.push(tokio::spawn(async move { get(&app, uri).await.status() }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap(), StatusCode::OK);
    }

    assert_eq!(shout_init_count(&site), 1);
}

#[tokio::test]
async fn test_status_endpoints() {
    let site = TestSite::new();
    let app = site.app(vec![]);

    assert_eq!(body_text(get(&app, "/_status/health").await).await, "OK");
    assert!(body_text(get(&app, "/_status/version").await)
        .await
        .starts_with("modweb v"));
}

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use media_store::MediaStore;
use serde_json::Value;
use server::auth::AuthManager;
use server::config::{AppState, ServerConfig};
use server::profile::store::ProfileManager;
use server::router::router;
use tempfile::{tempdir, TempDir};
use tower::ServiceExt;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\x00\x00\x00\rIHDR fake image data";

async fn app_state() -> (TempDir, AppState) {
    let dir = tempdir().unwrap();
    let config = ServerConfig::with_base_dir(dir.path());
    config.ensure_dirs().await.unwrap();

    let auth = Arc::new(AuthManager::new(&config.data_dir).await.unwrap());
    let profiles = Arc::new(ProfileManager::new(&config.data_dir).await.unwrap());
    let media = Arc::new(MediaStore::new(&config.media_dir).await.unwrap());

    let state = AppState {
        config,
        auth,
        profiles,
        media,
    };

    (dir, state)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(res: Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let (_dir, state) = app_state().await;
    let app = router(state);

    let res = app.oneshot(get("/customer-profile")).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["message"], "No auth token found");
}

#[tokio::test]
async fn test_non_bearer_scheme_is_unauthorized() {
    let (_dir, state) = app_state().await;
    let app = router(state);

    let mut req = get("/customer-profile");
    req.headers_mut()
        .insert(header::AUTHORIZATION, "Token abc".parse().unwrap());
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["message"], "Auth token wrong format");
}

#[tokio::test]
async fn test_unknown_bearer_token_is_unauthorized() {
    let (_dir, state) = app_state().await;
    let app = router(state);

    let mut req = get("/customer-profile");
    req.headers_mut().insert(
        header::AUTHORIZATION,
        "Bearer no-such-token".parse().unwrap(),
    );
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(res).await;
    assert_eq!(body["message"], "Invalid or expired session");
}

#[tokio::test]
async fn test_valid_bearer_token_reaches_handler() {
    let (_dir, state) = app_state().await;

    let user = state
        .auth
        .ensure_user("ada@example.com", "ada")
        .await
        .unwrap();
    let session = state.auth.issue_session(&user.id).await.unwrap();

    let app = router(state);

    // The caller has no profile yet, so a pass through the middleware
    // surfaces the handler's 404 rather than a 401.
    let mut req = get("/customer-profile");
    req.headers_mut().insert(
        header::AUTHORIZATION,
        format!("Bearer {}", session.token).parse().unwrap(),
    );
    let res = app.oneshot(req).await.unwrap();

    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert_eq!(body["message"], "Profile not found");
}

#[tokio::test]
async fn test_health_check_is_public() {
    let (_dir, state) = app_state().await;
    let app = router(state);

    let res = app.oneshot(get("/health")).await.unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"OK - Customer Profile Server");
}

#[tokio::test]
async fn test_stored_media_served_without_auth() {
    let (_dir, state) = app_state().await;

    let path = state
        .media
        .store("profile_images", "png", PNG)
        .await
        .unwrap();

    let app = router(state);

    let res = app
        .clone()
        .oneshot(get(&format!("/storage/{}", path)))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers().get(header::CONTENT_TYPE).unwrap(),
        "image/png"
    );
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], PNG);

    let res = app
        .oneshot(get("/storage/profile_images/missing.png"))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

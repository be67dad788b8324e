use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{HeaderMap, Request, StatusCode, header::AUTHORIZATION},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde_json::Value;
use tower::ServiceExt;
use wavepipe::db::{self, Backend, Entity, SqliteBackend, User};
use wavepipe::error::{AuthError, ClientError, StoreError};
use wavepipe::router::{AppState, wavepipe_router};
use wavepipe::service::{AuthMethod, Authenticated};

async fn seed(db: &dyn Backend) -> Result<(), StoreError> {
    let mut alice = User::with_username("alice");
    alice.set_password("wonder", 4)?;
    alice.save(db).await?;

    let mut broken = User::with_username("mallory");
    broken.password = "$2b$04$truncated".to_string();
    broken.save(db).await
}

async fn send(app: &Router, uri: &str, auth: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(auth) = auth {
        builder = builder.header(AUTHORIZATION, auth);
    }
    let resp = app
        .clone()
        .oneshot(builder.body(Body::empty()).expect("failed to build request"))
        .await
        .expect("request failed");

    let status = resp.status();
    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let json: Value = serde_json::from_slice(&body).expect("response body was not json");
    (status, json)
}

fn basic(credentials: &str) -> String {
    format!("Basic {}", STANDARD.encode(credentials))
}

#[tokio::test]
async fn login_route_maps_outcomes_to_status_codes() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database_url = format!("sqlite:{}", dir.path().join("wavepipe.db").display());

    db::with_backend(SqliteBackend::new(), &database_url, |backend| async move {
        seed(backend.as_ref()).await?;
        let backend: Arc<dyn Backend> = backend;
        let app = wavepipe_router(AppState::new(backend));

        let (status, json) = send(&app, "/api/login", Some(&basic("alice:wonder"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["username"], "alice");
        assert!(json["user"].get("password").is_none());
        assert!(json["session"].is_null());
        assert!(json["error"].is_null());

        let (status, json) = send(&app, "/api/login?u=alice&p=wonder", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["user"]["username"], "alice");

        let (status, json) = send(&app, "/api/login", Some(&basic("alice:wrong"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "invalid password");

        let (status, json) = send(&app, "/api/login?u=bob&p=x", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "invalid username");

        let (status, json) = send(&app, "/api/login", Some(&basic("alice:"))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "missing password");

        let (status, json) = send(&app, "/api/login", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["message"], "missing username");

        let (status, json) = send(&app, "/api/login", Some(&basic("mallory:secret"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"]["code"], "INTERNAL_ERROR");
        let message = json["error"]["message"].as_str().unwrap_or_default();
        assert!(!message.contains("hash"), "server details leaked: {message}");

        Ok::<_, StoreError>(())
    })
    .await
    .expect("route scenario");
}

/// Accepts only the query `u=guest`, without touching storage.
struct GuestOnly;

#[async_trait]
impl AuthMethod for GuestOnly {
    async fn authenticate(
        &self,
        _headers: &HeaderMap,
        query: Option<&str>,
    ) -> Result<Authenticated, AuthError> {
        if query == Some("u=guest") {
            Ok(Authenticated {
                user: User::with_username("guest"),
                session: None,
            })
        } else {
            Err(ClientError::InvalidUsername.into())
        }
    }
}

#[tokio::test]
async fn router_state_needs_only_an_auth_method() {
    let app = wavepipe_router(AppState {
        auth: Arc::new(GuestOnly),
    });

    let (status, json) = send(&app, "/api/login?u=guest", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user"]["username"], "guest");

    let (status, json) = send(&app, "/api/login?u=alice", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["error"]["message"], "invalid username");
}

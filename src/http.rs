//! HTTP surface
//!
//! | Method | Path             | Success                    | Failure                    |
//! |--------|------------------|----------------------------|----------------------------|
//! | POST   | `/auth/login`    | 200 `{role, userId}`       | 401 generic, 429 locked    |
//! | POST   | `/auth/register` | 201 public user view       | 403, 409, 422              |
//! | GET    | `/health`        | 200 `OK`                   |                            |
//!
//! Argon2 work runs on the blocking pool so it never stalls the runtime.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use thiserror::Error;

use crate::config::TutorhubConfig;
use crate::error::{self as app_error, AccessError, AppError, ErrorConfig};
use crate::layers::HardenedRouter;
use crate::observability::SecurityEvent;
use crate::role::Role;
use crate::store::{CredentialStore, UserView};
use crate::verifier::{Authenticated, CredentialVerifier};

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    verifier: CredentialVerifier,
}

impl AppState {
    pub fn new(verifier: CredentialVerifier) -> Self {
        Self { verifier }
    }

    /// Open the configured store and attach the configured lockout
    pub fn from_config(config: &TutorhubConfig) -> Result<Self, AccessError> {
        let policy = config.password_policy();
        let store = match &config.store_path {
            Some(path) => CredentialStore::open(path, policy)?,
            None => CredentialStore::in_memory_with_policy(policy),
        };

        let mut verifier = CredentialVerifier::new(Arc::new(store));
        if let Some(lockout) = &config.lockout {
            verifier = verifier.with_lockout(lockout.clone());
        }
        Ok(Self::new(verifier))
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        self.verifier.store()
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub secret: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub secret: String,
    /// Parsed by the handler so an unknown role is a client error
    pub role: String,
}

/// Routes without hardening layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/health", get(health))
        .with_state(state)
}

/// Routes wrapped in the configured hardening layers
pub fn app(state: AppState, config: &TutorhubConfig) -> Router {
    router(state).with_hardening(config)
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<Authenticated>, AppError> {
    let verifier = state.verifier.clone();
    let outcome = run_blocking(move || verifier.verify(&req.identifier, &req.secret)).await?;
    Ok(Json(outcome))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserView>), AppError> {
    let role: Role = req.role.parse().map_err(|e: AccessError| {
        AppError::validation(e.to_string())
    })?;

    if role == Role::Administrator {
        crate::security_event!(
            SecurityEvent::AccessDenied,
            email = %req.email,
            "Administrator self-registration refused"
        );
        return Err(AppError::forbidden("Administrators are created by operators"));
    }

    let store = Arc::clone(state.store());
    let user = run_blocking(move || {
        store.create(&req.first_name, &req.last_name, &req.email, &req.secret, role)
    })
    .await?;

    Ok((StatusCode::CREATED, Json(user.view())))
}

async fn health() -> &'static str {
    "OK"
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AccessError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::internal("Worker task failed", e))?
        .map_err(AppError::from)
}

// ============================================================================
// Server
// ============================================================================

/// Failures starting or running the server
#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Store(#[from] AccessError),

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Serve until Ctrl-C
///
/// Error bodies follow [`ErrorConfig::from_env`], installed here unless the
/// embedding application already called [`crate::error::init`].
pub async fn serve(config: TutorhubConfig) -> Result<(), ServeError> {
    app_error::init(ErrorConfig::from_env());

    let state = AppState::from_config(&config)?;
    let users = state.store().len();
    let app = app(state, &config);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .map_err(|source| ServeError::Bind {
            addr: config.bind_addr.clone(),
            source,
        })?;

    tracing::info!(
        addr = %config.bind_addr,
        users,
        lockout = config.lockout.is_some(),
        persistent = config.store_path.is_some(),
        expose_error_details = app_error::config().expose_details,
        "tutorhub listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("tutorhub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::login::LockoutPolicy;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use axum::response::Response;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn state() -> AppState {
        let store = Arc::new(CredentialStore::in_memory());
        store
            .create("Jane", "Doe", "jane@example.com", "secret123", Role::Student)
            .unwrap();
        AppState::new(CredentialVerifier::new(store))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> Response {
        app.oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_login_success() {
        let state = state();
        let id = state.store().find_by_email("jane@example.com").unwrap().id;

        let response = post_json(
            router(state),
            "/auth/login",
            json!({"identifier": "jane@example.com", "secret": "secret123"}),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"role": "student", "userId": id}));
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let app = router(state());

        let wrong = post_json(
            app.clone(),
            "/auth/login",
            json!({"identifier": "jane@example.com", "secret": "wrong"}),
        )
        .await;
        let unknown = post_json(
            app,
            "/auth/login",
            json!({"identifier": "ghost@example.com", "secret": "secret123"}),
        )
        .await;

        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

        let wrong = body_json(wrong).await;
        assert_eq!(
            wrong,
            json!({"error": "unauthorized", "message": "invalid credentials"})
        );
        assert_eq!(wrong, body_json(unknown).await);
    }

    #[tokio::test]
    async fn test_login_lockout() {
        let store = Arc::new(CredentialStore::in_memory());
        let verifier = CredentialVerifier::new(store)
            .with_lockout(LockoutPolicy::builder().max_attempts(1).build());
        let app = router(AppState::new(verifier));

        let body = json!({"identifier": "jane@example.com", "secret": "wrong"});
        let first = post_json(app.clone(), "/auth/login", body.clone()).await;
        assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

        let second = post_json(app, "/auth/login", body).await;
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert!(second.headers().contains_key(header::RETRY_AFTER));
    }

    #[tokio::test]
    async fn test_register() {
        let state = state();
        let app = router(state.clone());

        let response = post_json(
            app.clone(),
            "/auth/register",
            json!({
                "firstName": "John",
                "lastName": "Roe",
                "email": "John@Example.com",
                "secret": "secret456",
                "role": "tutor"
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["email"], "john@example.com");
        assert_eq!(body["role"], "tutor");
        assert!(body.get("passwordHash").is_none());
        assert!(state.store().find_by_email("john@example.com").is_some());

        let login = post_json(
            app,
            "/auth/login",
            json!({"identifier": "john@example.com", "secret": "secret456"}),
        )
        .await;
        assert_eq!(login.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_register_failures() {
        let app = router(state());
        let request = |email: &str, secret: &str, role: &str| {
            json!({
                "firstName": "Jane",
                "lastName": "Doe",
                "email": email,
                "secret": secret,
                "role": role
            })
        };

        let duplicate = post_json(
            app.clone(),
            "/auth/register",
            request("jane@example.com", "secret123", "student"),
        )
        .await;
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);

        let bad_email = post_json(
            app.clone(),
            "/auth/register",
            request("jane", "secret123", "student"),
        )
        .await;
        assert_eq!(bad_email.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let weak = post_json(
            app.clone(),
            "/auth/register",
            request("new@example.com", "123", "student"),
        )
        .await;
        assert_eq!(weak.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let unknown_role = post_json(
            app.clone(),
            "/auth/register",
            request("new@example.com", "secret123", "staff"),
        )
        .await;
        assert_eq!(unknown_role.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let admin = post_json(
            app,
            "/auth/register",
            request("new@example.com", "secret123", "administrator"),
        )
        .await;
        assert_eq!(admin.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_health_through_hardening() {
        let app = app(state(), &TutorhubConfig::default());
        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
    }

    #[test]
    fn test_state_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let config = TutorhubConfig::builder()
            .store_path(dir.path().join("users.json"))
            .lockout(LockoutPolicy::default())
            .build();

        let state = AppState::from_config(&config).unwrap();
        assert!(state.store().path().is_some());
        assert!(state.verifier.tracker().is_some());
    }
}

//! HTTP handlers for auth routes.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use dealflow_core::auth::{
    hash_password, new_session, verify_password, AuthError as CoreError, SessionId,
};
use dealflow_core::user::{RegisterRequest, User};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::extractors::{session_token, CurrentUser};
use crate::AuthState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Body returned by a successful login.
///
/// `token` is the session id, usable as a bearer token by API clients.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Creates the auth router with all authentication routes.
///
/// Routes:
/// - `POST /auth/login` - Exchange username and password for a session
/// - `POST /auth/register` - Self-service sign-up (when enabled)
/// - `POST /auth/logout` - End current session
/// - `POST /auth/logout-all` - End all sessions for current user
/// - `GET /auth/me` - Get current authenticated user
pub fn auth_routes() -> Router<AuthState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/logout", post(logout))
        .route("/auth/logout-all", post(logout_all))
        .route("/auth/me", get(me))
}

async fn login(
    State(state): State<AuthState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AuthError> {
    let mut user = state
        .users
        .get_user_by_username(request.username.trim())
        .await?
        .ok_or(CoreError::InvalidCredentials)?;

    let stored_hash = state
        .users
        .get_password_hash(user.id)
        .await?
        .ok_or(CoreError::InvalidCredentials)?;

    let password = request.password;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))??;
    if !valid {
        tracing::info!(username = %user.username, "Rejected login");
        return Err(CoreError::InvalidCredentials.into());
    }

    let now = Utc::now();
    user.last_active = Some(now);
    state.users.update_user(&user).await?;

    let session = new_session(user.id, now, state.config.session_ttl_chrono());
    state.sessions.create_session(&session).await?;
    tracing::info!(user_id = %user.id, "User logged in");

    let cookie = Cookie::build((state.config.cookie_name.clone(), session.id.to_string()))
        .path("/")
        .http_only(true)
        .secure(state.config.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(
            state.config.session_ttl.as_secs() as i64
        ))
        .build();

    let response = LoginResponse {
        user,
        token: session.id.to_string(),
        expires_at: session.expires_at,
    };
    Ok((jar.add(cookie), Json(response)))
}

async fn register(
    State(state): State<AuthState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>), AuthError> {
    if !state.config.allow_registration {
        return Err(AuthError::RegistrationDisabled);
    }

    let request = request.into_create_request();
    request.validate()?;
    let user = request.to_user();

    let password = request.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| CoreError::Storage(e.to_string()))?;

    state.users.create_user(&user, &password_hash).await?;
    tracing::info!(user_id = %user.id, username = %user.username, "User registered");

    Ok((StatusCode::CREATED, Json(user)))
}

async fn logout(
    State(state): State<AuthState>,
    CurrentUser(user): CurrentUser,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<CookieJar, AuthError> {
    if let Some(token) = session_token(&headers, &state.config.cookie_name) {
        state.sessions.delete_session(&SessionId::new(token)).await?;
    }
    tracing::info!(user_id = %user.id, "User logged out");

    Ok(remove_session_cookie(&state, jar))
}

async fn logout_all(
    State(state): State<AuthState>,
    CurrentUser(user): CurrentUser,
    jar: CookieJar,
) -> Result<CookieJar, AuthError> {
    state.sessions.delete_user_sessions(user.id).await?;
    tracing::info!(user_id = %user.id, "Ended all sessions");

    Ok(remove_session_cookie(&state, jar))
}

async fn me(CurrentUser(user): CurrentUser) -> Json<User> {
    Json(user)
}

fn remove_session_cookie(state: &AuthState, jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(state.config.cookie_name.clone()).path("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuthConfig, InMemorySessionStore};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header, Request};
    use dealflow_core::auth::{hash_password_with_iterations, SessionRepository};
    use dealflow_core::storage::{RepositoryError, Result as RepoResult, UserRepository};
    use dealflow_core::user::UserRole;
    use http_body_util::BodyExt;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::ServiceExt;
    use uuid::Uuid;

    /// Minimal user store keyed by id.
    #[derive(Default)]
    struct TestUsers {
        users: RwLock<HashMap<Uuid, (User, String)>>,
    }

    #[async_trait]
    impl UserRepository for TestUsers {
        async fn get_user(&self, id: Uuid) -> RepoResult<Option<User>> {
            Ok(self.users.read().await.get(&id).map(|(u, _)| u.clone()))
        }

        async fn get_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|(u, _)| u.username.eq_ignore_ascii_case(username))
                .map(|(u, _)| u.clone()))
        }

        async fn get_user_by_email(&self, email: &str) -> RepoResult<Option<User>> {
            Ok(self
                .users
                .read()
                .await
                .values()
                .find(|(u, _)| u.email.eq_ignore_ascii_case(email))
                .map(|(u, _)| u.clone()))
        }

        async fn list_users(&self) -> RepoResult<Vec<User>> {
            Ok(self.users.read().await.values().map(|(u, _)| u.clone()).collect())
        }

        async fn create_user(&self, user: &User, password_hash: &str) -> RepoResult<()> {
            let mut users = self.users.write().await;
            if users
                .values()
                .any(|(u, _)| u.username.eq_ignore_ascii_case(&user.username))
            {
                return Err(RepositoryError::AlreadyExists {
                    entity_type: "User",
                    id: user.username.clone(),
                });
            }
            users.insert(user.id, (user.clone(), password_hash.to_string()));
            Ok(())
        }

        async fn update_user(&self, user: &User) -> RepoResult<()> {
            let mut users = self.users.write().await;
            match users.get_mut(&user.id) {
                Some(entry) => {
                    entry.0 = user.clone();
                    Ok(())
                }
                None => Err(RepositoryError::NotFound {
                    entity_type: "User",
                    id: user.id.to_string(),
                }),
            }
        }

        async fn delete_user(&self, id: Uuid) -> RepoResult<()> {
            self.users.write().await.remove(&id);
            Ok(())
        }

        async fn get_password_hash(&self, id: Uuid) -> RepoResult<Option<String>> {
            Ok(self.users.read().await.get(&id).map(|(_, h)| h.clone()))
        }

        async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> RepoResult<()> {
            if let Some(entry) = self.users.write().await.get_mut(&id) {
                entry.1 = password_hash.to_string();
            }
            Ok(())
        }
    }

    struct Fixture {
        state: AuthState,
        sessions: Arc<InMemorySessionStore>,
        users: Arc<TestUsers>,
        user: User,
    }

    async fn fixture(config: AuthConfig) -> Fixture {
        let users = Arc::new(TestUsers::default());
        let sessions = Arc::new(InMemorySessionStore::new());
        let user = User::new("jdoe", "Jane Doe", "jane@example.com", UserRole::Partner);
        users
            .create_user(&user, &hash_password_with_iterations("correct horse", 1_000))
            .await
            .unwrap();

        Fixture {
            state: AuthState::new(sessions.clone(), users.clone(), config),
            sessions,
            users,
            user,
        }
    }

    fn app(state: AuthState) -> Router {
        auth_routes().with_state(state)
    }

    fn json_request(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn login_token(state: &AuthState) -> String {
        let response = app(state.clone())
            .oneshot(json_request(
                "/auth/login",
                serde_json::json!({"username": "jdoe", "password": "correct horse"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        json["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_updates_last_active() {
        let fx = fixture(AuthConfig::default()).await;

        let response = app(fx.state.clone())
            .oneshot(json_request(
                "/auth/login",
                serde_json::json!({"username": "JDoe", "password": "correct horse"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("dealflow_session="));
        assert!(cookie.contains("HttpOnly"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["user"]["username"], "jdoe");
        assert!(json.get("password_hash").is_none());

        let token = json["token"].as_str().unwrap().to_string();
        assert!(fx
            .sessions
            .get_session(&SessionId::new(token))
            .await
            .unwrap()
            .is_some());

        let stored = fx.users.get_user(fx.user.id).await.unwrap().unwrap();
        assert!(stored.last_active.is_some());
    }

    #[tokio::test]
    async fn test_login_wrong_password_is_unauthorized() {
        let fx = fixture(AuthConfig::default()).await;

        let response = app(fx.state.clone())
            .oneshot(json_request(
                "/auth/login",
                serde_json::json!({"username": "jdoe", "password": "wrong"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["error"], "invalid username or password");
    }

    #[tokio::test]
    async fn test_login_unknown_user_gets_same_error() {
        let fx = fixture(AuthConfig::default()).await;

        let response = app(fx.state)
            .oneshot(json_request(
                "/auth/login",
                serde_json::json!({"username": "ghost", "password": "correct horse"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_with_bearer_token() {
        let fx = fixture(AuthConfig::default()).await;
        let token = login_token(&fx.state).await;

        let response = app(fx.state)
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header(header::AUTHORIZATION, format!("Bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["id"], fx.user.id.to_string());
    }

    #[tokio::test]
    async fn test_me_without_session_is_unauthorized() {
        let fx = fixture(AuthConfig::default()).await;

        let response = app(fx.state)
            .oneshot(Request::builder().uri("/auth/me").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_removed() {
        let fx = fixture(AuthConfig::default()).await;
        let past = Utc::now() - chrono::Duration::days(10);
        let session = new_session(fx.user.id, past, chrono::Duration::days(1));
        fx.sessions.create_session(&session).await.unwrap();

        let response = app(fx.state.clone())
            .oneshot(
                Request::builder()
                    .uri("/auth/me")
                    .header(header::COOKIE, format!("dealflow_session={}", session.id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(fx.sessions.get_session(&session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_removes_session() {
        let fx = fixture(AuthConfig::default()).await;
        let token = login_token(&fx.state).await;

        let response = app(fx.state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout")
                    .header(header::COOKIE, format!("dealflow_session={token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(fx
            .sessions
            .get_session(&SessionId::new(token))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_logout_all_removes_every_session() {
        let fx = fixture(AuthConfig::default()).await;
        let first = login_token(&fx.state).await;
        let second = login_token(&fx.state).await;

        let response = app(fx.state.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/auth/logout-all")
                    .header(header::AUTHORIZATION, format!("Bearer {first}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        for token in [first, second] {
            assert!(fx
                .sessions
                .get_session(&SessionId::new(token))
                .await
                .unwrap()
                .is_none());
        }
    }

    #[tokio::test]
    async fn test_register_disabled_by_default() {
        let fx = fixture(AuthConfig::default()).await;

        let response = app(fx.state)
            .oneshot(json_request(
                "/auth/register",
                serde_json::json!({
                    "username": "newbie",
                    "full_name": "New Person",
                    "email": "new@example.com",
                    "password": "long enough password"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_register_creates_analyst() {
        let config = AuthConfig {
            allow_registration: true,
            ..AuthConfig::default()
        };
        let fx = fixture(config).await;

        let response = app(fx.state.clone())
            .oneshot(json_request(
                "/auth/register",
                serde_json::json!({
                    "username": "newbie",
                    "full_name": "New Person",
                    "email": "new@example.com",
                    "password": "long enough password"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["role"], "analyst");
        assert_eq!(json["initials"], "NP");

        let duplicate = app(fx.state)
            .oneshot(json_request(
                "/auth/register",
                serde_json::json!({
                    "username": "jdoe",
                    "full_name": "Another Jane",
                    "email": "other@example.com",
                    "password": "long enough password"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(duplicate.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_username() {
        let config = AuthConfig {
            allow_registration: true,
            ..AuthConfig::default()
        };
        let fx = fixture(config).await;

        let response = app(fx.state)
            .oneshot(json_request(
                "/auth/register",
                serde_json::json!({
                    "username": "a b",
                    "full_name": "Spacey",
                    "email": "spacey@example.com",
                    "password": "long enough password"
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

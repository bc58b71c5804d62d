//! Axum extractors for authentication.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use axum_extra::extract::CookieJar;
use chrono::Utc;
use dealflow_core::auth::{is_session_expired, AuthError as CoreError, SessionId};
use dealflow_core::user::User;

use crate::{AuthError, AuthState};

/// Returns the session token of a request.
///
/// The `Authorization: Bearer` header (API clients) wins over the session
/// cookie (web clients).
pub fn session_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());

    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(cookie_name)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

async fn resolve_user(parts: &Parts, auth_state: &AuthState) -> Result<User, AuthError> {
    let token = session_token(&parts.headers, &auth_state.config.cookie_name)
        .ok_or(AuthError::Unauthenticated)?;
    let session_id = SessionId::new(token);

    let session = auth_state
        .sessions
        .get_session(&session_id)
        .await?
        .ok_or(CoreError::SessionNotFound)?;

    if is_session_expired(&session, Utc::now()) {
        auth_state.sessions.delete_session(&session_id).await?;
        tracing::debug!(user_id = %session.user_id, "Removed expired session");
        return Err(CoreError::SessionExpired.into());
    }

    match auth_state.users.get_user(session.user_id).await? {
        Some(user) => Ok(user),
        None => {
            // The account was removed while the session was alive.
            auth_state.sessions.delete_session(&session_id).await?;
            Err(CoreError::SessionNotFound.into())
        }
    }
}

/// Extractor for authenticated user. Returns 401 if not authenticated.
pub struct CurrentUser(pub User);

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        resolve_user(parts, &auth_state).await.map(CurrentUser)
    }
}

/// Extractor for optionally authenticated user. Returns None if not authenticated.
///
/// Storage failures still reject the request.
pub struct OptionalUser(pub Option<User>);

impl<S> FromRequestParts<S> for OptionalUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth_state = AuthState::from_ref(state);
        match resolve_user(parts, &auth_state).await {
            Ok(user) => Ok(OptionalUser(Some(user))),
            Err(e) if e.status_code().is_client_error() => Ok(OptionalUser(None)),
            Err(e) => Err(e),
        }
    }
}

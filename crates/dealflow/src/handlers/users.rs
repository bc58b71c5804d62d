//! User management handlers.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use dealflow_auth::CurrentUser;
use dealflow_core::auth::{hash_password, verify_password};
use dealflow_core::storage::RepositoryError;
use dealflow_core::user::{
    validate_password, ChangePasswordRequest, CreateUserRequest, UpdateUserRequest, User,
};

use super::authz::{require_admin, require_owner_or_admin};
use crate::{handlers::AppError, state::AppState};

/// PBKDF2 is CPU bound; keep it off the async workers.
async fn hash_blocking(password: String) -> Result<String, AppError> {
    Ok(tokio::task::spawn_blocking(move || hash_password(&password)).await?)
}

fn user_not_found(id: Uuid) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "User",
        id: id.to_string(),
    }
}

/// GET /api/users
pub async fn list_users(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.users.list_users().await?))
}

/// POST /api/users (admin)
pub async fn create_user(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), AppError> {
    require_admin(&actor)?;
    request.validate()?;

    let user = request.to_user();
    let password_hash = hash_blocking(request.password).await?;
    state.users.create_user(&user, &password_hash).await?;

    tracing::info!(user_id = %user.id, username = %user.username, role = %user.role, "User created");
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /api/users/{id}
pub async fn get_user(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = state
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    Ok(Json(user))
}

/// PUT /api/users/{id} (admin or self; only admins change roles)
pub async fn update_user(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>, AppError> {
    require_owner_or_admin(&actor, id, "account")?;
    if request.changes_role() {
        require_admin(&actor)?;
    }

    let mut user = state
        .users
        .get_user(id)
        .await?
        .ok_or_else(|| user_not_found(id))?;
    request.apply_to(&mut user)?;
    state.users.update_user(&user).await?;

    tracing::info!(user_id = %id, "User updated");
    Ok(Json(user))
}

/// DELETE /api/users/{id} (admin)
pub async fn delete_user(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    require_admin(&actor)?;
    if actor.id == id {
        return Err(AppError::bad_request("Admins cannot delete their own account"));
    }

    state.users.delete_user(id).await?;
    if let Err(err) = state.auth.sessions.delete_user_sessions(id).await {
        tracing::warn!(user_id = %id, error = %err, "Failed to remove sessions of deleted user");
    }

    tracing::info!(user_id = %id, "User deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/users/{id}/password
///
/// Users changing their own password must give the current one. Admins may
/// reset anyone else's without it.
pub async fn change_password(
    CurrentUser(actor): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<StatusCode, AppError> {
    require_owner_or_admin(&actor, id, "account")?;
    validate_password(&request.new_password)?;

    if actor.id == id {
        let stored = state
            .users
            .get_password_hash(id)
            .await?
            .ok_or_else(|| user_not_found(id))?;
        let current = request.current_password.clone().unwrap_or_default();
        let valid =
            tokio::task::spawn_blocking(move || verify_password(&current, &stored)).await??;
        if !valid {
            return Err(AppError::bad_request("Current password is incorrect"));
        }
    }

    let password_hash = hash_blocking(request.new_password).await?;
    state.users.update_password_hash(id, &password_hash).await?;

    tracing::info!(user_id = %id, changed_by = %actor.id, "Password changed");
    Ok(StatusCode::NO_CONTENT)
}

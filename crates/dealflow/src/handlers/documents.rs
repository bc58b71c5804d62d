//! Document upload, metadata and download handlers.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use uuid::Uuid;

use dealflow_auth::CurrentUser;
use dealflow_core::deal::{TimelineEvent, TimelineEventType};
use dealflow_core::document::{content_disposition, Document, UploadDocumentRequest};
use dealflow_core::storage::RepositoryError;
use dealflow_core::user::UserRole;

use super::authz::{require_writer, AuthzError};
use super::deals::{load_deal, record_event};
use crate::{handlers::AppError, state::AppState};

fn document_not_found(id: Uuid) -> RepositoryError {
    RepositoryError::NotFound {
        entity_type: "Document",
        id: id.to_string(),
    }
}

async fn load_document(state: &AppState, id: Uuid) -> Result<Document, AppError> {
    Ok(state
        .documents
        .get_document(id)
        .await?
        .ok_or_else(|| document_not_found(id))?)
}

/// POST /api/documents
///
/// The body carries the file as base64.
pub async fn upload_document(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Json(request): Json<UploadDocumentRequest>,
) -> Result<(StatusCode, Json<Document>), AppError> {
    require_writer(&user)?;
    load_deal(&state, request.deal_id).await?;
    let (document, content) = request.into_document(user.id, state.config.max_document_bytes)?;

    state.documents.create_document(&document, &content).await?;
    let event = TimelineEvent::new(
        document.deal_id,
        TimelineEventType::DocumentAdded,
        format!("{} uploaded {}", user.full_name, document.file_name),
        Some(user.id),
    )
    .with_metadata(serde_json::json!({
        "document_id": document.id,
        "document_type": document.document_type,
    }));
    record_event(&state, &event).await;

    tracing::info!(
        document_id = %document.id,
        deal_id = %document.deal_id,
        size_bytes = document.size_bytes,
        "Document uploaded"
    );
    Ok((StatusCode::CREATED, Json(document)))
}

/// GET /api/documents/{id}
pub async fn get_document(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Document>, AppError> {
    Ok(Json(load_document(&state, id).await?))
}

/// GET /api/documents/{id}/download
pub async fn download_document(
    CurrentUser(_user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let document = load_document(&state, id).await?;
    let content = state
        .documents
        .get_document_content(id)
        .await?
        .ok_or_else(|| document_not_found(id))?;

    Ok((
        [
            (header::CONTENT_TYPE, document.content_type.clone()),
            (
                header::CONTENT_DISPOSITION,
                content_disposition(&document.file_name),
            ),
        ],
        content,
    )
        .into_response())
}

/// DELETE /api/documents/{id} (uploader, admin or partner)
pub async fn delete_document(
    CurrentUser(user): CurrentUser,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let document = load_document(&state, id).await?;
    let allowed = document.uploaded_by == user.id
        || matches!(user.role, UserRole::Admin | UserRole::Partner);
    if !allowed {
        tracing::warn!(user_id = %user.id, document_id = %id, "Document delete denied");
        return Err(AuthzError::NotOwner {
            user_id: user.id,
            resource: "document",
        }
        .into());
    }

    state.documents.delete_document(id).await?;
    tracing::info!(document_id = %id, deleted_by = %user.id, "Document deleted");
    Ok(StatusCode::NO_CONTENT)
}

//! Content API endpoints.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};

use super::ApiResult;
use crate::errors::AppError;
use crate::models::{Content, MessageResponse, SaveContentRequest};
use crate::AppState;

/// GET /api/content - List all content.
pub async fn list_content(State(state): State<AppState>) -> ApiResult<Json<Vec<Content>>> {
    Ok(Json(state.store.list().await))
}

/// GET /api/content/:slug - Get a single content item by slug.
pub async fn get_content(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> ApiResult<Json<Content>> {
    state
        .store
        .find_by_slug(&slug)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Content not found".to_string()))
}

/// POST /api/content - Create content, or update it when the body carries an id.
pub async fn save_content(
    State(state): State<AppState>,
    payload: Result<Json<SaveContentRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<MessageResponse>)> {
    let Json(request) = payload?;
    let target_id = request.target_id().map(str::to_string);
    let draft = request.validate()?;

    match target_id {
        Some(id) => {
            let content = state.store.update_by_id(&id, draft).await?;
            tracing::info!("Content updated: {}", content.slug);
            Ok((
                StatusCode::OK,
                Json(MessageResponse::new(
                    "Content updated successfully",
                    Some(content.id),
                )),
            ))
        }
        None => {
            let content = state.store.insert(draft).await?;
            tracing::info!("New content created: {}", content.slug);
            Ok((
                StatusCode::CREATED,
                Json(MessageResponse::new(
                    "Content created successfully",
                    Some(content.id),
                )),
            ))
        }
    }
}

/// PUT /api/content/:slug - Update the content currently stored under a slug.
pub async fn update_content_by_slug(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: Result<Json<SaveContentRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let Json(request) = payload?;
    let draft = request.validate()?;

    let content = state.store.update_by_slug(&slug, draft).await?;
    tracing::info!("Content updated: {}", content.slug);
    Ok(Json(MessageResponse::new(
        "Content updated successfully",
        Some(content.id),
    )))
}

/// DELETE /api/content/:id - Delete a content item by id.
pub async fn delete_content(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let removed = state.store.delete_by_id(&id).await?;
    tracing::info!("Content deleted: ID {} ({})", removed.id, removed.slug);
    Ok(Json(MessageResponse::new("Content deleted successfully", None)))
}

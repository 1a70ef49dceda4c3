use axum::extract::{Path, State};

use crate::app::AppState;
use crate::content::ContentSummary;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/h5p/contents - List stored content
pub async fn list(State(state): State<AppState>) -> ApiResult<Vec<ContentSummary>> {
    let contents = state.content.list_contents().await?;
    Ok(ApiResponse::success(contents))
}

/// GET /api/h5p/contents/:id - Summary of one content item
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ContentSummary> {
    let content = state.content.get_content(&id).await?;
    Ok(ApiResponse::success(content))
}

/// DELETE /api/h5p/contents/:id - Remove content and its files
pub async fn delete(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<()> {
    state.content.delete_content(&id).await?;
    Ok(ApiResponse::no_content())
}

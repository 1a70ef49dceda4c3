use axum::extract::{Path, State};

use crate::app::AppState;
use crate::content::ContentParams;
use crate::middleware::{ApiResponse, ApiResult};

/// GET /api/h5p/params/:contentId - Library, parameters and metadata for the editor
pub async fn get(
    State(state): State<AppState>,
    Path(content_id): Path<String>,
) -> ApiResult<ContentParams> {
    let params = state.content.get_content_params(&content_id).await?;
    Ok(ApiResponse::success(params))
}

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;

/// GET /api/h5p/content/:contentId/*file - Serve a file stored with the content
///
/// Responds with the raw bytes rather than the JSON envelope.
pub async fn get(
    State(state): State<AppState>,
    Path((content_id, file)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let file = state.content.get_content_file(&content_id, &file).await?;
    Ok(([(header::CONTENT_TYPE, file.mime_type)], file.data).into_response())
}

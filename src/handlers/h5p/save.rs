// handlers/h5p/save.rs - POST /api/h5p/save handler

use axum::{body::Bytes, extract::State};
use serde_json::Value;

use crate::app::AppState;
use crate::content::SaveResult;
use crate::error::ApiError;
use crate::middleware::{ApiResponse, ApiResult, CallerIdentity};

/**
 * POST /api/h5p/save - Create or update content from an editor save
 *
 * The body is read as raw bytes so clients that post JSON as `text/plain`,
 * or post a JSON document that is itself a JSON-encoded string, are accepted.
 * Payload shape variations are resolved by the normalizer.
 *
 * Expected Output (Success):
 * ```json
 * { "success": true, "data": { "id": "3f2a..." } }
 * ```
 *
 * A payload without any usable library is rejected with 422 and nothing is
 * stored.
 */
pub async fn post(
    State(state): State<AppState>,
    caller: CallerIdentity,
    body: Bytes,
) -> ApiResult<SaveResult> {
    let raw: Value = serde_json::from_slice(&body)
        .map_err(|e| ApiError::invalid_json(format!("Invalid JSON body: {}", e)))?;

    let saved = state.content.save_content(&raw, caller.into_user()).await?;
    Ok(ApiResponse::success(saved))
}

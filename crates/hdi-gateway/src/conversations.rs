//! Conversation persistence endpoints

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use hdi_knowledge::ConversationRecord;
use tracing::info;

use crate::protocol::ApiError;
use crate::server::GatewayState;

pub async fn list_handler(State(state): State<GatewayState>) -> Result<impl IntoResponse, ApiError> {
    let conversations = state.conversations.load().await?;
    Ok(Json(serde_json::json!({
        "count": conversations.len(),
        "conversations": conversations,
    })))
}

/// Upsert by id; an empty id creates a new record
pub async fn save_handler(
    State(state): State<GatewayState>,
    Json(record): Json<ConversationRecord>,
) -> Result<Json<ConversationRecord>, ApiError> {
    let saved = state.conversations.save(record).await?;
    info!("Saved conversation {} ({} messages)", saved.id, saved.messages.len());
    Ok(Json(saved))
}

pub async fn delete_handler(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.conversations.delete(&id).await? {
        return Err(ApiError::not_found(format!("Conversation '{}' not found", id)));
    }
    Ok(Json(serde_json::json!({ "success": true, "id": id })))
}

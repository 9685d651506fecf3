use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::common::ConversationId;
use crate::domains::conversation::ChatMessage;
use crate::server::app::AxumAppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation_id: ConversationId,
    pub history: Vec<ChatMessage>,
}

/// GET /api/conversations/:id
pub async fn get_conversation_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<ConversationId>,
) -> Result<Json<ConversationResponse>, StatusCode> {
    let stored = state
        .server_deps
        .conversation_store
        .load(id)
        .await
        .map_err(|e| {
            error!(error = %e, conversation_id = %id, "Failed to load conversation");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(ConversationResponse {
        conversation_id: id,
        history: stored.history,
    }))
}

/// DELETE /api/conversations/:id
///
/// Removes the whole conversation. Single turns are never deleted.
pub async fn delete_conversation_handler(
    Extension(state): Extension<AxumAppState>,
    Path(id): Path<ConversationId>,
) -> StatusCode {
    match state.server_deps.conversation_store.delete(id).await {
        Ok(true) => StatusCode::NO_CONTENT,
        Ok(false) => StatusCode::NOT_FOUND,
        Err(e) => {
            error!(error = %e, conversation_id = %id, "Failed to delete conversation");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

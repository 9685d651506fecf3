//! POST /api/ask
//!
//! Runs one turn and returns the answer with the label that routed it.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::common::document::document_from_base64;
use crate::common::ConversationId;
use crate::domains::workflow::{ClassificationLabel, TurnRequest, WorkflowError};
use crate::server::app::AxumAppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub conversation_id: Option<ConversationId>,
    /// Attached document, base64-encoded.
    #[serde(default)]
    pub document_base64: Option<String>,
    /// Older clients send the transcript as `"User: ..."` / `"AI: ..."` lines.
    #[serde(default)]
    pub chat_history: Option<Vec<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
    pub detected_label: ClassificationLabel,
    pub conversation_id: ConversationId,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// HTTP face of a failed turn.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Workflow(WorkflowError),
}

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        ApiError::Workflow(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, *message),
            ApiError::Workflow(err) => {
                let status = match err {
                    WorkflowError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
                    WorkflowError::Model { .. } => StatusCode::BAD_GATEWAY,
                    WorkflowError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                error!(error = %err, status = status.as_u16(), "Turn failed");
                (status, err.user_message())
            }
        };

        (
            status,
            Json(ErrorBody {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

pub async fn ask_handler(
    Extension(state): Extension<AxumAppState>,
    Json(body): Json<AskRequest>,
) -> Result<Json<AskResponse>, ApiError> {
    if body.question.trim().is_empty() {
        warn!("Rejected empty question");
        return Err(ApiError::BadRequest("A pergunta não pode estar vazia."));
    }

    let request = TurnRequest {
        conversation_id: body.conversation_id,
        question: body.question,
        document: body.document_base64.as_deref().map(document_from_base64),
        legacy_history: body.chat_history.map(|lines| lines.join("\n")),
    };

    let outcome = state.orchestrator.run_turn(request).await?;

    Ok(Json(AskResponse {
        response: outcome.response,
        detected_label: outcome.label,
        conversation_id: outcome.conversation_id,
    }))
}

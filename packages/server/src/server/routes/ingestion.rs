//! POST /api/ingestion
//!
//! Accepts a batch of URLs for the legislation base and hands it to the
//! ingestion service on a background task. The response never waits for it.

use axum::{extract::Extension, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::server::app::AxumAppState;

#[derive(Debug, Deserialize)]
pub struct IngestionRequest {
    #[serde(default)]
    pub urls: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestionResponse {
    pub message: String,
    pub status: String,
}

pub async fn ingestion_handler(
    Extension(state): Extension<AxumAppState>,
    Json(body): Json<IngestionRequest>,
) -> (StatusCode, Json<IngestionResponse>) {
    let urls: Vec<String> = body
        .urls
        .into_iter()
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .collect();

    if urls.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(IngestionResponse {
                message: "Nenhuma URL fornecida.".to_string(),
                status: "error".to_string(),
            }),
        );
    }

    let count = urls.len();
    let ingestor = state.server_deps.ingestor.clone();
    tokio::spawn(async move {
        match ingestor.ingest_urls(&urls).await {
            Ok(()) => info!(count = urls.len(), "Ingestion batch finished"),
            Err(e) => error!(error = %e, count = urls.len(), "Ingestion batch failed"),
        }
    });

    (
        StatusCode::ACCEPTED,
        Json(IngestionResponse {
            message: format!(
                "Recebemos {} URLs. O processamento iniciou em segundo plano.",
                count
            ),
            status: "processing_started".to_string(),
        }),
    )
}

// HTTP adapter for the external legislation query engine and its ingestion
// pipeline. Both live in a separate service; this side only speaks JSON.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{BaseIngestor, BaseRetrieval};

/// Returned when no retrieval service is configured.
pub const NO_RETRIEVAL_ANSWER: &str =
    "Base jurídica indisponível no momento. Nenhum trecho de lei foi recuperado.";

#[derive(Debug, Serialize)]
struct QueryRequest<'a> {
    query: &'a str,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(alias = "answer")]
    response: String,
}

#[derive(Debug, Serialize)]
struct IngestRequest<'a> {
    urls: &'a [String],
}

pub struct HttpRetrievalClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRetrievalClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

#[async_trait]
impl BaseRetrieval for HttpRetrievalClient {
    async fn query(&self, text: &str) -> Result<String> {
        let response = self
            .client
            .post(self.endpoint("query"))
            .json(&QueryRequest { query: text })
            .send()
            .await
            .context("Failed to reach retrieval service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Retrieval service error {}: {}", status, body);
        }

        let parsed: QueryResponse = response
            .json()
            .await
            .context("Failed to parse retrieval response")?;

        debug!(answer_len = parsed.response.len(), "Retrieval answered");
        Ok(parsed.response)
    }
}

#[async_trait]
impl BaseIngestor for HttpRetrievalClient {
    async fn ingest_urls(&self, urls: &[String]) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint("ingest"))
            .json(&IngestRequest { urls })
            .send()
            .await
            .context("Failed to reach ingestion service")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Ingestion service error {}: {}", status, body);
        }
        Ok(())
    }
}

pub struct NoopRetrieval;

#[async_trait]
impl BaseRetrieval for NoopRetrieval {
    async fn query(&self, _text: &str) -> Result<String> {
        warn!("NoopRetrieval: query called but RETRIEVAL_URL is not configured");
        Ok(NO_RETRIEVAL_ANSWER.to_string())
    }
}

pub struct NoopIngestor;

#[async_trait]
impl BaseIngestor for NoopIngestor {
    async fn ingest_urls(&self, urls: &[String]) -> Result<()> {
        warn!(count = urls.len(), "NoopIngestor: dropping URLs, RETRIEVAL_URL is not configured");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let client = HttpRetrievalClient::new("http://rag:8000/").unwrap();
        assert_eq!(client.endpoint("query"), "http://rag:8000/query");
    }

    #[test]
    fn test_response_accepts_answer_alias() {
        let parsed: QueryResponse = serde_json::from_str(r#"{"answer":"Art. 3º"}"#).unwrap();
        assert_eq!(parsed.response, "Art. 3º");
    }

    #[tokio::test]
    async fn test_noop_retrieval_is_not_an_error() {
        assert_eq!(NoopRetrieval.query("MEI").await.unwrap(), NO_RETRIEVAL_ANSWER);
    }
}

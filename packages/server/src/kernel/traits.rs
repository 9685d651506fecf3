// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// Routing, caching policy and auditing live in domain code that uses these traits.
//
// Naming convention: Base* for trait names (e.g., BaseAI, BaseEmbeddingService)

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::common::ConversationId;
use crate::domains::audit::AuditEntry;
use crate::domains::cache::{CacheEntry, CacheHit};
use crate::domains::conversation::{ChatMessage, StoredConversation};
use crate::kernel::tools::ToolBox;

// =============================================================================
// AI Trait (Infrastructure - Generic LLM capabilities)
// =============================================================================

/// Chat message in provider wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant"
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A single model invocation.
#[derive(Debug, Clone, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct CompletionRequest {
    /// System instructions, sent first.
    pub system: String,
    /// Conversation after the system prompt, oldest first.
    #[builder(default)]
    pub messages: Vec<Message>,
    /// Overrides the client's default model.
    #[builder(default, setter(strip_option))]
    pub model: Option<String>,
    #[builder(default, setter(strip_option))]
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Everything the model sees, flattened. Handy for logging and mocks.
    pub fn transcript(&self) -> String {
        let mut out = self.system.clone();
        for m in &self.messages {
            out.push_str("\n\n");
            out.push_str(&m.role);
            out.push_str(": ");
            out.push_str(&m.content);
        }
        out
    }
}

#[async_trait]
pub trait BaseAI: Send + Sync {
    /// Complete a request with an LLM (returns raw text response)
    async fn complete(&self, request: CompletionRequest) -> Result<String>;

    /// Complete a request, letting the model call the given tools until it
    /// produces a final text answer.
    async fn complete_with_tools(
        &self,
        request: CompletionRequest,
        tools: &ToolBox,
    ) -> Result<String> {
        // Default implementation - not all providers support tools
        let _ = tools;
        self.complete(request).await
    }

    /// Generate structured output with a JSON schema
    /// Returns JSON string conforming to the provided schema
    async fn generate_structured(
        &self,
        request: CompletionRequest,
        schema: serde_json::Value,
    ) -> Result<String> {
        // Default implementation embeds the schema in the prompt
        let mut request = request;
        request.system = format!(
            "{}\n\nRespond only with valid JSON matching this schema:\n{}",
            request.system, schema
        );
        self.complete(request).await
    }
}

// =============================================================================
// Embedding Service Trait (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseEmbeddingService: Send + Sync {
    /// Generate embedding for text. Length depends on the configured model.
    async fn generate(&self, text: &str) -> Result<Vec<f32>>;
}

// =============================================================================
// Retrieval Trait (Infrastructure - legal text query engine)
// =============================================================================

#[async_trait]
pub trait BaseRetrieval: Send + Sync {
    /// Answer a query from the indexed legislation.
    async fn query(&self, text: &str) -> Result<String>;
}

#[async_trait]
pub trait BaseIngestor: Send + Sync {
    /// Hand a batch of law URLs to the ingestion pipeline.
    async fn ingest_urls(&self, urls: &[String]) -> Result<()>;
}

// =============================================================================
// Web Search Trait (Infrastructure)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

#[async_trait]
pub trait BaseWebSearch: Send + Sync {
    async fn search(
        &self,
        query: &str,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<WebSearchResult>>;
}

// =============================================================================
// Storage Traits (Infrastructure)
// =============================================================================

#[async_trait]
pub trait BaseCacheStore: Send + Sync {
    /// Create the vector index if missing. Returns the dimension of the index
    /// that is actually in place, which may differ from `dimension` when an
    /// older index already exists.
    async fn ensure_index(&self, dimension: usize) -> Result<usize>;

    /// Closest live entry by cosine distance.
    async fn nearest(&self, vector: &[f32]) -> Result<Option<CacheHit>>;

    /// Insert or overwrite the entry with the same key.
    async fn upsert(&self, entry: &CacheEntry) -> Result<()>;
}

#[async_trait]
pub trait BaseConversationStore: Send + Sync {
    async fn load(&self, id: ConversationId) -> Result<Option<StoredConversation>>;

    /// Replace the stored history. Last writer wins.
    async fn save(&self, id: ConversationId, history: &[ChatMessage]) -> Result<()>;

    /// Remove the whole conversation. Returns false when it did not exist.
    async fn delete(&self, id: ConversationId) -> Result<bool>;
}

#[async_trait]
pub trait BaseAuditSink: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_request_builder_accepts_borrowed_strings() {
        let request = CompletionRequest::builder()
            .system("Você é um assistente jurídico.")
            .messages(vec![Message::user("Oi"), Message::assistant("Olá!")])
            .model("gpt-4o-mini")
            .temperature(0.0_f32)
            .build();

        assert_eq!(request.model.as_deref(), Some("gpt-4o-mini"));
        assert_eq!(request.temperature, Some(0.0));
        assert!(request.transcript().ends_with("assistant: Olá!"));
    }

    #[test]
    fn completion_request_optionals_default_to_none() {
        let request = CompletionRequest::builder().system(String::from("s")).build();
        assert!(request.model.is_none());
        assert!(request.messages.is_empty());
    }
}

// TestDependencies - mock implementations for testing
//
// Provides mock services that can be injected into ServerDeps for tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::{
    BaseAI, BaseAuditSink, BaseCacheStore, BaseEmbeddingService, BaseIngestor, BaseRetrieval,
    BaseWebSearch, CompletionRequest, Message, ServerDeps, ToolBox, WebSearchResult,
};
use crate::domains::audit::AuditEntry;
use crate::domains::cache::{CacheEntry, CacheHit, InMemoryCacheStore};
use crate::domains::conversation::InMemoryConversationStore;

// =============================================================================
// Mock AI (Generic LLM capabilities)
// =============================================================================

/// Which trait method served a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Complete,
    Tools,
    Structured,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub kind: CallKind,
    pub model: Option<String>,
    pub transcript: String,
    /// Messages after the system prompt, oldest first.
    pub messages: Vec<Message>,
    /// Tool outputs produced by scripted tool calls during this call.
    pub tool_outputs: Vec<String>,
}

#[derive(Default)]
struct Script {
    complete: VecDeque<String>,
    tools: VecDeque<String>,
    structured: VecDeque<String>,
    tool_calls: Vec<(String, String)>,
}

/// Each call kind has its own response queue. The last queued response is
/// sticky: it keeps being returned once the queue is down to one item.
pub struct MockAI {
    script: Arc<Mutex<Script>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    failing: bool,
    hanging: bool,
    hang_on: Option<CallKind>,
}

impl MockAI {
    pub fn new() -> Self {
        Self {
            script: Arc::new(Mutex::new(Script::default())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: false,
            hanging: false,
            hang_on: None,
        }
    }

    /// Every call returns an error.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    /// Every call waits forever. Pair with a short model timeout.
    pub fn hanging() -> Self {
        Self {
            hanging: true,
            ..Self::new()
        }
    }

    /// Calls of this kind wait forever; the others answer normally.
    pub fn hanging_on(mut self, kind: CallKind) -> Self {
        self.hang_on = Some(kind);
        self
    }

    /// Queue a plain completion (the classifier uses this path).
    pub fn with_response(self, response: impl Into<String>) -> Self {
        self.script.lock().unwrap().complete.push_back(response.into());
        self
    }

    /// Queue a tool-enabled completion (specialists use this path).
    pub fn with_tool_response(self, response: impl Into<String>) -> Self {
        self.script.lock().unwrap().tools.push_back(response.into());
        self
    }

    /// Queue a structured response, serialized to JSON.
    pub fn with_json_response<T: serde::Serialize>(self, data: &T) -> Self {
        let json = serde_json::to_string(data).expect("Failed to serialize mock response");
        self.script.lock().unwrap().structured.push_back(json);
        self
    }

    /// Run this tool call against the provided ToolBox before answering
    /// every tool-enabled completion.
    pub fn with_tool_call(self, name: &str, arguments: serde_json::Value) -> Self {
        self.script
            .lock()
            .unwrap()
            .tool_calls
            .push((name.to_string(), arguments.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_of(&self, kind: CallKind) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.kind == kind)
            .collect()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.calls.lock().unwrap().last().map(|c| c.transcript.clone())
    }

    /// Check if a prompt containing the given text was sent
    pub fn was_called_with(&self, text: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.transcript.contains(text))
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn next(&self, kind: CallKind) -> String {
        let mut script = self.script.lock().unwrap();
        let queue = match kind {
            CallKind::Complete => &mut script.complete,
            CallKind::Tools => &mut script.tools,
            CallKind::Structured => &mut script.structured,
        };
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.unwrap_or_else(|| match kind {
            CallKind::Structured => "{}".to_string(),
            _ => "Mock AI response".to_string(),
        })
    }

    async fn respond(
        &self,
        kind: CallKind,
        request: &CompletionRequest,
        tools: Option<&ToolBox>,
    ) -> Result<String> {
        let mut tool_outputs = Vec::new();
        if let Some(tools) = tools {
            let scripted = self.script.lock().unwrap().tool_calls.clone();
            for (name, arguments) in scripted {
                if tools.names().contains(&name.as_str()) {
                    tool_outputs.push(tools.call(&name, &arguments).await);
                }
            }
        }

        self.calls.lock().unwrap().push(RecordedCall {
            kind,
            model: request.model.clone(),
            transcript: request.transcript(),
            messages: request.messages.clone(),
            tool_outputs,
        });

        if self.hanging || self.hang_on == Some(kind) {
            std::future::pending::<()>().await;
        }
        if self.failing {
            return Err(anyhow!("mock model unavailable"));
        }
        Ok(self.next(kind))
    }
}

#[async_trait]
impl BaseAI for MockAI {
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        self.respond(CallKind::Complete, &request, None).await
    }

    async fn complete_with_tools(
        &self,
        request: CompletionRequest,
        tools: &ToolBox,
    ) -> Result<String> {
        self.respond(CallKind::Tools, &request, Some(tools)).await
    }

    async fn generate_structured(
        &self,
        request: CompletionRequest,
        _schema: serde_json::Value,
    ) -> Result<String> {
        self.respond(CallKind::Structured, &request, None).await
    }
}

// =============================================================================
// Mock Embedding Service
// =============================================================================

pub struct MockEmbeddingService {
    // Returns a fixed embedding vector for all inputs by default
    fixed_embedding: Vec<f32>,
    // Text patterns mapped to embeddings, checked before the fixed one
    pattern_embeddings: Arc<Mutex<Vec<(String, Vec<f32>)>>>,
    calls: Arc<Mutex<Vec<String>>>,
    failing: bool,
}

impl MockEmbeddingService {
    pub fn new() -> Self {
        Self {
            fixed_embedding: vec![0.1; 1536],
            pattern_embeddings: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.fixed_embedding = embedding;
        self
    }

    /// When the text contains `pattern` (case-insensitive), return this embedding
    pub fn with_pattern_embedding(self, pattern: &str, embedding: Vec<f32>) -> Self {
        self.pattern_embeddings
            .lock()
            .unwrap()
            .push((pattern.to_lowercase(), embedding));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseEmbeddingService for MockEmbeddingService {
    async fn generate(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.lock().unwrap().push(text.to_string());

        if self.failing {
            return Err(anyhow!("mock embedding service unavailable"));
        }

        let lowered = text.to_lowercase();
        let patterns = self.pattern_embeddings.lock().unwrap();
        if let Some((_, embedding)) = patterns.iter().find(|(p, _)| lowered.contains(p)) {
            return Ok(embedding.clone());
        }

        Ok(self.fixed_embedding.clone())
    }
}

// =============================================================================
// Mock Retrieval
// =============================================================================

pub struct MockRetrieval {
    answer: String,
    queries: Arc<Mutex<Vec<String>>>,
    failing: bool,
}

impl MockRetrieval {
    pub fn new() -> Self {
        Self {
            answer: "Mock legal text".to_string(),
            queries: Arc::new(Mutex::new(Vec::new())),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub fn with_answer(mut self, answer: impl Into<String>) -> Self {
        self.answer = answer.into();
        self
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl BaseRetrieval for MockRetrieval {
    async fn query(&self, text: &str) -> Result<String> {
        self.queries.lock().unwrap().push(text.to_string());
        if self.failing {
            return Err(anyhow!("mock retrieval unavailable"));
        }
        Ok(self.answer.clone())
    }
}

// =============================================================================
// Mock Web Search
// =============================================================================

pub struct MockWebSearch {
    results: Vec<WebSearchResult>,
    queries: Arc<Mutex<Vec<(String, String, usize)>>>,
    failing: bool,
}

impl MockWebSearch {
    pub fn new() -> Self {
        Self {
            results: Vec::new(),
            queries: Arc::new(Mutex::new(Vec::new())),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::new()
        }
    }

    pub fn with_results(mut self, results: Vec<WebSearchResult>) -> Self {
        self.results = results;
        self
    }

    /// (query, region, max_results) per call
    pub fn queries(&self) -> Vec<(String, String, usize)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseWebSearch for MockWebSearch {
    async fn search(
        &self,
        query: &str,
        region: &str,
        max_results: usize,
    ) -> Result<Vec<WebSearchResult>> {
        self.queries
            .lock()
            .unwrap()
            .push((query.to_string(), region.to_string(), max_results));
        if self.failing {
            return Err(anyhow!("mock web search unavailable"));
        }
        Ok(self.results.iter().take(max_results).cloned().collect())
    }
}

// =============================================================================
// Mock Ingestor
// =============================================================================

pub struct MockIngestor {
    batches: Arc<Mutex<Vec<Vec<String>>>>,
}

impl MockIngestor {
    pub fn new() -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseIngestor for MockIngestor {
    async fn ingest_urls(&self, urls: &[String]) -> Result<()> {
        self.batches.lock().unwrap().push(urls.to_vec());
        Ok(())
    }
}

// =============================================================================
// Failing cache store (vector store outage)
// =============================================================================

pub struct FailingCacheStore;

#[async_trait]
impl BaseCacheStore for FailingCacheStore {
    async fn ensure_index(&self, _dimension: usize) -> Result<usize> {
        Err(anyhow!("vector store unreachable"))
    }

    async fn nearest(&self, _vector: &[f32]) -> Result<Option<CacheHit>> {
        Err(anyhow!("vector store unreachable"))
    }

    async fn upsert(&self, _entry: &CacheEntry) -> Result<()> {
        Err(anyhow!("vector store unreachable"))
    }
}

// =============================================================================
// Recording audit sink
// =============================================================================

pub struct RecordingAuditSink {
    entries: Arc<Mutex<Vec<AuditEntry>>>,
}

impl RecordingAuditSink {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

#[async_trait]
impl BaseAuditSink for RecordingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

// =============================================================================
// TestDependencies - Builder for test dependencies
// =============================================================================

#[derive(Clone)]
pub struct TestDependencies {
    pub ai: Arc<MockAI>,
    pub embedding_service: Arc<MockEmbeddingService>,
    pub retrieval: Arc<MockRetrieval>,
    pub web_search: Arc<MockWebSearch>,
    pub ingestor: Arc<MockIngestor>,
    pub cache_store: Arc<dyn BaseCacheStore>,
    pub conversation_store: Arc<InMemoryConversationStore>,
    pub audit_sink: Arc<RecordingAuditSink>,
}

impl TestDependencies {
    pub fn new() -> Self {
        Self {
            ai: Arc::new(MockAI::new()),
            embedding_service: Arc::new(MockEmbeddingService::new()),
            retrieval: Arc::new(MockRetrieval::new()),
            web_search: Arc::new(MockWebSearch::new()),
            ingestor: Arc::new(MockIngestor::new()),
            cache_store: Arc::new(InMemoryCacheStore::new()),
            conversation_store: Arc::new(InMemoryConversationStore::new()),
            audit_sink: Arc::new(RecordingAuditSink::new()),
        }
    }

    pub fn mock_ai(mut self, ai: MockAI) -> Self {
        self.ai = Arc::new(ai);
        self
    }

    pub fn mock_embeddings(mut self, service: MockEmbeddingService) -> Self {
        self.embedding_service = Arc::new(service);
        self
    }

    pub fn mock_retrieval(mut self, retrieval: MockRetrieval) -> Self {
        self.retrieval = Arc::new(retrieval);
        self
    }

    pub fn mock_web_search(mut self, search: MockWebSearch) -> Self {
        self.web_search = Arc::new(search);
        self
    }

    pub fn cache_store(mut self, store: Arc<dyn BaseCacheStore>) -> Self {
        self.cache_store = store;
        self
    }

    /// Convert into ServerDeps. The mocks stay reachable through `self`.
    pub fn into_deps(&self) -> ServerDeps {
        ServerDeps {
            ai: self.ai.clone(),
            embedding_service: self.embedding_service.clone(),
            retrieval: self.retrieval.clone(),
            web_search: self.web_search.clone(),
            ingestor: self.ingestor.clone(),
            cache_store: self.cache_store.clone(),
            conversation_store: self.conversation_store.clone(),
            audit_sink: self.audit_sink.clone(),
            db_pool: None,
        }
    }
}

impl Default for TestDependencies {
    fn default() -> Self {
        Self::new()
    }
}

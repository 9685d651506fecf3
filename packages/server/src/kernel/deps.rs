//! Server dependencies (using traits for testability)
//!
//! The central container handed to the workflow and the HTTP layer. Every
//! external service sits behind a `Base*` trait so tests can swap in mocks
//! from [`super::test_dependencies`].

use std::sync::Arc;

use anyhow::{Context, Result};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::domains::audit::{PgAuditSink, TracingAuditSink};
use crate::domains::cache::{InMemoryCacheStore, PgVectorCacheStore};
use crate::domains::conversation::{InMemoryConversationStore, PgConversationStore};
use crate::kernel::openai::OpenAiClient;
use crate::kernel::retrieval::{HttpRetrievalClient, NoopIngestor, NoopRetrieval};
use crate::kernel::tavily_client::{NoopWebSearch, TavilyClient};
use crate::kernel::{
    BaseAI, BaseAuditSink, BaseCacheStore, BaseConversationStore, BaseEmbeddingService,
    BaseIngestor, BaseRetrieval, BaseWebSearch,
};

#[derive(Clone)]
pub struct ServerDeps {
    /// Chat, classification and judging. The model is chosen per request.
    pub ai: Arc<dyn BaseAI>,
    pub embedding_service: Arc<dyn BaseEmbeddingService>,
    /// Raw legislation query engine. The workflow wraps it with the semantic cache.
    pub retrieval: Arc<dyn BaseRetrieval>,
    pub web_search: Arc<dyn BaseWebSearch>,
    pub ingestor: Arc<dyn BaseIngestor>,
    pub cache_store: Arc<dyn BaseCacheStore>,
    pub conversation_store: Arc<dyn BaseConversationStore>,
    pub audit_sink: Arc<dyn BaseAuditSink>,
    /// Present when DATABASE_URL is configured. Used by the health check.
    pub db_pool: Option<PgPool>,
}

impl ServerDeps {
    /// Wire production implementations from configuration.
    ///
    /// Optional services fall back to no-op or in-memory versions, so a
    /// bare `OPENAI_API_KEY` is enough to run locally.
    pub fn from_config(config: &Config, db_pool: Option<PgPool>) -> Result<Self> {
        let mut openai = OpenAiClient::new(
            config.openai_api_key.clone(),
            config.chat_model.clone(),
            config.embedding_model.clone(),
        )
        .context("Failed to create OpenAI client")?;
        if let Some(url) = &config.openai_base_url {
            openai = openai.with_base_url(url.clone());
        }
        let openai = Arc::new(openai);

        let web_search: Arc<dyn BaseWebSearch> = match &config.tavily_api_key {
            Some(key) => Arc::new(TavilyClient::new(key.clone())?),
            None => {
                warn!("TAVILY_API_KEY not set, web search disabled");
                Arc::new(NoopWebSearch)
            }
        };

        let (retrieval, ingestor): (Arc<dyn BaseRetrieval>, Arc<dyn BaseIngestor>) =
            match &config.retrieval_url {
                Some(url) => {
                    let client = Arc::new(HttpRetrievalClient::new(url.clone())?);
                    (client.clone(), client)
                }
                None => {
                    warn!("RETRIEVAL_URL not set, legal search disabled");
                    (Arc::new(NoopRetrieval), Arc::new(NoopIngestor))
                }
            };

        let (cache_store, conversation_store, audit_sink): (
            Arc<dyn BaseCacheStore>,
            Arc<dyn BaseConversationStore>,
            Arc<dyn BaseAuditSink>,
        ) = match &db_pool {
            Some(pool) => {
                info!("Using Postgres for cache, conversations and audit records");
                (
                    Arc::new(PgVectorCacheStore::new(pool.clone())),
                    Arc::new(PgConversationStore::new(pool.clone())),
                    Arc::new(PgAuditSink::new(pool.clone())),
                )
            }
            None => {
                warn!("DATABASE_URL not set, state is kept in memory only");
                (
                    Arc::new(InMemoryCacheStore::new()),
                    Arc::new(InMemoryConversationStore::new()),
                    Arc::new(TracingAuditSink),
                )
            }
        };

        Ok(Self {
            ai: openai.clone(),
            embedding_service: openai,
            retrieval,
            web_search,
            ingestor,
            cache_store,
            conversation_store,
            audit_sink,
            db_pool,
        })
    }
}

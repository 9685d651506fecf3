//! Semantic response cache in front of legislation retrieval.
//!
//! A question is normalized and embedded, then matched against previously
//! answered questions by cosine distance. Close enough means the stored
//! answer is reused and retrieval is skipped.
//!
//! The cache never fails a caller. An unreachable store at startup disables
//! it for the process lifetime; an unreachable store at call time makes that
//! single call fall through to the compute closure.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{info, instrument, warn};

use super::models::CacheEntry;
use crate::common::utils::{normalize_query, truncate_for_log};
use crate::kernel::{BaseCacheStore, BaseEmbeddingService, BaseRetrieval};

/// Embedded once at startup to learn the model's vector length.
pub const DIMENSION_PROBE: &str = "teste de dimensao";

pub const DEFAULT_DISTANCE_THRESHOLD: f64 = 0.35;
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug, Clone, Copy)]
pub struct CacheSettings {
    /// Hits need a cosine distance strictly below this.
    pub distance_threshold: f64,
    pub ttl: Duration,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            distance_threshold: DEFAULT_DISTANCE_THRESHOLD,
            ttl: DEFAULT_TTL,
        }
    }
}

pub struct SemanticCache {
    store: Arc<dyn BaseCacheStore>,
    embeddings: Arc<dyn BaseEmbeddingService>,
    settings: CacheSettings,
    dimension: usize,
    disabled: AtomicBool,
}

impl SemanticCache {
    /// Probe the embedding dimension and make sure the index exists.
    ///
    /// Any failure here yields a disabled cache rather than an error.
    pub async fn initialize(
        store: Arc<dyn BaseCacheStore>,
        embeddings: Arc<dyn BaseEmbeddingService>,
        settings: CacheSettings,
    ) -> Self {
        let mut cache = Self {
            store,
            embeddings,
            settings,
            dimension: 0,
            disabled: AtomicBool::new(true),
        };

        let probe = match cache.embeddings.generate(DIMENSION_PROBE).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Embedding probe failed, semantic cache disabled");
                return cache;
            }
        };

        match cache.store.ensure_index(probe.len()).await {
            Ok(dimension) => {
                if dimension != probe.len() {
                    warn!(
                        index_dim = dimension,
                        model_dim = probe.len(),
                        "Cache index dimension differs from embedding model"
                    );
                }
                info!(dimension, "Semantic cache ready");
                cache.dimension = dimension;
                cache.disabled.store(false, Ordering::Relaxed);
            }
            Err(e) => warn!(error = %e, "Vector store unreachable, semantic cache disabled"),
        }

        cache
    }

    pub fn is_enabled(&self) -> bool {
        !self.disabled.load(Ordering::Relaxed)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return a cached answer for a semantically close query, or run
    /// `compute` and remember its result.
    ///
    /// Only the embedding and the stored key use the normalized query;
    /// `compute` always receives `query` as given.
    ///
    /// Errors returned by `compute` propagate; cache errors never do.
    #[instrument(skip(self, compute), fields(query = %truncate_for_log(query, 80)))]
    pub async fn lookup_or_compute<F, Fut>(&self, query: &str, compute: F) -> Result<String>
    where
        F: FnOnce(String) -> Fut + Send,
        Fut: Future<Output = Result<String>> + Send,
    {
        let normalized = normalize_query(query);

        if !self.is_enabled() {
            return compute(query.to_string()).await;
        }

        let vector = match self.embeddings.generate(&normalized).await {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Embedding failed, bypassing semantic cache");
                return compute(query.to_string()).await;
            }
        };

        if vector.len() != self.dimension {
            warn!(
                index_dim = self.dimension,
                vector_dim = vector.len(),
                "Embedding dimension mismatch, bypassing semantic cache"
            );
            return compute(query.to_string()).await;
        }

        match self.store.nearest(&vector).await {
            Ok(Some(hit)) if hit.distance < self.settings.distance_threshold => {
                info!(
                    distance = hit.distance,
                    cached_query = %truncate_for_log(&hit.query_text, 80),
                    "Semantic cache hit"
                );
                return Ok(hit.answer_text);
            }
            Ok(Some(hit)) => info!(distance = hit.distance, "Semantic cache miss (too far)"),
            Ok(None) => info!("Semantic cache miss (empty)"),
            Err(e) => {
                warn!(error = %e, "Vector store unreachable, bypassing semantic cache");
                return compute(query.to_string()).await;
            }
        }

        let answer = compute(query.to_string()).await?;

        let ttl = chrono::Duration::from_std(self.settings.ttl)
            .unwrap_or_else(|_| chrono::Duration::hours(24));
        let entry = CacheEntry::new(&normalized, vector, answer.clone(), ttl);
        if let Err(e) = self.store.upsert(&entry).await {
            warn!(error = %e, "Failed to store semantic cache entry");
        }

        Ok(answer)
    }
}

/// Retrieval wrapped by the semantic cache. This is the handle the
/// specialists' legal-search tool receives.
pub struct CachedRetrieval {
    cache: Arc<SemanticCache>,
    inner: Arc<dyn BaseRetrieval>,
}

impl CachedRetrieval {
    pub fn new(cache: Arc<SemanticCache>, inner: Arc<dyn BaseRetrieval>) -> Self {
        Self { cache, inner }
    }
}

#[async_trait]
impl BaseRetrieval for CachedRetrieval {
    async fn query(&self, text: &str) -> Result<String> {
        let inner = self.inner.clone();
        self.cache
            .lookup_or_compute(text, move |q| async move { inner.query(&q).await })
            .await
    }
}

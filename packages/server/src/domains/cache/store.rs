//! Vector stores backing the semantic cache.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use pgvector::Vector;
use sqlx::PgPool;
use tracing::{debug, info, instrument};

use super::models::{CacheEntry, CacheHit};
use crate::kernel::BaseCacheStore;

// =============================================================================
// Postgres + pgvector
// =============================================================================

/// `semantic_cache` table with an HNSW cosine index.
///
/// The table is created at runtime because the vector column is sized from
/// the embedding model, which is only known after the first embedding.
pub struct PgVectorCacheStore {
    pool: PgPool,
}

impl PgVectorCacheStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn existing_dimension(&self) -> Result<Option<usize>> {
        // For vector(n) columns pgvector stores n in atttypmod.
        let row = sqlx::query_as::<_, (i32,)>(
            r#"
            SELECT atttypmod
            FROM pg_attribute
            WHERE attrelid = to_regclass('semantic_cache')
              AND attname = 'query_vector'
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(n,)| usize::try_from(n).ok()))
    }

    /// Delete expired rows. Lookups already ignore them.
    pub async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM semantic_cache WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl BaseCacheStore for PgVectorCacheStore {
    #[instrument(skip(self))]
    async fn ensure_index(&self, dimension: usize) -> Result<usize> {
        if let Some(existing) = self.existing_dimension().await? {
            debug!(existing, "semantic_cache table already present");
            return Ok(existing);
        }

        if dimension == 0 {
            return Err(anyhow!("cannot create a zero-dimension vector index"));
        }

        // Dimension is an integer we produced, so formatting it into DDL is safe.
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS semantic_cache (
                cache_key TEXT PRIMARY KEY,
                query_text TEXT NOT NULL,
                query_vector vector({dimension}) NOT NULL,
                answer_text TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                expires_at TIMESTAMPTZ NOT NULL
            )
            "#
        ))
        .execute(&self.pool)
        .await
        .context("Failed to create semantic_cache table")?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_semantic_cache_vector
            ON semantic_cache USING hnsw (query_vector vector_cosine_ops)
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create semantic_cache vector index")?;

        info!(dimension, "Created semantic_cache vector index");
        Ok(dimension)
    }

    #[instrument(skip(self, vector), fields(dim = vector.len()))]
    async fn nearest(&self, vector: &[f32]) -> Result<Option<CacheHit>> {
        let row = sqlx::query_as::<_, (String, String, f64)>(
            r#"
            SELECT query_text, answer_text, (query_vector <=> $1)::float8 AS distance
            FROM semantic_cache
            WHERE expires_at > NOW()
            ORDER BY query_vector <=> $1
            LIMIT 1
            "#,
        )
        .bind(Vector::from(vector.to_vec()))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(query_text, answer_text, distance)| CacheHit {
            distance,
            query_text,
            answer_text,
        }))
    }

    #[instrument(skip(self, entry), fields(key = %entry.key))]
    async fn upsert(&self, entry: &CacheEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO semantic_cache (cache_key, query_text, query_vector, answer_text, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (cache_key) DO UPDATE SET
                query_text = EXCLUDED.query_text,
                query_vector = EXCLUDED.query_vector,
                answer_text = EXCLUDED.answer_text,
                created_at = EXCLUDED.created_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(&entry.key)
        .bind(&entry.query_text)
        .bind(Vector::from(entry.query_vector.clone()))
        .bind(&entry.answer_text)
        .bind(entry.created_at)
        .bind(entry.expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

// =============================================================================
// In-memory (no DATABASE_URL, tests)
// =============================================================================

#[derive(Default)]
pub struct InMemoryCacheStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    dimension: RwLock<Option<usize>>,
}

impl InMemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, key: &str) -> Option<CacheEntry> {
        self.entries.read().ok()?.get(key).cloned()
    }
}

/// 1 - cosine similarity. Zero vectors are maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f64 {
    let (mut dot, mut norm_a, mut norm_b) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (f64::from(*x), f64::from(*y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[async_trait]
impl BaseCacheStore for InMemoryCacheStore {
    async fn ensure_index(&self, dimension: usize) -> Result<usize> {
        let mut current = self
            .dimension
            .write()
            .map_err(|_| anyhow!("cache dimension lock poisoned"))?;
        Ok(*current.get_or_insert(dimension))
    }

    async fn nearest(&self, vector: &[f32]) -> Result<Option<CacheHit>> {
        let now = Utc::now();
        let entries = self
            .entries
            .read()
            .map_err(|_| anyhow!("cache lock poisoned"))?;

        let best = entries
            .values()
            .filter(|e| !e.is_expired_at(now) && e.query_vector.len() == vector.len())
            .map(|e| (cosine_distance(&e.query_vector, vector), e))
            .min_by(|a, b| a.0.total_cmp(&b.0));

        Ok(best.map(|(distance, e)| CacheHit {
            distance,
            query_text: e.query_text.clone(),
            answer_text: e.answer_text.clone(),
        }))
    }

    async fn upsert(&self, entry: &CacheEntry) -> Result<()> {
        let now = Utc::now();
        let mut entries = self
            .entries
            .write()
            .map_err(|_| anyhow!("cache lock poisoned"))?;
        entries.retain(|_, e| !e.is_expired_at(now));
        entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cosine_distance_bounds() {
        assert!(cosine_distance(&[1.0, 0.0], &[2.0, 0.0]).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[0.0, 1.0]) - 1.0).abs() < 1e-9);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]) - 2.0).abs() < 1e-9);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), 1.0);
    }

    #[tokio::test]
    async fn first_dimension_wins() {
        let store = InMemoryCacheStore::new();
        assert_eq!(store.ensure_index(3).await.unwrap(), 3);
        assert_eq!(store.ensure_index(5).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn nearest_returns_closest_live_entry() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::hours(1);
        store
            .upsert(&CacheEntry::new("mei", vec![1.0, 0.0], "sobre MEI".into(), ttl))
            .await
            .unwrap();
        store
            .upsert(&CacheEntry::new("clt", vec![0.0, 1.0], "sobre CLT".into(), ttl))
            .await
            .unwrap();

        let hit = store.nearest(&[0.9, 0.1]).await.unwrap().unwrap();
        assert_eq!(hit.answer_text, "sobre MEI");
        assert!(hit.distance < 0.1);
    }

    #[tokio::test]
    async fn expired_entries_are_invisible() {
        let store = InMemoryCacheStore::new();
        store
            .upsert(&CacheEntry::new("mei", vec![1.0], "velho".into(), Duration::seconds(-1)))
            .await
            .unwrap();

        assert!(store.nearest(&[1.0]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn same_query_overwrites() {
        let store = InMemoryCacheStore::new();
        let ttl = Duration::hours(1);
        store
            .upsert(&CacheEntry::new("Teto MEI", vec![1.0], "a".into(), ttl))
            .await
            .unwrap();
        store
            .upsert(&CacheEntry::new("teto  mei", vec![1.0], "b".into(), ttl))
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.nearest(&[1.0]).await.unwrap().unwrap().answer_text, "b");
    }
}

use chrono::{DateTime, Duration, Utc};

use crate::common::utils::{generate_query_hash, normalize_query};

/// One cached answer, keyed by the hash of its normalized query.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: String,
    pub query_text: String,
    pub query_vector: Vec<f32>,
    pub answer_text: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(query: &str, query_vector: Vec<f32>, answer_text: String, ttl: Duration) -> Self {
        let created_at = Utc::now();
        Self {
            key: generate_query_hash(query),
            query_text: normalize_query(query),
            query_vector,
            answer_text,
            created_at,
            expires_at: created_at + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Nearest live neighbour of a query vector.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit {
    /// Cosine distance, 0 = identical direction.
    pub distance: f64,
    pub query_text: String,
    pub answer_text: String,
}

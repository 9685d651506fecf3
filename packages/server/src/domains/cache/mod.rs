pub mod models;
pub mod semantic_cache;
pub mod store;

pub use models::{CacheEntry, CacheHit};
pub use semantic_cache::{CacheSettings, CachedRetrieval, SemanticCache, DIMENSION_PROBE};
pub use store::{InMemoryCacheStore, PgVectorCacheStore};

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use tracing::instrument;

use super::models::{ChatMessage, StoredConversation};
use crate::common::ConversationId;
use crate::kernel::BaseConversationStore;

/// `conversations` table, history stored as a JSONB array.
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ConversationRow {
    chat_history: Json<Vec<ChatMessage>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl BaseConversationStore for PgConversationStore {
    #[instrument(skip(self))]
    async fn load(&self, id: ConversationId) -> Result<Option<StoredConversation>> {
        let row = sqlx::query_as::<_, ConversationRow>(
            "SELECT chat_history, created_at, updated_at FROM conversations WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| StoredConversation {
            history: r.chat_history.0,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }))
    }

    #[instrument(skip(self, history), fields(messages = history.len()))]
    async fn save(&self, id: ConversationId, history: &[ChatMessage]) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversations (id, chat_history)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET
                chat_history = EXCLUDED.chat_history,
                updated_at = NOW()
            "#,
        )
        .bind(id)
        .bind(Json(history))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: ConversationId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<ConversationId, StoredConversation>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Synchronous peek for tests.
    pub fn history(&self, id: ConversationId) -> Vec<ChatMessage> {
        self.conversations
            .read()
            .ok()
            .and_then(|c| c.get(&id).map(|s| s.history.clone()))
            .unwrap_or_default()
    }
}

#[async_trait]
impl BaseConversationStore for InMemoryConversationStore {
    async fn load(&self, id: ConversationId) -> Result<Option<StoredConversation>> {
        let conversations = self
            .conversations
            .read()
            .map_err(|_| anyhow!("conversation lock poisoned"))?;
        Ok(conversations.get(&id).cloned())
    }

    async fn save(&self, id: ConversationId, history: &[ChatMessage]) -> Result<()> {
        let now = Utc::now();
        let mut conversations = self
            .conversations
            .write()
            .map_err(|_| anyhow!("conversation lock poisoned"))?;

        conversations
            .entry(id)
            .and_modify(|c| {
                c.history = history.to_vec();
                c.updated_at = now;
            })
            .or_insert_with(|| StoredConversation {
                history: history.to_vec(),
                created_at: now,
                updated_at: now,
            });
        Ok(())
    }

    async fn delete(&self, id: ConversationId) -> Result<bool> {
        let mut conversations = self
            .conversations
            .write()
            .map_err(|_| anyhow!("conversation lock poisoned"))?;
        Ok(conversations.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_load_delete() {
        let store = InMemoryConversationStore::new();
        let id = ConversationId::new();

        assert!(store.load(id).await.unwrap().is_none());

        store.save(id, &[ChatMessage::user("Oi")]).await.unwrap();
        store
            .save(id, &[ChatMessage::user("Oi"), ChatMessage::assistant("Olá")])
            .await
            .unwrap();

        let stored = store.load(id).await.unwrap().unwrap();
        assert_eq!(stored.history.len(), 2);
        assert!(stored.updated_at >= stored.created_at);

        assert!(store.delete(id).await.unwrap());
        assert!(!store.delete(id).await.unwrap());
    }
}

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, instrument};

use super::models::AuditEntry;
use crate::kernel::BaseAuditSink;

/// Logs audit results only. Used when no database is configured.
pub struct TracingAuditSink;

#[async_trait]
impl BaseAuditSink for TracingAuditSink {
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        info!(
            audit_id = %entry.id,
            conversation_id = %entry.conversation_id,
            label = %entry.label,
            grounding = entry.record.grounding,
            usefulness = entry.record.usefulness,
            visual_protocol = entry.record.visual_protocol,
            tone = entry.record.tone,
            approved = entry.record.approved,
            correction = %entry.record.correction,
            "Audit recorded"
        );
        Ok(())
    }
}

/// Persists audit results to `audit_records`.
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BaseAuditSink for PgAuditSink {
    #[instrument(skip(self, entry), fields(conversation_id = %entry.conversation_id))]
    async fn record(&self, entry: &AuditEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_records (
                id, conversation_id, label,
                grounding, usefulness, visual_protocol, tone,
                approved, correction, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(entry.id)
        .bind(entry.conversation_id)
        .bind(entry.label.as_str())
        .bind(i16::from(entry.record.grounding))
        .bind(i16::from(entry.record.usefulness))
        .bind(i16::from(entry.record.visual_protocol))
        .bind(i16::from(entry.record.tone))
        .bind(entry.record.approved)
        .bind(&entry.record.correction)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

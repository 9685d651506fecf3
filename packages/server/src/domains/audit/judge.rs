//! LLM-as-judge scoring of a finished answer.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use super::models::{AuditRecord, AuditVerdict};
use crate::domains::conversation::ChatMessage;
use crate::domains::workflow::prompts;
use crate::kernel::{BaseAI, CompletionRequest, Message, StructuredOutput};

pub struct Judge {
    ai: Arc<dyn BaseAI>,
    model: String,
    timeout: Duration,
}

impl Judge {
    pub fn new(ai: Arc<dyn BaseAI>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ai,
            model: model.into(),
            timeout,
        }
    }

    /// Score `answer` against the rubric. A malformed or out-of-range verdict
    /// is an error; deciding what to do with it is the caller's business.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn audit(
        &self,
        question: &str,
        answer: &str,
        history: &[ChatMessage],
    ) -> Result<AuditRecord> {
        let mut messages: Vec<Message> = history.iter().map(Message::from).collect();
        messages.push(Message::user(prompts::audit_request(question, answer)));

        let request = CompletionRequest::builder()
            .system(prompts::JUDGE_PROMPT)
            .messages(messages)
            .model(self.model.clone())
            .temperature(0.0)
            .build();

        let raw = tokio::time::timeout(
            self.timeout,
            self.ai.generate_structured(request, AuditVerdict::openai_schema()),
        )
        .await
        .context("Audit model call timed out")??;

        let verdict: AuditVerdict =
            serde_json::from_str(&raw).context("Audit verdict is not valid JSON")?;
        let record = AuditRecord::try_from(verdict)?;

        info!(
            grounding = record.grounding,
            usefulness = record.usefulness,
            visual_protocol = record.visual_protocol,
            tone = record.tone,
            approved = record.approved,
            "Audit scored"
        );
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::{CallKind, MockAI};
    use serde_json::json;

    fn judge(ai: MockAI) -> (Judge, Arc<MockAI>) {
        let ai = Arc::new(ai);
        (
            Judge::new(ai.clone(), "gpt-4o-mini", Duration::from_secs(5)),
            ai,
        )
    }

    #[tokio::test]
    async fn scores_are_validated() {
        let (judge, ai) = judge(MockAI::new().with_json_response(&json!({
            "nota_fundamentacao": 5,
            "nota_utilidade": 4,
            "nota_protocolo_visual": 4,
            "nota_tom_de_voz": 5,
            "aprovado": true,
            "correcao_necessaria": ""
        })));

        let record = judge
            .audit("Qual o teto do MEI?", "O teto é **R$ 81.000,00**.", &[])
            .await
            .unwrap();

        assert!(record.passes());
        let calls = ai.calls_of(CallKind::Structured);
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].model.as_deref(), Some("gpt-4o-mini"));
        assert!(calls[0].transcript.contains("O teto é **R$ 81.000,00**."));
    }

    #[tokio::test]
    async fn history_reaches_the_judge_as_messages() {
        let (judge, ai) = judge(MockAI::new().with_json_response(&json!({
            "nota_fundamentacao": 4,
            "nota_utilidade": 4,
            "nota_protocolo_visual": 4,
            "nota_tom_de_voz": 4,
            "aprovado": true,
            "correcao_necessaria": ""
        })));
        let history = vec![
            ChatMessage::user("Sou MEI"),
            ChatMessage::assistant("Entendido."),
        ];

        judge.audit("Posso contratar?", "Sim, **1** empregado.", &history).await.unwrap();

        let messages = &ai.calls_of(CallKind::Structured)[0].messages;
        let roles: Vec<&str> = messages.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["user", "assistant", "user"]);
        assert_eq!(messages[0].content, "Sou MEI");
        assert!(messages[2].content.contains("Posso contratar?"));
        assert!(messages[2].content.contains("Sim, **1** empregado."));
    }

    #[tokio::test]
    async fn malformed_verdict_is_an_error() {
        let (judge, _) = judge(MockAI::new().with_json_response(&json!({"nota": "ótima"})));
        assert!(judge.audit("q", "a", &[]).await.is_err());
    }

    #[tokio::test]
    async fn out_of_range_verdict_is_an_error() {
        let (judge, _) = judge(MockAI::new().with_json_response(&json!({
            "nota_fundamentacao": 7,
            "nota_utilidade": 4,
            "nota_protocolo_visual": 4,
            "nota_tom_de_voz": 5,
            "aprovado": true,
            "correcao_necessaria": ""
        })));
        assert!(judge.audit("q", "a", &[]).await.is_err());
    }
}

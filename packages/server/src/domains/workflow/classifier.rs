use std::sync::Arc;
use std::time::Duration;

use tracing::{info, instrument};

use super::context::DependencyContext;
use super::error::{with_timeout, Stage, WorkflowError};
use super::label::{parse_label_output, ClassificationLabel};
use super::prompts;
use crate::common::document::classifier_excerpt;
use crate::kernel::{BaseAI, CompletionRequest};

/// Single-shot router over the closed label set.
pub struct Classifier {
    ai: Arc<dyn BaseAI>,
    model: String,
    timeout: Duration,
}

impl Classifier {
    pub fn new(ai: Arc<dyn BaseAI>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            ai,
            model: model.into(),
            timeout,
        }
    }

    /// Off-list output becomes `OutOfScope`. Only an unreachable model is an error.
    #[instrument(skip_all, fields(model = %self.model))]
    pub async fn classify(
        &self,
        question: &str,
        ctx: &DependencyContext,
    ) -> Result<ClassificationLabel, WorkflowError> {
        let excerpt = classifier_excerpt(ctx.has_document().then_some(ctx.document_text.as_str()));

        let request = CompletionRequest::builder()
            .system(prompts::router_prompt(&excerpt))
            .messages(ctx.messages_with(question))
            .model(self.model.clone())
            .temperature(0.0)
            .build();

        let raw = with_timeout(Stage::Classifier, self.timeout, self.ai.complete(request)).await?;
        let label = parse_label_output(&raw);

        info!(raw = %raw.trim(), label = %label, "Classified question");
        Ok(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::conversation::ConversationState;
    use crate::domains::workflow::context::build_context;
    use crate::kernel::test_dependencies::{MockAI, MockRetrieval};
    use chrono::NaiveDate;

    fn ctx(document: Option<&str>) -> DependencyContext {
        let state = ConversationState::new("q", vec![], document.map(String::from));
        build_context(
            &state,
            Arc::new(MockRetrieval::new()),
            NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
        )
    }

    async fn classify_with(output: &str) -> ClassificationLabel {
        let classifier = Classifier::new(
            Arc::new(MockAI::new().with_response(output)),
            "gpt-4o-mini",
            Duration::from_secs(5),
        );
        classifier.classify("pergunta", &ctx(None)).await.unwrap()
    }

    #[tokio::test]
    async fn off_list_outputs_fall_back() {
        for raw in ["banana", "", "PENAL"] {
            assert_eq!(classify_with(raw).await, ClassificationLabel::OutOfScope);
        }
        assert_eq!(classify_with("Trabalhista").await, ClassificationLabel::Trabalhista);
    }

    #[tokio::test]
    async fn classifier_sees_only_a_document_excerpt() {
        let ai = Arc::new(MockAI::new().with_response("societario"));
        let classifier = Classifier::new(ai.clone(), "m", Duration::from_secs(5));
        let document = format!("INICIO{}", "x".repeat(10_000));

        classifier.classify("Analise", &ctx(Some(&document))).await.unwrap();

        let prompt = ai.last_prompt().unwrap();
        assert!(prompt.contains("INICIO"));
        assert!(!prompt.contains(&"x".repeat(2_500)));
    }

    #[tokio::test]
    async fn model_outage_is_an_error() {
        let classifier = Classifier::new(Arc::new(MockAI::failing()), "m", Duration::from_secs(5));
        let err = classifier.classify("q", &ctx(None)).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Model { stage: Stage::Classifier, .. }));
    }
}

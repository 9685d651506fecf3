//! Runs one conversational turn through the state machine in [`super::machine`].

use std::sync::Arc;
use std::time::Duration;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, info, instrument, warn};

use super::classifier::Classifier;
use super::context::{build_context, DependencyContext};
use super::error::WorkflowError;
use super::label::ClassificationLabel;
use super::machine::{next, WorkflowStep};
use super::specialists::SpecialistRegistry;
use crate::common::{escape_currency_glyph, normalize_markup, ConversationId};
use crate::config::Config;
use crate::domains::audit::{AuditDispatcher, AuditEntry, AuditJob, AuditMode, AuditRecord, Judge};
use crate::domains::cache::{CacheSettings, CachedRetrieval, SemanticCache};
use crate::domains::conversation::{history_from_legacy, ChatMessage, ConversationState};
use crate::kernel::{BaseAuditSink, BaseConversationStore, BaseRetrieval, ServerDeps};

/// Knobs the workflow reads. Built from [`Config`] so nothing below the
/// server layer touches the environment.
#[derive(Debug, Clone)]
pub struct WorkflowSettings {
    pub chat_model: String,
    pub classifier_model: String,
    pub audit_model: String,
    pub model_timeout: Duration,
    pub max_revisions: u32,
    pub audit_mode: AuditMode,
    pub escape_currency_glyph: bool,
    pub cache: CacheSettings,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4o".to_string(),
            classifier_model: "gpt-4o-mini".to_string(),
            audit_model: "gpt-4o-mini".to_string(),
            model_timeout: Duration::from_secs(45),
            max_revisions: 2,
            audit_mode: AuditMode::Detached,
            escape_currency_glyph: false,
            cache: CacheSettings::default(),
        }
    }
}

impl From<&Config> for WorkflowSettings {
    fn from(config: &Config) -> Self {
        Self {
            chat_model: config.chat_model.clone(),
            classifier_model: config.classifier_model.clone(),
            audit_model: config.audit_model.clone(),
            model_timeout: config.model_timeout(),
            max_revisions: config.max_revisions,
            audit_mode: config.audit_mode,
            escape_currency_glyph: config.escape_currency_glyph,
            cache: CacheSettings {
                distance_threshold: config.cache_distance_threshold,
                ttl: config.cache_ttl(),
            },
        }
    }
}

/// One user message and what came with it.
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    /// Continue this conversation, or start a new one when `None`.
    pub conversation_id: Option<ConversationId>,
    pub question: String,
    /// Extracted document text (or an extraction sentinel).
    pub document: Option<String>,
    /// `User:`/`AI:` transcript, used only when the conversation has no stored history.
    pub legacy_history: Option<String>,
}

impl TurnRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            ..Self::default()
        }
    }

    pub fn in_conversation(mut self, id: ConversationId) -> Self {
        self.conversation_id = Some(id);
        self
    }

    pub fn with_document(mut self, text: impl Into<String>) -> Self {
        self.document = Some(text.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub conversation_id: ConversationId,
    pub response: String,
    pub label: ClassificationLabel,
    /// Inline verdict, only in blocking audit mode.
    pub audit: Option<AuditRecord>,
    pub revisions: u32,
}

pub struct Orchestrator {
    classifier: Classifier,
    specialists: SpecialistRegistry,
    judge: Arc<Judge>,
    retrieval: Arc<dyn BaseRetrieval>,
    conversations: Arc<dyn BaseConversationStore>,
    audit_sink: Arc<dyn BaseAuditSink>,
    dispatcher: AuditDispatcher,
    cache: Arc<SemanticCache>,
    settings: WorkflowSettings,
}

impl Orchestrator {
    /// Wire the workflow. Probes the semantic cache, which may come up disabled.
    pub async fn initialize(
        deps: &ServerDeps,
        settings: WorkflowSettings,
        judge: Arc<Judge>,
        dispatcher: AuditDispatcher,
    ) -> Self {
        let cache = Arc::new(
            SemanticCache::initialize(
                deps.cache_store.clone(),
                deps.embedding_service.clone(),
                settings.cache,
            )
            .await,
        );
        let retrieval: Arc<dyn BaseRetrieval> =
            Arc::new(CachedRetrieval::new(cache.clone(), deps.retrieval.clone()));

        Self {
            classifier: Classifier::new(
                deps.ai.clone(),
                settings.classifier_model.clone(),
                settings.model_timeout,
            ),
            specialists: SpecialistRegistry::new(
                deps.ai.clone(),
                deps.web_search.clone(),
                settings.chat_model.clone(),
                settings.model_timeout,
            ),
            judge,
            retrieval,
            conversations: deps.conversation_store.clone(),
            audit_sink: deps.audit_sink.clone(),
            dispatcher,
            cache,
            settings,
        }
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    /// Run a turn to completion.
    ///
    /// On error nothing is written: the stored history is exactly what it
    /// was before the call.
    #[instrument(skip_all, fields(conversation_id))]
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome, WorkflowError> {
        let conversation_id = request.conversation_id.unwrap_or_default();
        tracing::Span::current().record("conversation_id", tracing::field::display(conversation_id));

        let history = self
            .load_history(conversation_id, request.legacy_history.as_deref())
            .await?;

        let mut state = ConversationState::new(request.question, history, request.document);
        let ctx = build_context(&state, self.retrieval.clone(), today());
        state.attached_document = None;

        let max_revisions = self.settings.max_revisions;
        let mut step = WorkflowStep::Route;

        while step != WorkflowStep::Done {
            debug!(?step, revision = state.revision_count, "Workflow step");
            step = match step {
                WorkflowStep::Route => {
                    let label = self.classifier.classify(&state.user_question, &ctx).await?;
                    state.classification_label = Some(label);
                    next(step, &state, max_revisions)
                }
                WorkflowStep::Specialize(label) => {
                    let draft = self
                        .specialists
                        .respond(
                            label,
                            &state.user_question,
                            &ctx,
                            state.revision_feedback.as_deref(),
                        )
                        .await
                        .inspect_err(|e| error!(error = %e, %label, "Specialist failed"))?;
                    state.draft_response = Some(draft);

                    let following = next(step, &state, max_revisions);
                    if following == WorkflowStep::Done {
                        self.commit(conversation_id, &mut state).await;
                    }
                    following
                }
                WorkflowStep::Format => {
                    let draft = state.draft_response.take().unwrap_or_default();
                    state.draft_response = Some(normalize_markup(&draft));
                    next(step, &state, max_revisions)
                }
                WorkflowStep::Audit => self.audit_step(conversation_id, &ctx, &mut state).await,
                WorkflowStep::Done => WorkflowStep::Done,
            };
        }

        let label = state
            .classification_label
            .unwrap_or(ClassificationLabel::OutOfScope);
        let mut response = state.draft_response.unwrap_or_default();
        if self.settings.escape_currency_glyph {
            response = escape_currency_glyph(&response);
        }

        info!(%label, revisions = state.revision_count, "Turn complete");
        Ok(TurnOutcome {
            conversation_id,
            response,
            label,
            audit: state.audit_record,
            revisions: state.revision_count,
        })
    }

    async fn audit_step(
        &self,
        conversation_id: ConversationId,
        ctx: &DependencyContext,
        state: &mut ConversationState,
    ) -> WorkflowStep {
        let max_revisions = self.settings.max_revisions;
        let label = state
            .classification_label
            .unwrap_or(ClassificationLabel::OutOfScope);
        let answer = state.draft_response.clone().unwrap_or_default();

        if self.settings.audit_mode == AuditMode::Detached {
            self.commit(conversation_id, state).await;
            self.dispatcher.dispatch(AuditJob {
                conversation_id,
                label,
                question: state.user_question.clone(),
                answer,
                history: ctx.history.clone(),
            });
            return next(WorkflowStep::Audit, state, max_revisions);
        }

        state.audit_record = match self
            .judge
            .audit(&state.user_question, &answer, &ctx.history)
            .await
        {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(error = %e, "Inline audit failed, accepting draft");
                None
            }
        };

        let following = next(WorkflowStep::Audit, state, max_revisions);
        if let WorkflowStep::Specialize(_) = following {
            state.revision_count += 1;
            state.revision_feedback = state.audit_record.as_ref().map(|r| r.correction.clone());
            warn!(revision = state.revision_count, "Draft failed audit, revising");
            return following;
        }

        if let Some(record) = &state.audit_record {
            if !record.passes() {
                warn!(
                    revisions = state.revision_count,
                    "Revision limit reached, accepting last draft"
                );
            }
            let entry = AuditEntry::new(conversation_id, label, record.clone());
            if let Err(e) = self.audit_sink.record(&entry).await {
                warn!(error = %e, "Failed to record audit result");
            }
        }

        self.commit(conversation_id, state).await;
        following
    }

    /// Append the finished turn and persist it. A storage failure is logged;
    /// the answer is still returned.
    async fn commit(&self, conversation_id: ConversationId, state: &mut ConversationState) {
        let answer = state.draft_response.clone().unwrap_or_default();
        state.record_turn(&answer);

        if let Err(e) = self
            .conversations
            .save(conversation_id, &state.chat_history)
            .await
        {
            error!(error = %e, %conversation_id, "Failed to save conversation history");
        }
    }

    async fn load_history(
        &self,
        conversation_id: ConversationId,
        legacy: Option<&str>,
    ) -> Result<Vec<ChatMessage>, WorkflowError> {
        let stored = self
            .conversations
            .load(conversation_id)
            .await
            .map_err(WorkflowError::Persistence)?;

        Ok(match (stored, legacy) {
            (Some(conversation), _) => conversation.history,
            (None, Some(transcript)) => history_from_legacy(transcript),
            (None, None) => Vec::new(),
        })
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

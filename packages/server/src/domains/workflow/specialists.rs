//! Specialist registry: one responder per label.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument};

use super::context::DependencyContext;
use super::error::{with_timeout, Stage, WorkflowError};
use super::label::ClassificationLabel;
use super::prompts;
use crate::kernel::{
    BaseAI, BaseWebSearch, CompletionRequest, LegalSearchTool, ToolBox, WebSearchTool,
};

/// Which tools a model-backed specialist may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolAccess {
    pub legal_search: bool,
    pub web_search: bool,
}

impl ToolAccess {
    pub const NONE: ToolAccess = ToolAccess {
        legal_search: false,
        web_search: false,
    };
    pub const ALL: ToolAccess = ToolAccess {
        legal_search: true,
        web_search: true,
    };
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Responder {
    /// Topic expert: specialist prompt plus tools.
    Topic(ToolAccess),
    /// Short cordial reply from the model, no tools.
    Conversational,
    /// Fixed text, no model call.
    Static(&'static str),
}

#[derive(Debug, Clone)]
pub struct Specialist {
    pub label: ClassificationLabel,
    pub responder: Responder,
}

impl Specialist {
    pub fn is_static(&self) -> bool {
        matches!(self.responder, Responder::Static(_))
    }
}

fn default_specialists() -> HashMap<ClassificationLabel, Specialist> {
    ClassificationLabel::ALL
        .into_iter()
        .map(|label| {
            let responder = match label {
                ClassificationLabel::Conversational => Responder::Conversational,
                ClassificationLabel::OutOfScope => Responder::Static(prompts::OUT_OF_SCOPE_RESPONSE),
                _ => Responder::Topic(ToolAccess::ALL),
            };
            (label, Specialist { label, responder })
        })
        .collect()
}

pub struct SpecialistRegistry {
    specialists: HashMap<ClassificationLabel, Specialist>,
    ai: Arc<dyn BaseAI>,
    web_search: Arc<dyn BaseWebSearch>,
    model: String,
    timeout: Duration,
}

impl SpecialistRegistry {
    pub fn new(
        ai: Arc<dyn BaseAI>,
        web_search: Arc<dyn BaseWebSearch>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            specialists: default_specialists(),
            ai,
            web_search,
            model: model.into(),
            timeout,
        }
    }

    /// Replace the tool access of one topic specialist.
    pub fn with_tools(mut self, label: ClassificationLabel, access: ToolAccess) -> Self {
        if let Some(s) = self.specialists.get_mut(&label) {
            if let Responder::Topic(_) = s.responder {
                s.responder = Responder::Topic(access);
            }
        }
        self
    }

    pub fn get(&self, label: ClassificationLabel) -> Option<&Specialist> {
        self.specialists.get(&label)
    }

    fn toolbox(&self, access: ToolAccess, ctx: &DependencyContext) -> ToolBox {
        let mut tools = ToolBox::new();
        if access.legal_search {
            tools = tools.with(LegalSearchTool::new(ctx.retrieval.clone()));
        }
        if access.web_search {
            tools = tools.with(WebSearchTool::new(self.web_search.clone()));
        }
        tools
    }

    /// Produce a draft answer. `revision` carries the judge's correction when
    /// a previous draft failed a blocking audit.
    #[instrument(skip_all, fields(label = %label))]
    pub async fn respond(
        &self,
        label: ClassificationLabel,
        question: &str,
        ctx: &DependencyContext,
        revision: Option<&str>,
    ) -> Result<String, WorkflowError> {
        let responder = self
            .get(label)
            .map(|s| s.responder.clone())
            .unwrap_or(Responder::Static(prompts::OUT_OF_SCOPE_RESPONSE));

        let (system, tools) = match responder {
            Responder::Static(text) => {
                debug!("Static specialist, no model call");
                return Ok(text.to_string());
            }
            Responder::Conversational => (
                prompts::conversational_prompt(),
                ToolBox::new(),
            ),
            Responder::Topic(access) => (
                prompts::specialist_prompt(label, ctx),
                self.toolbox(access, ctx),
            ),
        };

        let mut user = question.to_string();
        if let Some(correction) = revision {
            user.push_str(&prompts::revision_note(correction));
        }

        let request = CompletionRequest::builder()
            .system(system)
            .messages(ctx.messages_with(user))
            .model(self.model.clone())
            .build();

        let draft = with_timeout(
            Stage::Specialist,
            self.timeout,
            self.ai.complete_with_tools(request, &tools),
        )
        .await?;

        info!(tools = ?tools, draft_len = draft.len(), "Specialist produced draft");
        Ok(draft)
    }
}

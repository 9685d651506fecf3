use std::sync::Arc;

use chrono::NaiveDate;

use crate::common::document::NO_DOCUMENT;
use crate::domains::conversation::{ChatMessage, ConversationState};
use crate::kernel::{BaseRetrieval, Message};

/// Shorter attachments are treated as absent.
const MIN_DOCUMENT_CHARS: usize = 10;

/// Read-only bundle handed to every specialist for one turn.
#[derive(Clone)]
pub struct DependencyContext {
    /// Cache-backed legislation retrieval.
    pub retrieval: Arc<dyn BaseRetrieval>,
    /// Prior turns in canonical form.
    pub history: Vec<ChatMessage>,
    /// Document text, or [`NO_DOCUMENT`].
    pub document_text: String,
    pub today: NaiveDate,
}

impl DependencyContext {
    pub fn has_document(&self) -> bool {
        self.document_text != NO_DOCUMENT
    }

    /// Prior turns as role-tagged messages, followed by `latest` from the user.
    pub fn messages_with(&self, latest: impl Into<String>) -> Vec<Message> {
        self.history
            .iter()
            .map(Message::from)
            .chain(std::iter::once(Message::user(latest)))
            .collect()
    }

    /// `dd/mm/yyyy`, the way dates are written in the prompts.
    pub fn today_br(&self) -> String {
        self.today.format("%d/%m/%Y").to_string()
    }
}

impl std::fmt::Debug for DependencyContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyContext")
            .field("history_len", &self.history.len())
            .field("document_chars", &self.document_text.chars().count())
            .field("today", &self.today)
            .finish()
    }
}

pub fn build_context(
    state: &ConversationState,
    retrieval: Arc<dyn BaseRetrieval>,
    today: NaiveDate,
) -> DependencyContext {
    let document_text = match state.attached_document.as_deref() {
        Some(text) if text.trim().chars().count() > MIN_DOCUMENT_CHARS => text.to_string(),
        _ => NO_DOCUMENT.to_string(),
    };

    DependencyContext {
        retrieval,
        history: state.chat_history.clone(),
        document_text,
        today,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::test_dependencies::MockRetrieval;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 9).unwrap()
    }

    #[test]
    fn missing_document_uses_sentinel() {
        let state = ConversationState::new("Oi", vec![], None);
        let ctx = build_context(&state, Arc::new(MockRetrieval::new()), today());

        assert_eq!(ctx.document_text, NO_DOCUMENT);
        assert!(!ctx.has_document());
        assert_eq!(ctx.today_br(), "09/03/2026");
    }

    #[test]
    fn document_and_history_are_carried() {
        let state = ConversationState::new(
            "Analise a multa",
            vec![ChatMessage::user("Oi"), ChatMessage::assistant("Olá")],
            Some("Cláusula 5ª: multa de três aluguéis".into()),
        );
        let ctx = build_context(&state, Arc::new(MockRetrieval::new()), today());

        assert!(ctx.has_document());
        assert_eq!(ctx.history.len(), 2);
        assert!(!build_context(
            &ConversationState::new("q", vec![], Some("ok".into())),
            Arc::new(MockRetrieval::new()),
            today()
        )
        .has_document());
        assert_eq!(
            ctx.messages_with("E agora?"),
            vec![
                Message::user("Oi"),
                Message::assistant("Olá"),
                Message::user("E agora?"),
            ]
        );
    }
}

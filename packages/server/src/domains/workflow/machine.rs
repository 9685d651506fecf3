//! Turn state machine.
//!
//! ```text
//! Route ──► Specialize(label) ──► Format ──► Audit ──► Done
//!                 │   ▲                        │
//!                 │   └──── failed audit ──────┘  (blocking mode, bounded)
//!                 └──► Done   (conversational, out_of_scope)
//! ```
//!
//! `next` is pure: every branch is decided from the state alone.

use crate::domains::conversation::ConversationState;
use crate::domains::workflow::ClassificationLabel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    Route,
    Specialize(ClassificationLabel),
    Format,
    Audit,
    Done,
}

pub fn next(step: WorkflowStep, state: &ConversationState, max_revisions: u32) -> WorkflowStep {
    match step {
        WorkflowStep::Route => WorkflowStep::Specialize(
            state
                .classification_label
                .unwrap_or(ClassificationLabel::OutOfScope),
        ),
        WorkflowStep::Specialize(label) if label.is_topic() => WorkflowStep::Format,
        WorkflowStep::Specialize(_) => WorkflowStep::Done,
        WorkflowStep::Format => WorkflowStep::Audit,
        WorkflowStep::Audit => match (&state.audit_record, state.classification_label) {
            (Some(record), Some(label))
                if !record.passes() && state.revision_count < max_revisions =>
            {
                WorkflowStep::Specialize(label)
            }
            _ => WorkflowStep::Done,
        },
        WorkflowStep::Done => WorkflowStep::Done,
    }
}

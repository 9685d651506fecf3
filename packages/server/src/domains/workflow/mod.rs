//! The turn pipeline: classify, specialize, format, audit.

pub mod classifier;
pub mod context;
pub mod error;
pub mod label;
pub mod machine;
pub mod orchestrator;
pub mod prompts;
pub mod specialists;

pub use classifier::Classifier;
pub use context::{build_context, DependencyContext};
pub use error::{Stage, WorkflowError};
pub use label::{parse_label_output, ClassificationLabel};
pub use machine::{next, WorkflowStep};
pub use orchestrator::{Orchestrator, TurnOutcome, TurnRequest, WorkflowSettings};
pub use specialists::{Responder, Specialist, SpecialistRegistry, ToolAccess};

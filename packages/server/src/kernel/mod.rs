//! Kernel module - server infrastructure and dependencies.

pub mod deps;
pub mod openai;
pub mod retrieval;
pub mod schema;
pub mod tavily_client;
pub mod test_dependencies;
pub mod tools;
pub mod traits;

pub use deps::ServerDeps;
pub use openai::{OpenAiClient, OpenAiError};
pub use schema::StructuredOutput;
pub use test_dependencies::TestDependencies;
pub use tools::{LegalSearchTool, Tool, ToolBox, WebSearchTool};
pub use traits::*;

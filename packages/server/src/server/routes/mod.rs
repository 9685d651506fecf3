// HTTP routes
pub mod chat;
pub mod conversations;
pub mod health;
pub mod ingestion;

pub use chat::*;
pub use conversations::*;
pub use health::*;
pub use ingestion::*;

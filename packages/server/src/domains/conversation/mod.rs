pub mod models;
pub mod store;

pub use models::{
    history_from_legacy, ChatMessage, ConversationState, Role, StoredConversation,
};
pub use store::{InMemoryConversationStore, PgConversationStore};

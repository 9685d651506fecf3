// Common types and utilities shared across the application

pub mod document;
pub mod id;
pub mod markup;
pub mod utils;

pub use id::{AuditRecordId, ConversationId, Id};
pub use markup::{escape_currency_glyph, normalize_markup};

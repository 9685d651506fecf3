// Juridico - API Core
//
// Legal-assistant backend: routes business-law questions to topic
// specialists, formats their answers and audits them in the background.
//
// Each domain lives under domains/*; external services sit behind the
// Base* traits in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;

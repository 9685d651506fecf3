// Business domains
pub mod audit;
pub mod cache;
pub mod conversation;
pub mod workflow;

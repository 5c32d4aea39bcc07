//! Salary analysis pipeline: upload validation → data-URL encoding →
//! bounded-retry model invocation → response shaping.

pub mod handlers;
pub mod invoker;
pub mod models;
pub mod prompts;
pub mod upload;

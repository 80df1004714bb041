//! Portfolio Builder: a guided Statement of Intent questionnaire.

pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod prompts;
pub mod questionnaire;
pub mod schema;
pub mod store;

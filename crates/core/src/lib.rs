pub mod config;
pub mod domain;
pub mod llm;
pub mod pricing;
pub mod quote;

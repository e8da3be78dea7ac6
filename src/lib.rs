pub mod agent;
pub mod api;
pub mod catalog;
pub mod config;
pub mod data_models;
pub mod errors;
pub mod finder;
pub mod llm;

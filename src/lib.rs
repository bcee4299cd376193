pub mod config;
pub mod engine;
pub mod models;
pub mod plan;
pub mod report;

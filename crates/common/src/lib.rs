//! Paper Pulse Common Library
//!
//! Shared code for the ingestion and search crates including:
//! - Domain models and arXiv identifier helpers
//! - The predicate AST and the paper store contract
//! - SQL (sea-orm) and in-memory store adapters
//! - Result cache abstraction
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod cache;
pub mod config;
pub mod db;
pub mod domain;
pub mod errors;
pub mod metrics;
pub mod predicate;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, SqlPaperStore};
pub use domain::{Author, Paper, RemoteRecord};
pub use errors::{AppError, Result};
pub use predicate::{Flag, Predicate, TextField};
pub use store::{MemoryPaperStore, PaperStore, Sort, SortField, SortOrder};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

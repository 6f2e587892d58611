//! Paper Pulse Ingestion
//!
//! Keeps the local paper store in sync with arXiv:
//! - [`IngestionEngine`]: one cutoff-bounded sync pass per standing query
//! - [`SyncOrchestrator`]: all standing queries, strictly sequential
//! - Quick fetch, important-papers list and ad hoc remote search
//! - [`ArxivClient`]: the arXiv Atom adapter behind [`PaperSource`]

pub mod arxiv;
pub mod engine;
pub mod errors;
pub mod fetch;
pub mod orchestrator;
pub mod source;
pub mod stats;

#[cfg(test)]
pub(crate) mod test_support;

pub use arxiv::ArxivClient;
pub use engine::{IngestionEngine, SyncOptions, SyncOutcome};
pub use errors::{IngestionError, SourceError};
pub use fetch::{ImportantOutcome, RemoteSearchOutcome};
pub use orchestrator::{SyncOrchestrator, SyncReport};
pub use source::{PaperSource, SourceOrder, SourceQuery, SourceSort};
pub use stats::{crawler_stats, CrawlerStats};

//! Paper Pulse Search
//!
//! Keyword retrieval over the local paper store:
//! - [`SearchFilter`]: caller-built filter description
//! - Tiered fuzzy text matching with a two-phase strict re-rank
//! - Category similarity and search history
//! - Optional caching through a caller-owned [`pulse_common::cache::ResultCache`]

pub mod cached;
pub mod engine;
pub mod filter;
pub mod predicates;
pub mod text;

pub use cached::cache_key;
pub use engine::{SearchEngine, SearchHistoryEntry};
pub use filter::{AuthorMatch, SearchFilter, SimilarityQuery};

//! Paper store abstraction
//!
//! Both engines receive an `Arc<dyn PaperStore>` at construction time. Two
//! adapters ship with the crate:
//! - [`crate::db::SqlPaperStore`]: sea-orm over SQLite or PostgreSQL
//! - [`MemoryPaperStore`]: in-process, evaluates predicates directly
//!
//! Every adapter must enforce `arxiv_id` uniqueness on insert and report a
//! violation as [`AppError::Duplicate`](crate::AppError::Duplicate).

mod memory;

pub use memory::MemoryPaperStore;

use crate::domain::Paper;
use crate::errors::Result;
use crate::predicate::Predicate;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;
use uuid::Uuid;

/// Sortable paper columns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Published,
    RelevanceScore,
    Title,
    Updated,
    CreatedAt,
}

impl FromStr for SortField {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to `published`
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "relevance_score" | "relevance" => SortField::RelevanceScore,
            "title" => SortField::Title,
            "updated" => SortField::Updated,
            "created_at" => SortField::CreatedAt,
            _ => SortField::Published,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Result ordering. Ties are broken by `arxiv_id` ascending; missing values
/// sort lowest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Sort {
    pub field: SortField,
    pub order: SortOrder,
}

impl Sort {
    pub fn new(field: SortField, order: SortOrder) -> Self {
        Self { field, order }
    }

    /// Compare two papers under this ordering
    pub fn compare(&self, a: &Paper, b: &Paper) -> Ordering {
        let primary = match self.field {
            SortField::Published => a.published.cmp(&b.published),
            SortField::Updated => a.updated.cmp(&b.updated),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::RelevanceScore => a.relevance_score.total_cmp(&b.relevance_score),
        };
        let primary = match self.order {
            SortOrder::Asc => primary,
            SortOrder::Desc => primary.reverse(),
        };
        primary.then_with(|| a.arxiv_id.cmp(&b.arxiv_id))
    }
}

/// Usage of one provenance value across the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceSummary {
    pub query: String,
    pub count: u64,
    /// Most recent publication date among the query's papers
    pub last_published: Option<NaiveDateTime>,
    /// The paper carrying that date
    pub last_arxiv_id: Option<String>,
}

/// Persistence contract consumed by the ingestion and retrieval engines
#[async_trait]
pub trait PaperStore: Send + Sync {
    /// Whether a paper with this arXiv id is stored
    async fn exists(&self, arxiv_id: &str) -> Result<bool>;

    /// Insert a new paper. Fails with `AppError::Duplicate` if the id is taken.
    async fn insert(&self, paper: Paper) -> Result<Uuid>;

    /// Latest publication date among papers with this provenance
    async fn latest_published(&self, search_query: &str) -> Result<Option<NaiveDateTime>>;

    /// Papers matching `predicate`, ordered by `sort`, paginated
    async fn query(
        &self,
        predicate: &Predicate,
        sort: Sort,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Paper>>;

    /// Number of papers matching `predicate`
    async fn count(&self, predicate: &Predicate) -> Result<u64>;

    async fn find_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<Paper>>;

    /// Provenance values by descending paper count
    async fn provenance_summary(&self, limit: Option<u64>) -> Result<Vec<ProvenanceSummary>>;
}

//! Sync orchestrator
//!
//! Runs the ingestion engine over every standing query, strictly one after
//! another. A failing query is recorded and the next one still runs.

use crate::engine::{IngestionEngine, SyncOptions, SyncOutcome};
use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

/// Window used by the daily update
pub const DAILY_WINDOW_DAYS: i64 = 2;

/// Aggregate of a full sync over all standing queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReport {
    pub total_new_papers: usize,
    /// One entry per standing query, in configuration order
    pub query_results: Vec<SyncOutcome>,
    pub years_back: u32,
    pub force: bool,
    pub max_results: usize,
}

/// Aggregate of a daily update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub total_new_papers: usize,
    pub since: NaiveDateTime,
    pub query_results: Vec<SyncOutcome>,
}

/// Aggregate of a category crawl
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCrawlReport {
    pub total_new_papers: usize,
    pub categories: Vec<String>,
    pub results: Vec<SyncOutcome>,
}

/// Sequential driver over the configured standing queries
pub struct SyncOrchestrator {
    engine: Arc<IngestionEngine>,
    queries: Vec<String>,
}

impl SyncOrchestrator {
    pub fn new(engine: Arc<IngestionEngine>, queries: Vec<String>) -> Self {
        Self { engine, queries }
    }

    pub fn queries(&self) -> &[String] {
        &self.queries
    }

    /// Sync every standing query
    #[instrument(skip(self), fields(queries = self.queries.len()))]
    pub async fn sync_all_queries(&self, years_back: u32, force: bool, max_results: usize) -> SyncReport {
        let options = SyncOptions {
            years_back,
            force,
            max_results,
        };

        let mut query_results = Vec::with_capacity(self.queries.len());
        for query in &self.queries {
            query_results.push(self.engine.sync_query(query, options).await);
        }

        let total_new_papers = query_results.iter().map(|r| r.new_saved).sum();
        let failed = query_results.iter().filter(|r| r.error.is_some()).count();
        info!(total_new_papers, failed, "Sync of all queries finished");

        SyncReport {
            total_new_papers,
            query_results,
            years_back,
            force,
            max_results,
        }
    }

    /// Pick up papers from the last two days for every standing query
    #[instrument(skip(self))]
    pub async fn daily_update(&self, max_results: usize) -> DailyReport {
        let since = Utc::now().naive_utc() - ChronoDuration::days(DAILY_WINDOW_DAYS);

        let mut query_results = Vec::with_capacity(self.queries.len());
        for query in &self.queries {
            query_results.push(self.engine.sync_since(query, since, max_results).await);
        }

        let total_new_papers = query_results.iter().map(|r| r.new_saved).sum();
        info!(total_new_papers, since = %since, "Daily update finished");

        DailyReport {
            total_new_papers,
            since,
            query_results,
        }
    }

    /// Pull the newest papers of each category
    #[instrument(skip(self))]
    pub async fn crawl_categories(&self, categories: &[String], max_results: usize) -> CategoryCrawlReport {
        let mut results = Vec::with_capacity(categories.len());
        for category in categories {
            results.push(self.engine.crawl_category(category, max_results).await);
        }

        let total_new_papers = results.iter().map(|r| r.new_saved).sum();
        info!(total_new_papers, "Category crawl finished");

        CategoryCrawlReport {
            total_new_papers,
            categories: categories.to_vec(),
            results,
        }
    }
}

//! Ingestion engine
//!
//! One sync pass per standing query:
//! 1. Compute the cutoff date (forced window, or the stored cursor minus a day)
//! 2. Stream newest-first records until one is older than the cutoff or the
//!    result cap is reached
//! 3. Insert records whose arXiv id is not stored yet
//!
//! Failures never escape a pass: they end up in [`SyncOutcome::error`].
//! Already-stored records are counted but never stop the scan.

use crate::errors::SourceError;
use crate::source::{PaperSource, SourceQuery, SourceSort, SourceOrder};
use chrono::{Duration as ChronoDuration, NaiveDateTime, Utc};
use futures::StreamExt;
use pulse_common::domain::normalize_arxiv_id;
use pulse_common::metrics::record_sync;
use pulse_common::{Paper, PaperStore, RemoteRecord};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Consecutive store failures after which a pass is abandoned
pub const MAX_CONSECUTIVE_STORE_FAILURES: usize = 5;

/// Safety margin subtracted from the stored cursor
const CURSOR_MARGIN_DAYS: i64 = 1;

/// Inputs of a single sync pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOptions {
    pub years_back: u32,
    pub force: bool,
    pub max_results: usize,
}

/// Result of one sync pass over one query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub query: String,
    /// Earliest publication date accepted; `None` when the scan was unbounded
    pub cutoff_date: Option<NaiveDateTime>,
    /// Records pulled from the source
    pub total_found: usize,
    pub new_saved: usize,
    /// Records skipped because their id was already stored
    pub existing: usize,
    /// Records whose insert failed
    pub failed: usize,
    /// The result cap stopped the scan
    pub hit_limit: bool,
    pub force: bool,
    pub error: Option<String>,
}

impl SyncOutcome {
    fn empty(query: &str, cutoff_date: Option<NaiveDateTime>, force: bool) -> Self {
        Self {
            query: query.to_string(),
            cutoff_date,
            total_found: 0,
            new_saved: 0,
            existing: 0,
            failed: 0,
            hit_limit: false,
            force,
            error: None,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

#[derive(Debug, Default)]
struct SaveTally {
    new_saved: usize,
    existing: usize,
    failed: usize,
    error: Option<String>,
}

/// Drives sync passes against a remote source and a paper store
pub struct IngestionEngine {
    pub(crate) store: Arc<dyn PaperStore>,
    pub(crate) source: Arc<dyn PaperSource>,
    pub(crate) query_delay: Duration,
    pub(crate) fetch_delay: Duration,
    sort_by: SourceSort,
    sort_order: SourceOrder,
}

impl IngestionEngine {
    pub fn new(store: Arc<dyn PaperStore>, source: Arc<dyn PaperSource>) -> Self {
        Self {
            store,
            source,
            query_delay: Duration::ZERO,
            fetch_delay: Duration::ZERO,
            sort_by: SourceSort::SubmittedDate,
            sort_order: SourceOrder::Descending,
        }
    }

    /// Pause applied after every query pass
    pub fn with_query_delay(mut self, delay: Duration) -> Self {
        self.query_delay = delay;
        self
    }

    /// Pause applied between single-paper fetches
    pub fn with_fetch_delay(mut self, delay: Duration) -> Self {
        self.fetch_delay = delay;
        self
    }

    /// Remote ordering. The cutoff early stop assumes newest-first.
    pub fn with_source_order(mut self, sort_by: SourceSort, sort_order: SourceOrder) -> Self {
        self.sort_by = sort_by;
        self.sort_order = sort_order;
        self
    }

    pub fn store(&self) -> &Arc<dyn PaperStore> {
        &self.store
    }

    /// Sync one standing query
    #[instrument(skip(self), fields(source = self.source.name()))]
    pub async fn sync_query(&self, query: &str, options: SyncOptions) -> SyncOutcome {
        let window_start = Utc::now().naive_utc() - years(options.years_back);

        let cutoff = if options.force {
            debug!(cutoff = %window_start, "Forced sync over the full window");
            window_start
        } else {
            match self.store.latest_published(query).await {
                Ok(Some(latest)) => {
                    let cutoff = latest - ChronoDuration::days(CURSOR_MARGIN_DAYS);
                    debug!(cursor = %latest, cutoff = %cutoff, "Incremental sync");
                    cutoff
                }
                Ok(None) => {
                    debug!(cutoff = %window_start, "First sync for query");
                    window_start
                }
                Err(e) => {
                    warn!(error = %e, "Failed to read sync cursor");
                    let mut outcome = SyncOutcome::empty(query, Some(window_start), options.force);
                    outcome.error = Some(e.to_string());
                    self.pause_between_queries().await;
                    return outcome;
                }
            }
        };

        self.run_pass(query, query, Some(cutoff), options.max_results, options.force)
            .await
    }

    /// Sync `query` accepting only records published on or after `cutoff`
    pub async fn sync_since(
        &self,
        query: &str,
        cutoff: NaiveDateTime,
        max_results: usize,
    ) -> SyncOutcome {
        self.run_pass(query, query, Some(cutoff), max_results, false).await
    }

    /// Pull the newest records of one category, without a cutoff
    pub async fn crawl_category(&self, category: &str, max_results: usize) -> SyncOutcome {
        let query = format!("cat:{}", category.trim());
        self.run_pass(&query, &query, None, max_results, false).await
    }

    /// Fetch, dedupe and insert for one query; never fails
    pub(crate) async fn run_pass(
        &self,
        query: &str,
        provenance: &str,
        cutoff: Option<NaiveDateTime>,
        max_results: usize,
        force: bool,
    ) -> SyncOutcome {
        let started = Instant::now();
        let mut outcome = SyncOutcome::empty(query, cutoff, force);

        match self.collect(query, cutoff, max_results).await {
            Ok((records, hit_limit)) => {
                outcome.total_found = records.len();
                outcome.hit_limit = hit_limit;

                let tally = self.save(records, provenance).await;
                outcome.new_saved = tally.new_saved;
                outcome.existing = tally.existing;
                outcome.failed = tally.failed;
                outcome.error = tally.error;
            }
            Err(e) => {
                warn!(query, error = %e, "Remote fetch failed");
                outcome.error = Some(e.to_string());
            }
        }

        if outcome.hit_limit {
            info!(query, max_results, "Result cap reached, older records may remain");
        }
        info!(
            query,
            total_found = outcome.total_found,
            new_saved = outcome.new_saved,
            existing = outcome.existing,
            failed = outcome.failed,
            error = outcome.error.as_deref().unwrap_or(""),
            "Sync pass finished"
        );
        record_sync(
            started.elapsed().as_secs_f64(),
            provenance,
            outcome.new_saved,
            outcome.error.is_some(),
        );

        self.pause_between_queries().await;
        outcome
    }

    async fn pause_between_queries(&self) {
        if !self.query_delay.is_zero() {
            tokio::time::sleep(self.query_delay).await;
        }
    }

    /// Stream records until the cutoff or the cap; returns whether the cap hit
    async fn collect(
        &self,
        query: &str,
        cutoff: Option<NaiveDateTime>,
        max_results: usize,
    ) -> Result<(Vec<RemoteRecord>, bool), SourceError> {
        let mut records = Vec::new();
        if max_results == 0 {
            return Ok((records, false));
        }

        let request = SourceQuery {
            query: query.to_string(),
            max_results,
            sort_by: self.sort_by,
            sort_order: self.sort_order,
        };
        let mut stream = self.source.search(request);

        while let Some(item) = stream.next().await {
            let record = item?;

            if let (Some(cutoff), Some(published)) = (cutoff, record.published) {
                if published < cutoff {
                    debug!(published = %published, "Reached records older than cutoff, stopping");
                    break;
                }
            }

            records.push(record);
            if records.len() >= max_results {
                return Ok((records, true));
            }
        }

        Ok((records, false))
    }

    /// Insert records not yet stored. Duplicate ids count as existing.
    async fn save(&self, records: Vec<RemoteRecord>, provenance: &str) -> SaveTally {
        let mut tally = SaveTally::default();
        let mut attempted = 0usize;
        let mut streak = 0usize;
        let mut last_error = String::new();

        for record in records {
            let arxiv_id = normalize_arxiv_id(&record.external_id);

            let result = match self.store.exists(&arxiv_id).await {
                Ok(true) => {
                    debug!(arxiv_id = %arxiv_id, "Paper already stored");
                    tally.existing += 1;
                    continue;
                }
                Ok(false) => {
                    attempted += 1;
                    self.store.insert(Paper::from_remote(record, provenance)).await
                }
                Err(e) => {
                    attempted += 1;
                    Err(e)
                }
            };

            match result {
                Ok(_) => {
                    tally.new_saved += 1;
                    streak = 0;
                }
                Err(e) if e.is_duplicate() => {
                    // lost a race with a concurrent writer
                    tally.existing += 1;
                    streak = 0;
                }
                Err(e) => {
                    warn!(arxiv_id = %arxiv_id, error = %e, "Failed to store paper");
                    tally.failed += 1;
                    last_error = e.to_string();
                    // a rejected row says nothing about the store's health
                    streak = if e.is_store_failure() { streak + 1 } else { 0 };

                    if streak >= MAX_CONSECUTIVE_STORE_FAILURES {
                        tally.error = Some(format!(
                            "aborted after {} consecutive store failures: {}",
                            streak, last_error
                        ));
                        return tally;
                    }
                }
            }
        }

        if attempted > 1 && tally.failed == attempted {
            tally.error = Some(format!(
                "all {} inserts failed: {}",
                attempted, last_error
            ));
        }

        tally
    }
}

fn years(n: u32) -> ChronoDuration {
    ChronoDuration::days(365 * i64::from(n))
}

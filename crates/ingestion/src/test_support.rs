//! Scripted source and failing store shared by the ingestion tests

use crate::errors::{SourceError, SourceResult};
use crate::source::{PaperSource, SourceQuery};
use async_trait::async_trait;
use chrono::{Duration, NaiveDateTime, Utc};
use futures::stream::{self, BoxStream, StreamExt};
use pulse_common::predicate::Predicate;
use pulse_common::store::{ProvenanceSummary, Sort};
use pulse_common::{AppError, Author, MemoryPaperStore, Paper, PaperStore, RemoteRecord, Result};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

pub fn days_ago(days: i64) -> Option<NaiveDateTime> {
    Some(Utc::now().naive_utc() - Duration::days(days))
}

pub fn hours_ago(hours: i64) -> Option<NaiveDateTime> {
    Some(Utc::now().naive_utc() - Duration::hours(hours))
}

pub fn record(id: &str, published: Option<NaiveDateTime>) -> RemoteRecord {
    RemoteRecord {
        external_id: id.to_string(),
        title: format!("Paper {}", id),
        authors: vec![Author::new("Test Author")],
        abstract_text: "An abstract.".to_string(),
        categories: vec!["cond-mat.mtrl-sci".to_string(), "cs.LG".to_string()],
        primary_category: Some("cond-mat.mtrl-sci".to_string()),
        published,
        ..Default::default()
    }
}

/// Source replaying a fixed, newest-first record list
pub struct ScriptedSource {
    records: Vec<RemoteRecord>,
    fail_after: Option<usize>,
    pulled: Arc<AtomicUsize>,
    queries: Mutex<Vec<SourceQuery>>,
}

impl ScriptedSource {
    pub fn new(records: Vec<RemoteRecord>) -> Self {
        Self {
            records,
            fail_after: None,
            pulled: Arc::new(AtomicUsize::new(0)),
            queries: Mutex::new(Vec::new()),
        }
    }

    /// Yield `n` records, then a 503
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Records handed to consumers so far, across all searches
    pub fn pulled(&self) -> usize {
        self.pulled.load(Ordering::SeqCst)
    }

    pub fn last_query(&self) -> Option<SourceQuery> {
        self.queries.lock().ok().and_then(|q| q.last().cloned())
    }

    pub fn query_count(&self) -> usize {
        self.queries.lock().map(|q| q.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PaperSource for ScriptedSource {
    fn search(&self, query: SourceQuery) -> BoxStream<'_, SourceResult<RemoteRecord>> {
        let max = query.max_results;
        if let Ok(mut queries) = self.queries.lock() {
            queries.push(query);
        }

        let mut items: Vec<SourceResult<RemoteRecord>> =
            self.records.iter().cloned().map(Ok).collect();
        if let Some(n) = self.fail_after {
            items.truncate(n);
            items.push(Err(SourceError::Status {
                status: 503,
                url: "scripted".to_string(),
            }));
        }

        let pulled = self.pulled.clone();
        stream::iter(items)
            .take(max)
            .map(move |item| {
                pulled.fetch_add(1, Ordering::SeqCst);
                item
            })
            .boxed()
    }

    async fn fetch_by_ids(&self, ids: &[String]) -> SourceResult<Vec<RemoteRecord>> {
        if self.fail_after == Some(0) {
            return Err(SourceError::Status {
                status: 503,
                url: "scripted".to_string(),
            });
        }
        Ok(self
            .records
            .iter()
            .filter(|r| {
                let id = pulse_common::domain::normalize_arxiv_id(&r.external_id);
                ids.iter().any(|wanted| *wanted == id)
            })
            .cloned()
            .collect())
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// Memory store whose inserts fail for selected ids (or all of them)
pub struct FlakyStore {
    inner: MemoryPaperStore,
    failing: Option<HashSet<String>>,
    cursor_fails: bool,
    rejects_rows: bool,
}

impl FlakyStore {
    pub fn failing_ids(ids: &[&str]) -> Self {
        Self {
            inner: MemoryPaperStore::new(),
            failing: Some(ids.iter().map(|s| s.to_string()).collect()),
            cursor_fails: false,
            rejects_rows: false,
        }
    }

    pub fn failing_all() -> Self {
        Self {
            inner: MemoryPaperStore::new(),
            failing: None,
            cursor_fails: false,
            rejects_rows: false,
        }
    }

    /// Inserts succeed but the sync cursor cannot be read
    pub fn failing_cursor() -> Self {
        Self {
            inner: MemoryPaperStore::new(),
            failing: Some(HashSet::new()),
            cursor_fails: true,
            rejects_rows: false,
        }
    }

    /// Failing inserts report a bad row instead of a store outage
    pub fn rejecting_rows(mut self) -> Self {
        self.rejects_rows = true;
        self
    }
}

#[async_trait]
impl PaperStore for FlakyStore {
    async fn exists(&self, arxiv_id: &str) -> Result<bool> {
        self.inner.exists(arxiv_id).await
    }

    async fn insert(&self, paper: Paper) -> Result<Uuid> {
        let fails = match &self.failing {
            Some(ids) => ids.contains(&paper.arxiv_id),
            None => true,
        };
        if fails && self.rejects_rows {
            return Err(AppError::InvalidFormat {
                message: format!("rejected row {}", paper.arxiv_id),
            });
        }
        if fails {
            return Err(AppError::DatabaseConnection {
                message: "database is locked".to_string(),
            });
        }
        self.inner.insert(paper).await
    }

    async fn latest_published(&self, search_query: &str) -> Result<Option<NaiveDateTime>> {
        if self.cursor_fails {
            return Err(AppError::DatabaseConnection {
                message: "database is locked".to_string(),
            });
        }
        self.inner.latest_published(search_query).await
    }

    async fn query(
        &self,
        predicate: &Predicate,
        sort: Sort,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Paper>> {
        self.inner.query(predicate, sort, offset, limit).await
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64> {
        self.inner.count(predicate).await
    }

    async fn find_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<Paper>> {
        self.inner.find_by_arxiv_id(arxiv_id).await
    }

    async fn provenance_summary(&self, limit: Option<u64>) -> Result<Vec<ProvenanceSummary>> {
        self.inner.provenance_summary(limit).await
    }
}

//! Retrieval engine
//!
//! Runs filter predicates against the paper store. Strict searches are
//! two-phase: the fuzzy superset is fetched in the caller's sort order, split
//! into word-boundary matches and the rest, and paginated only after the
//! strict tier has been put first.
//!
//! Nothing here returns an error to the caller. Validation, predicate and
//! store failures are logged and produce an empty result.

use crate::filter::{SearchFilter, SimilarityQuery};
use crate::predicates::build_predicate;
use crate::text::{tokenize, BoundaryMatcher};
use chrono::{NaiveDateTime, Utc};
use pulse_common::domain::split_categories;
use pulse_common::metrics::record_search;
use pulse_common::{AppError, Paper, PaperStore, Predicate, Result, Sort};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, instrument, warn};
use validator::Validate;

/// One provenance value and its most recent paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHistoryEntry {
    pub query: String,
    pub count: u64,
    pub last_used: Option<NaiveDateTime>,
    pub last_paper_id: Option<String>,
}

pub struct SearchEngine {
    store: Arc<dyn PaperStore>,
}

impl SearchEngine {
    pub fn new(store: Arc<dyn PaperStore>) -> Self {
        Self { store }
    }

    /// Papers matching `filter`; empty on any failure
    #[instrument(skip(self, filter), fields(mode = filter.mode()))]
    pub async fn search(&self, filter: &SearchFilter) -> Vec<Paper> {
        let started = Instant::now();

        if let Err(e) = filter.validate() {
            warn!(error = %e, "Rejected invalid search filter");
            return Vec::new();
        }

        let papers = match self.try_search(filter).await {
            Ok(papers) => papers,
            Err(e) => {
                warn!(error = %e, "Search failed");
                Vec::new()
            }
        };

        record_search(started.elapsed().as_secs_f64(), filter.mode(), papers.len());
        papers
    }

    async fn try_search(&self, filter: &SearchFilter) -> Result<Vec<Paper>> {
        let now = Utc::now().naive_utc();

        if !filter.strict_match || filter.query_text().is_none() {
            let predicate = build_predicate(filter, filter.strict_match, now);
            let papers = self
                .store
                .query(&predicate, sort_of(filter), filter.offset, Some(filter.limit))
                .await?;
            debug!(found = papers.len(), "Search finished");
            return Ok(papers);
        }

        self.tiered_search(filter, now).await
    }

    async fn tiered_search(&self, filter: &SearchFilter, now: NaiveDateTime) -> Result<Vec<Paper>> {
        let predicate = build_predicate(filter, false, now);
        let candidates = self
            .store
            .query(&predicate, sort_of(filter), 0, None)
            .await?;
        if candidates.is_empty() {
            return Ok(candidates);
        }

        let tokens = tokenize(filter.query_text().unwrap_or_default());
        let matcher = BoundaryMatcher::new(&tokens).map_err(|e| AppError::InvalidFormat {
            message: format!("boundary pattern: {}", e),
        })?;

        let (strict, loose): (Vec<Paper>, Vec<Paper>) = candidates
            .into_iter()
            .partition(|p| matcher.matches(p, &filter.search_fields));
        let strict_count = strict.len();
        let loose_count = loose.len();

        let page: Vec<Paper> = strict
            .into_iter()
            .chain(loose)
            .skip(usize::try_from(filter.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.limit).unwrap_or(usize::MAX))
            .collect();

        debug!(
            strict = strict_count,
            non_strict = loose_count,
            returned = page.len(),
            "Tiered search finished"
        );
        Ok(page)
    }

    /// Papers sharing categories with `arxiv_id`, best first
    #[instrument(skip(self))]
    pub async fn find_similar(&self, arxiv_id: &str, limit: usize, threshold: f64) -> Vec<(Paper, f64)> {
        let query = SimilarityQuery {
            arxiv_id: arxiv_id.trim().to_string(),
            limit,
            threshold,
        };
        if let Err(e) = query.validate() {
            warn!(error = %e, "Rejected invalid similarity query");
            return Vec::new();
        }

        match self.try_find_similar(&query).await {
            Ok(similar) => similar,
            Err(e) => {
                warn!(error = %e, "Similarity search failed");
                Vec::new()
            }
        }
    }

    async fn try_find_similar(&self, query: &SimilarityQuery) -> Result<Vec<(Paper, f64)>> {
        let Some(target) = self.store.find_by_arxiv_id(&query.arxiv_id).await? else {
            warn!(arxiv_id = %query.arxiv_id, "Paper not found");
            return Ok(Vec::new());
        };
        let target_categories: BTreeSet<&str> = split_categories(&target.categories).collect();

        let others = self
            .store
            .query(
                &Predicate::ArxivId(target.arxiv_id.clone()).negate(),
                Sort::default(),
                0,
                None,
            )
            .await?;

        let mut scored: Vec<(Paper, f64)> = others
            .into_iter()
            .filter_map(|paper| {
                let score = category_similarity(&target_categories, &paper.categories);
                (score > 0.0 && score >= query.threshold).then_some((paper, score))
            })
            .collect();

        // stable: equal scores keep store order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(query.limit);
        Ok(scored)
    }

    /// Provenance values by descending paper count
    #[instrument(skip(self))]
    pub async fn search_history(&self, limit: u64) -> Vec<SearchHistoryEntry> {
        match self.store.provenance_summary(Some(limit)).await {
            Ok(summaries) => summaries
                .into_iter()
                .map(|s| SearchHistoryEntry {
                    query: s.query,
                    count: s.count,
                    last_used: s.last_published,
                    last_paper_id: s.last_arxiv_id,
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, "Search history failed");
                Vec::new()
            }
        }
    }
}

fn sort_of(filter: &SearchFilter) -> Sort {
    Sort::new(filter.sort_by, filter.sort_order)
}

/// Shared categories over the larger of the two category sets
fn category_similarity(target: &BTreeSet<&str>, other_raw: &str) -> f64 {
    let other: BTreeSet<&str> = split_categories(other_raw).collect();
    let larger = target.len().max(other.len());
    if larger == 0 {
        return 0.0;
    }
    target.intersection(&other).count() as f64 / larger as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::AuthorMatch;
    use chrono::Duration;
    use pulse_common::store::ProvenanceSummary;
    use pulse_common::{
        DbPool, MemoryPaperStore, RemoteRecord, SortField, SortOrder, SqlPaperStore, TextField,
    };
    use uuid::Uuid;

    fn paper(id: &str, title: &str, abstract_text: &str, days_old: i64) -> Paper {
        let mut p = Paper::from_remote(
            RemoteRecord {
                external_id: id.into(),
                title: title.into(),
                abstract_text: abstract_text.into(),
                categories: vec!["cs.LG".into()],
                ..Default::default()
            },
            "materials AI",
        );
        p.published = Some(Utc::now().naive_utc() - Duration::days(days_old));
        p
    }

    fn with_categories(mut p: Paper, categories: &str) -> Paper {
        p.categories = categories.to_string();
        p
    }

    fn engine(papers: Vec<Paper>) -> SearchEngine {
        SearchEngine::new(Arc::new(MemoryPaperStore::with_papers(papers)))
    }

    fn ids(papers: &[Paper]) -> Vec<&str> {
        papers.iter().map(|p| p.arxiv_id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_fuzzy_phrase_and_bag_tiers() {
        let engine = engine(vec![
            paper("2401.00001", "Deep Learning for materials discovery", "", 1),
            paper("2401.00002", "Learning deep representations", "", 2),
            paper("2401.00003", "Shallow networks", "", 3),
        ]);

        let results = engine.search(&SearchFilter::text("deep learning")).await;

        assert_eq!(ids(&results), vec!["2401.00001", "2401.00002"]);
    }

    #[tokio::test]
    async fn test_match_all_fixture() {
        let engine = engine(vec![
            paper("2401.00001", "Alpha method", "uses classical theory", 1),
            paper("2401.00002", "Alpha and Beta combined", "n/a", 2),
            paper("2401.00003", "Alpha method", "a beta variant", 3),
        ]);
        let filter = SearchFilter {
            match_all: true,
            ..SearchFilter::text("alpha beta")
        };

        let results = engine.search(&filter).await;

        assert_eq!(ids(&results), vec!["2401.00002"]);
    }

    #[tokio::test]
    async fn test_strict_tier_comes_first() {
        let engine = engine(vec![
            paper("2401.00001", "Graphene growth", "", 1),
            paper("2401.00002", "Graphite anodes", "", 2),
            paper("2401.00003", "A graph model", "", 3),
            paper("2401.00004", "Unrelated", "", 4),
        ]);
        let filter = SearchFilter {
            strict_match: true,
            ..SearchFilter::text("graph")
        };

        let results = engine.search(&filter).await;
        assert_eq!(ids(&results), vec!["2401.00003", "2401.00001", "2401.00002"]);

        // pagination applies after the tiers are concatenated
        let second_page = engine
            .search(&SearchFilter {
                offset: 1,
                limit: 1,
                ..filter.clone()
            })
            .await;
        assert_eq!(ids(&second_page), vec!["2401.00001"]);
    }

    #[tokio::test]
    async fn test_strict_without_boundary_matches_still_returns_fallback() {
        let engine = engine(vec![paper("2401.00001", "Graphene growth", "", 1)]);
        let filter = SearchFilter {
            strict_match: true,
            ..SearchFilter::text("graph")
        };

        assert_eq!(ids(&engine.search(&filter).await), vec!["2401.00001"]);
    }

    #[tokio::test]
    async fn test_strict_multi_token_ordering() {
        let engine = engine(vec![
            paper("2401.00001", "Graph neuralnets", "", 1),
            paper("2401.00002", "Neural graph models", "", 2),
        ]);
        let filter = SearchFilter {
            strict_match: true,
            ..SearchFilter::text("graph neural")
        };

        let results = engine.search(&filter).await;

        assert_eq!(ids(&results), vec!["2401.00002", "2401.00001"]);
    }

    #[tokio::test]
    async fn test_category_exclusion_and_sort() {
        let engine = engine(vec![
            with_categories(paper("2401.00001", "A", "", 1), "cond-mat.mtrl-sci, cs.LG"),
            with_categories(paper("2401.00002", "B", "", 2), "cond-mat.mtrl-sci"),
            with_categories(paper("2401.00003", "C", "", 3), "cond-mat.mtrl-sci physics.comp-ph"),
        ]);
        let filter = SearchFilter {
            categories: vec!["cond-mat.mtrl-sci".into()],
            exclude_categories: vec!["cs.LG".into()],
            sort_by: SortField::Published,
            sort_order: SortOrder::Asc,
            ..Default::default()
        };

        let results = engine.search(&filter).await;

        assert_eq!(ids(&results), vec!["2401.00003", "2401.00002"]);
    }

    #[tokio::test]
    async fn test_author_and_status_filters() {
        let mut summarized = paper("2401.00001", "A", "", 1);
        summarized.summarized = true;
        summarized.authors = vec![pulse_common::Author::new("Ada Lovelace")];
        let mut plain = paper("2401.00002", "B", "", 2);
        plain.authors = vec![pulse_common::Author::new("Ada Lovelace")];
        let engine = engine(vec![summarized, plain]);

        let filter = SearchFilter {
            authors: vec!["ada lovelace".into()],
            author_match: AuthorMatch::Exact,
            summarized_only: true,
            ..Default::default()
        };

        assert_eq!(ids(&engine.search(&filter).await), vec!["2401.00001"]);
    }

    #[tokio::test]
    async fn test_invalid_filter_yields_empty() {
        let engine = engine(vec![paper("2401.00001", "Graph", "", 1)]);
        let filter = SearchFilter {
            limit: 0,
            ..SearchFilter::text("graph")
        };
        assert!(engine.search(&filter).await.is_empty());
    }

    #[tokio::test]
    async fn test_search_fields_respected() {
        let engine = engine(vec![paper("2401.00001", "Title", "graph in abstract", 1)]);
        let filter = SearchFilter {
            search_fields: vec![TextField::Title],
            ..SearchFilter::text("graph")
        };
        assert!(engine.search(&filter).await.is_empty());
    }

    #[tokio::test]
    async fn test_find_similar() {
        let engine = engine(vec![
            with_categories(paper("2401.00001", "T", "", 1), "cs.LG, stat.ML"),
            with_categories(paper("2401.00002", "T", "", 2), "cs.LG, stat.ML"),
            with_categories(paper("2401.00003", "T", "", 3), "cs.LG cs.AI cs.CV"),
            with_categories(paper("2401.00004", "T", "", 4), "physics.optics"),
        ]);

        let similar = engine.find_similar("2401.00001", 10, 0.3).await;
        let scored: Vec<(&str, f64)> = similar.iter().map(|(p, s)| (p.arxiv_id.as_str(), *s)).collect();
        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0], ("2401.00002", 1.0));
        assert_eq!(scored[1].0, "2401.00003");
        assert!((scored[1].1 - 1.0 / 3.0).abs() < 1e-9);

        assert_eq!(engine.find_similar("2401.00001", 10, 0.5).await.len(), 1);
        assert!(engine.find_similar("9999.99999", 10, 0.0).await.is_empty());
        assert!(engine.find_similar("2401.00001", 10, 2.0).await.is_empty());
    }

    async fn sql_engine(papers: Vec<Paper>) -> SearchEngine {
        let store = SqlPaperStore::new(DbPool::in_memory().await.unwrap());
        store.ensure_schema().await.unwrap();
        for p in papers {
            store.insert(p).await.unwrap();
        }
        SearchEngine::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_strict_search_on_sql_store() {
        let engine = sql_engine(vec![
            paper("2401.00001", "Graphene growth", "", 1),
            paper("2401.00003", "A graph model", "", 3),
            paper("2401.00004", "Unrelated", "", 4),
        ])
        .await;
        let strict = SearchFilter {
            strict_match: true,
            ..SearchFilter::text("graph")
        };

        assert_eq!(
            ids(&engine.search(&SearchFilter::text("graph")).await),
            vec!["2401.00001", "2401.00003"]
        );
        assert_eq!(ids(&engine.search(&strict).await), vec!["2401.00003", "2401.00001"]);

        let second_page = engine
            .search(&SearchFilter {
                offset: 1,
                limit: 1,
                ..strict
            })
            .await;
        assert_eq!(ids(&second_page), vec!["2401.00001"]);
    }

    #[tokio::test]
    async fn test_find_similar_on_sql_store() {
        let engine = sql_engine(vec![
            with_categories(paper("2401.00001", "T", "", 1), "cs.LG, stat.ML"),
            with_categories(paper("2401.00002", "T", "", 2), "cs.LG, stat.ML"),
            with_categories(paper("2401.00003", "T", "", 3), "physics.optics"),
        ])
        .await;

        let similar = engine.find_similar("2401.00001", 10, 0.0).await;

        assert_eq!(similar.len(), 1);
        assert_eq!(similar[0].0.arxiv_id, "2401.00002");
        assert_eq!(similar[0].1, 1.0);
    }

    #[tokio::test]
    async fn test_search_history() {
        let mut important = paper("2401.00003", "T", "", 1);
        important.search_query = "important".into();
        let engine = engine(vec![
            paper("2401.00001", "T", "", 5),
            paper("2401.00002", "T", "", 2),
            important,
        ]);

        let history = engine.search_history(10).await;

        assert_eq!(history.len(), 2);
        assert_eq!(history[0].query, "materials AI");
        assert_eq!(history[0].count, 2);
        assert_eq!(history[0].last_paper_id.as_deref(), Some("2401.00002"));
        assert_eq!(history[1].query, "important");
    }

    /// Store whose reads always fail
    struct BrokenStore;

    #[async_trait::async_trait]
    impl PaperStore for BrokenStore {
        async fn exists(&self, _: &str) -> Result<bool> {
            Err(broken())
        }
        async fn insert(&self, _: Paper) -> Result<Uuid> {
            Err(broken())
        }
        async fn latest_published(&self, _: &str) -> Result<Option<NaiveDateTime>> {
            Err(broken())
        }
        async fn query(&self, _: &Predicate, _: Sort, _: u64, _: Option<u64>) -> Result<Vec<Paper>> {
            Err(broken())
        }
        async fn count(&self, _: &Predicate) -> Result<u64> {
            Err(broken())
        }
        async fn find_by_arxiv_id(&self, _: &str) -> Result<Option<Paper>> {
            Err(broken())
        }
        async fn provenance_summary(&self, _: Option<u64>) -> Result<Vec<ProvenanceSummary>> {
            Err(broken())
        }
    }

    fn broken() -> AppError {
        AppError::DatabaseConnection {
            message: "connection refused".into(),
        }
    }

    #[tokio::test]
    async fn test_store_failures_degrade_to_empty() {
        let engine = SearchEngine::new(Arc::new(BrokenStore));
        let strict = SearchFilter {
            strict_match: true,
            ..SearchFilter::text("graph")
        };

        assert!(engine.search(&SearchFilter::text("graph")).await.is_empty());
        assert!(engine.search(&strict).await.is_empty());
        assert!(engine.find_similar("2401.00001", 5, 0.5).await.is_empty());
        assert!(engine.search_history(5).await.is_empty());
    }
}

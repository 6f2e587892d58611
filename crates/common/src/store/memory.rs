//! In-process paper store

use super::{PaperStore, ProvenanceSummary, Sort};
use crate::domain::Paper;
use crate::errors::{AppError, Result};
use crate::predicate::Predicate;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Vector-backed store that evaluates predicates directly.
///
/// Insertion order is kept; queries sort a filtered copy.
#[derive(Default)]
pub struct MemoryPaperStore {
    papers: RwLock<Vec<Paper>>,
}

impl MemoryPaperStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with papers, skipping duplicate ids
    pub fn with_papers(papers: impl IntoIterator<Item = Paper>) -> Self {
        let mut seeded: Vec<Paper> = Vec::new();
        for paper in papers {
            if !seeded.iter().any(|p| p.arxiv_id == paper.arxiv_id) {
                seeded.push(paper);
            }
        }
        Self {
            papers: RwLock::new(seeded),
        }
    }

    pub async fn len(&self) -> usize {
        self.papers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.papers.read().await.is_empty()
    }

    /// Snapshot of every stored paper in insertion order
    pub async fn all(&self) -> Vec<Paper> {
        self.papers.read().await.clone()
    }
}

#[async_trait]
impl PaperStore for MemoryPaperStore {
    async fn exists(&self, arxiv_id: &str) -> Result<bool> {
        Ok(self.papers.read().await.iter().any(|p| p.arxiv_id == arxiv_id))
    }

    async fn insert(&self, paper: Paper) -> Result<Uuid> {
        let mut papers = self.papers.write().await;
        if papers.iter().any(|p| p.arxiv_id == paper.arxiv_id) {
            return Err(AppError::Duplicate {
                arxiv_id: paper.arxiv_id,
            });
        }
        let id = paper.id;
        papers.push(paper);
        Ok(id)
    }

    async fn latest_published(&self, search_query: &str) -> Result<Option<NaiveDateTime>> {
        Ok(self
            .papers
            .read()
            .await
            .iter()
            .filter(|p| p.search_query == search_query)
            .filter_map(|p| p.published)
            .max())
    }

    async fn query(
        &self,
        predicate: &Predicate,
        sort: Sort,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Paper>> {
        let papers = self.papers.read().await;
        let mut matched: Vec<&Paper> = papers.iter().filter(|p| predicate.matches(p)).collect();
        matched.sort_by(|a, b| sort.compare(a, b));

        let take = limit.map(|l| l as usize).unwrap_or(usize::MAX);
        Ok(matched
            .into_iter()
            .skip(offset as usize)
            .take(take)
            .cloned()
            .collect())
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64> {
        let papers = self.papers.read().await;
        Ok(papers.iter().filter(|p| predicate.matches(p)).count() as u64)
    }

    async fn find_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<Paper>> {
        Ok(self
            .papers
            .read()
            .await
            .iter()
            .find(|p| p.arxiv_id == arxiv_id)
            .cloned())
    }

    async fn provenance_summary(&self, limit: Option<u64>) -> Result<Vec<ProvenanceSummary>> {
        let papers = self.papers.read().await;
        let mut groups: HashMap<&str, ProvenanceSummary> = HashMap::new();

        for paper in papers.iter() {
            let entry = groups
                .entry(paper.search_query.as_str())
                .or_insert_with(|| ProvenanceSummary {
                    query: paper.search_query.clone(),
                    count: 0,
                    last_published: None,
                    last_arxiv_id: None,
                });
            entry.count += 1;
            if paper.published.is_some() && paper.published > entry.last_published {
                entry.last_published = paper.published;
                entry.last_arxiv_id = Some(paper.arxiv_id.clone());
            }
        }

        let mut summary: Vec<ProvenanceSummary> = groups.into_values().collect();
        summary.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.query.cmp(&b.query)));
        if let Some(limit) = limit {
            summary.truncate(limit as usize);
        }
        Ok(summary)
    }
}

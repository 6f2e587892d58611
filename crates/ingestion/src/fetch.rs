//! Out-of-band fetch paths
//!
//! Single papers requested by id (quick fetch, the important-papers list) and
//! ad hoc remote searches. These bypass cutoff logic entirely but obey the
//! same insert-only rule as a sync pass.

use crate::engine::IngestionEngine;
use crate::errors::IngestionError;
use crate::source::SourceQuery;
use futures::TryStreamExt;
use pulse_common::domain::{
    normalize_arxiv_id, parse_arxiv_id, PROVENANCE_IMPORTANT, PROVENANCE_QUICK_FETCH,
};
use pulse_common::Paper;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Result of syncing the important-papers list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportantOutcome {
    /// Ids that needed a fetch (added plus errors)
    pub total_processed: usize,
    pub added: usize,
    /// Ids already stored
    pub skipped: usize,
    pub errors: Vec<String>,
}

/// Result of an ad hoc remote search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteSearchOutcome {
    /// Stored papers for every fetched record, in remote order
    pub papers: Vec<Paper>,
    pub total_found: usize,
    pub new_saved: usize,
}

/// Ids listed in an important-papers file.
///
/// One id per line; blank lines and `#` comments are skipped, anything after
/// the first whitespace is ignored, duplicates are dropped.
pub fn parse_id_list(contents: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| line.split_whitespace().next())
        .map(normalize_arxiv_id)
        .filter(|id| !id.is_empty() && seen.insert(id.clone()))
        .collect()
}

impl IngestionEngine {
    /// Return the stored paper for `input`, fetching and storing it first if
    /// needed. `Ok(None)` when the source does not know the id.
    #[instrument(skip(self))]
    pub async fn quick_fetch(&self, input: &str) -> Result<Option<Paper>, IngestionError> {
        let arxiv_id = parse_arxiv_id(input)
            .map(|id| normalize_arxiv_id(&id))
            .ok_or_else(|| IngestionError::InvalidId(input.trim().to_string()))?;

        if let Some(paper) = self.store.find_by_arxiv_id(&arxiv_id).await? {
            debug!(arxiv_id = %arxiv_id, "Paper already stored");
            return Ok(Some(paper));
        }

        self.fetch_and_store(&arxiv_id, PROVENANCE_QUICK_FETCH).await
    }

    /// Make sure every paper in the list file is stored
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn sync_important_papers(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ImportantOutcome, IngestionError> {
        let path = path.as_ref();
        if !path.exists() {
            warn!("Important papers file not found");
            return Err(IngestionError::FileNotFound(path.display().to_string()));
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let mut outcome = ImportantOutcome::default();

        for arxiv_id in parse_id_list(&contents) {
            match self.store.exists(&arxiv_id).await {
                Ok(true) => {
                    debug!(arxiv_id = %arxiv_id, "Important paper already stored");
                    outcome.skipped += 1;
                    continue;
                }
                Ok(false) => {}
                Err(e) => {
                    outcome.errors.push(format!("Error checking paper {}: {}", arxiv_id, e));
                    continue;
                }
            }

            match self.fetch_and_store(&arxiv_id, PROVENANCE_IMPORTANT).await {
                Ok(Some(_)) => {
                    info!(arxiv_id = %arxiv_id, "Added important paper");
                    outcome.added += 1;
                }
                Ok(None) => outcome
                    .errors
                    .push(format!("Paper not found on arXiv: {}", arxiv_id)),
                Err(e) => outcome
                    .errors
                    .push(format!("Error fetching paper {}: {}", arxiv_id, e)),
            }

            if !self.fetch_delay.is_zero() {
                tokio::time::sleep(self.fetch_delay).await;
            }
        }

        outcome.total_processed = outcome.added + outcome.errors.len();
        info!(
            added = outcome.added,
            skipped = outcome.skipped,
            errors = outcome.errors.len(),
            "Important papers synced"
        );
        Ok(outcome)
    }

    /// Run an ad hoc remote query and store whatever is new
    #[instrument(skip(self))]
    pub async fn remote_search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<RemoteSearchOutcome, IngestionError> {
        let records: Vec<_> = self
            .source
            .search(SourceQuery::newest_first(query, max_results))
            .try_collect()
            .await?;

        let provenance = format!("remote_search:{}", query);
        let mut outcome = RemoteSearchOutcome {
            total_found: records.len(),
            ..Default::default()
        };

        for record in records {
            let arxiv_id = normalize_arxiv_id(&record.external_id);
            if let Some(existing) = self.store.find_by_arxiv_id(&arxiv_id).await? {
                outcome.papers.push(existing);
                continue;
            }

            let paper = Paper::from_remote(record, &provenance);
            match self.store.insert(paper.clone()).await {
                Ok(_) => {
                    outcome.new_saved += 1;
                    outcome.papers.push(paper);
                }
                Err(e) if e.is_duplicate() => {
                    if let Some(existing) = self.store.find_by_arxiv_id(&arxiv_id).await? {
                        outcome.papers.push(existing);
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        debug!(
            total_found = outcome.total_found,
            new_saved = outcome.new_saved,
            "Remote search finished"
        );
        Ok(outcome)
    }

    /// Fetch one id from the source and insert it under `provenance`
    async fn fetch_and_store(
        &self,
        arxiv_id: &str,
        provenance: &str,
    ) -> Result<Option<Paper>, IngestionError> {
        let records = self.source.fetch_by_ids(&[arxiv_id.to_string()]).await?;
        let Some(record) = records
            .into_iter()
            .find(|r| normalize_arxiv_id(&r.external_id) == arxiv_id)
        else {
            return Ok(None);
        };

        let paper = Paper::from_remote(record, provenance);
        match self.store.insert(paper.clone()).await {
            Ok(_) => Ok(Some(paper)),
            // stored concurrently; return the winner
            Err(e) if e.is_duplicate() => Ok(self.store.find_by_arxiv_id(arxiv_id).await?),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{days_ago, record, ScriptedSource};
    use pulse_common::{MemoryPaperStore, PaperStore};
    use std::sync::Arc;

    fn engine_with(
        records: Vec<pulse_common::RemoteRecord>,
    ) -> (Arc<MemoryPaperStore>, Arc<ScriptedSource>, IngestionEngine) {
        let store = Arc::new(MemoryPaperStore::new());
        let source = Arc::new(ScriptedSource::new(records));
        let engine = IngestionEngine::new(store.clone(), source.clone());
        (store, source, engine)
    }

    #[test]
    fn test_parse_id_list() {
        let contents = "# seminal papers\n\n2401.00001v2  Attention paper\n2401.00002\n  # indented comment\n2401.00001\nhep-th/9901001v1\n";
        assert_eq!(
            parse_id_list(contents),
            vec!["2401.00001", "2401.00002", "hep-th/9901001"]
        );
    }

    #[tokio::test]
    async fn test_quick_fetch_inserts_then_reuses() {
        let (store, _, engine) = engine_with(vec![record("2401.01234v3", days_ago(3))]);

        let paper = engine
            .quick_fetch("https://arxiv.org/abs/2401.01234v3")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(paper.arxiv_id, "2401.01234");
        assert_eq!(paper.search_query, PROVENANCE_QUICK_FETCH);

        let again = engine.quick_fetch("arXiv:2401.01234").await.unwrap().unwrap();
        assert_eq!(again.id, paper.id);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_quick_fetch_unknown_and_invalid() {
        let (_, _, engine) = engine_with(Vec::new());

        assert!(engine.quick_fetch("2401.99999").await.unwrap().is_none());
        assert!(matches!(
            engine.quick_fetch("no id in here").await,
            Err(IngestionError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_sync_important_papers() {
        let (store, _, engine) = engine_with(vec![
            record("2401.00001", days_ago(10)),
            record("2401.00002", days_ago(20)),
        ]);
        store
            .insert(Paper::from_remote(record("2401.00002", days_ago(20)), "q"))
            .await
            .unwrap();

        let path = std::env::temp_dir().join(format!("important-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, "# list\n2401.00001v1\n2401.00002\n2401.00404\n").unwrap();

        let outcome = engine.sync_important_papers(&path).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("2401.00404"));
        assert_eq!(outcome.total_processed, 2);

        let stored = store.find_by_arxiv_id("2401.00001").await.unwrap().unwrap();
        assert_eq!(stored.search_query, PROVENANCE_IMPORTANT);
        // existing rows keep their provenance
        let kept = store.find_by_arxiv_id("2401.00002").await.unwrap().unwrap();
        assert_eq!(kept.search_query, "q");
    }

    #[tokio::test]
    async fn test_sync_important_papers_missing_file() {
        let (_, _, engine) = engine_with(Vec::new());
        let result = engine
            .sync_important_papers("/nonexistent/important_papers.txt")
            .await;
        assert!(matches!(result, Err(IngestionError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_important_fetch_error_is_collected() {
        let store = Arc::new(MemoryPaperStore::new());
        let source = Arc::new(ScriptedSource::new(vec![record("2401.00001", days_ago(1))]).failing_after(0));
        let engine = IngestionEngine::new(store.clone(), source);

        let path = std::env::temp_dir().join(format!("important-{}.txt", uuid::Uuid::new_v4()));
        std::fs::write(&path, "2401.00001\n").unwrap();
        let outcome = engine.sync_important_papers(&path).await.unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.errors.len(), 1);
        assert!(outcome.errors[0].contains("503"));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_remote_search_returns_stored_and_new() {
        let (store, _, engine) = engine_with(vec![
            record("2401.00003", days_ago(1)),
            record("2401.00002", days_ago(2)),
        ]);
        store
            .insert(Paper::from_remote(record("2401.00002", days_ago(2)), "materials AI"))
            .await
            .unwrap();

        let outcome = engine.remote_search("graph networks", 10).await.unwrap();

        assert_eq!(outcome.total_found, 2);
        assert_eq!(outcome.new_saved, 1);
        assert_eq!(outcome.papers.len(), 2);
        assert_eq!(outcome.papers[0].search_query, "remote_search:graph networks");
        assert_eq!(outcome.papers[1].search_query, "materials AI");
    }
}

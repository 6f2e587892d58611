//! Crawler statistics

use pulse_common::predicate::Predicate;
use pulse_common::{PaperStore, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrawlerStats {
    pub total_papers: u64,
    /// Papers created since midnight UTC
    pub papers_today: u64,
    pub papers_by_query: BTreeMap<String, u64>,
}

/// Summarise the store contents by provenance
pub async fn crawler_stats(store: &dyn PaperStore) -> Result<CrawlerStats> {
    let midnight = chrono::Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default();

    let total_papers = store.count(&Predicate::always()).await?;
    let papers_today = store.count(&Predicate::CreatedOnOrAfter(midnight)).await?;
    let papers_by_query = store
        .provenance_summary(None)
        .await?
        .into_iter()
        .map(|s| (s.query, s.count))
        .collect();

    Ok(CrawlerStats {
        total_papers,
        papers_today,
        papers_by_query,
    })
}

//! Remote source contract
//!
//! A source yields [`RemoteRecord`]s for a query in the requested order. The
//! stream is lazy: the ingestion engine stops polling once it hits the cutoff
//! date, and a paging adapter must not request pages nobody polls.

use crate::errors::SourceResult;
use async_trait::async_trait;
use futures::stream::BoxStream;
use pulse_common::RemoteRecord;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Remote sort criterion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SourceSort {
    #[default]
    SubmittedDate,
    LastUpdatedDate,
    Relevance,
}

impl SourceSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceSort::SubmittedDate => "submittedDate",
            SourceSort::LastUpdatedDate => "lastUpdatedDate",
            SourceSort::Relevance => "relevance",
        }
    }
}

impl FromStr for SourceSort {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to `submittedDate`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "lastUpdatedDate" => SourceSort::LastUpdatedDate,
            "relevance" => SourceSort::Relevance,
            _ => SourceSort::SubmittedDate,
        })
    }
}

/// Remote sort direction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceOrder {
    #[default]
    Descending,
    Ascending,
}

impl SourceOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceOrder::Descending => "descending",
            SourceOrder::Ascending => "ascending",
        }
    }
}

impl FromStr for SourceOrder {
    type Err = std::convert::Infallible;

    /// Unknown names fall back to `descending`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "ascending" => SourceOrder::Ascending,
            _ => SourceOrder::Descending,
        })
    }
}

/// One remote search request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceQuery {
    pub query: String,
    pub max_results: usize,
    pub sort_by: SourceSort,
    pub sort_order: SourceOrder,
}

impl SourceQuery {
    /// Newest-first query, the order the engine's early stop relies on
    pub fn newest_first(query: impl Into<String>, max_results: usize) -> Self {
        Self {
            query: query.into(),
            max_results,
            sort_by: SourceSort::SubmittedDate,
            sort_order: SourceOrder::Descending,
        }
    }
}

/// Remote bibliographic source
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Lazily stream records matching `query`. Transport errors may surface
    /// at any point in the stream.
    fn search(&self, query: SourceQuery) -> BoxStream<'_, SourceResult<RemoteRecord>>;

    /// Fetch records by identifier; unknown ids are simply absent
    async fn fetch_by_ids(&self, ids: &[String]) -> SourceResult<Vec<RemoteRecord>>;

    /// Source name for logging
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_parsing() {
        assert_eq!("relevance".parse::<SourceSort>().unwrap(), SourceSort::Relevance);
        assert_eq!("whatever".parse::<SourceSort>().unwrap(), SourceSort::SubmittedDate);
        assert_eq!("ascending".parse::<SourceOrder>().unwrap(), SourceOrder::Ascending);
        assert_eq!("".parse::<SourceOrder>().unwrap(), SourceOrder::Descending);
    }

    #[test]
    fn test_newest_first() {
        let q = SourceQuery::newest_first("cat:cs.LG", 50);
        assert_eq!(q.sort_by.as_str(), "submittedDate");
        assert_eq!(q.sort_order.as_str(), "descending");
    }
}

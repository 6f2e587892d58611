//! Domain types shared by ingestion and retrieval
//!
//! - [`Paper`]: a stored bibliographic record, unique by `arxiv_id`
//! - [`RemoteRecord`]: a record as yielded by a remote source, before normalisation
//! - arXiv identifier helpers

mod arxiv_id;

pub use arxiv_id::{normalize_arxiv_id, parse_arxiv_id};

use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Provenance for papers pulled from the important-papers list
pub const PROVENANCE_IMPORTANT: &str = "important";

/// Provenance for papers fetched one-off by identifier
pub const PROVENANCE_QUICK_FETCH: &str = "quick_fetch";

/// One author of a paper
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    #[serde(default)]
    pub affiliation: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
        }
    }
}

/// Record yielded by a remote source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    /// Identifier as reported by the source, possibly versioned (`2401.01234v2`)
    pub external_id: String,
    pub title: String,
    pub authors: Vec<Author>,
    pub abstract_text: String,
    pub categories: Vec<String>,
    pub primary_category: Option<String>,
    pub published: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
    pub pdf_url: Option<String>,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    pub comment: Option<String>,
}

/// A stored paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    pub id: Uuid,
    /// Unversioned arXiv identifier, immutable once stored
    pub arxiv_id: String,
    pub title: String,
    pub authors: Vec<Author>,
    pub abstract_text: String,
    /// Category codes, delimited by commas and/or whitespace
    pub categories: String,
    pub primary_category: String,
    pub published: Option<NaiveDateTime>,
    pub updated: Option<NaiveDateTime>,
    pub pdf_url: Option<String>,
    pub doi: Option<String>,
    pub journal_ref: Option<String>,
    pub comment: Option<String>,
    /// Standing query (or sentinel) that produced this paper
    pub search_query: String,
    pub relevance_score: f64,
    pub downloaded: bool,
    pub summarized: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Paper {
    /// Build a new paper from a remote record.
    ///
    /// Missing pieces are treated as absent rather than rejected: no
    /// categories falls back to the primary category, no PDF link falls back
    /// to the canonical arXiv PDF URL.
    pub fn from_remote(record: RemoteRecord, provenance: &str) -> Self {
        let arxiv_id = normalize_arxiv_id(&record.external_id);
        let now = Utc::now().naive_utc();

        let primary_category = record
            .primary_category
            .filter(|c| !c.trim().is_empty())
            .or_else(|| record.categories.first().cloned())
            .unwrap_or_default();

        let categories = if record.categories.is_empty() {
            primary_category.clone()
        } else {
            record.categories.join(", ")
        };

        let pdf_url = record
            .pdf_url
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("https://arxiv.org/pdf/{}.pdf", arxiv_id));

        Self {
            id: Uuid::new_v4(),
            arxiv_id,
            title: record.title.trim().to_string(),
            authors: record.authors,
            abstract_text: record.abstract_text.trim().to_string(),
            categories,
            primary_category,
            published: record.published,
            updated: record.updated,
            pdf_url: Some(pdf_url),
            doi: record.doi,
            journal_ref: record.journal_ref,
            comment: record.comment,
            search_query: provenance.to_string(),
            relevance_score: 0.0,
            downloaded: false,
            summarized: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Category codes as a set, whatever delimiter the writer used
    pub fn category_set(&self) -> BTreeSet<&str> {
        split_categories(&self.categories).collect()
    }

    /// Authors in their stored JSON form
    pub fn authors_json(&self) -> String {
        serde_json::to_string(&self.authors).unwrap_or_else(|_| "[]".to_string())
    }
}

/// Split a stored category string on commas and whitespace
pub fn split_categories(raw: &str) -> impl Iterator<Item = &str> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|c| !c.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record() -> RemoteRecord {
        RemoteRecord {
            external_id: "2401.01234v3".into(),
            title: "  Graph networks for crystals ".into(),
            authors: vec![Author::new("Ada Lovelace")],
            abstract_text: "We study crystals.".into(),
            categories: vec!["cond-mat.mtrl-sci".into(), "cs.LG".into()],
            primary_category: Some("cond-mat.mtrl-sci".into()),
            published: NaiveDate::from_ymd_opt(2024, 1, 2)
                .and_then(|d| d.and_hms_opt(10, 0, 0)),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_remote_strips_version() {
        let paper = Paper::from_remote(record(), "materials AI");
        assert_eq!(paper.arxiv_id, "2401.01234");
        assert_eq!(paper.title, "Graph networks for crystals");
        assert_eq!(paper.categories, "cond-mat.mtrl-sci, cs.LG");
        assert_eq!(paper.search_query, "materials AI");
        assert_eq!(
            paper.pdf_url.as_deref(),
            Some("https://arxiv.org/pdf/2401.01234.pdf")
        );
        assert!(!paper.summarized && !paper.downloaded);
    }

    #[test]
    fn test_from_remote_missing_categories() {
        let mut rec = record();
        rec.categories.clear();
        let paper = Paper::from_remote(rec, "q");
        assert_eq!(paper.categories, "cond-mat.mtrl-sci");

        let mut rec = record();
        rec.categories.clear();
        rec.primary_category = None;
        rec.published = None;
        let paper = Paper::from_remote(rec, "q");
        assert_eq!(paper.categories, "");
        assert_eq!(paper.primary_category, "");
        assert!(paper.published.is_none());
    }

    #[test]
    fn test_category_set_mixed_delimiters() {
        let mut paper = Paper::from_remote(record(), "q");
        paper.categories = "cs.LG, cond-mat.mtrl-sci physics.comp-ph,stat.ML".into();
        let set = paper.category_set();
        assert_eq!(set.len(), 4);
        assert!(set.contains("physics.comp-ph"));
        assert!(set.contains("stat.ML"));
    }

    #[test]
    fn test_authors_json() {
        let paper = Paper::from_remote(record(), "q");
        assert_eq!(
            paper.authors_json(),
            r#"[{"name":"Ada Lovelace","affiliation":null}]"#
        );
    }
}

//! Search filter description
//!
//! Built by the caller for one retrieval call. Every sub-filter is optional;
//! the defaults search title and abstract, newest first, twenty at a time.

use chrono::NaiveDateTime;
use pulse_common::{SortField, SortOrder, TextField};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// How the `authors` list is matched
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthorMatch {
    /// Every author appears somewhere in the author list
    #[default]
    Contains,
    /// Every author is the exact name of a listed author
    Exact,
    /// At least one author appears
    Any,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct SearchFilter {
    /// Free-text query; blank means no text predicate
    #[validate(length(max = 1000))]
    pub query: Option<String>,

    /// Fields the text query is matched against
    pub search_fields: Vec<TextField>,

    /// At least one of these must appear in `categories`
    pub categories: Vec<String>,
    /// None of these may appear in `categories`
    pub exclude_categories: Vec<String>,
    pub primary_category: Option<String>,

    pub authors: Vec<String>,
    pub author_match: AuthorMatch,

    pub date_from: Option<NaiveDateTime>,
    pub date_to: Option<NaiveDateTime>,
    /// Only papers published within this many days; zero is ignored
    pub days_back: Option<u32>,

    pub summarized_only: bool,
    pub downloaded_only: bool,

    #[validate(range(min = 1, max = 10000))]
    pub limit: u64,
    pub offset: u64,

    pub sort_by: SortField,
    pub sort_order: SortOrder,

    /// Every token must appear within a single field
    pub match_all: bool,
    /// Rank word-boundary matches ahead of substring matches
    pub strict_match: bool,
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            query: None,
            search_fields: vec![TextField::Title, TextField::Abstract],
            categories: Vec::new(),
            exclude_categories: Vec::new(),
            primary_category: None,
            authors: Vec::new(),
            author_match: AuthorMatch::default(),
            date_from: None,
            date_to: None,
            days_back: None,
            summarized_only: false,
            downloaded_only: false,
            limit: 20,
            offset: 0,
            sort_by: SortField::Published,
            sort_order: SortOrder::Desc,
            match_all: false,
            strict_match: false,
        }
    }
}

impl SearchFilter {
    /// Filter with only a text query set
    pub fn text(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
            ..Default::default()
        }
    }

    /// The query, if it has any non-blank content
    pub fn query_text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }

    /// Label used for logs and metrics
    pub fn mode(&self) -> &'static str {
        match (self.query_text().is_some(), self.strict_match, self.match_all) {
            (false, _, _) => "filter",
            (true, true, _) => "strict",
            (true, false, true) => "match_all",
            (true, false, false) => "fuzzy",
        }
    }
}

/// Parameters of a category-similarity lookup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct SimilarityQuery {
    #[validate(length(min = 1))]
    pub arxiv_id: String,
    #[validate(range(min = 1, max = 1000))]
    pub limit: usize,
    #[validate(range(min = 0.0, max = 1.0))]
    pub threshold: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_json() {
        let filter: SearchFilter = serde_json::from_str("{}").unwrap();
        assert_eq!(filter, SearchFilter::default());
        assert_eq!(filter.search_fields, vec![TextField::Title, TextField::Abstract]);
        assert_eq!(filter.limit, 20);
        assert_eq!(filter.sort_order, SortOrder::Desc);
    }

    #[test]
    fn test_partial_json() {
        let filter: SearchFilter = serde_json::from_str(
            r#"{"query":"graph networks","search_fields":["title","authors"],"author_match":"exact","strict_match":true}"#,
        )
        .unwrap();
        assert_eq!(filter.search_fields, vec![TextField::Title, TextField::Authors]);
        assert_eq!(filter.author_match, AuthorMatch::Exact);
        assert_eq!(filter.mode(), "strict");
    }

    #[test]
    fn test_validation() {
        assert!(SearchFilter::text("ok").validate().is_ok());

        let zero_limit = SearchFilter {
            limit: 0,
            ..Default::default()
        };
        assert!(zero_limit.validate().is_err());

        let long_query = SearchFilter::text("x".repeat(1001));
        assert!(long_query.validate().is_err());

        let similarity = SimilarityQuery {
            arxiv_id: "2401.00001".into(),
            limit: 10,
            threshold: 1.5,
        };
        assert!(similarity.validate().is_err());
    }

    #[test]
    fn test_blank_query() {
        assert_eq!(SearchFilter::text("   ").query_text(), None);
        assert_eq!(SearchFilter::text("   ").mode(), "filter");
        assert_eq!(SearchFilter::text(" ai ").query_text(), Some("ai"));
    }
}

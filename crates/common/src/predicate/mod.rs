//! Storage-agnostic predicate AST over [`Paper`]
//!
//! Retrieval builds a tree of leaf tests joined by AND/OR/NOT; each store
//! adapter either evaluates it directly ([`Predicate::matches`]) or compiles it
//! into its native query language (see `db::condition`).
//!
//! Text leaves are case-insensitive. An empty `And` is true, an empty `Or` is
//! false.

use crate::domain::Paper;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// Text columns a predicate can test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextField {
    Title,
    Abstract,
    Categories,
    PrimaryCategory,
    SearchQuery,
    /// The author list in its stored JSON form
    Authors,
}

impl TextField {
    /// The field's text on a paper, as the store holds it
    pub fn text<'a>(&self, paper: &'a Paper) -> Cow<'a, str> {
        match self {
            TextField::Title => Cow::Borrowed(&paper.title),
            TextField::Abstract => Cow::Borrowed(&paper.abstract_text),
            TextField::Categories => Cow::Borrowed(&paper.categories),
            TextField::PrimaryCategory => Cow::Borrowed(&paper.primary_category),
            TextField::SearchQuery => Cow::Borrowed(&paper.search_query),
            TextField::Authors => Cow::Owned(paper.authors_json()),
        }
    }
}

/// Boolean processing flags owned by downstream collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Flag {
    Summarized,
    Downloaded,
}

/// A predicate over stored papers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    Not(Box<Predicate>),

    /// Field contains `needle`
    Contains { field: TextField, needle: String },
    /// Field contains every part, in order, with arbitrary gaps
    Sequence { field: TextField, parts: Vec<String> },
    /// Word bordered by spaces or the field edges, or equal to the whole field
    Bounded { field: TextField, word: String },
    /// Field equals `value` exactly (case-sensitive)
    Equals { field: TextField, value: String },

    /// Some author's name equals `name`, ignoring case
    AuthorNamed(String),
    /// Paper has this arXiv id
    ArxivId(String),

    PublishedOnOrAfter(NaiveDateTime),
    PublishedOnOrBefore(NaiveDateTime),
    CreatedOnOrAfter(NaiveDateTime),

    Flag { flag: Flag, value: bool },
}

impl Predicate {
    /// Always-true predicate
    pub fn always() -> Self {
        Predicate::And(Vec::new())
    }

    pub fn contains(field: TextField, needle: impl Into<String>) -> Self {
        Predicate::Contains {
            field,
            needle: needle.into(),
        }
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    /// AND of the given parts, collapsing the single-part case
    pub fn all(mut parts: Vec<Predicate>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::And(parts)
        }
    }

    /// OR of the given parts, collapsing the single-part case
    pub fn any(mut parts: Vec<Predicate>) -> Self {
        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Predicate::Or(parts)
        }
    }

    /// Evaluate against a paper in memory
    pub fn matches(&self, paper: &Paper) -> bool {
        match self {
            Predicate::And(parts) => parts.iter().all(|p| p.matches(paper)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(paper)),
            Predicate::Not(inner) => !inner.matches(paper),

            Predicate::Contains { field, needle } => field
                .text(paper)
                .to_lowercase()
                .contains(&needle.to_lowercase()),

            Predicate::Sequence { field, parts } => {
                let haystack = field.text(paper).to_lowercase();
                let mut rest = haystack.as_str();
                for part in parts {
                    let part = part.to_lowercase();
                    match rest.find(&part) {
                        Some(pos) => rest = &rest[pos + part.len()..],
                        None => return false,
                    }
                }
                true
            }

            Predicate::Bounded { field, word } => {
                let text = field.text(paper).to_lowercase();
                let word = word.to_lowercase();
                text == word
                    || text.starts_with(&format!("{} ", word))
                    || text.ends_with(&format!(" {}", word))
                    || text.contains(&format!(" {} ", word))
            }

            Predicate::Equals { field, value } => field.text(paper) == value.as_str(),

            Predicate::AuthorNamed(name) => {
                let name = name.to_lowercase();
                paper.authors.iter().any(|a| a.name.to_lowercase() == name)
            }

            Predicate::ArxivId(id) => paper.arxiv_id == *id,

            Predicate::PublishedOnOrAfter(at) => paper.published.is_some_and(|p| p >= *at),
            Predicate::PublishedOnOrBefore(at) => paper.published.is_some_and(|p| p <= *at),
            Predicate::CreatedOnOrAfter(at) => paper.created_at >= *at,

            Predicate::Flag { flag, value } => match flag {
                Flag::Summarized => paper.summarized == *value,
                Flag::Downloaded => paper.downloaded == *value,
            },
        }
    }
}

//! Text matching
//!
//! Query tokenisation, the tiered text predicate, and the word-boundary test
//! used to re-rank strict searches.
//!
//! Tiers for a multi-token query, OR'd together:
//! 1. Phrase: the whole query as one substring
//! 2. Sequence: every token, in query order, with arbitrary gaps
//! 3. Bag: every token somewhere in the same field
//!
//! `match_all` keeps only the bag tier. Word boundaries follow Unicode `\w`;
//! scripts written without spaces have no boundaries inside a run, so the
//! strict test is an approximation there.

use pulse_common::{Paper, Predicate, TextField};
use regex::Regex;
use std::sync::OnceLock;

fn separator() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^\w]+").expect("valid separator regex"))
}

/// Lowercased query tokens longer than one character. A query with no such
/// token becomes a single token of its own.
pub fn tokenize(query: &str) -> Vec<String> {
    let lowered = query.trim().to_lowercase();
    let tokens: Vec<String> = separator()
        .split(&lowered)
        .filter(|t| t.chars().count() > 1)
        .map(str::to_string)
        .collect();

    if tokens.is_empty() && !lowered.is_empty() {
        vec![lowered]
    } else {
        tokens
    }
}

/// Text predicate for `query` over `fields`; `None` when there is nothing to match
pub fn text_predicate(
    query: &str,
    fields: &[TextField],
    match_all: bool,
    strict: bool,
) -> Option<Predicate> {
    let tokens = tokenize(query);
    if tokens.is_empty() || fields.is_empty() {
        return None;
    }

    if let [word] = tokens.as_slice() {
        let per_field = fields
            .iter()
            .map(|&field| {
                if strict {
                    Predicate::Bounded {
                        field,
                        word: word.clone(),
                    }
                } else {
                    Predicate::contains(field, word.clone())
                }
            })
            .collect();
        return Some(Predicate::any(per_field));
    }

    let bag = Predicate::any(
        fields
            .iter()
            .map(|&field| {
                Predicate::all(
                    tokens
                        .iter()
                        .map(|t| Predicate::contains(field, t.clone()))
                        .collect(),
                )
            })
            .collect(),
    );

    if match_all {
        return Some(bag);
    }

    let phrase_text = query.trim().to_lowercase();
    let phrase = Predicate::any(
        fields
            .iter()
            .map(|&field| Predicate::contains(field, phrase_text.clone()))
            .collect(),
    );
    let sequence = Predicate::any(
        fields
            .iter()
            .map(|&field| Predicate::Sequence {
                field,
                parts: tokens.clone(),
            })
            .collect(),
    );

    Some(Predicate::Or(vec![phrase, sequence, bag]))
}

/// Compiled word-boundary tests, one per token
#[derive(Debug, Clone)]
pub struct BoundaryMatcher {
    patterns: Vec<Regex>,
}

impl BoundaryMatcher {
    pub fn new(tokens: &[String]) -> Result<Self, regex::Error> {
        let patterns = tokens
            .iter()
            .map(|t| Regex::new(&format!(r"\b{}\b", regex::escape(t))))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Whether every token occurs on word boundaries in the selected fields
    pub fn matches(&self, paper: &Paper, fields: &[TextField]) -> bool {
        let text = searchable_text(paper, fields);
        self.patterns.iter().all(|re| re.is_match(&text))
    }
}

/// Lowercased concatenation of the selected fields
pub fn searchable_text(paper: &Paper, fields: &[TextField]) -> String {
    let mut text = String::new();
    for field in fields {
        text.push_str(&field.text(paper).to_lowercase());
        text.push(' ');
    }
    text
}

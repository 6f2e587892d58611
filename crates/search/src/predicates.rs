//! Filter composition
//!
//! Each builder returns `None` when its part of the filter is unset, so the
//! final predicate is an AND of only the parts the caller asked for.

use crate::filter::{AuthorMatch, SearchFilter};
use crate::text::text_predicate;
use chrono::{Duration, NaiveDateTime};
use pulse_common::{Flag, Predicate, TextField};

/// Include-any, exclude-all, and primary category equality
pub fn category_predicate(
    categories: &[String],
    exclude: &[String],
    primary: Option<&str>,
) -> Option<Predicate> {
    let mut parts = Vec::new();

    let include: Vec<_> = non_blank(categories)
        .map(|c| Predicate::contains(TextField::Categories, c))
        .collect();
    if !include.is_empty() {
        parts.push(Predicate::any(include));
    }

    let excluded: Vec<_> = non_blank(exclude)
        .map(|c| Predicate::contains(TextField::Categories, c).negate())
        .collect();
    if !excluded.is_empty() {
        parts.push(Predicate::all(excluded));
    }

    if let Some(primary) = primary.map(str::trim).filter(|p| !p.is_empty()) {
        parts.push(Predicate::Equals {
            field: TextField::PrimaryCategory,
            value: primary.to_string(),
        });
    }

    (!parts.is_empty()).then(|| Predicate::all(parts))
}

pub fn author_predicate(authors: &[String], mode: AuthorMatch) -> Option<Predicate> {
    let tests: Vec<_> = non_blank(authors)
        .map(|author| match mode {
            AuthorMatch::Exact => Predicate::AuthorNamed(author.to_string()),
            AuthorMatch::Contains | AuthorMatch::Any => {
                Predicate::contains(TextField::Authors, author)
            }
        })
        .collect();

    if tests.is_empty() {
        return None;
    }
    Some(match mode {
        AuthorMatch::Any => Predicate::any(tests),
        AuthorMatch::Contains | AuthorMatch::Exact => Predicate::all(tests),
    })
}

pub fn date_predicate(
    from: Option<NaiveDateTime>,
    to: Option<NaiveDateTime>,
    days_back: Option<u32>,
    now: NaiveDateTime,
) -> Option<Predicate> {
    let mut parts = Vec::new();

    if let Some(days) = days_back.filter(|d| *d > 0) {
        parts.push(Predicate::PublishedOnOrAfter(
            now - Duration::days(i64::from(days)),
        ));
    }
    if let Some(from) = from {
        parts.push(Predicate::PublishedOnOrAfter(from));
    }
    if let Some(to) = to {
        parts.push(Predicate::PublishedOnOrBefore(to));
    }

    (!parts.is_empty()).then(|| Predicate::all(parts))
}

pub fn status_predicate(summarized_only: bool, downloaded_only: bool) -> Option<Predicate> {
    let mut parts = Vec::new();
    if summarized_only {
        parts.push(Predicate::Flag {
            flag: Flag::Summarized,
            value: true,
        });
    }
    if downloaded_only {
        parts.push(Predicate::Flag {
            flag: Flag::Downloaded,
            value: true,
        });
    }
    (!parts.is_empty()).then(|| Predicate::all(parts))
}

/// The complete predicate for `filter`, with the text part built fuzzy or
/// strict as requested
pub fn build_predicate(filter: &SearchFilter, strict: bool, now: NaiveDateTime) -> Predicate {
    let parts: Vec<Predicate> = [
        filter
            .query_text()
            .and_then(|q| text_predicate(q, &filter.search_fields, filter.match_all, strict)),
        category_predicate(
            &filter.categories,
            &filter.exclude_categories,
            filter.primary_category.as_deref(),
        ),
        author_predicate(&filter.authors, filter.author_match),
        date_predicate(filter.date_from, filter.date_to, filter.days_back, now),
        status_predicate(filter.summarized_only, filter.downloaded_only),
    ]
    .into_iter()
    .flatten()
    .collect();

    if parts.is_empty() {
        Predicate::always()
    } else {
        Predicate::all(parts)
    }
}

fn non_blank(values: &[String]) -> impl Iterator<Item = &str> {
    values.iter().map(|v| v.trim()).filter(|v| !v.is_empty())
}

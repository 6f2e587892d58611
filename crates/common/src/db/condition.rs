//! Compile the predicate AST into sea-orm conditions
//!
//! Text leaves become `LOWER(col) LIKE pattern ESCAPE '\'` with the needle
//! lowercased and its LIKE metacharacters escaped. SQLite's `LOWER` only folds
//! ASCII, so non-ASCII case folding is weaker here than in the memory store.

use super::models::PaperColumn;
use crate::predicate::{Flag, Predicate, TextField};
use sea_orm::sea_query::{Expr, Func, LikeExpr, SimpleExpr};
use sea_orm::{ColumnTrait, Condition};

/// Translate a predicate into a sea-orm `Condition`
pub fn to_condition(predicate: &Predicate) -> Condition {
    match predicate {
        Predicate::And(parts) => parts
            .iter()
            .fold(Condition::all(), |cond, part| cond.add(to_condition(part))),
        Predicate::Or(parts) if parts.is_empty() => leaf(never()),
        Predicate::Or(parts) => parts
            .iter()
            .fold(Condition::any(), |cond, part| cond.add(to_condition(part))),
        Predicate::Not(inner) => to_condition(inner).not(),

        Predicate::Contains { field, needle } => leaf(lower_like(
            column(*field),
            format!("%{}%", escape_like(&needle.to_lowercase())),
        )),

        Predicate::Sequence { field, parts } => {
            let inner: Vec<String> = parts
                .iter()
                .map(|p| escape_like(&p.to_lowercase()))
                .collect();
            leaf(lower_like(column(*field), format!("%{}%", inner.join("%"))))
        }

        Predicate::Bounded { field, word } => {
            let col = column(*field);
            let word = escape_like(&word.to_lowercase());
            Condition::any()
                .add(lower_like(col, word.clone()))
                .add(lower_like(col, format!("{} %", word)))
                .add(lower_like(col, format!("% {}", word)))
                .add(lower_like(col, format!("% {} %", word)))
        }

        Predicate::Equals { field, value } => leaf(column(*field).eq(value.clone())),

        Predicate::AuthorNamed(name) => {
            let quoted = serde_json::to_string(&name.to_lowercase())
                .unwrap_or_else(|_| format!("\"{}\"", name.to_lowercase()));
            leaf(lower_like(
                PaperColumn::Authors,
                format!("%{}%", escape_like(&format!("\"name\":{}", quoted))),
            ))
        }

        Predicate::ArxivId(id) => leaf(PaperColumn::ArxivId.eq(id.clone())),

        Predicate::PublishedOnOrAfter(at) => leaf(PaperColumn::Published.gte(*at)),
        Predicate::PublishedOnOrBefore(at) => leaf(PaperColumn::Published.lte(*at)),
        Predicate::CreatedOnOrAfter(at) => leaf(PaperColumn::CreatedAt.gte(*at)),

        Predicate::Flag { flag, value } => leaf(match flag {
            Flag::Summarized => PaperColumn::Summarized.eq(*value),
            Flag::Downloaded => PaperColumn::Downloaded.eq(*value),
        }),
    }
}

fn leaf(expr: SimpleExpr) -> Condition {
    Condition::all().add(expr)
}

/// Column backing a text field
pub fn column(field: TextField) -> PaperColumn {
    match field {
        TextField::Title => PaperColumn::Title,
        TextField::Abstract => PaperColumn::AbstractText,
        TextField::Categories => PaperColumn::Categories,
        TextField::PrimaryCategory => PaperColumn::PrimaryCategory,
        TextField::SearchQuery => PaperColumn::SearchQuery,
        TextField::Authors => PaperColumn::Authors,
    }
}

fn lower_like(col: PaperColumn, pattern: String) -> SimpleExpr {
    Expr::expr(Func::lower(Expr::col(col))).like(LikeExpr::new(pattern).escape('\\'))
}

fn never() -> SimpleExpr {
    Expr::val(1).eq(0)
}

/// Escape `\`, `%` and `_` for a LIKE pattern using `\` as the escape char
pub fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

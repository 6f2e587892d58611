//! Paper entity

use crate::domain::{Author, Paper as DomainPaper};
use sea_orm::entity::prelude::*;
use sea_orm::Set;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Unversioned arXiv identifier
    #[sea_orm(unique, indexed)]
    pub arxiv_id: String,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Author list as JSON `[{"name": .., "affiliation": ..}]`
    #[sea_orm(column_type = "Text")]
    pub authors: String,

    #[sea_orm(column_type = "Text")]
    pub abstract_text: String,

    #[sea_orm(column_type = "Text")]
    pub categories: String,

    pub primary_category: String,

    #[sea_orm(indexed)]
    pub published: Option<DateTime>,

    pub updated: Option<DateTime>,

    #[sea_orm(column_type = "Text", nullable)]
    pub pdf_url: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub doi: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub journal_ref: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub comment: Option<String>,

    /// Provenance: the standing query or a sentinel
    #[sea_orm(indexed)]
    pub search_query: String,

    #[sea_orm(column_type = "Double")]
    pub relevance_score: f64,

    pub downloaded: bool,

    pub summarized: bool,

    pub created_at: DateTime,

    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for DomainPaper {
    type Error = crate::AppError;

    fn try_from(model: Model) -> crate::Result<Self> {
        let authors: Vec<Author> = if model.authors.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&model.authors)?
        };

        Ok(DomainPaper {
            id: model.id,
            arxiv_id: model.arxiv_id,
            title: model.title,
            authors,
            abstract_text: model.abstract_text,
            categories: model.categories,
            primary_category: model.primary_category,
            published: model.published,
            updated: model.updated,
            pdf_url: model.pdf_url,
            doi: model.doi,
            journal_ref: model.journal_ref,
            comment: model.comment,
            search_query: model.search_query,
            relevance_score: model.relevance_score,
            downloaded: model.downloaded,
            summarized: model.summarized,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

impl From<DomainPaper> for ActiveModel {
    fn from(paper: DomainPaper) -> Self {
        let authors = paper.authors_json();
        ActiveModel {
            id: Set(paper.id),
            arxiv_id: Set(paper.arxiv_id),
            title: Set(paper.title),
            authors: Set(authors),
            abstract_text: Set(paper.abstract_text),
            categories: Set(paper.categories),
            primary_category: Set(paper.primary_category),
            published: Set(paper.published),
            updated: Set(paper.updated),
            pdf_url: Set(paper.pdf_url),
            doi: Set(paper.doi),
            journal_ref: Set(paper.journal_ref),
            comment: Set(paper.comment),
            search_query: Set(paper.search_query),
            relevance_score: Set(paper.relevance_score),
            downloaded: Set(paper.downloaded),
            summarized: Set(paper.summarized),
            created_at: Set(paper.created_at),
            updated_at: Set(paper.updated_at),
        }
    }
}

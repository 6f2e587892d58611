//! SQL paper store
//!
//! Implements [`PaperStore`] over the `papers` table with sea-orm. Each call
//! runs on a pooled connection; uniqueness of `arxiv_id` is enforced by the
//! table's unique index and surfaced as `AppError::Duplicate`.

use super::condition::to_condition;
use super::models::{PaperActiveModel, PaperColumn, PaperEntity, PaperModel};
use super::DbPool;
use crate::domain::Paper;
use crate::errors::{AppError, Result};
use crate::predicate::Predicate;
use crate::store::{PaperStore, ProvenanceSummary, Sort, SortField, SortOrder};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sea_orm::sea_query::NullOrdering;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Schema, SqlErr,
};
use tracing::{debug, instrument};
use uuid::Uuid;

/// Stand-in for "no limit" when an offset is requested
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

/// sea-orm backed paper store
#[derive(Clone)]
pub struct SqlPaperStore {
    pool: DbPool,
}

impl SqlPaperStore {
    /// Create a new store with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        self.pool.conn()
    }

    // ========================================================================
    // Schema
    // ========================================================================

    /// Create the `papers` table and its indexes if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let conn = self.conn();
        let backend = conn.get_database_backend();
        let schema = Schema::new(backend);

        let mut table = schema.create_table_from_entity(PaperEntity);
        table.if_not_exists();
        conn.execute(backend.build(&table)).await?;

        for mut index in schema.create_index_from_entity(PaperEntity) {
            index.if_not_exists();
            conn.execute(backend.build(&index)).await?;
        }

        debug!("Paper schema ready");
        Ok(())
    }

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    fn to_papers(models: Vec<PaperModel>) -> Result<Vec<Paper>> {
        models.into_iter().map(Paper::try_from).collect()
    }

    fn sort_column(field: SortField) -> PaperColumn {
        match field {
            SortField::Published => PaperColumn::Published,
            SortField::RelevanceScore => PaperColumn::RelevanceScore,
            SortField::Title => PaperColumn::Title,
            SortField::Updated => PaperColumn::Updated,
            SortField::CreatedAt => PaperColumn::CreatedAt,
        }
    }
}

#[async_trait]
impl PaperStore for SqlPaperStore {
    async fn exists(&self, arxiv_id: &str) -> Result<bool> {
        let count = PaperEntity::find()
            .filter(PaperColumn::ArxivId.eq(arxiv_id))
            .count(self.conn())
            .await?;
        Ok(count > 0)
    }

    #[instrument(skip(self, paper), fields(arxiv_id = %paper.arxiv_id))]
    async fn insert(&self, paper: Paper) -> Result<Uuid> {
        let id = paper.id;
        let arxiv_id = paper.arxiv_id.clone();
        let model: PaperActiveModel = paper.into();

        PaperEntity::insert(model)
            .exec(self.conn())
            .await
            .map_err(|e| match e.sql_err() {
                Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Duplicate { arxiv_id },
                _ => AppError::Database(e),
            })?;

        Ok(id)
    }

    async fn latest_published(&self, search_query: &str) -> Result<Option<NaiveDateTime>> {
        let latest = PaperEntity::find()
            .filter(PaperColumn::SearchQuery.eq(search_query))
            .filter(PaperColumn::Published.is_not_null())
            .order_by_desc(PaperColumn::Published)
            .one(self.conn())
            .await?;

        Ok(latest.and_then(|m| m.published))
    }

    #[instrument(skip(self, predicate))]
    async fn query(
        &self,
        predicate: &Predicate,
        sort: Sort,
        offset: u64,
        limit: Option<u64>,
    ) -> Result<Vec<Paper>> {
        let (order, nulls) = match sort.order {
            SortOrder::Asc => (Order::Asc, NullOrdering::First),
            SortOrder::Desc => (Order::Desc, NullOrdering::Last),
        };

        let mut select = PaperEntity::find()
            .filter(to_condition(predicate))
            .order_by_with_nulls(Self::sort_column(sort.field), order, nulls)
            .order_by_asc(PaperColumn::ArxivId);

        // SQLite only accepts OFFSET after a LIMIT
        match (limit, offset) {
            (Some(limit), offset) => select = select.offset(offset).limit(limit),
            (None, 0) => {}
            (None, offset) => select = select.offset(offset).limit(UNBOUNDED_LIMIT),
        }

        let models = select.all(self.conn()).await?;

        debug!(rows = models.len(), "Paper query executed");
        Self::to_papers(models)
    }

    async fn count(&self, predicate: &Predicate) -> Result<u64> {
        PaperEntity::find()
            .filter(to_condition(predicate))
            .count(self.conn())
            .await
            .map_err(Into::into)
    }

    async fn find_by_arxiv_id(&self, arxiv_id: &str) -> Result<Option<Paper>> {
        PaperEntity::find()
            .filter(PaperColumn::ArxivId.eq(arxiv_id))
            .one(self.conn())
            .await?
            .map(Paper::try_from)
            .transpose()
    }

    async fn provenance_summary(&self, limit: Option<u64>) -> Result<Vec<ProvenanceSummary>> {
        let groups: Vec<(String, i64)> = PaperEntity::find()
            .select_only()
            .column(PaperColumn::SearchQuery)
            .column_as(PaperColumn::Id.count(), "paper_count")
            .group_by(PaperColumn::SearchQuery)
            .order_by_desc(PaperColumn::Id.count())
            .order_by_asc(PaperColumn::SearchQuery)
            .limit(limit)
            .into_tuple::<(String, i64)>()
            .all(self.conn())
            .await?;

        let mut summary = Vec::with_capacity(groups.len());
        for (query, count) in groups {
            let latest = PaperEntity::find()
                .filter(PaperColumn::SearchQuery.eq(query.as_str()))
                .filter(PaperColumn::Published.is_not_null())
                .order_by_desc(PaperColumn::Published)
                .order_by_asc(PaperColumn::ArxivId)
                .one(self.conn())
                .await?;

            summary.push(ProvenanceSummary {
                query,
                count: count.max(0) as u64,
                last_published: latest.as_ref().and_then(|m| m.published),
                last_arxiv_id: latest.map(|m| m.arxiv_id),
            });
        }

        Ok(summary)
    }
}

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;
use uuid::Uuid;

use jobdeck_core::section::{Section, SectionPolicy};
use jobdeck_core::types::{
    Content, Course, EntityKind, EntityRef, FeaturedEntity, FeaturedItem, HeroBanner, JobPosting,
};
use jobdeck_core::SectionStore;

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle for managing curated featured items.
    pub fn featured(&self) -> FeaturedItemRepository {
        FeaturedItemRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for reading catalog summaries (admin pickers).
    pub fn catalog(&self) -> CatalogRepository {
        CatalogRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle for reading hero banners.
    pub fn banners(&self) -> HeroBannerRepository {
        HeroBannerRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns the section-query surface consumed by the resolver.
    pub fn sections(&self) -> SectionQueries {
        SectionQueries {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

const FEATURED_COLUMNS: &str =
    "id, section, course_id, content_id, job_id, display_order, is_active, created_at, updated_at";

const COURSE_COLUMNS: &str = "id, title, instructor_name, category, thumbnail_url, price, rating, \
                              review_count, status, created_at";

const CONTENT_COLUMNS: &str =
    "id, title, summary, author_name, category, thumbnail_url, view_count, like_count, published_at";

const JOB_COLUMNS: &str = "id, company_name, title, job_type, location, deadline, url, \
                           thumbnail_url, is_active, created_at";

fn catalog_columns(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Course => COURSE_COLUMNS,
        EntityKind::Content => CONTENT_COLUMNS,
        EntityKind::Job => JOB_COLUMNS,
    }
}

/// Repository owning the `featured_items` table.
#[derive(Clone)]
pub struct FeaturedItemRepository {
    pool: SqlitePool,
}

impl FeaturedItemRepository {
    /// Lists every override, active and inactive, for the admin screen.
    ///
    /// Ordered by section, then rank, then insertion order so the listing is
    /// deterministic even with tied ranks.
    pub async fn list_all(&self) -> Result<Vec<FeaturedItem>, FeaturedError> {
        let sql = format!(
            "SELECT {FEATURED_COLUMNS} FROM featured_items \
             ORDER BY section ASC, display_order ASC, rowid ASC"
        );
        let rows = sqlx::query_as::<_, FeaturedRow>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(into_featured_items(rows))
    }

    /// Lists the active overrides for one section in resolution order.
    pub async fn list_active(&self, section: Section) -> Result<Vec<FeaturedItem>, FeaturedError> {
        Ok(fetch_active_items(&self.pool, section).await?)
    }

    /// Inserts a new override or updates an existing one by id.
    ///
    /// The entity reference kind must match the section; a mismatch fails
    /// before touching the database. Duplicate references to the same entity
    /// within a section are not rejected here.
    pub async fn upsert(
        &self,
        upsert: FeaturedItemUpsert,
        now: DateTime<Utc>,
    ) -> Result<FeaturedItem, FeaturedError> {
        if upsert.entity.kind() != upsert.section.entity_kind() {
            return Err(FeaturedError::SectionMismatch {
                section: upsert.section.as_str(),
                reference: upsert.entity.kind().as_str(),
            });
        }
        if upsert.display_order < 1 {
            return Err(FeaturedError::InvalidDisplayOrder(upsert.display_order));
        }

        let (course_id, content_id, job_id) = reference_columns(&upsert.entity);
        let is_active = if upsert.is_active { 1 } else { 0 };
        let stamp = to_rfc3339(now);

        match upsert.id {
            Some(id) => {
                let sql = format!(
                    "UPDATE featured_items \
                     SET section = ?, course_id = ?, content_id = ?, job_id = ?, \
                         display_order = ?, is_active = ?, updated_at = ? \
                     WHERE id = ? \
                     RETURNING {FEATURED_COLUMNS}"
                );
                let row = sqlx::query_as::<_, FeaturedRow>(&sql)
                    .bind(upsert.section.as_str())
                    .bind(course_id)
                    .bind(content_id)
                    .bind(job_id)
                    .bind(upsert.display_order)
                    .bind(is_active)
                    .bind(&stamp)
                    .bind(&id)
                    .fetch_optional(&self.pool)
                    .await?
                    .ok_or(FeaturedError::NotFound)?;

                row.into_domain()
                    .ok_or_else(|| FeaturedError::InvalidStored(id))
            }
            None => {
                let id = Uuid::new_v4().to_string();
                sqlx::query(
                    "INSERT INTO featured_items \
                     (id, section, course_id, content_id, job_id, display_order, is_active, \
                      created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(&id)
                .bind(upsert.section.as_str())
                .bind(course_id)
                .bind(content_id)
                .bind(job_id)
                .bind(upsert.display_order)
                .bind(is_active)
                .bind(&stamp)
                .bind(&stamp)
                .execute(&self.pool)
                .await?;

                Ok(FeaturedItem {
                    id,
                    section: upsert.section,
                    entity: upsert.entity,
                    display_order: upsert.display_order,
                    is_active: upsert.is_active,
                    created_at: now,
                    updated_at: now,
                })
            }
        }
    }

    /// Deletes an override by id.
    pub async fn delete(&self, id: &str) -> Result<(), FeaturedError> {
        let result = sqlx::query("DELETE FROM featured_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(FeaturedError::NotFound);
        }
        Ok(())
    }
}

/// Mutable fields of a featured item, plus the optional id that switches
/// between insert and update.
#[derive(Debug, Clone)]
pub struct FeaturedItemUpsert {
    pub id: Option<String>,
    pub section: Section,
    pub entity: EntityRef,
    pub display_order: i64,
    pub is_active: bool,
}

/// Errors that can occur while managing featured items.
#[derive(Debug, Error)]
pub enum FeaturedError {
    #[error("featured item not found")]
    NotFound,
    #[error("entity reference of kind '{reference}' does not fit section '{section}'")]
    SectionMismatch {
        section: &'static str,
        reference: &'static str,
    },
    #[error("display_order must be a positive integer (got {0})")]
    InvalidDisplayOrder(i64),
    #[error("stored featured item {0} has an invalid reference")]
    InvalidStored(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

fn reference_columns(entity: &EntityRef) -> (Option<&str>, Option<&str>, Option<&str>) {
    match entity {
        EntityRef::Course(id) => (Some(id.as_str()), None, None),
        EntityRef::Content(id) => (None, Some(id.as_str()), None),
        EntityRef::Job(id) => (None, None, Some(id.as_str())),
    }
}

async fn fetch_active_items(
    pool: &SqlitePool,
    section: Section,
) -> Result<Vec<FeaturedItem>, sqlx::Error> {
    let sql = format!(
        "SELECT {FEATURED_COLUMNS} FROM featured_items \
         WHERE section = ? AND is_active = 1 \
         ORDER BY display_order ASC, rowid ASC"
    );
    let rows = sqlx::query_as::<_, FeaturedRow>(&sql)
        .bind(section.as_str())
        .fetch_all(pool)
        .await?;
    Ok(into_featured_items(rows))
}

fn into_featured_items(rows: Vec<FeaturedRow>) -> Vec<FeaturedItem> {
    rows.into_iter()
        .filter_map(|row| {
            let row_id = row.id.clone();
            let item = row.into_domain();
            if item.is_none() {
                tracing::warn!(id = %row_id, "skipping featured item with invalid section or reference");
            }
            item
        })
        .collect()
}

/// Raw `featured_items` row with the legacy three-nullable-column reference.
#[derive(Debug, sqlx::FromRow)]
struct FeaturedRow {
    id: String,
    section: String,
    course_id: Option<String>,
    content_id: Option<String>,
    job_id: Option<String>,
    display_order: i64,
    is_active: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl FeaturedRow {
    /// Converts to the domain item. Rows with an unknown section name or
    /// with zero or multiple references set yield `None`.
    fn into_domain(self) -> Option<FeaturedItem> {
        let section = Section::parse(&self.section).ok()?;
        let entity = match (self.course_id, self.content_id, self.job_id) {
            (Some(id), None, None) => EntityRef::Course(id),
            (None, Some(id), None) => EntityRef::Content(id),
            (None, None, Some(id)) => EntityRef::Job(id),
            _ => return None,
        };
        if entity.kind() != section.entity_kind() {
            return None;
        }
        Some(FeaturedItem {
            id: self.id,
            section,
            entity,
            display_order: self.display_order,
            is_active: self.is_active != 0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Section-scoped catalog queries; the concrete [`SectionStore`] the
/// resolver runs against in production.
#[derive(Clone)]
pub struct SectionQueries {
    pool: SqlitePool,
}

impl SectionQueries {
    async fn fetch_by_ids<R>(&self, kind: EntityKind, ids: &[String]) -> Result<Vec<R>, StorageError>
    where
        R: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM {} WHERE id IN ({placeholders})",
            catalog_columns(kind),
            table_for(kind),
        );
        let mut query = sqlx::query_as::<_, R>(&sql);
        for id in ids {
            query = query.bind(id);
        }
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn fetch_ranked<R>(
        &self,
        policy: SectionPolicy,
        kind: EntityKind,
        exclude: &[String],
        limit: usize,
    ) -> Result<Vec<R>, StorageError>
    where
        R: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    {
        let mut clauses: Vec<String> = Vec::new();
        if let Some(flag) = policy.flag_filter {
            clauses.push(format!("{flag} = 1"));
        }
        if !exclude.is_empty() {
            let placeholders = vec!["?"; exclude.len()].join(", ");
            clauses.push(format!("id NOT IN ({placeholders})"));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };
        let direction = if policy.ascending { "ASC" } else { "DESC" };
        let sql = format!(
            "SELECT {} FROM {}{where_sql} ORDER BY {} {direction}, rowid ASC LIMIT ?",
            catalog_columns(kind),
            policy.table,
            policy.sort_column,
        );
        let mut query = sqlx::query_as::<_, R>(&sql);
        for id in exclude {
            query = query.bind(id);
        }
        query = query.bind(limit as i64);
        Ok(query.fetch_all(&self.pool).await?)
    }
}

fn table_for(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Course => "courses",
        EntityKind::Content => "contents",
        EntityKind::Job => "job_postings",
    }
}

impl SectionStore for SectionQueries {
    type Error = StorageError;

    async fn active_overrides(&self, section: Section) -> Result<Vec<FeaturedItem>, StorageError> {
        Ok(fetch_active_items(&self.pool, section).await?)
    }

    async fn entities_by_ids(
        &self,
        section: Section,
        ids: &[String],
    ) -> Result<Vec<FeaturedEntity>, StorageError> {
        match section.entity_kind() {
            EntityKind::Course => Ok(self
                .fetch_by_ids::<CourseRow>(EntityKind::Course, ids)
                .await?
                .into_iter()
                .map(CourseRow::into_entity)
                .collect()),
            EntityKind::Content => Ok(self
                .fetch_by_ids::<ContentRow>(EntityKind::Content, ids)
                .await?
                .into_iter()
                .map(ContentRow::into_entity)
                .collect()),
            EntityKind::Job => Ok(self
                .fetch_by_ids::<JobRow>(EntityKind::Job, ids)
                .await?
                .into_iter()
                .map(JobRow::into_entity)
                .collect()),
        }
    }

    async fn ranked_entities(
        &self,
        section: Section,
        exclude: &[String],
        limit: usize,
    ) -> Result<Vec<FeaturedEntity>, StorageError> {
        let policy = section.policy();
        match section.entity_kind() {
            EntityKind::Course => Ok(self
                .fetch_ranked::<CourseRow>(policy, EntityKind::Course, exclude, limit)
                .await?
                .into_iter()
                .map(CourseRow::into_entity)
                .collect()),
            EntityKind::Content => Ok(self
                .fetch_ranked::<ContentRow>(policy, EntityKind::Content, exclude, limit)
                .await?
                .into_iter()
                .map(ContentRow::into_entity)
                .collect()),
            EntityKind::Job => Ok(self
                .fetch_ranked::<JobRow>(policy, EntityKind::Job, exclude, limit)
                .await?
                .into_iter()
                .map(JobRow::into_entity)
                .collect()),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CourseRow {
    id: String,
    title: String,
    instructor_name: String,
    category: String,
    thumbnail_url: Option<String>,
    price: i64,
    rating: f64,
    review_count: i64,
    status: String,
    created_at: DateTime<Utc>,
}

impl CourseRow {
    fn into_entity(self) -> FeaturedEntity {
        FeaturedEntity::Course(Course {
            id: self.id,
            title: self.title,
            instructor_name: self.instructor_name,
            category: self.category,
            thumbnail_url: self.thumbnail_url,
            price: self.price,
            rating: self.rating,
            review_count: self.review_count,
            status: self.status,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ContentRow {
    id: String,
    title: String,
    summary: String,
    author_name: String,
    category: String,
    thumbnail_url: Option<String>,
    view_count: i64,
    like_count: i64,
    published_at: DateTime<Utc>,
}

impl ContentRow {
    fn into_entity(self) -> FeaturedEntity {
        FeaturedEntity::Content(Content {
            id: self.id,
            title: self.title,
            summary: self.summary,
            author_name: self.author_name,
            category: self.category,
            thumbnail_url: self.thumbnail_url,
            view_count: self.view_count,
            like_count: self.like_count,
            published_at: self.published_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct JobRow {
    id: String,
    company_name: String,
    title: String,
    job_type: String,
    location: Option<String>,
    deadline: DateTime<Utc>,
    url: Option<String>,
    thumbnail_url: Option<String>,
    is_active: i64,
    created_at: DateTime<Utc>,
}

impl JobRow {
    fn into_entity(self) -> FeaturedEntity {
        FeaturedEntity::Job(JobPosting {
            id: self.id,
            company_name: self.company_name,
            title: self.title,
            job_type: self.job_type,
            location: self.location,
            deadline: self.deadline,
            url: self.url,
            thumbnail_url: self.thumbnail_url,
            is_active: self.is_active != 0,
            created_at: self.created_at,
        })
    }
}

/// Read-only catalog summaries used by the admin picker lists.
#[derive(Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

/// Minimal id/label pair for admin dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct CatalogSummary {
    pub id: String,
    pub title: String,
}

impl CatalogRepository {
    pub async fn course_summaries(&self) -> Result<Vec<CatalogSummary>, CatalogError> {
        let rows = sqlx::query_as::<_, CatalogSummary>(
            "SELECT id, title FROM courses ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    pub async fn content_summaries(&self) -> Result<Vec<CatalogSummary>, CatalogError> {
        let rows = sqlx::query_as::<_, CatalogSummary>(
            "SELECT id, title FROM contents ORDER BY title ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Job labels are "company - role" so the picker reads naturally.
    pub async fn job_summaries(&self) -> Result<Vec<CatalogSummary>, CatalogError> {
        let rows = sqlx::query_as::<_, CatalogSummary>(
            "SELECT id, company_name || ' - ' || title AS title \
             FROM job_postings ORDER BY deadline ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

/// Errors that can occur while reading catalog summaries.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Read-only hero banner queries.
#[derive(Clone)]
pub struct HeroBannerRepository {
    pool: SqlitePool,
}

impl HeroBannerRepository {
    /// Active banners in display order, capped at `limit`.
    pub async fn list_active(&self, limit: usize) -> Result<Vec<HeroBanner>, BannerError> {
        let rows = sqlx::query_as::<_, BannerRow>(
            "SELECT id, title, subtitle, image_url, link_url, display_order, is_active \
             FROM hero_banners WHERE is_active = 1 \
             ORDER BY display_order ASC, rowid ASC LIMIT ?",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(BannerRow::into_domain).collect())
    }
}

/// Errors that can occur while reading hero banners.
#[derive(Debug, Error)]
pub enum BannerError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, sqlx::FromRow)]
struct BannerRow {
    id: String,
    title: String,
    subtitle: Option<String>,
    image_url: Option<String>,
    link_url: Option<String>,
    display_order: i64,
    is_active: i64,
}

impl BannerRow {
    fn into_domain(self) -> HeroBanner {
        HeroBanner {
            id: self.id,
            title: self.title,
            subtitle: self.subtitle,
            image_url: self.image_url,
            link_url: self.link_url,
            display_order: self.display_order,
            is_active: self.is_active != 0,
        }
    }
}

fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{DEFAULT_QUERY_LIMIT, PolicyStore};
use crate::entities::{
    Attachment, CrawlLogEntry, DedupKey, PersistedSchedulerState, PolicyCandidate, PolicyFilter,
    PolicyStats, StoredPolicy, Targets, Translation,
};

const POLICY_COLUMNS: &str = "id, external_id, site_id, title, organization, category, status, \
     start_date, end_date, target_visa, target_region, summary, content, original_url, \
     attachments, credit_required, credit_keywords, translations, is_new, views, created_at";

/// PostgreSQL-backed store. Sets are `text[]`, nested documents `jsonb`.
#[derive(Clone)]
pub struct PgPolicyStore {
    pool: PgPool,
}

impl PgPolicyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[derive(FromRow)]
struct PolicyRow {
    id: Uuid,
    external_id: String,
    site_id: String,
    title: String,
    organization: String,
    category: String,
    status: String,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
    target_visa: Vec<String>,
    target_region: Vec<String>,
    summary: String,
    content: String,
    original_url: String,
    attachments: Json<Vec<Attachment>>,
    credit_required: bool,
    credit_keywords: Vec<String>,
    translations: Json<BTreeMap<String, Translation>>,
    is_new: bool,
    views: i32,
    created_at: DateTime<Utc>,
}

impl TryFrom<PolicyRow> for StoredPolicy {
    type Error = anyhow::Error;

    fn try_from(row: PolicyRow) -> Result<Self> {
        let status = row.status.parse().map_err(anyhow::Error::msg)?;
        Ok(StoredPolicy {
            id: row.id,
            policy: PolicyCandidate {
                external_id: row.external_id,
                site_id: row.site_id,
                title: row.title,
                organization: row.organization,
                category: row.category,
                status,
                start_date: row.start_date,
                end_date: row.end_date,
                target_visa: Targets::from(row.target_visa),
                target_region: Targets::from(row.target_region),
                summary: row.summary,
                content: row.content,
                original_url: row.original_url,
                attachments: row.attachments.0,
                credit_required: row.credit_required,
                credit_keywords: row.credit_keywords,
                translations: row.translations.0,
            },
            is_new: row.is_new,
            views: row.views,
            created_at: row.created_at,
        })
    }
}

#[derive(FromRow)]
struct CrawlLogRow {
    site_id: String,
    site_name: String,
    status: String,
    total_found: i32,
    new_added: i32,
    duplicates_skipped: i32,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
}

impl TryFrom<CrawlLogRow> for CrawlLogEntry {
    type Error = anyhow::Error;

    fn try_from(row: CrawlLogRow) -> Result<Self> {
        Ok(CrawlLogEntry {
            site_id: row.site_id,
            site_name: row.site_name,
            status: row.status.parse().map_err(anyhow::Error::msg)?,
            total_found: row.total_found.max(0) as u32,
            new_added: row.new_added.max(0) as u32,
            duplicates_skipped: row.duplicates_skipped.max(0) as u32,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

#[async_trait]
impl PolicyStore for PgPolicyStore {
    async fn exists(&self, key: &DedupKey) -> Result<bool> {
        let found: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM policies
                WHERE site_id = $1
                  AND title = $2
                  AND ($3::date IS NULL OR start_date = $3)
            )
            "#,
        )
        .bind(&key.site_id)
        .bind(&key.title)
        .bind(key.start_date)
        .fetch_one(&self.pool)
        .await
        .context("existence check failed")?;

        Ok(found)
    }

    async fn insert_policy(&self, policy: &PolicyCandidate) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query(
            r#"
            INSERT INTO policies
                (id, external_id, site_id, title, organization, category, status,
                 start_date, end_date, target_visa, target_region, summary, content,
                 original_url, attachments, credit_required, credit_keywords, translations,
                 is_new, views, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                    $17, $18, TRUE, 0, now())
            "#,
        )
        .bind(id)
        .bind(&policy.external_id)
        .bind(&policy.site_id)
        .bind(&policy.title)
        .bind(&policy.organization)
        .bind(&policy.category)
        .bind(policy.status.as_str())
        .bind(policy.start_date)
        .bind(policy.end_date)
        .bind(policy.target_visa.codes())
        .bind(policy.target_region.codes())
        .bind(&policy.summary)
        .bind(&policy.content)
        .bind(&policy.original_url)
        .bind(Json(&policy.attachments))
        .bind(policy.credit_required)
        .bind(&policy.credit_keywords)
        .bind(Json(&policy.translations))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to insert policy '{}'", policy.title))?;

        Ok(id)
    }

    async fn query_policies(&self, filter: &PolicyFilter) -> Result<Vec<StoredPolicy>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {POLICY_COLUMNS} FROM policies WHERE TRUE"));
        if let Some(site_id) = &filter.site_id {
            builder.push(" AND site_id = ").push_bind(site_id);
        }
        if let Some(category) = &filter.category {
            builder.push(" AND category = ").push_bind(category);
        }
        if let Some(status) = filter.status {
            builder.push(" AND status = ").push_bind(status.as_str());
        }
        if let Some(credit_required) = filter.credit_required {
            builder
                .push(" AND credit_required = ")
                .push_bind(credit_required);
        }
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(filter.limit.unwrap_or(DEFAULT_QUERY_LIMIT).max(0))
            .push(" OFFSET ")
            .push_bind(filter.offset.unwrap_or(0).max(0));

        let rows: Vec<PolicyRow> = builder
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .context("policy query failed")?;

        rows.into_iter().map(StoredPolicy::try_from).collect()
    }

    async fn aggregate(&self) -> Result<PolicyStats> {
        let (total, new_count): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_new) FROM policies",
        )
        .fetch_one(&self.pool)
        .await?;

        let by_status: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM policies GROUP BY status")
                .fetch_all(&self.pool)
                .await?;

        let by_category: Vec<(String, i64)> =
            sqlx::query_as("SELECT category, COUNT(*) FROM policies GROUP BY category")
                .fetch_all(&self.pool)
                .await?;

        Ok(PolicyStats {
            total,
            new_count,
            by_status: by_status.into_iter().collect(),
            by_category: by_category.into_iter().collect(),
        })
    }

    async fn append_crawl_log(&self, entry: &CrawlLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO crawl_logs
                (site_id, site_name, status, total_found, new_added, duplicates_skipped,
                 error_message, started_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(&entry.site_id)
        .bind(&entry.site_name)
        .bind(entry.status.as_str())
        .bind(entry.total_found as i32)
        .bind(entry.new_added as i32)
        .bind(entry.duplicates_skipped as i32)
        .bind(&entry.error_message)
        .bind(entry.started_at)
        .bind(entry.completed_at)
        .execute(&self.pool)
        .await
        .context("failed to append crawl log")?;

        Ok(())
    }

    async fn list_crawl_logs(&self, limit: usize) -> Result<Vec<CrawlLogEntry>> {
        let rows: Vec<CrawlLogRow> = sqlx::query_as(
            r#"
            SELECT site_id, site_name, status, total_found, new_added, duplicates_skipped,
                   error_message, started_at, completed_at
            FROM crawl_logs
            ORDER BY completed_at DESC, id DESC
            LIMIT $1
            "#,
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(CrawlLogEntry::try_from).collect()
    }

    async fn load_scheduler_state(&self) -> Result<Option<PersistedSchedulerState>> {
        let row: Option<(bool, Option<DateTime<Utc>>)> =
            sqlx::query_as("SELECT enabled, last_run FROM scheduler_state WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(enabled, last_run)| PersistedSchedulerState { enabled, last_run }))
    }

    async fn save_scheduler_state(&self, state: &PersistedSchedulerState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scheduler_state (id, enabled, last_run)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE
              SET enabled  = EXCLUDED.enabled,
                  last_run = EXCLUDED.last_run
            "#,
        )
        .bind(state.enabled)
        .bind(state.last_run)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

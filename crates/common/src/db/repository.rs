//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::auth::{self, ScopeSet};
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbBackend, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, Statement,
};
use uuid::Uuid;

/// A processed bulk item ready to be checkpointed
#[derive(Debug, Clone)]
pub struct NewJobItem {
    pub item_index: i32,
    pub status: ItemStatus,
    pub generation_id: Option<Uuid>,
    pub output: Option<serde_json::Value>,
    pub error_message: Option<String>,
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Tenant Operations
    // ========================================================================

    /// Create a new tenant
    pub async fn create_tenant(
        &self,
        name: String,
        plan: Plan,
        owner_email: String,
    ) -> Result<Tenant> {
        let now = Utc::now();

        let tenant = TenantActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name),
            plan: Set(String::from(plan)),
            owner_email: Set(owner_email),
            is_active: Set(true),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        tenant.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find tenant by ID
    pub async fn find_tenant_by_id(&self, id: Uuid) -> Result<Option<Tenant>> {
        TenantEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Credential Operations
    // ========================================================================

    /// Create a new API key. Returns the stored model together with the raw
    /// token; the raw token is shown to the caller exactly once and never
    /// persisted.
    pub async fn create_api_key(
        &self,
        tenant_id: Uuid,
        name: String,
        scopes: ScopeSet,
    ) -> Result<(ApiKey, String)> {
        let raw_token = auth::generate_api_key();
        let now = Utc::now();

        let key = ApiKeyActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            name: Set(name),
            token_hash: Set(auth::hash_api_key(&raw_token)),
            token_prefix: Set(auth::token_prefix(&raw_token)),
            scopes: Set(scopes),
            usage_count: Set(0),
            last_used_at: Set(None),
            is_active: Set(true),
            created_at: Set(now.into()),
        };

        let model = key.insert(self.write_conn()).await?;
        Ok((model, raw_token))
    }

    /// Find an active credential by token hash
    pub async fn find_api_key_by_hash(&self, hash: &str) -> Result<Option<ApiKey>> {
        ApiKeyEntity::find()
            .filter(ApiKeyColumn::TokenHash.eq(hash))
            .filter(ApiKeyColumn::IsActive.eq(true))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Bump the usage counter and last-used timestamp of a credential.
    /// Callers treat a failure here as best-effort accounting, never as a
    /// request failure.
    pub async fn record_api_key_use(&self, id: Uuid) -> Result<()> {
        use sea_orm::ConnectionTrait;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE api_keys SET usage_count = usage_count + 1, last_used_at = $1 WHERE id = $2",
            vec![Utc::now().into(), id.into()],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// List the API keys of a tenant, newest first
    pub async fn list_api_keys(&self, tenant_id: Uuid) -> Result<Vec<ApiKey>> {
        ApiKeyEntity::find()
            .filter(ApiKeyColumn::TenantId.eq(tenant_id))
            .order_by_desc(ApiKeyColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Soft-deactivate an API key within a tenant
    pub async fn deactivate_api_key(&self, id: Uuid, tenant_id: Uuid) -> Result<bool> {
        let Some(key) = ApiKeyEntity::find_by_id(id)
            .filter(ApiKeyColumn::TenantId.eq(tenant_id))
            .one(self.write_conn())
            .await?
        else {
            return Ok(false);
        };

        let mut key: ApiKeyActiveModel = key.into();
        key.is_active = Set(false);
        key.update(self.write_conn()).await?;

        Ok(true)
    }

    // ========================================================================
    // Usage Ledger
    // ========================================================================

    /// Append one usage record
    pub async fn insert_usage_record(
        &self,
        api_key_id: Uuid,
        tenant_id: Uuid,
        endpoint: &str,
        method: &str,
        status_code: i32,
    ) -> Result<()> {
        let record = UsageRecordActiveModel {
            id: Set(Uuid::new_v4()),
            api_key_id: Set(api_key_id),
            tenant_id: Set(tenant_id),
            endpoint: Set(endpoint.to_string()),
            method: Set(method.to_string()),
            status_code: Set(status_code),
            recorded_at: Set(Utc::now().into()),
        };

        record.insert(self.write_conn()).await?;
        Ok(())
    }

    /// Count records for a credential since a window start
    pub async fn count_usage_since(
        &self,
        api_key_id: Uuid,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        UsageRecordEntity::find()
            .filter(UsageRecordColumn::ApiKeyId.eq(api_key_id))
            .filter(UsageRecordColumn::RecordedAt.gte(since))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Total / successful / failed request counts inside a range
    pub async fn usage_counts(
        &self,
        api_key_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(u64, u64, u64)> {
        let base = UsageRecordEntity::find()
            .filter(UsageRecordColumn::ApiKeyId.eq(api_key_id))
            .filter(UsageRecordColumn::RecordedAt.gte(start))
            .filter(UsageRecordColumn::RecordedAt.lte(end));

        let total = base.clone().count(self.read_conn()).await?;

        let successful = base
            .clone()
            .filter(UsageRecordColumn::StatusCode.gte(200))
            .filter(UsageRecordColumn::StatusCode.lt(300))
            .count(self.read_conn())
            .await?;

        let failed = base
            .filter(UsageRecordColumn::StatusCode.gte(400))
            .count(self.read_conn())
            .await?;

        Ok((total, successful, failed))
    }

    /// Count generations produced through a credential inside a range
    pub async fn count_generations_between(
        &self,
        api_key_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64> {
        GenerationEntity::find()
            .filter(GenerationColumn::ApiKeyId.eq(api_key_id))
            .filter(GenerationColumn::CreatedAt.gte(start))
            .filter(GenerationColumn::CreatedAt.lte(end))
            .count(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Per-day request counts inside a range, oldest first
    pub async fn usage_daily_breakdown(
        &self,
        api_key_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>> {
        use sea_orm::ConnectionTrait;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT to_char(date_trunc('day', recorded_at), 'YYYY-MM-DD') AS day,
                   COUNT(*) AS requests
            FROM usage_records
            WHERE api_key_id = $1 AND recorded_at >= $2 AND recorded_at <= $3
            GROUP BY 1
            ORDER BY 1 ASC
            "#,
            vec![api_key_id.into(), start.into(), end.into()],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some((
                    row.try_get_by_index::<String>(0).ok()?,
                    row.try_get_by_index::<i64>(1).ok()?,
                ))
            })
            .collect())
    }

    /// Per-endpoint request counts inside a range, busiest first
    pub async fn usage_endpoint_breakdown(
        &self,
        api_key_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<(String, i64)>> {
        use sea_orm::ConnectionTrait;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            SELECT endpoint, COUNT(*) AS requests
            FROM usage_records
            WHERE api_key_id = $1 AND recorded_at >= $2 AND recorded_at <= $3
            GROUP BY endpoint
            ORDER BY requests DESC
            "#,
            vec![api_key_id.into(), start.into(), end.into()],
        );

        let rows = self.read_conn().query_all(stmt).await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                Some((
                    row.try_get_by_index::<String>(0).ok()?,
                    row.try_get_by_index::<i64>(1).ok()?,
                ))
            })
            .collect())
    }

    // ========================================================================
    // Rate Limiting
    // ========================================================================

    /// Atomically consume one admission slot for a credential inside a
    /// fixed window. Returns the new count when admitted, `None` when the
    /// window is exhausted. The conditional increment is a single
    /// statement, so concurrent requests on the same credential cannot
    /// both slip past the quota boundary.
    pub async fn try_consume_rate(
        &self,
        api_key_id: Uuid,
        window_start: DateTime<Utc>,
        quota: u32,
    ) -> Result<Option<i64>> {
        use sea_orm::ConnectionTrait;

        if quota == 0 {
            return Ok(None);
        }

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO rate_counters (id, api_key_id, window_start, count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (api_key_id, window_start)
            DO UPDATE SET count = rate_counters.count + 1
            WHERE rate_counters.count < $4
            RETURNING count
            "#,
            vec![
                Uuid::new_v4().into(),
                api_key_id.into(),
                window_start.into(),
                (quota as i64).into(),
            ],
        );

        let row = self.write_conn().query_one(stmt).await?;

        match row {
            Some(row) => {
                let count = row
                    .try_get_by_index::<i64>(0)
                    .map_err(sea_orm::DbErr::from)?;
                Ok(Some(count))
            }
            None => Ok(None),
        }
    }

    /// Current admission count of a credential's window
    pub async fn window_count(
        &self,
        api_key_id: Uuid,
        window_start: DateTime<Utc>,
    ) -> Result<i64> {
        let counter = RateCounterEntity::find()
            .filter(RateCounterColumn::ApiKeyId.eq(api_key_id))
            .filter(RateCounterColumn::WindowStart.eq(window_start))
            .one(self.read_conn())
            .await?;

        Ok(counter.map(|c| c.count).unwrap_or(0))
    }

    // ========================================================================
    // Bulk Job Operations
    // ========================================================================

    /// Create a bulk job in the pending state with zeroed counters
    pub async fn create_bulk_job(
        &self,
        tenant_id: Uuid,
        api_key_id: Option<Uuid>,
        name: String,
        items: BulkInput,
    ) -> Result<BulkJob> {
        let now = Utc::now();
        let total = items.0.len() as i32;

        let job = BulkJobActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            api_key_id: Set(api_key_id),
            name: Set(name),
            status: Set(String::from(JobStatus::Pending)),
            total_items: Set(total),
            processed: Set(0),
            successful: Set(0),
            failed: Set(0),
            input_items: Set(items),
            error_message: Set(None),
            created_at: Set(now.into()),
            started_at: Set(None),
            completed_at: Set(None),
        };

        job.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Find a bulk job by ID
    pub async fn find_bulk_job(&self, id: Uuid) -> Result<Option<BulkJob>> {
        BulkJobEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a bulk job scoped to its owning tenant. A foreign job is
    /// indistinguishable from an absent one.
    pub async fn find_bulk_job_for_tenant(
        &self,
        id: Uuid,
        tenant_id: Uuid,
    ) -> Result<Option<BulkJob>> {
        BulkJobEntity::find_by_id(id)
            .filter(BulkJobColumn::TenantId.eq(tenant_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Advance a job's status, stamping `started_at`/`completed_at` as the
    /// state machine requires. Rejects any non-monotonic transition.
    pub async fn transition_job(
        &self,
        job_id: Uuid,
        next: JobStatus,
        error_message: Option<String>,
    ) -> Result<BulkJob> {
        let now = Utc::now();

        let job = BulkJobEntity::find_by_id(job_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::JobNotFound {
                id: job_id.to_string(),
            })?;

        let current = job.job_status();
        if !current.can_transition(next) {
            return Err(AppError::Internal {
                message: format!(
                    "Illegal job status transition {} -> {}",
                    String::from(current),
                    String::from(next)
                ),
            });
        }

        let mut job: BulkJobActiveModel = job.into();
        job.status = Set(String::from(next));

        if let Some(err) = error_message {
            job.error_message = Set(Some(err));
        }

        match next {
            JobStatus::Processing => {
                job.started_at = Set(Some(now.into()));
            }
            JobStatus::Completed | JobStatus::Failed => {
                job.completed_at = Set(Some(now.into()));
            }
            JobStatus::Pending => {}
        }

        job.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Durably checkpoint one processed item: the item row plus the job's
    /// progress counters. Called once per item before the next item starts.
    pub async fn checkpoint_item(
        &self,
        job_id: Uuid,
        item: NewJobItem,
        processed: i32,
        successful: i32,
        failed: i32,
    ) -> Result<()> {
        use sea_orm::ConnectionTrait;

        let row = BulkJobItemActiveModel {
            id: Set(Uuid::new_v4()),
            job_id: Set(job_id),
            item_index: Set(item.item_index),
            status: Set(String::from(item.status)),
            generation_id: Set(item.generation_id),
            output: Set(item.output),
            error_message: Set(item.error_message),
            processed_at: Set(Utc::now().into()),
        };

        row.insert(self.write_conn()).await?;

        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            "UPDATE bulk_jobs SET processed = $1, successful = $2, failed = $3 WHERE id = $4",
            vec![
                processed.into(),
                successful.into(),
                failed.into(),
                job_id.into(),
            ],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    /// Item rows of a job in input order
    pub async fn job_items(&self, job_id: Uuid) -> Result<Vec<BulkJobItem>> {
        BulkJobItemEntity::find()
            .filter(BulkJobItemColumn::JobId.eq(job_id))
            .order_by_asc(BulkJobItemColumn::ItemIndex)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Recount a job's progress from its checkpointed item rows. The child
    /// table is the source of truth when resuming an interrupted job.
    pub async fn recount_job_progress(&self, job_id: Uuid) -> Result<(i32, i32, i32)> {
        let items = self.job_items(job_id).await?;

        let processed = items.len() as i32;
        let successful = items
            .iter()
            .filter(|i| i.item_status() == ItemStatus::Succeeded)
            .count() as i32;
        let failed = processed - successful;

        Ok((processed, successful, failed))
    }

    /// Jobs left in a non-terminal state, oldest first. Scanned at worker
    /// startup to resume interrupted work from its last checkpoint.
    pub async fn find_resumable_jobs(&self) -> Result<Vec<BulkJob>> {
        BulkJobEntity::find()
            .filter(
                BulkJobColumn::Status.is_in([
                    String::from(JobStatus::Pending),
                    String::from(JobStatus::Processing),
                ]),
            )
            .order_by_asc(BulkJobColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Generation Operations
    // ========================================================================

    /// Persist one produced artifact
    #[allow(clippy::too_many_arguments)]
    pub async fn insert_generation(
        &self,
        tenant_id: Uuid,
        api_key_id: Option<Uuid>,
        bulk_job_id: Option<Uuid>,
        product_name: &str,
        category: &str,
        writing_style: &str,
        language: &str,
        content: serde_json::Value,
    ) -> Result<Generation> {
        let generation = GenerationActiveModel {
            id: Set(Uuid::new_v4()),
            tenant_id: Set(tenant_id),
            api_key_id: Set(api_key_id),
            bulk_job_id: Set(bulk_job_id),
            product_name: Set(product_name.to_string()),
            category: Set(category.to_string()),
            writing_style: Set(writing_style.to_string()),
            language: Set(language.to_string()),
            content: Set(content),
            created_at: Set(Utc::now().into()),
        };

        generation
            .insert(self.write_conn())
            .await
            .map_err(Into::into)
    }
}

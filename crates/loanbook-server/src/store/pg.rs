//! Postgres-backed catalog store
//!
//! Batch creation and chunk commits run inside single transactions so a
//! failure never leaves an orphan batch header or a half-applied chunk.

use async_trait::async_trait;
use chrono::{DateTime, Months, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{
    AuditEntry, BatchStatus, ChunkLog, ChunkWrite, InvalidRow, Product, ProductRecord, RowOutcome,
    RowStatus, StagingRow, UploadBatch, ValidationCounts,
};
use crate::store::{CatalogStore, ProductFilter, StoreError, StoreResult};

/// Postgres implementation of [`CatalogStore`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn parse_enum<T: std::str::FromStr>(value: &str) -> StoreResult<T>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| StoreError::Internal(e.to_string()))
}

#[derive(sqlx::FromRow)]
struct BatchRow {
    batch_id: Uuid,
    file_name: String,
    uploaded_by: String,
    total_records: i64,
    valid_records: i64,
    invalid_records: i64,
    processed_records: i64,
    status: String,
    uploaded_at: DateTime<Utc>,
    processing_started: Option<DateTime<Utc>>,
    processing_completed: Option<DateTime<Utc>>,
}

impl TryFrom<BatchRow> for UploadBatch {
    type Error = StoreError;

    fn try_from(row: BatchRow) -> StoreResult<Self> {
        Ok(UploadBatch {
            batch_id: row.batch_id,
            file_name: row.file_name,
            uploaded_by: row.uploaded_by,
            total_records: row.total_records,
            valid_records: row.valid_records,
            invalid_records: row.invalid_records,
            processed_records: row.processed_records,
            status: parse_enum(&row.status)?,
            uploaded_at: row.uploaded_at,
            processing_started: row.processing_started,
            processing_completed: row.processing_completed,
        })
    }
}

#[derive(sqlx::FromRow)]
struct StagingRowDb {
    staging_id: i64,
    batch_id: Uuid,
    row_number: i64,
    product_id: String,
    product_name: Option<String>,
    loan_start_date: Option<NaiveDate>,
    withdrawn_date: Option<NaiveDate>,
    pricing: Option<f64>,
    min_loan: Option<f64>,
    max_loan: Option<f64>,
    min_ltv: Option<f64>,
    max_ltv: Option<f64>,
    term_months: Option<i64>,
    product_fee: Option<f64>,
    cashback_min: Option<f64>,
    cashback_max: Option<f64>,
    status: String,
    validation_errors: Option<String>,
    processed_at: Option<DateTime<Utc>>,
    uploaded_by: String,
    uploaded_at: DateTime<Utc>,
}

impl TryFrom<StagingRowDb> for StagingRow {
    type Error = StoreError;

    fn try_from(row: StagingRowDb) -> StoreResult<Self> {
        Ok(StagingRow {
            staging_id: row.staging_id,
            batch_id: row.batch_id,
            row_number: row.row_number,
            record: ProductRecord {
                product_id: row.product_id,
                product_name: row.product_name,
                loan_start_date: row.loan_start_date,
                withdrawn_date: row.withdrawn_date,
                pricing: row.pricing,
                min_loan: row.min_loan,
                max_loan: row.max_loan,
                min_ltv: row.min_ltv,
                max_ltv: row.max_ltv,
                term_months: row.term_months,
                product_fee: row.product_fee,
                cashback_min: row.cashback_min,
                cashback_max: row.cashback_max,
            },
            status: parse_enum(&row.status)?,
            validation_errors: row.validation_errors,
            processed_at: row.processed_at,
            uploaded_by: row.uploaded_by,
            uploaded_at: row.uploaded_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    product_id: String,
    product_name: Option<String>,
    loan_start_date: Option<NaiveDate>,
    withdrawn_date: Option<NaiveDate>,
    pricing: Option<f64>,
    min_loan: Option<f64>,
    max_loan: Option<f64>,
    min_ltv: Option<f64>,
    max_ltv: Option<f64>,
    term_months: Option<i64>,
    product_fee: Option<f64>,
    cashback_min: Option<f64>,
    cashback_max: Option<f64>,
    is_active: bool,
    created_by: String,
    created_at: DateTime<Utc>,
    updated_by: Option<String>,
    updated_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            record: ProductRecord {
                product_id: row.product_id,
                product_name: row.product_name,
                loan_start_date: row.loan_start_date,
                withdrawn_date: row.withdrawn_date,
                pricing: row.pricing,
                min_loan: row.min_loan,
                max_loan: row.max_loan,
                min_ltv: row.min_ltv,
                max_ltv: row.max_ltv,
                term_months: row.term_months,
                product_fee: row.product_fee,
                cashback_min: row.cashback_min,
                cashback_max: row.cashback_max,
            },
            is_active: row.is_active,
            created_by: row.created_by,
            created_at: row.created_at,
            updated_by: row.updated_by,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct AuditRow {
    audit_id: i64,
    batch_id: Uuid,
    product_id: String,
    product_name: Option<String>,
    change_type: String,
    old_pricing: Option<f64>,
    new_pricing: Option<f64>,
    old_withdrawn_date: Option<NaiveDate>,
    new_withdrawn_date: Option<NaiveDate>,
    changed_by: String,
    changed_at: DateTime<Utc>,
}

impl TryFrom<AuditRow> for AuditEntry {
    type Error = StoreError;

    fn try_from(row: AuditRow) -> StoreResult<Self> {
        Ok(AuditEntry {
            audit_id: row.audit_id,
            batch_id: row.batch_id,
            product_id: row.product_id,
            product_name: row.product_name,
            change_type: parse_enum(&row.change_type)?,
            old_pricing: row.old_pricing,
            new_pricing: row.new_pricing,
            old_withdrawn_date: row.old_withdrawn_date,
            new_withdrawn_date: row.new_withdrawn_date,
            changed_by: row.changed_by,
            changed_at: row.changed_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ChunkLogRow {
    log_id: i64,
    batch_id: Uuid,
    chunk_number: i64,
    records_processed: i64,
    records_created: i64,
    records_updated: i64,
    records_skipped: i64,
    processing_ms: i64,
    logged_at: DateTime<Utc>,
}

impl From<ChunkLogRow> for ChunkLog {
    fn from(row: ChunkLogRow) -> Self {
        ChunkLog {
            log_id: row.log_id,
            batch_id: row.batch_id,
            chunk_number: row.chunk_number,
            records_processed: row.records_processed,
            records_created: row.records_created,
            records_updated: row.records_updated,
            records_skipped: row.records_skipped,
            processing_ms: row.processing_ms,
            logged_at: row.logged_at,
        }
    }
}

const BATCH_COLUMNS: &str = "batch_id, file_name, uploaded_by, total_records, valid_records, \
     invalid_records, processed_records, status, uploaded_at, processing_started, \
     processing_completed";

const STAGING_COLUMNS: &str = "staging_id, batch_id, row_number, product_id, product_name, \
     loan_start_date, withdrawn_date, pricing, min_loan, max_loan, min_ltv, max_ltv, \
     term_months, product_fee, cashback_min, cashback_max, status, validation_errors, \
     processed_at, uploaded_by, uploaded_at";

const PRODUCT_COLUMNS: &str = "product_id, product_name, loan_start_date, withdrawn_date, \
     pricing, min_loan, max_loan, min_ltv, max_ltv, term_months, product_fee, cashback_min, \
     cashback_max, is_active, created_by, created_at, updated_by, updated_at";

const AUDIT_COLUMNS: &str = "audit_id, batch_id, product_id, product_name, change_type, \
     old_pricing, new_pricing, old_withdrawn_date, new_withdrawn_date, changed_by, changed_at";

#[async_trait]
impl CatalogStore for PgStore {
    async fn create_batch(
        &self,
        file_name: &str,
        uploaded_by: &str,
        records: &[ProductRecord],
    ) -> StoreResult<Uuid> {
        let batch_id = Uuid::new_v4();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO upload_batches (batch_id, file_name, uploaded_by, total_records, status) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(batch_id)
        .bind(file_name)
        .bind(uploaded_by)
        .bind(records.len() as i64)
        .bind(BatchStatus::Uploaded.as_str())
        .execute(&mut *tx)
        .await?;

        for (index, record) in records.iter().enumerate() {
            sqlx::query(
                "INSERT INTO staging_products (batch_id, row_number, product_id, product_name, \
                 loan_start_date, withdrawn_date, pricing, min_loan, max_loan, min_ltv, max_ltv, \
                 term_months, product_fee, cashback_min, cashback_max, status, uploaded_by) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)",
            )
            .bind(batch_id)
            .bind(index as i64 + 2)
            .bind(&record.product_id)
            .bind(&record.product_name)
            .bind(record.loan_start_date)
            .bind(record.withdrawn_date)
            .bind(record.pricing)
            .bind(record.min_loan)
            .bind(record.max_loan)
            .bind(record.min_ltv)
            .bind(record.max_ltv)
            .bind(record.term_months)
            .bind(record.product_fee)
            .bind(record.cashback_min)
            .bind(record.cashback_max)
            .bind(RowStatus::Pending.as_str())
            .bind(uploaded_by)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(batch_id)
    }

    async fn get_batch(&self, batch_id: Uuid) -> StoreResult<UploadBatch> {
        let row = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM upload_batches WHERE batch_id = $1",
            BATCH_COLUMNS
        ))
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("batch", batch_id))?;

        row.try_into()
    }

    async fn list_batches(&self, limit: i64, offset: i64) -> StoreResult<(Vec<UploadBatch>, i64)> {
        let rows = sqlx::query_as::<_, BatchRow>(&format!(
            "SELECT {} FROM upload_batches ORDER BY uploaded_at DESC LIMIT $1 OFFSET $2",
            BATCH_COLUMNS
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM upload_batches")
            .fetch_one(&self.pool)
            .await?;

        let batches = rows
            .into_iter()
            .map(UploadBatch::try_from)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((batches, total))
    }

    async fn update_batch_status(&self, batch_id: Uuid, status: BatchStatus) -> StoreResult<()> {
        let result = sqlx::query("UPDATE upload_batches SET status = $1 WHERE batch_id = $2")
            .bind(status.as_str())
            .bind(batch_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("batch", batch_id));
        }
        Ok(())
    }

    async fn mark_processing_started(&self, batch_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE upload_batches SET status = $1, processing_started = NOW(), \
             processing_completed = NULL WHERE batch_id = $2",
        )
        .bind(BatchStatus::Processing.as_str())
        .bind(batch_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("batch", batch_id));
        }
        Ok(())
    }

    async fn mark_completed(&self, batch_id: Uuid) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE upload_batches SET status = $1, processing_completed = NOW() \
             WHERE batch_id = $2",
        )
        .bind(BatchStatus::Completed.as_str())
        .bind(batch_id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("batch", batch_id));
        }
        Ok(())
    }

    async fn staging_rows(&self, batch_id: Uuid) -> StoreResult<Vec<StagingRow>> {
        let rows = sqlx::query_as::<_, StagingRowDb>(&format!(
            "SELECT {} FROM staging_products WHERE batch_id = $1 ORDER BY staging_id",
            STAGING_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StagingRow::try_from).collect()
    }

    async fn apply_validation(
        &self,
        batch_id: Uuid,
        outcomes: &[RowOutcome],
    ) -> StoreResult<ValidationCounts> {
        let mut tx = self.pool.begin().await?;

        for outcome in outcomes {
            sqlx::query(
                "UPDATE staging_products SET status = $1, validation_errors = $2 \
                 WHERE staging_id = $3 AND batch_id = $4",
            )
            .bind(outcome.status.as_str())
            .bind(&outcome.error)
            .bind(outcome.staging_id)
            .bind(batch_id)
            .execute(&mut *tx)
            .await?;
        }

        let valid: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM staging_products WHERE batch_id = $1 AND status = 'VALID'",
        )
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;

        let invalid: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM staging_products WHERE batch_id = $1 AND status = 'INVALID'",
        )
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE upload_batches SET valid_records = $1, invalid_records = $2, status = $3 \
             WHERE batch_id = $4",
        )
        .bind(valid)
        .bind(invalid)
        .bind(BatchStatus::Validated.as_str())
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("batch", batch_id));
        }

        tx.commit().await?;
        Ok(ValidationCounts { valid, invalid })
    }

    async fn invalid_rows(&self, batch_id: Uuid) -> StoreResult<Vec<InvalidRow>> {
        let rows: Vec<(i64, String, Option<String>)> = sqlx::query_as(
            "SELECT row_number, product_id, validation_errors FROM staging_products \
             WHERE batch_id = $1 AND status = 'INVALID' ORDER BY row_number",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(row_number, product_id, errors)| InvalidRow {
                row_number,
                product_id,
                errors: errors
                    .as_deref()
                    .map(|e| e.split(';').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn valid_row_ids(&self, batch_id: Uuid) -> StoreResult<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT staging_id FROM staging_products \
             WHERE batch_id = $1 AND status = 'VALID' ORDER BY staging_id",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn staging_rows_by_ids(&self, staging_ids: &[i64]) -> StoreResult<Vec<StagingRow>> {
        let rows = sqlx::query_as::<_, StagingRowDb>(&format!(
            "SELECT {} FROM staging_products WHERE staging_id = ANY($1) ORDER BY staging_id",
            STAGING_COLUMNS
        ))
        .bind(staging_ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(StagingRow::try_from).collect()
    }

    async fn recount_processed(&self, batch_id: Uuid) -> StoreResult<i64> {
        let processed: i64 = sqlx::query_scalar(
            "UPDATE upload_batches SET processed_records = ( \
               SELECT COUNT(*) FROM staging_products \
               WHERE batch_id = $1 AND status = 'PROCESSED') \
             WHERE batch_id = $1 RETURNING processed_records",
        )
        .bind(batch_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("batch", batch_id))?;
        Ok(processed)
    }

    async fn reset_for_retry(&self, batch_id: Uuid) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE upload_batches SET status = $1, processed_records = 0, \
             processing_started = NULL, processing_completed = NULL WHERE batch_id = $2",
        )
        .bind(BatchStatus::Validated.as_str())
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("batch", batch_id));
        }

        sqlx::query(
            "UPDATE staging_products SET status = 'VALID', processed_at = NULL \
             WHERE batch_id = $1 AND status = 'PROCESSED'",
        )
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn products_by_ids(&self, product_ids: &[String]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE product_id = ANY($1)",
            PRODUCT_COLUMNS
        ))
        .bind(product_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn commit_chunk(&self, batch_id: Uuid, write: ChunkWrite) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        for record in &write.upserts {
            sqlx::query(
                "INSERT INTO products (product_id, product_name, loan_start_date, \
                 withdrawn_date, pricing, min_loan, max_loan, min_ltv, max_ltv, term_months, \
                 product_fee, cashback_min, cashback_max, is_active, created_by) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, TRUE, $14) \
                 ON CONFLICT (product_id) DO UPDATE SET \
                   product_name = EXCLUDED.product_name, \
                   loan_start_date = EXCLUDED.loan_start_date, \
                   withdrawn_date = EXCLUDED.withdrawn_date, \
                   pricing = EXCLUDED.pricing, \
                   min_loan = EXCLUDED.min_loan, \
                   max_loan = EXCLUDED.max_loan, \
                   min_ltv = EXCLUDED.min_ltv, \
                   max_ltv = EXCLUDED.max_ltv, \
                   term_months = EXCLUDED.term_months, \
                   product_fee = EXCLUDED.product_fee, \
                   cashback_min = EXCLUDED.cashback_min, \
                   cashback_max = EXCLUDED.cashback_max, \
                   updated_by = $14, \
                   updated_at = NOW()",
            )
            .bind(&record.product_id)
            .bind(&record.product_name)
            .bind(record.loan_start_date)
            .bind(record.withdrawn_date)
            .bind(record.pricing)
            .bind(record.min_loan)
            .bind(record.max_loan)
            .bind(record.min_ltv)
            .bind(record.max_ltv)
            .bind(record.term_months)
            .bind(record.product_fee)
            .bind(record.cashback_min)
            .bind(record.cashback_max)
            .bind(&write.actor)
            .execute(&mut *tx)
            .await?;
        }

        for audit in &write.audits {
            sqlx::query(
                "INSERT INTO product_audit (batch_id, product_id, product_name, change_type, \
                 old_pricing, new_pricing, old_withdrawn_date, new_withdrawn_date, changed_by) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
            )
            .bind(batch_id)
            .bind(&audit.product_id)
            .bind(&audit.product_name)
            .bind(audit.change_type.as_str())
            .bind(audit.old_pricing)
            .bind(audit.new_pricing)
            .bind(audit.old_withdrawn_date)
            .bind(audit.new_withdrawn_date)
            .bind(&write.actor)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            "UPDATE staging_products SET status = 'PROCESSED', processed_at = NOW() \
             WHERE staging_id = ANY($1)",
        )
        .bind(&write.processed_staging_ids)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO processing_log (batch_id, chunk_number, records_processed, \
             records_created, records_updated, records_skipped, processing_ms) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(batch_id)
        .bind(write.chunk_number)
        .bind(write.processed_staging_ids.len() as i64)
        .bind(write.stats.created)
        .bind(write.stats.updated)
        .bind(write.stats.skipped)
        .bind(write.stats.processing_ms)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn chunk_logs(&self, batch_id: Uuid) -> StoreResult<Vec<ChunkLog>> {
        let rows = sqlx::query_as::<_, ChunkLogRow>(
            "SELECT log_id, batch_id, chunk_number, records_processed, records_created, \
             records_updated, records_skipped, processing_ms, logged_at \
             FROM processing_log WHERE batch_id = $1 ORDER BY chunk_number",
        )
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ChunkLog::from).collect())
    }

    async fn audit_for_batch(&self, batch_id: Uuid) -> StoreResult<Vec<AuditEntry>> {
        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "SELECT {} FROM product_audit WHERE batch_id = $1 ORDER BY audit_id",
            AUDIT_COLUMNS
        ))
        .bind(batch_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEntry::try_from).collect()
    }

    async fn get_product(&self, product_id: &str) -> StoreResult<Product> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products WHERE product_id = $1",
            PRODUCT_COLUMNS
        ))
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found("product", product_id))?;

        Ok(row.into())
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, i64)> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {} FROM products \
             WHERE ($1::text IS NULL \
                    OR product_id ILIKE '%' || $1 || '%' \
                    OR product_name ILIKE '%' || $1 || '%') \
               AND ($2::boolean IS NULL OR is_active = $2) \
             ORDER BY product_name NULLS LAST, product_id \
             LIMIT $3 OFFSET $4",
            PRODUCT_COLUMNS
        ))
        .bind(&filter.search)
        .bind(filter.active_only)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM products \
             WHERE ($1::text IS NULL \
                    OR product_id ILIKE '%' || $1 || '%' \
                    OR product_name ILIKE '%' || $1 || '%') \
               AND ($2::boolean IS NULL OR is_active = $2)",
        )
        .bind(&filter.search)
        .bind(filter.active_only)
        .fetch_one(&self.pool)
        .await?;

        Ok((rows.into_iter().map(Product::from).collect(), total))
    }

    async fn product_history(
        &self,
        product_id: &str,
        months_back: i32,
    ) -> StoreResult<Vec<AuditEntry>> {
        let cutoff = Utc::now()
            .checked_sub_months(Months::new(months_back.max(0) as u32))
            .unwrap_or_else(Utc::now);

        let rows = sqlx::query_as::<_, AuditRow>(&format!(
            "SELECT {} FROM product_audit \
             WHERE product_id = $1 AND changed_at >= $2 \
             ORDER BY changed_at DESC, audit_id DESC",
            AUDIT_COLUMNS
        ))
        .bind(product_id)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AuditEntry::try_from).collect()
    }
}

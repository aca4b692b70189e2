//! In-memory catalog store
//!
//! Behaviorally matched to the Postgres store; backs the unit and
//! integration tests and any embedded usage that does not want a database.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{Months, Utc};
use uuid::Uuid;

use crate::models::{
    AuditEntry, BatchStatus, ChunkLog, ChunkWrite, InvalidRow, Product, ProductRecord, RowOutcome,
    RowStatus, StagingRow, UploadBatch, ValidationCounts,
};
use crate::store::{CatalogStore, ProductFilter, StoreError, StoreResult};

#[derive(Default)]
struct Inner {
    batches: HashMap<Uuid, UploadBatch>,
    staging: Vec<StagingRow>,
    products: BTreeMap<String, Product>,
    audit: Vec<AuditEntry>,
    chunk_logs: Vec<ChunkLog>,
    next_staging_id: i64,
    next_audit_id: i64,
    next_log_id: i64,
}

/// Mutex-guarded in-memory implementation of [`CatalogStore`]
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Internal("memory store mutex poisoned".to_string()))
    }
}

impl Inner {
    fn batch_mut(&mut self, batch_id: Uuid) -> StoreResult<&mut UploadBatch> {
        self.batches
            .get_mut(&batch_id)
            .ok_or_else(|| StoreError::not_found("batch", batch_id))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_batch(
        &self,
        file_name: &str,
        uploaded_by: &str,
        records: &[ProductRecord],
    ) -> StoreResult<Uuid> {
        let mut inner = self.lock()?;
        let batch_id = Uuid::new_v4();
        let now = Utc::now();

        inner.batches.insert(
            batch_id,
            UploadBatch {
                batch_id,
                file_name: file_name.to_string(),
                uploaded_by: uploaded_by.to_string(),
                total_records: records.len() as i64,
                valid_records: 0,
                invalid_records: 0,
                processed_records: 0,
                status: BatchStatus::Uploaded,
                uploaded_at: now,
                processing_started: None,
                processing_completed: None,
            },
        );

        for (index, record) in records.iter().enumerate() {
            inner.next_staging_id += 1;
            let staging_id = inner.next_staging_id;
            inner.staging.push(StagingRow {
                staging_id,
                batch_id,
                row_number: index as i64 + 2,
                record: record.clone(),
                status: RowStatus::Pending,
                validation_errors: None,
                processed_at: None,
                uploaded_by: uploaded_by.to_string(),
                uploaded_at: now,
            });
        }

        Ok(batch_id)
    }

    async fn get_batch(&self, batch_id: Uuid) -> StoreResult<UploadBatch> {
        let inner = self.lock()?;
        inner
            .batches
            .get(&batch_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("batch", batch_id))
    }

    async fn list_batches(&self, limit: i64, offset: i64) -> StoreResult<(Vec<UploadBatch>, i64)> {
        let inner = self.lock()?;
        let mut batches: Vec<UploadBatch> = inner.batches.values().cloned().collect();
        batches.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        let total = batches.len() as i64;
        let page = batches
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn update_batch_status(&self, batch_id: Uuid, status: BatchStatus) -> StoreResult<()> {
        let mut inner = self.lock()?;
        inner.batch_mut(batch_id)?.status = status;
        Ok(())
    }

    async fn mark_processing_started(&self, batch_id: Uuid) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let batch = inner.batch_mut(batch_id)?;
        batch.status = BatchStatus::Processing;
        batch.processing_started = Some(Utc::now());
        batch.processing_completed = None;
        Ok(())
    }

    async fn mark_completed(&self, batch_id: Uuid) -> StoreResult<()> {
        let mut inner = self.lock()?;
        let batch = inner.batch_mut(batch_id)?;
        batch.status = BatchStatus::Completed;
        batch.processing_completed = Some(Utc::now());
        Ok(())
    }

    async fn staging_rows(&self, batch_id: Uuid) -> StoreResult<Vec<StagingRow>> {
        let inner = self.lock()?;
        Ok(inner
            .staging
            .iter()
            .filter(|row| row.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn apply_validation(
        &self,
        batch_id: Uuid,
        outcomes: &[RowOutcome],
    ) -> StoreResult<ValidationCounts> {
        let mut inner = self.lock()?;

        let by_id: HashMap<i64, &RowOutcome> =
            outcomes.iter().map(|o| (o.staging_id, o)).collect();
        for row in inner.staging.iter_mut().filter(|r| r.batch_id == batch_id) {
            if let Some(outcome) = by_id.get(&row.staging_id) {
                row.status = outcome.status;
                row.validation_errors = outcome.error.clone();
            }
        }

        let valid = inner
            .staging
            .iter()
            .filter(|r| r.batch_id == batch_id && r.status == RowStatus::Valid)
            .count() as i64;
        let invalid = inner
            .staging
            .iter()
            .filter(|r| r.batch_id == batch_id && r.status == RowStatus::Invalid)
            .count() as i64;

        let batch = inner.batch_mut(batch_id)?;
        batch.valid_records = valid;
        batch.invalid_records = invalid;
        batch.status = BatchStatus::Validated;

        Ok(ValidationCounts { valid, invalid })
    }

    async fn invalid_rows(&self, batch_id: Uuid) -> StoreResult<Vec<InvalidRow>> {
        let inner = self.lock()?;
        Ok(inner
            .staging
            .iter()
            .filter(|r| r.batch_id == batch_id && r.status == RowStatus::Invalid)
            .map(|r| InvalidRow {
                row_number: r.row_number,
                product_id: r.record.product_id.clone(),
                errors: r
                    .validation_errors
                    .as_deref()
                    .map(|e| e.split(';').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default(),
            })
            .collect())
    }

    async fn valid_row_ids(&self, batch_id: Uuid) -> StoreResult<Vec<i64>> {
        let inner = self.lock()?;
        Ok(inner
            .staging
            .iter()
            .filter(|r| r.batch_id == batch_id && r.status == RowStatus::Valid)
            .map(|r| r.staging_id)
            .collect())
    }

    async fn staging_rows_by_ids(&self, staging_ids: &[i64]) -> StoreResult<Vec<StagingRow>> {
        let inner = self.lock()?;
        let mut rows: Vec<StagingRow> = inner
            .staging
            .iter()
            .filter(|r| staging_ids.contains(&r.staging_id))
            .cloned()
            .collect();
        rows.sort_by_key(|r| r.staging_id);
        Ok(rows)
    }

    async fn recount_processed(&self, batch_id: Uuid) -> StoreResult<i64> {
        let mut inner = self.lock()?;
        let processed = inner
            .staging
            .iter()
            .filter(|r| r.batch_id == batch_id && r.status == RowStatus::Processed)
            .count() as i64;
        inner.batch_mut(batch_id)?.processed_records = processed;
        Ok(processed)
    }

    async fn reset_for_retry(&self, batch_id: Uuid) -> StoreResult<()> {
        let mut inner = self.lock()?;
        {
            let batch = inner.batch_mut(batch_id)?;
            batch.status = BatchStatus::Validated;
            batch.processed_records = 0;
            batch.processing_started = None;
            batch.processing_completed = None;
        }
        for row in inner.staging.iter_mut().filter(|r| r.batch_id == batch_id) {
            if row.status == RowStatus::Processed {
                row.status = RowStatus::Valid;
                row.processed_at = None;
            }
        }
        Ok(())
    }

    async fn products_by_ids(&self, product_ids: &[String]) -> StoreResult<Vec<Product>> {
        let inner = self.lock()?;
        Ok(product_ids
            .iter()
            .filter_map(|id| inner.products.get(id).cloned())
            .collect())
    }

    async fn commit_chunk(&self, batch_id: Uuid, write: ChunkWrite) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if !inner.batches.contains_key(&batch_id) {
            return Err(StoreError::not_found("batch", batch_id));
        }
        let now = Utc::now();

        for record in write.upserts {
            match inner.products.get_mut(&record.product_id) {
                Some(existing) => {
                    existing.record = record;
                    existing.updated_by = Some(write.actor.clone());
                    existing.updated_at = Some(now);
                }
                None => {
                    inner.products.insert(
                        record.product_id.clone(),
                        Product {
                            record,
                            is_active: true,
                            created_by: write.actor.clone(),
                            created_at: now,
                            updated_by: None,
                            updated_at: None,
                        },
                    );
                }
            }
        }

        for audit in write.audits {
            inner.next_audit_id += 1;
            let audit_id = inner.next_audit_id;
            inner.audit.push(AuditEntry {
                audit_id,
                batch_id,
                product_id: audit.product_id,
                product_name: audit.product_name,
                change_type: audit.change_type,
                old_pricing: audit.old_pricing,
                new_pricing: audit.new_pricing,
                old_withdrawn_date: audit.old_withdrawn_date,
                new_withdrawn_date: audit.new_withdrawn_date,
                changed_by: write.actor.clone(),
                changed_at: now,
            });
        }

        for row in inner
            .staging
            .iter_mut()
            .filter(|r| write.processed_staging_ids.contains(&r.staging_id))
        {
            row.status = RowStatus::Processed;
            row.processed_at = Some(now);
        }

        inner.next_log_id += 1;
        let log_id = inner.next_log_id;
        inner.chunk_logs.push(ChunkLog {
            log_id,
            batch_id,
            chunk_number: write.chunk_number,
            records_processed: write.processed_staging_ids.len() as i64,
            records_created: write.stats.created,
            records_updated: write.stats.updated,
            records_skipped: write.stats.skipped,
            processing_ms: write.stats.processing_ms,
            logged_at: now,
        });

        Ok(())
    }

    async fn chunk_logs(&self, batch_id: Uuid) -> StoreResult<Vec<ChunkLog>> {
        let inner = self.lock()?;
        let mut logs: Vec<ChunkLog> = inner
            .chunk_logs
            .iter()
            .filter(|l| l.batch_id == batch_id)
            .cloned()
            .collect();
        logs.sort_by_key(|l| l.chunk_number);
        Ok(logs)
    }

    async fn audit_for_batch(&self, batch_id: Uuid) -> StoreResult<Vec<AuditEntry>> {
        let inner = self.lock()?;
        Ok(inner
            .audit
            .iter()
            .filter(|a| a.batch_id == batch_id)
            .cloned()
            .collect())
    }

    async fn get_product(&self, product_id: &str) -> StoreResult<Product> {
        let inner = self.lock()?;
        inner
            .products
            .get(product_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("product", product_id))
    }

    async fn list_products(&self, filter: &ProductFilter) -> StoreResult<(Vec<Product>, i64)> {
        let inner = self.lock()?;
        let search = filter.search.as_deref().map(str::to_lowercase);
        let mut products: Vec<Product> = inner
            .products
            .values()
            .filter(|p| {
                if let Some(active) = filter.active_only {
                    if p.is_active != active {
                        return false;
                    }
                }
                if let Some(ref term) = search {
                    let in_id = p.record.product_id.to_lowercase().contains(term);
                    let in_name = p
                        .record
                        .product_name
                        .as_deref()
                        .map(|n| n.to_lowercase().contains(term))
                        .unwrap_or(false);
                    if !in_id && !in_name {
                        return false;
                    }
                }
                true
            })
            .cloned()
            .collect();
        let total = products.len() as i64;
        products.sort_by(|a, b| {
            (a.record.product_name.as_deref(), &a.record.product_id)
                .cmp(&(b.record.product_name.as_deref(), &b.record.product_id))
        });
        let page = products
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .collect();
        Ok((page, total))
    }

    async fn product_history(
        &self,
        product_id: &str,
        months_back: i32,
    ) -> StoreResult<Vec<AuditEntry>> {
        let inner = self.lock()?;
        let cutoff = Utc::now()
            .checked_sub_months(Months::new(months_back.max(0) as u32))
            .unwrap_or_else(Utc::now);
        let mut history: Vec<AuditEntry> = inner
            .audit
            .iter()
            .filter(|a| a.product_id == product_id && a.changed_at >= cutoff)
            .cloned()
            .collect();
        history.sort_by(|a, b| b.changed_at.cmp(&a.changed_at).then(b.audit_id.cmp(&a.audit_id)));
        Ok(history)
    }
}

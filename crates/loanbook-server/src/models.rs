//! Domain models for the loan product catalog
//!
//! Covers the staged record shape, batch lifecycle, canonical products,
//! and the audit/chunk-log rows written during reconciliation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length of a product identifier.
pub const MAX_PRODUCT_ID_LEN: usize = 50;

/// Lifecycle status of an upload batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    Uploaded,
    Validating,
    Validated,
    Processing,
    Completed,
    Failed,
}

impl BatchStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Uploaded => "UPLOADED",
            BatchStatus::Validating => "VALIDATING",
            BatchStatus::Validated => "VALIDATED",
            BatchStatus::Processing => "PROCESSING",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
        }
    }

    /// Whether an operator may cancel a batch in this state.
    pub fn cancellable(self) -> bool {
        matches!(
            self,
            BatchStatus::Validating | BatchStatus::Validated | BatchStatus::Processing
        )
    }

    /// Whether an operator may retry a batch in this state.
    pub fn retryable(self) -> bool {
        matches!(self, BatchStatus::Failed)
    }
}

impl std::str::FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UPLOADED" => Ok(BatchStatus::Uploaded),
            "VALIDATING" => Ok(BatchStatus::Validating),
            "VALIDATED" => Ok(BatchStatus::Validated),
            "PROCESSING" => Ok(BatchStatus::Processing),
            "COMPLETED" => Ok(BatchStatus::Completed),
            "FAILED" => Ok(BatchStatus::Failed),
            other => Err(format!("unknown batch status: {}", other)),
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation state of a single staging row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RowStatus {
    Pending,
    Valid,
    Invalid,
    Processed,
}

impl RowStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RowStatus::Pending => "PENDING",
            RowStatus::Valid => "VALID",
            RowStatus::Invalid => "INVALID",
            RowStatus::Processed => "PROCESSED",
        }
    }
}

impl std::str::FromStr for RowStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(RowStatus::Pending),
            "VALID" => Ok(RowStatus::Valid),
            "INVALID" => Ok(RowStatus::Invalid),
            "PROCESSED" => Ok(RowStatus::Processed),
            other => Err(format!("unknown row status: {}", other)),
        }
    }
}

impl std::fmt::Display for RowStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of change applied to a canonical product
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    Insert,
    Update,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Insert => "INSERT",
            ChangeType::Update => "UPDATE",
        }
    }
}

impl std::str::FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INSERT" => Ok(ChangeType::Insert),
            "UPDATE" => Ok(ChangeType::Update),
            other => Err(format!("unknown change type: {}", other)),
        }
    }
}

/// A parsed loan product record
///
/// Every attribute other than `product_id` is independently nullable.
/// Decimal fields are rounded to 2 decimal places at parse time, so all
/// downstream comparisons see already-rounded values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub product_id: String,
    pub product_name: Option<String>,
    pub loan_start_date: Option<NaiveDate>,
    pub withdrawn_date: Option<NaiveDate>,
    pub pricing: Option<f64>,
    pub min_loan: Option<f64>,
    pub max_loan: Option<f64>,
    pub min_ltv: Option<f64>,
    pub max_ltv: Option<f64>,
    pub term_months: Option<i64>,
    pub product_fee: Option<f64>,
    pub cashback_min: Option<f64>,
    pub cashback_max: Option<f64>,
}

/// One staged input row, owned by exactly one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagingRow {
    pub staging_id: i64,
    pub batch_id: Uuid,
    /// File row number; the header occupies row 1, so the first data row
    /// is row 2. Matches the numbering used in parse rejection messages.
    pub row_number: i64,
    #[serde(flatten)]
    pub record: ProductRecord,
    pub status: RowStatus,
    pub validation_errors: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
    pub uploaded_by: String,
    pub uploaded_at: DateTime<Utc>,
}

/// One upload's end-to-end processing unit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadBatch {
    pub batch_id: Uuid,
    pub file_name: String,
    pub uploaded_by: String,
    pub total_records: i64,
    pub valid_records: i64,
    pub invalid_records: i64,
    pub processed_records: i64,
    pub status: BatchStatus,
    pub uploaded_at: DateTime<Utc>,
    pub processing_started: Option<DateTime<Utc>>,
    pub processing_completed: Option<DateTime<Utc>>,
}

/// Canonical product state, keyed by product identifier
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    #[serde(flatten)]
    pub record: ProductRecord,
    pub is_active: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_by: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Immutable record of one insert or update to a canonical product
///
/// References the product identifier by value; the batch id records which
/// upload produced the change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub audit_id: i64,
    pub batch_id: Uuid,
    pub product_id: String,
    pub product_name: Option<String>,
    pub change_type: ChangeType,
    pub old_pricing: Option<f64>,
    pub new_pricing: Option<f64>,
    pub old_withdrawn_date: Option<NaiveDate>,
    pub new_withdrawn_date: Option<NaiveDate>,
    pub changed_by: String,
    pub changed_at: DateTime<Utc>,
}

/// Audit entry pending insertion; batch id, actor, and timestamp are
/// supplied by the store when the chunk commits.
#[derive(Debug, Clone)]
pub struct NewAuditEntry {
    pub product_id: String,
    pub product_name: Option<String>,
    pub change_type: ChangeType,
    pub old_pricing: Option<f64>,
    pub new_pricing: Option<f64>,
    pub old_withdrawn_date: Option<NaiveDate>,
    pub new_withdrawn_date: Option<NaiveDate>,
}

/// Per-chunk reconciliation counts
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ChunkStats {
    pub created: i64,
    pub updated: i64,
    pub skipped: i64,
    pub processing_ms: i64,
}

/// Persisted log row for one processed chunk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkLog {
    pub log_id: i64,
    pub batch_id: Uuid,
    pub chunk_number: i64,
    pub records_processed: i64,
    pub records_created: i64,
    pub records_updated: i64,
    pub records_skipped: i64,
    pub processing_ms: i64,
    pub logged_at: DateTime<Utc>,
}

/// Validation outcome for one staging row
#[derive(Debug, Clone)]
pub struct RowOutcome {
    pub staging_id: i64,
    pub status: RowStatus,
    pub error: Option<String>,
}

/// Valid/invalid totals recomputed after validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationCounts {
    pub valid: i64,
    pub invalid: i64,
}

/// An invalid staging row as reported to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvalidRow {
    pub row_number: i64,
    pub product_id: String,
    pub errors: Vec<String>,
}

/// The atomic unit of work for one reconciliation chunk
///
/// Everything here commits together or not at all: product upserts, audit
/// entries, staging rows flipped to PROCESSED, and the chunk log row.
#[derive(Debug, Clone)]
pub struct ChunkWrite {
    pub chunk_number: i64,
    pub actor: String,
    pub upserts: Vec<ProductRecord>,
    pub audits: Vec<NewAuditEntry>,
    pub processed_staging_ids: Vec<i64>,
    pub stats: ChunkStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_batch_status_round_trip() {
        for status in [
            BatchStatus::Uploaded,
            BatchStatus::Validating,
            BatchStatus::Validated,
            BatchStatus::Processing,
            BatchStatus::Completed,
            BatchStatus::Failed,
        ] {
            assert_eq!(BatchStatus::from_str(status.as_str()).unwrap(), status);
        }
        assert!(BatchStatus::from_str("DONE").is_err());
    }

    #[test]
    fn test_row_status_round_trip() {
        for status in [
            RowStatus::Pending,
            RowStatus::Valid,
            RowStatus::Invalid,
            RowStatus::Processed,
        ] {
            assert_eq!(RowStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn test_cancellable_states() {
        assert!(BatchStatus::Validating.cancellable());
        assert!(BatchStatus::Validated.cancellable());
        assert!(BatchStatus::Processing.cancellable());
        assert!(!BatchStatus::Uploaded.cancellable());
        assert!(!BatchStatus::Completed.cancellable());
        assert!(!BatchStatus::Failed.cancellable());
    }

    #[test]
    fn test_retryable_states() {
        assert!(BatchStatus::Failed.retryable());
        assert!(!BatchStatus::Completed.retryable());
        assert!(!BatchStatus::Processing.retryable());
    }
}

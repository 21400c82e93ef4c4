//! Applying one queued operation to the stores.
//!
//! Every rule here reads the *current* store state at apply time: rows are
//! resolved after any earlier insert/delete has shifted them, and cell
//! re-validation uses the variable as written, not the enqueue-time payload.

use crate::gap_fill::GapFiller;
use chrono::Utc;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use varview_core::{
    OperationId, OperationKind, PendingOperation, Timestamp, Variable, VariableChanges,
    VarviewResult,
};
use varview_storage::SharedStores;

// ============================================================================
// OUTCOMES
// ============================================================================

/// Why an operation was skipped without touching the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// CREATE addressed a row that already has a variable.
    AlreadyExists,
    /// UPDATE/DELETE addressed a row with no variable.
    Missing,
}

/// Result of one drain pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DrainOutcome {
    Applied,
    Skipped { reason: SkipReason },
    Failed { error: String },
}

/// One entry of the drain history: the operation as enqueued and what became
/// of it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrainRecord {
    pub operation_id: OperationId,
    pub kind: OperationKind,
    pub row: usize,
    pub operation: PendingOperation,
    pub outcome: DrainOutcome,
    pub finished_at: Timestamp,
}

impl DrainRecord {
    pub(crate) fn new(
        operation_id: OperationId,
        operation: PendingOperation,
        outcome: DrainOutcome,
    ) -> Self {
        Self {
            operation_id,
            kind: operation.kind(),
            row: operation.row(),
            operation,
            outcome,
            finished_at: Utc::now(),
        }
    }
}

// ============================================================================
// METRICS
// ============================================================================

/// Counters kept by the drain worker.
#[derive(Debug, Default)]
pub struct DrainMetrics {
    pub applied: AtomicU64,
    pub skipped: AtomicU64,
    pub failed: AtomicU64,
    pub drain_passes: AtomicU64,
}

impl DrainMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record(&self, outcome: &DrainOutcome) {
        self.drain_passes.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            DrainOutcome::Applied => &self.applied,
            DrainOutcome::Skipped { .. } => &self.skipped,
            DrainOutcome::Failed { .. } => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DrainMetricsSnapshot {
        DrainMetricsSnapshot {
            applied: self.applied.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            drain_passes: self.drain_passes.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`DrainMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DrainMetricsSnapshot {
    pub applied: u64,
    pub skipped: u64,
    pub failed: u64,
    pub drain_passes: u64,
}

// ============================================================================
// APPLY
// ============================================================================

/// Apply one operation. The caller holds the stores' write gate.
pub(crate) async fn apply_operation(
    stores: &SharedStores,
    operation: &PendingOperation,
) -> VarviewResult<DrainOutcome> {
    match operation {
        PendingOperation::CreateVariable { row, data } => create_variable(stores, *row, data).await,
        PendingOperation::UpdateVariable { row, changes } => {
            update_variable(stores, *row, changes).await
        }
        PendingOperation::InsertVariable { row } => insert_variable(stores, *row).await,
        PendingOperation::DeleteVariable { row } => delete_variable(stores, *row).await,
    }
}

async fn create_variable(
    stores: &SharedStores,
    row: usize,
    data: &VariableChanges,
) -> VarviewResult<DrainOutcome> {
    let count = stores.variables().count().await?;
    if row < count {
        tracing::warn!(row, "CREATE_VARIABLE skipped: variable already exists");
        return Ok(DrainOutcome::Skipped {
            reason: SkipReason::AlreadyExists,
        });
    }
    if GapFiller::needs_fill(row, count) {
        GapFiller::new(stores).ensure_up_to(row).await?;
    }

    let mut data = data.clone();
    if data.enforce_string_measure(None) {
        tracing::debug!(row, "Forced nominal measure on STRING variable");
    }
    if data.enforce_string_missing(None) {
        tracing::warn!(row, "Dropped missing-value range from STRING variable");
    }
    let created = stores.variables().add_variable(row, &data).await?;
    stores.data().ensure_columns(row).await?;
    if data.touches_type_or_width() {
        revalidate_column(stores, &created).await?;
    }
    Ok(DrainOutcome::Applied)
}

async fn update_variable(
    stores: &SharedStores,
    row: usize,
    changes: &VariableChanges,
) -> VarviewResult<DrainOutcome> {
    let Some(current) = stores.variables().variable_at(row).await? else {
        tracing::warn!(row, "UPDATE_VARIABLE skipped: no variable at row");
        return Ok(DrainOutcome::Skipped {
            reason: SkipReason::Missing,
        });
    };

    let mut changes = changes.clone();
    if changes.enforce_string_measure(Some(&current)) {
        tracing::debug!(row, "Forced nominal measure on STRING variable");
    }
    if changes.enforce_string_missing(Some(&current)) {
        tracing::warn!(row, "Dropped missing-value range from STRING variable");
    }
    let updated = stores.variables().update_multiple_fields(row, &changes).await?;
    stores.data().ensure_columns(row).await?;
    if changes.touches_type_or_width() {
        revalidate_column(stores, &updated).await?;
    }
    Ok(DrainOutcome::Applied)
}

async fn insert_variable(stores: &SharedStores, row: usize) -> VarviewResult<DrainOutcome> {
    let count = stores.variables().count().await?;
    if GapFiller::needs_fill(row, count) {
        GapFiller::new(stores).ensure_up_to(row).await?;
    }
    stores.variables().insert_variable_at(row).await?;
    stores.data().add_columns(&[row]).await?;
    Ok(DrainOutcome::Applied)
}

async fn delete_variable(stores: &SharedStores, row: usize) -> VarviewResult<DrainOutcome> {
    let count = stores.variables().count().await?;
    if row >= count {
        tracing::warn!(row, "DELETE_VARIABLE skipped: no variable at row");
        return Ok(DrainOutcome::Skipped {
            reason: SkipReason::Missing,
        });
    }
    stores.variables().delete_variable(row).await?;
    if row < stores.data().column_count().await? {
        stores.data().delete_column(row).await?;
    }
    Ok(DrainOutcome::Applied)
}

/// Coerce a column against the variable as stored (read-after-write).
async fn revalidate_column(stores: &SharedStores, variable: &Variable) -> VarviewResult<()> {
    let changed = stores
        .data()
        .validate_variable_data(variable.column_index, variable.var_type, variable.width)
        .await?;
    if changed > 0 {
        tracing::debug!(
            column = variable.column_index,
            var_type = %variable.var_type,
            width = variable.width,
            changed,
            "Coerced column cells"
        );
    }
    Ok(())
}

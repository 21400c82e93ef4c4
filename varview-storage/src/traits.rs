//! Store traits consumed by the operation queue.
//!
//! The queue depends only on these methods, so any backend (a UI state
//! container, a remote document, the in-memory stores in this crate) can sit
//! behind them.
//!
//! # Index conventions
//!
//! All indices are variable `column_index` values. The `ensure_*` methods take
//! an inclusive upper index: `ensure_columns(4)` guarantees columns `0..=4`.

use async_trait::async_trait;
use varview_core::{DataMatrix, Variable, VariableChanges, VariableType, VarviewResult};

/// Authoritative variable metadata.
///
/// Variables are dense: the variable at position `i` has `column_index == i`,
/// and a variable exists at `i` exactly when `i < count()`.
#[async_trait]
pub trait VariableStore: Send + Sync {
    /// All variables in `column_index` order.
    async fn variables(&self) -> VarviewResult<Vec<Variable>>;

    /// Number of variables.
    async fn count(&self) -> VarviewResult<usize>;

    /// The variable at `index`, if any.
    async fn variable_at(&self, index: usize) -> VarviewResult<Option<Variable>> {
        Ok(self.variables().await?.into_iter().nth(index))
    }

    /// Create a variable at `column_index` from defaults overlaid with `partial`.
    ///
    /// # Errors
    ///
    /// - `AlreadyExists` if a variable is already at `column_index`
    /// - `OutOfBounds` if `column_index` is past the end (gap-fill first)
    async fn add_variable(
        &self,
        column_index: usize,
        partial: &VariableChanges,
    ) -> VarviewResult<Variable>;

    /// Insert a blank variable at `index`, shifting every variable at or after
    /// `index` up by one.
    async fn insert_variable_at(&self, index: usize) -> VarviewResult<Variable>;

    /// Apply `changes` to the variable at `index` and return the stored result.
    async fn update_multiple_fields(
        &self,
        index: usize,
        changes: &VariableChanges,
    ) -> VarviewResult<Variable>;

    /// Remove the variable at `index`, shifting higher indices down by one.
    async fn delete_variable(&self, index: usize) -> VarviewResult<Variable>;

    /// Materialise default variables for every missing index `0..=upto_index`.
    /// Returns how many were created.
    async fn ensure_complete_variables(&self, upto_index: usize) -> VarviewResult<usize>;
}

/// Authoritative raw data matrix.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// A copy of the current matrix.
    async fn matrix(&self) -> VarviewResult<DataMatrix>;

    /// Current column count.
    async fn column_count(&self) -> VarviewResult<usize>;

    /// Insert a blank column at each index, applied in ascending order.
    async fn add_columns(&self, indices: &[usize]) -> VarviewResult<()>;

    /// Remove the column at `index`, shifting later columns left.
    async fn delete_column(&self, index: usize) -> VarviewResult<()>;

    /// Grow to at least `upto_index + 1` columns without touching existing cells.
    async fn ensure_columns(&self, upto_index: usize) -> VarviewResult<()>;

    /// Coerce the cells of column `index` to `var_type` and `width`.
    /// Returns the number of cells that changed.
    async fn validate_variable_data(
        &self,
        index: usize,
        var_type: VariableType,
        width: u32,
    ) -> VarviewResult<usize>;
}

//! Gap filling for sparse creation.
//!
//! When an edit targets a row past the end of the variable list, every
//! position before it is materialised with defaults in both stores first, so
//! the cross-store invariant holds for the whole prefix.

use varview_core::VarviewResult;
use varview_storage::{DataStore, SharedStores, VariableStore};

/// Materialises default entries below a target index.
///
/// Callers mutating shared state must hold the stores' write gate.
pub struct GapFiller<'a> {
    variables: &'a dyn VariableStore,
    data: &'a dyn DataStore,
}

/// What one fill did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GapFill {
    pub variables_created: usize,
}

impl<'a> GapFiller<'a> {
    pub fn new(stores: &'a SharedStores) -> Self {
        Self {
            variables: stores.variables().as_ref(),
            data: stores.data().as_ref(),
        }
    }

    /// Whether creating at `row` with `count` existing variables leaves a gap.
    pub fn needs_fill(row: usize, count: usize) -> bool {
        row > count
    }

    /// Guarantee default entries at every position `0..index` in both stores.
    ///
    /// Existing entries are untouched; repeated or smaller indices are no-ops.
    pub async fn ensure_up_to(&self, index: usize) -> VarviewResult<GapFill> {
        let Some(last) = index.checked_sub(1) else {
            return Ok(GapFill::default());
        };
        let variables_created = self.variables.ensure_complete_variables(last).await?;
        self.data.ensure_columns(last).await?;
        if variables_created > 0 {
            tracing::debug!(upto = last, variables_created, "Gap-filled default variables");
        }
        Ok(GapFill { variables_created })
    }
}

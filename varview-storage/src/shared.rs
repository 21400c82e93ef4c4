//! Shared store handles with a settled-read gate.
//!
//! The drain worker holds the write half of the gate for the whole of one
//! operation (fill-then-create, shift-then-insert), so a reader that goes
//! through [`SharedStores`] never observes a half-applied operation.

use crate::memory::{InMemoryDataStore, InMemoryVariableStore};
use crate::traits::{DataStore, VariableStore};
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock, RwLockReadGuard};
use varview_core::{DataMatrix, ValidationError, Variable, VarviewResult};

/// The two injected stores plus the gate that serialises writers against
/// readers.
#[derive(Clone)]
pub struct SharedStores {
    variables: Arc<dyn VariableStore>,
    data: Arc<dyn DataStore>,
    gate: Arc<RwLock<()>>,
}

impl std::fmt::Debug for SharedStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedStores").finish_non_exhaustive()
    }
}

impl SharedStores {
    pub fn new(variables: Arc<dyn VariableStore>, data: Arc<dyn DataStore>) -> Self {
        Self {
            variables,
            data,
            gate: Arc::new(RwLock::new(())),
        }
    }

    /// Fresh empty in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryVariableStore::new()),
            Arc::new(InMemoryDataStore::new()),
        )
    }

    /// Raw variable store. Writers must hold [`SharedStores::lock_for_write`].
    pub fn variables(&self) -> &Arc<dyn VariableStore> {
        &self.variables
    }

    /// Raw data store. Writers must hold [`SharedStores::lock_for_write`].
    pub fn data(&self) -> &Arc<dyn DataStore> {
        &self.data
    }

    /// Exclude readers until the returned guard is dropped.
    pub async fn lock_for_write(&self) -> OwnedRwLockWriteGuard<()> {
        Arc::clone(&self.gate).write_owned().await
    }

    /// Hold off writers until the returned guard is dropped. Reads made through
    /// the raw stores meanwhile see settled state.
    pub async fn lock_for_read(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    /// Settled read of one variable.
    pub async fn variable_at(&self, index: usize) -> VarviewResult<Option<Variable>> {
        let _read = self.gate.read().await;
        self.variables.variable_at(index).await
    }

    /// Settled read of the variable count.
    pub async fn variable_count(&self) -> VarviewResult<usize> {
        let _read = self.gate.read().await;
        self.variables.count().await
    }

    /// Settled read of both stores at once.
    pub async fn snapshot(&self) -> VarviewResult<StoreSnapshot> {
        let _read = self.gate.read().await;
        let variables = self.variables.variables().await?;
        let matrix = self.data.matrix().await?;
        Ok(StoreSnapshot { variables, matrix })
    }
}

/// Both stores as seen between two drain passes.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub variables: Vec<Variable>,
    pub matrix: DataMatrix,
}

impl StoreSnapshot {
    /// Check the cross-store invariants: variables are dense and numbered by
    /// position, and the matrix has a column for every variable.
    pub fn check_alignment(&self) -> Result<(), ValidationError> {
        if let Some((position, variable)) = self
            .variables
            .iter()
            .enumerate()
            .find(|(position, v)| v.column_index != *position)
        {
            return Err(ValidationError::ConstraintViolation {
                constraint: "variables.column_index".to_string(),
                reason: format!(
                    "variable at position {} has column_index {}",
                    position, variable.column_index
                ),
            });
        }
        if self.matrix.column_count() < self.variables.len() {
            return Err(ValidationError::ConstraintViolation {
                constraint: "matrix.column_count".to_string(),
                reason: format!(
                    "{} columns for {} variables",
                    self.matrix.column_count(),
                    self.variables.len()
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_snapshot_of_empty_stores_is_aligned() {
        let stores = SharedStores::in_memory();
        let snapshot = stores.snapshot().await.unwrap();
        assert!(snapshot.variables.is_empty());
        assert!(snapshot.check_alignment().is_ok());
    }

    #[tokio::test]
    async fn test_check_alignment_detects_missing_column() {
        let stores = SharedStores::new(
            Arc::new(InMemoryVariableStore::with_defaults(3)),
            Arc::new(InMemoryDataStore::new()),
        );
        let snapshot = stores.snapshot().await.unwrap();
        assert!(matches!(
            snapshot.check_alignment(),
            Err(ValidationError::ConstraintViolation { ref constraint, .. })
                if constraint == "matrix.column_count"
        ));
    }

    #[tokio::test]
    async fn test_readers_wait_for_writer() {
        let stores = SharedStores::in_memory();
        let guard = stores.lock_for_write().await;
        stores.variables().ensure_complete_variables(1).await.unwrap();

        let reader = stores.clone();
        let pending = tokio::spawn(async move { reader.variable_count().await });
        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        stores.data().ensure_columns(1).await.unwrap();
        drop(guard);
        assert_eq!(pending.await.unwrap().unwrap(), 2);
    }
}

//! In-memory store implementations.
//!
//! Both stores keep their state behind an `RwLock` shared through an `Arc`,
//! so clones observe the same data. They back the tests and any embedding
//! without an external store.

use crate::traits::{DataStore, VariableStore};
use async_trait::async_trait;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use varview_core::{
    default_name, DataMatrix, StorageError, StoreKind, Variable, VariableChanges, VariableType,
    VarviewError, VarviewResult,
};

// ============================================================================
// VARIABLE STORE
// ============================================================================

/// In-memory variable store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryVariableStore {
    variables: Arc<RwLock<Vec<Variable>>>,
}

impl InMemoryVariableStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `variables`, renumbered by position.
    pub fn with_variables(mut variables: Vec<Variable>) -> Self {
        renumber(&mut variables, 0);
        Self {
            variables: Arc::new(RwLock::new(variables)),
        }
    }

    /// Create a store with `count` default variables.
    pub fn with_defaults(count: usize) -> Self {
        Self::with_variables((0..count).map(Variable::default_at).collect())
    }

    fn read(&self) -> VarviewResult<RwLockReadGuard<'_, Vec<Variable>>> {
        self.variables
            .read()
            .map_err(|_| VarviewError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> VarviewResult<RwLockWriteGuard<'_, Vec<Variable>>> {
        self.variables
            .write()
            .map_err(|_| VarviewError::Storage(StorageError::LockPoisoned))
    }
}

fn renumber(variables: &mut [Variable], from: usize) {
    for (index, variable) in variables.iter_mut().enumerate().skip(from) {
        variable.column_index = index;
    }
}

/// A blank variable at `index` whose generated name is not already taken.
fn fresh_variable(variables: &[Variable], index: usize) -> Variable {
    let mut variable = Variable::default_at(index);
    let mut ordinal = index;
    while variables.iter().any(|v| v.name == variable.name) {
        ordinal += 1;
        variable.name = default_name(ordinal);
    }
    variable
}

fn not_found(store: StoreKind, index: usize) -> VarviewError {
    VarviewError::Storage(StorageError::NotFound { store, index })
}

fn out_of_bounds(store: StoreKind, index: usize, len: usize) -> VarviewError {
    VarviewError::Storage(StorageError::OutOfBounds { store, index, len })
}

#[async_trait]
impl VariableStore for InMemoryVariableStore {
    async fn variables(&self) -> VarviewResult<Vec<Variable>> {
        Ok(self.read()?.clone())
    }

    async fn count(&self) -> VarviewResult<usize> {
        Ok(self.read()?.len())
    }

    async fn variable_at(&self, index: usize) -> VarviewResult<Option<Variable>> {
        Ok(self.read()?.get(index).cloned())
    }

    async fn add_variable(
        &self,
        column_index: usize,
        partial: &VariableChanges,
    ) -> VarviewResult<Variable> {
        let mut variables = self.write()?;
        let len = variables.len();
        if column_index < len {
            return Err(VarviewError::Storage(StorageError::AlreadyExists {
                store: StoreKind::Variables,
                index: column_index,
            }));
        }
        if column_index > len {
            return Err(out_of_bounds(StoreKind::Variables, column_index, len));
        }
        let mut variable = fresh_variable(&variables, column_index);
        variable.apply(partial);
        variables.push(variable.clone());
        Ok(variable)
    }

    async fn insert_variable_at(&self, index: usize) -> VarviewResult<Variable> {
        let mut variables = self.write()?;
        let len = variables.len();
        if index > len {
            return Err(out_of_bounds(StoreKind::Variables, index, len));
        }
        let variable = fresh_variable(&variables, index);
        variables.insert(index, variable.clone());
        renumber(&mut variables, index + 1);
        Ok(variable)
    }

    async fn update_multiple_fields(
        &self,
        index: usize,
        changes: &VariableChanges,
    ) -> VarviewResult<Variable> {
        let mut variables = self.write()?;
        let variable = variables
            .get_mut(index)
            .ok_or_else(|| not_found(StoreKind::Variables, index))?;
        variable.apply(changes);
        Ok(variable.clone())
    }

    async fn delete_variable(&self, index: usize) -> VarviewResult<Variable> {
        let mut variables = self.write()?;
        if index >= variables.len() {
            return Err(not_found(StoreKind::Variables, index));
        }
        let removed = variables.remove(index);
        renumber(&mut variables, index);
        Ok(removed)
    }

    async fn ensure_complete_variables(&self, upto_index: usize) -> VarviewResult<usize> {
        let mut variables = self.write()?;
        let before = variables.len();
        for index in before..=upto_index {
            let variable = fresh_variable(&variables, index);
            variables.push(variable);
        }
        Ok(variables.len() - before)
    }
}

// ============================================================================
// DATA STORE
// ============================================================================

/// In-memory data store.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDataStore {
    matrix: Arc<RwLock<DataMatrix>>,
}

impl InMemoryDataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding `matrix`.
    pub fn with_matrix(matrix: DataMatrix) -> Self {
        Self {
            matrix: Arc::new(RwLock::new(matrix)),
        }
    }

    fn read(&self) -> VarviewResult<RwLockReadGuard<'_, DataMatrix>> {
        self.matrix
            .read()
            .map_err(|_| VarviewError::Storage(StorageError::LockPoisoned))
    }

    fn write(&self) -> VarviewResult<RwLockWriteGuard<'_, DataMatrix>> {
        self.matrix
            .write()
            .map_err(|_| VarviewError::Storage(StorageError::LockPoisoned))
    }
}

#[async_trait]
impl DataStore for InMemoryDataStore {
    async fn matrix(&self) -> VarviewResult<DataMatrix> {
        Ok(self.read()?.clone())
    }

    async fn column_count(&self) -> VarviewResult<usize> {
        Ok(self.read()?.column_count())
    }

    async fn add_columns(&self, indices: &[usize]) -> VarviewResult<()> {
        let mut sorted = indices.to_vec();
        sorted.sort_unstable();
        let mut matrix = self.write()?;
        for index in sorted {
            matrix.insert_column(index);
        }
        Ok(())
    }

    async fn delete_column(&self, index: usize) -> VarviewResult<()> {
        let mut matrix = self.write()?;
        let len = matrix.column_count();
        if matrix.remove_column(index) {
            Ok(())
        } else {
            Err(out_of_bounds(StoreKind::Data, index, len))
        }
    }

    async fn ensure_columns(&self, upto_index: usize) -> VarviewResult<()> {
        self.write()?.ensure_columns(upto_index);
        Ok(())
    }

    async fn validate_variable_data(
        &self,
        index: usize,
        var_type: VariableType,
        width: u32,
    ) -> VarviewResult<usize> {
        let mut matrix = self.write()?;
        if index >= matrix.column_count() {
            return Err(out_of_bounds(StoreKind::Data, index, matrix.column_count()));
        }
        Ok(matrix.coerce_column(index, var_type, width))
    }
}

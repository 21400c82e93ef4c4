//! VARVIEW Test Utilities
//!
//! Centralized test infrastructure for the VARVIEW workspace:
//! - Proptest generators for variables, changes and operations
//! - Fault-injecting store fakes for resilience tests
//! - Test fixtures for common scenarios
//! - Custom assertions for cross-store invariants

// Re-export stores from their source crate
pub use varview_storage::{
    DataStore, InMemoryDataStore, InMemoryVariableStore, SharedStores, StoreSnapshot,
    VariableStore,
};

// Re-export core types for convenience
pub use varview_core::{
    Align, CellValue, DataMatrix, Measure, MissingValues, PendingOperation, Role, StorageError,
    StoreKind, ValidationError, ValueLabel, Variable, VariableChanges, VariableType,
    VarviewError, VarviewResult,
};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ============================================================================
// FAULT-INJECTING STORES
// ============================================================================

/// How a faulty store misbehaves on an armed index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Return `StorageError::Backend`.
    Error,
    /// Panic inside the store call.
    Panic,
}

/// Index -> fault table shared by clones of a faulty store.
#[derive(Debug, Clone, Default)]
struct Faults {
    armed: Arc<Mutex<HashMap<usize, FaultMode>>>,
}

impl Faults {
    fn arm(&self, index: usize, mode: FaultMode) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.insert(index, mode);
        }
    }

    fn clear(&self) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.clear();
        }
    }

    fn check(&self, store: StoreKind, operation: &str, index: usize) -> VarviewResult<()> {
        // guard is dropped before panicking so the table never poisons
        let mode = self
            .armed
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?
            .get(&index)
            .copied();
        match mode {
            None => Ok(()),
            Some(FaultMode::Error) => Err(StorageError::Backend {
                store,
                reason: format!("injected fault in {} at {}", operation, index),
            }
            .into()),
            Some(FaultMode::Panic) => panic!("injected panic in {} at {}", operation, index),
        }
    }
}

/// Variable store that fails every mutation addressed at an armed index.
/// Reads always succeed.
#[derive(Debug, Clone, Default)]
pub struct FaultyVariableStore {
    inner: InMemoryVariableStore,
    faults: Faults,
}

impl FaultyVariableStore {
    pub fn new(inner: InMemoryVariableStore) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    pub fn fail_at(self, index: usize, mode: FaultMode) -> Self {
        self.faults.arm(index, mode);
        self
    }

    pub fn arm(&self, index: usize, mode: FaultMode) {
        self.faults.arm(index, mode);
    }

    pub fn clear_faults(&self) {
        self.faults.clear();
    }
}

#[async_trait]
impl VariableStore for FaultyVariableStore {
    async fn variables(&self) -> VarviewResult<Vec<Variable>> {
        self.inner.variables().await
    }

    async fn count(&self) -> VarviewResult<usize> {
        self.inner.count().await
    }

    async fn add_variable(
        &self,
        column_index: usize,
        partial: &VariableChanges,
    ) -> VarviewResult<Variable> {
        self.faults
            .check(StoreKind::Variables, "add_variable", column_index)?;
        self.inner.add_variable(column_index, partial).await
    }

    async fn insert_variable_at(&self, index: usize) -> VarviewResult<Variable> {
        self.faults
            .check(StoreKind::Variables, "insert_variable_at", index)?;
        self.inner.insert_variable_at(index).await
    }

    async fn update_multiple_fields(
        &self,
        index: usize,
        changes: &VariableChanges,
    ) -> VarviewResult<Variable> {
        self.faults
            .check(StoreKind::Variables, "update_multiple_fields", index)?;
        self.inner.update_multiple_fields(index, changes).await
    }

    async fn delete_variable(&self, index: usize) -> VarviewResult<Variable> {
        self.faults
            .check(StoreKind::Variables, "delete_variable", index)?;
        self.inner.delete_variable(index).await
    }

    async fn ensure_complete_variables(&self, upto_index: usize) -> VarviewResult<usize> {
        self.inner.ensure_complete_variables(upto_index).await
    }
}

/// Data store that fails cell re-validation of an armed column.
#[derive(Debug, Clone, Default)]
pub struct FaultyDataStore {
    inner: InMemoryDataStore,
    faults: Faults,
}

impl FaultyDataStore {
    pub fn new(inner: InMemoryDataStore) -> Self {
        Self {
            inner,
            faults: Faults::default(),
        }
    }

    pub fn fail_at(self, index: usize, mode: FaultMode) -> Self {
        self.faults.arm(index, mode);
        self
    }
}

#[async_trait]
impl DataStore for FaultyDataStore {
    async fn matrix(&self) -> VarviewResult<DataMatrix> {
        self.inner.matrix().await
    }

    async fn column_count(&self) -> VarviewResult<usize> {
        self.inner.column_count().await
    }

    async fn add_columns(&self, indices: &[usize]) -> VarviewResult<()> {
        self.inner.add_columns(indices).await
    }

    async fn delete_column(&self, index: usize) -> VarviewResult<()> {
        self.inner.delete_column(index).await
    }

    async fn ensure_columns(&self, upto_index: usize) -> VarviewResult<()> {
        self.inner.ensure_columns(upto_index).await
    }

    async fn validate_variable_data(
        &self,
        index: usize,
        var_type: VariableType,
        width: u32,
    ) -> VarviewResult<usize> {
        self.faults
            .check(StoreKind::Data, "validate_variable_data", index)?;
        self.inner.validate_variable_data(index, var_type, width).await
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for generating VARVIEW types.

    use super::*;
    use proptest::prelude::*;

    /// Generate a VariableType variant.
    pub fn arb_variable_type() -> impl Strategy<Value = VariableType> {
        prop_oneof![
            Just(VariableType::Numeric),
            Just(VariableType::Comma),
            Just(VariableType::Dot),
            Just(VariableType::Scientific),
            Just(VariableType::Date),
            Just(VariableType::Dollar),
            Just(VariableType::CustomCurrency),
            Just(VariableType::String),
            Just(VariableType::RestrictedNumeric),
        ]
    }

    /// Generate a Measure variant.
    pub fn arb_measure() -> impl Strategy<Value = Measure> {
        prop_oneof![
            Just(Measure::Nominal),
            Just(Measure::Ordinal),
            Just(Measure::Scale),
            Just(Measure::Unknown),
        ]
    }

    /// Generate a Role variant.
    pub fn arb_role() -> impl Strategy<Value = Role> {
        prop_oneof![
            Just(Role::Input),
            Just(Role::Target),
            Just(Role::Both),
            Just(Role::None),
            Just(Role::Partition),
            Just(Role::Split),
        ]
    }

    /// Generate an Align variant.
    pub fn arb_align() -> impl Strategy<Value = Align> {
        prop_oneof![Just(Align::Left), Just(Align::Right), Just(Align::Center)]
    }

    /// Generate a name accepted by `validate_variable_name`.
    pub fn arb_variable_name() -> impl Strategy<Value = String> {
        "[a-zA-Z][a-zA-Z0-9_]{0,15}"
    }

    /// Generate a cell value.
    pub fn arb_cell_value() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            Just(CellValue::Empty),
            (-1.0e6f64..1.0e6).prop_map(CellValue::Number),
            "[a-z0-9 ]{0,12}".prop_map(CellValue::Text),
        ]
    }

    /// Generate a partial change payload touching any subset of fields.
    pub fn arb_variable_changes() -> impl Strategy<Value = VariableChanges> {
        (
            proptest::option::of(arb_variable_name()),
            proptest::option::of(arb_variable_type()),
            proptest::option::of(1u32..=64),
            proptest::option::of(0u32..=16),
            proptest::option::of("[a-zA-Z ]{0,20}"),
            proptest::option::of(arb_measure()),
            proptest::option::of(arb_role()),
            proptest::option::of(arb_align()),
        )
            .prop_map(
                |(name, var_type, width, decimals, label, measure, role, align)| {
                    VariableChanges {
                        name,
                        var_type,
                        width,
                        decimals,
                        label,
                        measure,
                        role,
                        align,
                        ..Default::default()
                    }
                },
            )
    }

    /// Generate an operation addressing a row below `max_row`.
    pub fn arb_pending_operation(max_row: usize) -> impl Strategy<Value = PendingOperation> {
        let max_row = max_row.max(1);
        prop_oneof![
            (0..max_row, arb_variable_changes())
                .prop_map(|(row, data)| PendingOperation::CreateVariable { row, data }),
            (0..max_row, arb_variable_changes())
                .prop_map(|(row, changes)| PendingOperation::UpdateVariable { row, changes }),
            (0..max_row).prop_map(|row| PendingOperation::InsertVariable { row }),
            (0..max_row).prop_map(|row| PendingOperation::DeleteVariable { row }),
        ]
    }

    /// Generate a rectangular matrix of up to `max_rows` x `max_cols` cells.
    pub fn arb_matrix(max_rows: usize, max_cols: usize) -> impl Strategy<Value = DataMatrix> {
        (0..=max_cols).prop_flat_map(move |cols| {
            proptest::collection::vec(
                proptest::collection::vec(arb_cell_value(), cols),
                0..=max_rows,
            )
            .prop_map(DataMatrix::from_rows)
        })
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built stores for common scenarios.

    use super::*;

    /// A matrix of `rows` x `cols` where each cell holds its column index.
    pub fn numbered_matrix(rows: usize, cols: usize) -> DataMatrix {
        DataMatrix::from_rows(
            (0..rows)
                .map(|_| (0..cols).map(|c| CellValue::Number(c as f64)).collect())
                .collect(),
        )
    }

    /// `count` default variables with an aligned numbered matrix of `rows`.
    pub fn aligned_stores(count: usize, rows: usize) -> SharedStores {
        SharedStores::new(
            Arc::new(InMemoryVariableStore::with_defaults(count)),
            Arc::new(InMemoryDataStore::with_matrix(numbered_matrix(rows, count))),
        )
    }

    /// Variables named `v0..v{count}` with an aligned numbered matrix.
    pub fn named_stores(count: usize, rows: usize) -> SharedStores {
        let variables = (0..count)
            .map(|i| {
                let mut variable = Variable::default_at(i);
                variable.name = format!("v{}", i);
                variable
            })
            .collect();
        SharedStores::new(
            Arc::new(InMemoryVariableStore::with_variables(variables)),
            Arc::new(InMemoryDataStore::with_matrix(numbered_matrix(rows, count))),
        )
    }

    /// Aligned stores whose variable mutations fail at `index`.
    pub fn faulty_stores(count: usize, index: usize, mode: FaultMode) -> SharedStores {
        SharedStores::new(
            Arc::new(
                FaultyVariableStore::new(InMemoryVariableStore::with_defaults(count))
                    .fail_at(index, mode),
            ),
            Arc::new(InMemoryDataStore::with_matrix(numbered_matrix(1, count))),
        )
    }

    pub fn named(name: &str) -> VariableChanges {
        VariableChanges {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions for VARVIEW-specific invariants.

    use super::*;

    /// Assert the cross-store invariants hold.
    pub fn assert_aligned(snapshot: &StoreSnapshot) {
        if let Err(e) = snapshot.check_alignment() {
            panic!("stores out of alignment: {}", e);
        }
    }

    /// Assert variable names, in order.
    pub fn assert_names(snapshot: &StoreSnapshot, expected: &[&str]) {
        let names: Vec<&str> = snapshot.variables.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, expected, "variable names differ");
    }

    pub fn assert_storage_error<T: std::fmt::Debug>(result: &VarviewResult<T>) {
        assert!(
            matches!(result, Err(VarviewError::Storage(_))),
            "Expected storage error, got {:?}",
            result
        );
    }

    pub fn assert_validation_error<T: std::fmt::Debug>(result: &VarviewResult<T>) {
        assert!(
            matches!(result, Err(VarviewError::Validation(_))),
            "Expected validation error, got {:?}",
            result
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_faulty_variable_store_errors_on_armed_index() {
        let store = FaultyVariableStore::new(InMemoryVariableStore::with_defaults(2))
            .fail_at(1, FaultMode::Error);
        let result = store.update_multiple_fields(1, &fixtures::named("x")).await;
        assertions::assert_storage_error(&result);

        let ok = store.update_multiple_fields(0, &fixtures::named("y")).await;
        assert!(ok.is_ok());

        store.clear_faults();
        assert!(store.delete_variable(1).await.is_ok());
    }

    #[tokio::test]
    #[should_panic(expected = "injected panic")]
    async fn test_faulty_variable_store_panics_on_armed_index() {
        let store = FaultyVariableStore::new(InMemoryVariableStore::with_defaults(1))
            .fail_at(0, FaultMode::Panic);
        let _ = store.delete_variable(0).await;
    }

    #[tokio::test]
    async fn test_aligned_stores_fixture_is_aligned() {
        let snapshot = fixtures::aligned_stores(4, 3).snapshot().await.unwrap();
        assertions::assert_aligned(&snapshot);
        assert_eq!(snapshot.matrix.row_count(), 3);
    }
}

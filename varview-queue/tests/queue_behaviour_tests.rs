//! Behaviour Tests for the Operation Queue
//!
//! End-to-end scenarios through the public API: operations are enqueued by
//! the translator, the mediator or directly, drained by the worker, and the
//! settled stores are checked afterwards.

use serde_json::json;
use varview_queue::{
    CellChange, ChangeVerdict, DialogKind, DialogMediator, DialogValue, DrainOutcome,
    EventTranslator, OperationKind, OperationQueue, PendingOperation, QueueConfig, Selection,
    SharedStores, VariableChanges,
};
use varview_test_utils::assertions::{assert_aligned, assert_names};
use varview_test_utils::fixtures::{faulty_stores, named, named_stores};
use varview_test_utils::{FaultMode, Measure, VariableType};

fn spawn(stores: SharedStores) -> OperationQueue {
    let (queue, _worker) = OperationQueue::spawn(stores, QueueConfig::default()).unwrap();
    queue
}

// ============================================================================
// ORDERING
// ============================================================================

#[tokio::test]
async fn test_update_after_insert_targets_shifted_row() {
    let queue = spawn(named_stores(6, 2));
    queue
        .enqueue(PendingOperation::InsertVariable { row: 2 })
        .unwrap();
    queue
        .enqueue(PendingOperation::UpdateVariable {
            row: 5,
            changes: named("x"),
        })
        .unwrap();
    queue.settled().await.unwrap();

    let snapshot = queue.stores().snapshot().await.unwrap();
    assert_eq!(snapshot.variables.len(), 7);
    // the former v4 now sits at 5 and took the update; v5 moved to 6 untouched
    assert_eq!(snapshot.variables[5].name, "x");
    assert_eq!(snapshot.variables[6].name, "v5");
    assert_eq!(snapshot.variables[6].column_index, 6);
    assert_aligned(&snapshot);
}

#[tokio::test]
async fn test_operations_apply_in_enqueue_order() {
    let queue = spawn(SharedStores::in_memory());
    for name in ["a", "b", "c"] {
        queue
            .enqueue(PendingOperation::InsertVariable { row: 0 })
            .unwrap();
        queue
            .enqueue(PendingOperation::UpdateVariable {
                row: 0,
                changes: named(name),
            })
            .unwrap();
    }
    queue.settled().await.unwrap();

    let snapshot = queue.stores().snapshot().await.unwrap();
    assert_names(&snapshot, &["c", "b", "a"]);
    assert_eq!(queue.metrics().applied, 6);
}

// ============================================================================
// DELETION AND SPARSE CREATION
// ============================================================================

#[tokio::test]
async fn test_delete_compacts_both_stores() {
    let queue = spawn(named_stores(5, 3));
    queue
        .enqueue(PendingOperation::DeleteVariable { row: 1 })
        .unwrap();
    queue.settled().await.unwrap();

    let snapshot = queue.stores().snapshot().await.unwrap();
    assert_names(&snapshot, &["v0", "v2", "v3", "v4"]);
    let indices: Vec<usize> = snapshot.variables.iter().map(|v| v.column_index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(snapshot.matrix.column_count(), 4);
    assert_aligned(&snapshot);
}

#[tokio::test]
async fn test_sparse_create_gap_fills_defaults() {
    let queue = spawn(SharedStores::in_memory());
    queue
        .enqueue(PendingOperation::CreateVariable {
            row: 10,
            data: named("v"),
        })
        .unwrap();
    queue.settled().await.unwrap();

    let snapshot = queue.stores().snapshot().await.unwrap();
    assert_eq!(snapshot.variables.len(), 11);
    for (i, variable) in snapshot.variables.iter().take(10).enumerate() {
        assert_eq!(variable, &varview_test_utils::Variable::default_at(i));
    }
    assert_eq!(snapshot.variables[10].name, "v");
    assert_eq!(snapshot.variables[10].column_index, 10);
    assert!(snapshot.matrix.column_count() >= 11);
}

// ============================================================================
// STRING / SCALE
// ============================================================================

#[tokio::test]
async fn test_string_update_over_scale_stores_nominal() {
    let queue = spawn(named_stores(1, 1));
    queue
        .enqueue(PendingOperation::UpdateVariable {
            row: 0,
            changes: VariableChanges {
                measure: Some(Measure::Scale),
                ..Default::default()
            },
        })
        .unwrap();
    queue
        .enqueue(PendingOperation::UpdateVariable {
            row: 0,
            changes: VariableChanges {
                var_type: Some(VariableType::String),
                ..Default::default()
            },
        })
        .unwrap();
    queue.settled().await.unwrap();

    let stored = queue.stores().variable_at(0).await.unwrap().unwrap();
    assert_eq!(stored.var_type, VariableType::String);
    assert_eq!(stored.measure, Measure::Nominal);
}

// ============================================================================
// POISONED OPERATIONS
// ============================================================================

async fn run_poisoned(mode: FaultMode) {
    let queue = spawn(faulty_stores(3, 1, mode));
    queue
        .enqueue(PendingOperation::UpdateVariable {
            row: 0,
            changes: named("first"),
        })
        .unwrap();
    let poisoned = queue
        .enqueue(PendingOperation::UpdateVariable {
            row: 1,
            changes: named("second"),
        })
        .unwrap();
    queue
        .enqueue(PendingOperation::UpdateVariable {
            row: 2,
            changes: named("third"),
        })
        .unwrap();
    queue.settled().await.unwrap();

    assert_eq!(queue.pending(), 0);
    let snapshot = queue.stores().snapshot().await.unwrap();
    assert_names(&snapshot, &["first", "VAR00002", "third"]);

    let metrics = queue.metrics();
    assert_eq!(metrics.applied, 2);
    assert_eq!(metrics.failed, 1);

    let history = queue.history().unwrap();
    let failed = history
        .iter()
        .find(|r| r.operation_id == poisoned)
        .unwrap();
    assert!(matches!(failed.outcome, DrainOutcome::Failed { .. }));
}

#[tokio::test]
async fn test_failing_operation_is_discarded_and_queue_continues() {
    run_poisoned(FaultMode::Error).await;
}

#[tokio::test]
async fn test_panicking_operation_is_discarded_and_queue_continues() {
    run_poisoned(FaultMode::Panic).await;
}

// ============================================================================
// DIALOG ROUND-TRIP
// ============================================================================

#[tokio::test]
async fn test_type_dialog_round_trip() {
    let queue = spawn(named_stores(2, 1));
    let translator = EventTranslator::new(queue.clone());
    let mut dialogs = DialogMediator::new(queue.clone());

    let opened = translator
        .on_selection(Selection::cell(1, 1), &mut dialogs)
        .await
        .unwrap();
    assert_eq!(opened, Some(DialogKind::Type));
    assert!(dialogs.props(DialogKind::Type).open);
    assert!(!dialogs.props(DialogKind::ValueLabels).open);
    assert!(!dialogs.props(DialogKind::MissingValues).open);

    dialogs
        .save(DialogValue::Type {
            var_type: VariableType::String,
            width: 8,
            decimals: 0,
        })
        .await
        .unwrap();
    assert!(dialogs.open_dialog().is_none());

    queue.settled().await.unwrap();
    let history = queue.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].kind, OperationKind::UpdateVariable);
    assert_eq!(history[0].outcome, DrainOutcome::Applied);
    assert_eq!(
        history[0].operation,
        PendingOperation::UpdateVariable {
            row: 1,
            changes: VariableChanges {
                var_type: Some(VariableType::String),
                width: Some(8),
                decimals: Some(0),
                ..Default::default()
            },
        }
    );

    let stored = queue.stores().variable_at(1).await.unwrap().unwrap();
    assert_eq!(stored.name, "v1");
    assert_eq!(stored.var_type, VariableType::String);
    assert_eq!(stored.width, 8);
    assert_eq!(stored.decimals, 0);
}

#[tokio::test]
async fn test_cancelled_dialog_enqueues_nothing() {
    let queue = spawn(named_stores(1, 1));
    let translator = EventTranslator::new(queue.clone());
    let mut dialogs = DialogMediator::new(queue.clone());

    let translation = translator
        .translate(&[CellChange::edit(0, 5, json!([]))], &mut dialogs)
        .await
        .unwrap();
    assert_eq!(translation.verdicts, vec![ChangeVerdict::Veto]);
    assert_eq!(dialogs.open_dialog().unwrap().kind, DialogKind::ValueLabels);

    dialogs.on_open_change(DialogKind::ValueLabels, false);
    assert!(dialogs.open_dialog().is_none());

    queue.settled().await.unwrap();
    assert_eq!(queue.metrics().drain_passes, 0);
}

// ============================================================================
// SETTLED READS
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readers_never_see_half_applied_gap_fill() {
    let queue = spawn(SharedStores::in_memory());
    for row in (0..200).step_by(20) {
        queue
            .enqueue(PendingOperation::CreateVariable {
                row,
                data: VariableChanges::new(),
            })
            .unwrap();
    }

    while queue.pending() > 0 {
        let snapshot = queue.stores().snapshot().await.unwrap();
        assert_aligned(&snapshot);
        tokio::task::yield_now().await;
    }
    queue.settled().await.unwrap();
    assert_aligned(&queue.stores().snapshot().await.unwrap());
}

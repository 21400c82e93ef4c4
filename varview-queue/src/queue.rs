//! Operation Queue & Drainer
//!
//! A single worker task consumes an unbounded channel of
//! [`QueuedOperation`]s. Each operation is applied to completion under the
//! stores' write gate before the next one is popped, so mutations are never
//! interleaved or reordered. A failing operation is logged, recorded and
//! discarded; the queue always moves on.
//!
//! # Example
//!
//! ```ignore
//! let stores = SharedStores::in_memory();
//! let (queue, worker) = OperationQueue::spawn(stores, QueueConfig::default())?;
//!
//! queue.enqueue(PendingOperation::InsertVariable { row: 0 })?;
//! queue.settled().await?;
//!
//! queue.shutdown();
//! let metrics = worker.await?;
//! ```

use crate::drain::{apply_operation, DrainMetrics, DrainMetricsSnapshot, DrainOutcome, DrainRecord};
use futures_util::FutureExt;
use std::any::Any;
use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use varview_core::{
    OperationId, PendingOperation, QueueConfig, QueueError, QueuedOperation, StorageError,
    VarviewResult,
};
use varview_storage::SharedStores;

/// How a queued operation changes the variable count once applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CountEffect {
    Create(usize),
    Insert(usize),
    Delete(usize),
}

impl CountEffect {
    fn of(operation: &PendingOperation) -> Option<Self> {
        match operation {
            PendingOperation::CreateVariable { row, .. } => Some(CountEffect::Create(*row)),
            PendingOperation::InsertVariable { row } => Some(CountEffect::Insert(*row)),
            PendingOperation::DeleteVariable { row } => Some(CountEffect::Delete(*row)),
            PendingOperation::UpdateVariable { .. } => None,
        }
    }

    /// Mirrors the drainer: CREATE on an existing row and DELETE past the end
    /// are skipped, CREATE and INSERT past the end gap-fill first.
    fn apply(self, count: usize) -> usize {
        match self {
            CountEffect::Create(row) if row < count => count,
            CountEffect::Create(row) => row + 1,
            CountEffect::Insert(row) => count.max(row) + 1,
            CountEffect::Delete(row) if row < count => count - 1,
            CountEffect::Delete(_) => count,
        }
    }
}

/// State shared between producer handles and the drain worker.
struct QueueState {
    pending: watch::Sender<usize>,
    /// Structural operations enqueued but not yet applied, in channel order.
    unsettled: Mutex<VecDeque<(OperationId, CountEffect)>>,
    busy: AtomicBool,
    metrics: DrainMetrics,
    history: Mutex<VecDeque<DrainRecord>>,
    history_capacity: usize,
    shutdown: watch::Sender<bool>,
}

impl QueueState {
    fn push_history(&self, record: DrainRecord) {
        if self.history_capacity == 0 {
            return;
        }
        match self.history.lock() {
            Ok(mut history) => {
                if history.len() == self.history_capacity {
                    history.pop_front();
                }
                history.push_back(record);
            }
            Err(_) => tracing::warn!("Drain history lock poisoned, record dropped"),
        }
    }

    fn settle(&self, id: OperationId) {
        match self.unsettled.lock() {
            Ok(mut unsettled) => {
                if let Some(position) = unsettled.iter().position(|(queued, _)| *queued == id) {
                    unsettled.remove(position);
                }
            }
            Err(_) => tracing::warn!(operation_id = %id, "Unsettled set lock poisoned"),
        }
    }

    fn finish_one(&self) {
        self.pending.send_modify(|n| *n = n.saturating_sub(1));
    }
}

/// Producer handle for the operation queue.
///
/// Cloning is cheap; all clones feed the same worker. `enqueue` never awaits.
#[derive(Clone)]
pub struct OperationQueue {
    tx: mpsc::UnboundedSender<QueuedOperation>,
    stores: SharedStores,
    state: Arc<QueueState>,
}

impl std::fmt::Debug for OperationQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OperationQueue")
            .field("pending", &self.pending())
            .field("busy", &self.is_busy())
            .finish_non_exhaustive()
    }
}

impl OperationQueue {
    /// Validate `config`, spawn the drain worker and return the producer
    /// handle. The join handle yields the final metrics when the worker stops.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        stores: SharedStores,
        config: QueueConfig,
    ) -> VarviewResult<(Self, JoinHandle<DrainMetricsSnapshot>)> {
        config.validate()?;

        let (tx, rx) = mpsc::unbounded_channel();
        let (pending, _) = watch::channel(0usize);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let state = Arc::new(QueueState {
            pending,
            unsettled: Mutex::new(VecDeque::new()),
            busy: AtomicBool::new(false),
            metrics: DrainMetrics::new(),
            history: Mutex::new(VecDeque::with_capacity(config.history_capacity)),
            history_capacity: config.history_capacity,
            shutdown,
        });

        let worker = tokio::spawn(drain_worker(
            rx,
            stores.clone(),
            config,
            Arc::clone(&state),
            shutdown_rx,
        ));

        Ok((Self { tx, stores, state }, worker))
    }

    /// Append an operation to the tail of the queue.
    pub fn enqueue(&self, operation: PendingOperation) -> VarviewResult<OperationId> {
        if *self.state.shutdown.borrow() {
            return Err(QueueError::Closed.into());
        }

        let queued = QueuedOperation::new(operation);
        let id = queued.id;
        let kind = queued.operation.kind();
        let row = queued.operation.row();

        let effect = CountEffect::of(&queued.operation);
        let mut unsettled = self
            .state
            .unsettled
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        self.state.pending.send_modify(|n| *n += 1);
        if self.tx.send(queued).is_err() {
            self.state.finish_one();
            return Err(QueueError::Closed.into());
        }
        if let Some(effect) = effect {
            unsettled.push_back((id, effect));
        }
        drop(unsettled);

        tracing::trace!(operation_id = %id, kind = %kind, row, "Operation enqueued");
        Ok(id)
    }

    /// Operations enqueued but not yet finished (including one in flight).
    pub fn pending(&self) -> usize {
        *self.state.pending.borrow()
    }

    /// Whether a drain pass is in flight.
    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::Acquire)
    }

    /// Resolve once every enqueued operation has been applied or discarded.
    pub async fn settled(&self) -> VarviewResult<()> {
        let mut pending = self.state.pending.subscribe();
        pending
            .wait_for(|n| *n == 0)
            .await
            .map_err(|_| QueueError::Closed)?;
        Ok(())
    }

    /// Number of variables once everything enqueued so far has drained.
    ///
    /// Starts from the settled count and replays the queued CREATE, INSERT
    /// and DELETE operations on top of it, so a row whose CREATE is still
    /// queued already counts as existing.
    pub async fn projected_count(&self) -> VarviewResult<usize> {
        let _read = self.stores.lock_for_read().await;
        let settled = self.stores.variables().count().await?;
        let unsettled = self
            .state
            .unsettled
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(unsettled
            .iter()
            .fold(settled, |count, (_, effect)| effect.apply(count)))
    }

    /// Whether a variable will exist at `row` once the queue drains.
    pub async fn will_exist(&self, row: usize) -> VarviewResult<bool> {
        Ok(row < self.projected_count().await?)
    }

    /// Current drain counters.
    pub fn metrics(&self) -> DrainMetricsSnapshot {
        self.state.metrics.snapshot()
    }

    /// Most recent drain records, oldest first.
    pub fn history(&self) -> VarviewResult<Vec<DrainRecord>> {
        let history = self
            .state
            .history
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;
        Ok(history.iter().cloned().collect())
    }

    /// Close the queue to new operations. Already queued operations are still
    /// applied, then the worker exits.
    pub fn shutdown(&self) {
        self.state.shutdown.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.state.shutdown.borrow() || self.tx.is_closed()
    }

    /// The stores this queue drains into.
    pub fn stores(&self) -> &SharedStores {
        &self.stores
    }
}

// ============================================================================
// WORKER
// ============================================================================

async fn drain_worker(
    mut rx: mpsc::UnboundedReceiver<QueuedOperation>,
    stores: SharedStores,
    config: QueueConfig,
    state: Arc<QueueState>,
    mut shutdown_rx: watch::Receiver<bool>,
) -> DrainMetricsSnapshot {
    tracing::info!(
        yield_between_operations = config.yield_between_operations,
        history_capacity = config.history_capacity,
        "Operation queue drain worker started"
    );

    let mut closing = false;
    loop {
        let next = tokio::select! {
            biased;

            changed = shutdown_rx.changed(), if !closing => {
                if changed.is_err() || *shutdown_rx.borrow_and_update() {
                    tracing::info!(pending = *state.pending.borrow(), "Operation queue closing");
                    rx.close();
                    closing = true;
                }
                continue;
            }

            next = rx.recv() => next,
        };

        let Some(queued) = next else {
            break;
        };

        drain_one(&stores, &config, &state, queued).await;

        if config.yield_between_operations {
            tokio::task::yield_now().await;
        }
    }

    let snapshot = state.metrics.snapshot();
    tracing::info!(
        applied = snapshot.applied,
        skipped = snapshot.skipped,
        failed = snapshot.failed,
        drain_passes = snapshot.drain_passes,
        "Operation queue drain worker stopped"
    );
    snapshot
}

/// One drain pass: apply exactly one operation, then record it.
async fn drain_one(
    stores: &SharedStores,
    config: &QueueConfig,
    state: &QueueState,
    queued: QueuedOperation,
) {
    state.busy.store(true, Ordering::Release);

    let outcome = {
        let _gate = stores.lock_for_write().await;
        let outcome = match AssertUnwindSafe(apply_operation(stores, &queued.operation))
            .catch_unwind()
            .await
        {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => DrainOutcome::Failed {
                error: e.to_string(),
            },
            Err(panic) => DrainOutcome::Failed {
                error: format!("store call panicked: {}", panic_message(panic.as_ref())),
            },
        };
        // settled and unsettled state change together under the gate
        state.settle(queued.id);
        outcome
    };

    let kind = queued.operation.kind();
    let row = queued.operation.row();
    match &outcome {
        DrainOutcome::Applied if config.log_operations => {
            tracing::debug!(operation_id = %queued.id, kind = %kind, row, "Operation applied");
        }
        DrainOutcome::Applied => {}
        DrainOutcome::Skipped { reason } => {
            tracing::debug!(operation_id = %queued.id, kind = %kind, row, ?reason, "Operation skipped");
        }
        DrainOutcome::Failed { error } => {
            tracing::error!(
                operation_id = %queued.id,
                kind = %kind,
                row,
                error = %error,
                "Operation failed and was discarded"
            );
        }
    }

    state.metrics.record(&outcome);
    state.push_history(DrainRecord::new(queued.id, queued.operation, outcome));
    state.busy.store(false, Ordering::Release);
    state.finish_one();
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic"
    }
}

//! VARVIEW Queue - Operation Queue, Event Translation and Dialog Mediation
//!
//! Keeps the variable store and the data matrix consistent while a user edits
//! the variable view:
//!
//! - [`OperationQueue`]: single-consumer FIFO of store mutations, applied one
//!   at a time under the stores' write gate
//! - [`GapFiller`]: materialises default entries when an edit lands past the
//!   end of the variable list
//! - [`EventTranslator`]: turns grid change events into queued operations
//! - [`DialogMediator`]: owns the type / value-label / missing-value modals
//!
//! ```text
//! grid events ──► EventTranslator ──► OperationQueue ──► drain worker ──► stores
//!                      │                    ▲
//!                      ▼                    │
//!                DialogMediator ── save ────┘
//! ```

pub mod dialog;
pub mod drain;
pub mod gap_fill;
pub mod queue;
pub mod telemetry;
pub mod translate;

pub use dialog::{CellRef, DialogKind, DialogMediator, DialogProps, DialogValue, OpenDialog};
pub use drain::{DrainMetrics, DrainMetricsSnapshot, DrainOutcome, DrainRecord, SkipReason};
pub use gap_fill::{GapFill, GapFiller};
pub use queue::OperationQueue;
pub use telemetry::{init_tracing, LogFormat, TelemetryConfig};
pub use translate::{
    CellChange, ChangeSource, ChangeVerdict, EventTranslator, Selection, Translation,
    VariableField,
};

// Re-export core and storage types for convenience
pub use varview_core::{
    OperationKind, PendingOperation, QueueConfig, QueuedOperation, VariableChanges, VarviewError,
    VarviewResult,
};
pub use varview_storage::{DataStore, SharedStores, StoreSnapshot, VariableStore};

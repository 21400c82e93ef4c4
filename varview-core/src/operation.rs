//! Queued store operations

use crate::VariableChanges;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of one enqueued operation (UUIDv7, sortable by enqueue time).
pub type OperationId = Uuid;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

/// A store mutation waiting in the operation queue.
///
/// Rows are variable `column_index` values, resolved against the store state
/// at the moment the operation is applied, never at enqueue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PendingOperation {
    CreateVariable { row: usize, data: VariableChanges },
    UpdateVariable { row: usize, changes: VariableChanges },
    InsertVariable { row: usize },
    DeleteVariable { row: usize },
}

impl PendingOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            PendingOperation::CreateVariable { .. } => OperationKind::CreateVariable,
            PendingOperation::UpdateVariable { .. } => OperationKind::UpdateVariable,
            PendingOperation::InsertVariable { .. } => OperationKind::InsertVariable,
            PendingOperation::DeleteVariable { .. } => OperationKind::DeleteVariable,
        }
    }

    pub fn row(&self) -> usize {
        match self {
            PendingOperation::CreateVariable { row, .. }
            | PendingOperation::UpdateVariable { row, .. }
            | PendingOperation::InsertVariable { row }
            | PendingOperation::DeleteVariable { row } => *row,
        }
    }
}

/// Discriminant of [`PendingOperation`], for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationKind {
    CreateVariable,
    UpdateVariable,
    InsertVariable,
    DeleteVariable,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::CreateVariable => "CREATE_VARIABLE",
            OperationKind::UpdateVariable => "UPDATE_VARIABLE",
            OperationKind::InsertVariable => "INSERT_VARIABLE",
            OperationKind::DeleteVariable => "DELETE_VARIABLE",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An operation as held by the queue: immutable once enqueued.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueuedOperation {
    pub id: OperationId,
    pub enqueued_at: Timestamp,
    pub operation: PendingOperation,
}

impl QueuedOperation {
    pub fn new(operation: PendingOperation) -> Self {
        Self {
            id: Uuid::now_v7(),
            enqueued_at: Utc::now(),
            operation,
        }
    }
}

//! Error types for VARVIEW operations

use std::fmt;
use thiserror::Error;

/// Which of the two stores an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Variables,
    Data,
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreKind::Variables => write!(f, "variable store"),
            StoreKind::Data => write!(f, "data store"),
        }
    }
}

/// Storage layer errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Index {index} out of bounds in {store} (len {len})")]
    OutOfBounds {
        store: StoreKind,
        index: usize,
        len: usize,
    },

    #[error("Entry already exists in {store} at index {index}")]
    AlreadyExists { store: StoreKind, index: usize },

    #[error("No entry in {store} at index {index}")]
    NotFound { store: StoreKind, index: usize },

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("Backend failure in {store}: {reason}")]
    Backend { store: StoreKind, reason: String },
}

/// Validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Required field missing: {field}")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Constraint violation on {constraint}: {reason}")]
    ConstraintViolation { constraint: String, reason: String },
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Failed to parse config: {reason}")]
    Parse { reason: String },

    #[error("Failed to read config file: {reason}")]
    Io { reason: String },

    #[error("Failed to initialise telemetry: {reason}")]
    Telemetry { reason: String },
}

/// Operation queue and dialog errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("Operation queue is closed")]
    Closed,

    #[error("No dialog is open")]
    DialogNotOpen,

    #[error("Dialog kind mismatch: {open} dialog is open, got a {got} value")]
    DialogKindMismatch { open: &'static str, got: &'static str },
}

/// Master error type for all VARVIEW errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VarviewError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// Result type alias for VARVIEW operations.
pub type VarviewResult<T> = Result<T, VarviewError>;

// =============================================================================
// TESTS
// =============================================================================

//! VARVIEW Core - Variable View Types
//!
//! Data structures shared by every VARVIEW crate: variable metadata, the raw
//! data matrix, queued operations, errors and queue configuration.
//! This crate contains no store or scheduling logic.

pub mod config;
pub mod constants;
pub mod enums;
pub mod error;
pub mod matrix;
pub mod operation;
pub mod variable;

pub use config::QueueConfig;
pub use enums::{Align, EnumParseError, Measure, Role, VariableType};
pub use error::{
    ConfigError, QueueError, StorageError, StoreKind, ValidationError, VarviewError,
    VarviewResult,
};
pub use matrix::{CellValue, DataMatrix};
pub use operation::{OperationId, OperationKind, PendingOperation, QueuedOperation, Timestamp};
pub use variable::{
    default_name, validate_variable_name, MissingRange, MissingValues, ValueLabel, Variable,
    VariableChanges, DEFAULT_COLUMNS, DEFAULT_DECIMALS, DEFAULT_WIDTH, MAX_DISCRETE_MISSING,
    MAX_NAME_LEN,
};

//! Constants for VARVIEW
//!
//! Defaults for queue configuration and the environment variables that
//! override them.

// ============================================================================
// OPERATION QUEUE
// ============================================================================

/// Whether the drain worker yields to the scheduler between operations
pub const DEFAULT_QUEUE_YIELD_BETWEEN_OPERATIONS: bool = true;

/// Number of recent drain records kept for diagnostics
pub const DEFAULT_QUEUE_HISTORY_CAPACITY: usize = 64;

/// Upper bound accepted for the drain history ring
pub const MAX_QUEUE_HISTORY_CAPACITY: usize = 10_000;

/// Whether each applied operation is logged at debug level
pub const DEFAULT_QUEUE_LOG_OPERATIONS: bool = true;

// ============================================================================
// ENVIRONMENT
// ============================================================================

pub const ENV_QUEUE_YIELD: &str = "VARVIEW_QUEUE_YIELD";
pub const ENV_QUEUE_HISTORY_CAPACITY: &str = "VARVIEW_QUEUE_HISTORY_CAPACITY";
pub const ENV_QUEUE_LOG_OPERATIONS: &str = "VARVIEW_QUEUE_LOG_OPERATIONS";

//! VARVIEW Storage - Store Traits and In-Memory Implementation
//!
//! Defines the narrow variable/data store interfaces the operation queue
//! depends on, in-memory implementations of both, and [`SharedStores`], the
//! injected pair guarded by a settled-read gate.

pub mod memory;
pub mod shared;
pub mod traits;

pub use memory::{InMemoryDataStore, InMemoryVariableStore};
pub use shared::{SharedStores, StoreSnapshot};
pub use traits::{DataStore, VariableStore};

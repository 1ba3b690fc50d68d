//! In-memory operator storage backend.
//!
//! This crate provides an in-memory implementation of the `OperatorStorage`
//! trait from `operator-repo-storage`. It backs the test suites and the
//! `storage.backend = "memory"` server mode.
//!
//! # Example
//!
//! ```ignore
//! use operator_repo_db_memory::InMemoryStorage;
//! use operator_repo_storage::{OperatorInput, OperatorStorage};
//!
//! let storage = InMemoryStorage::new();
//! let created = storage.insert(OperatorInput::new("adder").into_new("alice")).await?;
//! ```

pub mod query;
pub mod storage;

pub use operator_repo_storage::{OperatorStorage, StorageError};
pub use storage::InMemoryStorage;

/// Creates a new shareable in-memory storage instance.
pub fn create_storage() -> operator_repo_storage::DynStorage {
    std::sync::Arc::new(InMemoryStorage::new())
}

//! # operator-repo-storage
//!
//! Storage abstraction layer for the analytics operator repository.
//!
//! This crate defines the data model, query types and the trait that all
//! storage backends must implement. It does not contain any implementations,
//! those are provided by separate crates (`operator-repo-db-memory`,
//! `operator-repo-db-mongo`).
//!
//! ## Example
//!
//! ```ignore
//! use operator_repo_storage::{FindOptions, OperatorFilter, OperatorStorage, StorageError};
//!
//! async fn visible_page(
//!     storage: &dyn OperatorStorage,
//!     caller: &str,
//! ) -> Result<Vec<Operator>, StorageError> {
//!     let filter = OperatorFilter::new().visible_to(caller);
//!     storage.find(&filter, &FindOptions::new().with_limit(10)).await
//! }
//! ```

mod error;
mod query;
mod traits;
mod types;

pub use error::StorageError;
pub use query::{FindOptions, ID_FIELD, OperatorFilter, SortDirection, SortSpec};
pub use traits::OperatorStorage;
pub use types::{IoField, NewOperator, Operator, OperatorInput, OperatorPage, OperatorPatch};

/// Type alias for a storage result.
pub type StorageResult<T> = Result<T, StorageError>;

/// Type alias for a shared storage trait object.
pub type DynStorage = std::sync::Arc<dyn OperatorStorage>;

//! Storage traits for the operator storage abstraction layer.
//!
//! This module defines the core trait that all storage backends must implement.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::query::{FindOptions, OperatorFilter};
use crate::types::{NewOperator, Operator, OperatorPatch};

/// The storage trait that all operator backends must implement.
///
/// The trait mirrors the primitives of a document collection: filtered find
/// with sort/skip/limit, count, insert, atomic find-and-update and deletes.
/// Ownership and visibility rules are expressed through [`OperatorFilter`];
/// backends only evaluate the filter, they never decide policy.
///
/// Implementations must be thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use operator_repo_storage::{OperatorFilter, OperatorStorage, StorageError};
///
/// async fn owned(storage: &dyn OperatorStorage, id: &str, user: &str) -> Result<bool, StorageError> {
///     let filter = OperatorFilter::by_id(id).with_owner(user);
///     Ok(storage.count(&filter).await? == 1)
/// }
/// ```
#[async_trait]
pub trait OperatorStorage: Send + Sync {
    /// Inserts a new operator and returns it with its generated id.
    async fn insert(&self, operator: NewOperator) -> Result<Operator, StorageError>;

    /// Returns the first operator matching `filter`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing operators.
    async fn find_one(&self, filter: &OperatorFilter) -> Result<Option<Operator>, StorageError>;

    /// Returns the operators matching `filter`, ordered by `options.sort`
    /// then `_id` ascending, after applying skip and limit.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidQuery` if the name pattern cannot be compiled.
    async fn find(
        &self,
        filter: &OperatorFilter,
        options: &FindOptions,
    ) -> Result<Vec<Operator>, StorageError>;

    /// Counts all operators matching `filter`, ignoring pagination.
    async fn count(&self, filter: &OperatorFilter) -> Result<u64, StorageError>;

    /// Atomically applies `patch` to the first operator matching `filter`
    /// and returns the post-update document.
    ///
    /// Returns `None` if nothing matched.
    async fn find_one_and_update(
        &self,
        filter: &OperatorFilter,
        patch: &OperatorPatch,
    ) -> Result<Option<Operator>, StorageError>;

    /// Deletes the first operator matching `filter`. Returns whether one was removed.
    async fn delete_one(&self, filter: &OperatorFilter) -> Result<bool, StorageError>;

    /// Deletes every operator matching `filter` and returns how many were removed.
    async fn delete_many(&self, filter: &OperatorFilter) -> Result<u64, StorageError>;

    /// Checks that the backend is reachable.
    async fn ping(&self) -> Result<(), StorageError>;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

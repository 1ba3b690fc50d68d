//! MongoDB storage backend for the analytics operator repository.
//!
//! This crate provides a MongoDB implementation of the `OperatorStorage`
//! trait from `operator-repo-storage`, using the official driver.
//!
//! # Example
//!
//! ```ignore
//! use operator_repo_db_mongo::{MongoConfig, MongoStorage};
//! use operator_repo_storage::OperatorStorage;
//!
//! let config = MongoConfig::new("mongodb://localhost:27017")
//!     .with_database("db")
//!     .with_collection("operators");
//!
//! let storage = MongoStorage::new(config).await?;
//! storage.ping().await?;
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Configuration for the backend
//! - [`error`]: Error types specific to MongoDB operations
//! - [`client`]: Client construction and health checks
//! - [`convert`]: Filter, sort and document translation
//! - [`storage`]: Main `OperatorStorage` implementation

pub mod client;
pub mod config;
pub mod convert;
mod error;
pub mod storage;

pub use config::MongoConfig;
pub use error::{MongoError, Result};
pub use storage::MongoStorage;

pub use operator_repo_storage::{OperatorStorage, StorageError};

/// Creates a new shareable MongoDB storage instance with the given configuration.
pub async fn create_storage(config: MongoConfig) -> Result<operator_repo_storage::DynStorage> {
    let storage = MongoStorage::new(config).await?;
    Ok(std::sync::Arc::new(storage))
}

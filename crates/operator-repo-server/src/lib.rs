pub mod config;
pub mod handlers;
pub mod identity;
pub mod middleware;
pub mod observability;
pub mod openapi;
pub mod server;
pub mod service;

pub use config::{AppConfig, IdentityConfig, MongoStorageConfig, ServerConfig, StorageBackend};
pub use identity::{CallerIdentity, IdentityResolver};
pub use observability::init_tracing;
pub use server::{AppState, OperatorRepoServer, ServerBuilder, build_app};
pub use service::{ListQuery, OperatorService};

use operator_repo_db_mongo::MongoConfig;
use operator_repo_storage::DynStorage;

/// Create the storage backend selected by configuration.
///
/// ## Backends
///
/// - **mongo**: MongoDB collection, the production backend
/// - **memory**: process-local map, lost on restart
///
/// The MongoDB driver connects lazily. An unreachable server is logged at
/// startup but does not prevent the server from starting; requests fail with
/// 503 until it becomes reachable and `/readyz` reports the outage.
pub async fn create_storage(cfg: &AppConfig) -> anyhow::Result<DynStorage> {
    let storage = match cfg.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory storage; operators are lost on restart");
            operator_repo_db_memory::create_storage()
        }
        StorageBackend::Mongo => {
            let mongo = &cfg.storage.mongo;
            let mongo_config = MongoConfig::new(mongo.connection_url())
                .with_database(mongo.database.clone())
                .with_collection(mongo.collection.clone())
                .with_connect_timeout_ms(mongo.connect_timeout_ms);
            operator_repo_db_mongo::create_storage(mongo_config).await?
        }
    };

    match storage.ping().await {
        Ok(()) => tracing::info!(backend = storage.backend_name(), "Storage ready"),
        Err(e) => tracing::warn!(
            backend = storage.backend_name(),
            error = %e,
            "Storage not reachable at startup"
        ),
    }
    Ok(storage)
}

//! Client construction for the MongoDB storage backend.

use std::time::Duration;

use mongodb::Client;
use mongodb::bson::doc;
use mongodb::options::ClientOptions;
use tracing::{debug, info, instrument};

use crate::config::MongoConfig;
use crate::error::{MongoError, Result};

/// Creates a new MongoDB client from the given configuration.
///
/// The driver connects lazily; use [`ping`] to verify reachability.
#[instrument(skip(config), fields(url = %mask_password(&config.url)))]
pub async fn create_client(config: &MongoConfig) -> Result<Client> {
    info!(
        database = %config.database,
        collection = %config.collection,
        connect_timeout_ms = config.connect_timeout_ms,
        "Creating MongoDB client"
    );

    if config.url.is_empty() {
        return Err(MongoError::config("MongoDB url must not be empty"));
    }

    let mut options = ClientOptions::parse(&config.url).await?;
    let timeout = Duration::from_millis(config.connect_timeout_ms);
    options.connect_timeout = Some(timeout);
    options.server_selection_timeout = Some(timeout);
    if let Some(name) = &config.app_name {
        options.app_name = Some(name.clone());
    }

    let client = Client::with_options(options)?;

    debug!("MongoDB client created successfully");

    Ok(client)
}

/// Runs the `ping` admin command against `database`.
#[instrument(skip(client))]
pub async fn ping(client: &Client, database: &str) -> Result<()> {
    client
        .database(database)
        .run_command(doc! { "ping": 1 })
        .await?;

    debug!("Database connection test successful");

    Ok(())
}

/// Masks the password portion of a connection URL for logging.
pub fn mask_password(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    let Some((credentials, host)) = rest.rsplit_once('@') else {
        return url.to_string();
    };
    match credentials.split_once(':') {
        Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
        None => url.to_string(),
    }
}

//! MongoDB implementation of the `OperatorStorage` trait.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Bson, Document, doc};
use mongodb::options::ReturnDocument;
use mongodb::{Client, Collection};
use operator_repo_storage::{
    FindOptions, NewOperator, Operator, OperatorFilter, OperatorPatch, OperatorStorage,
    StorageError,
};
use tracing::{debug, instrument};

use crate::client::{create_client, ping};
use crate::config::MongoConfig;
use crate::convert::{
    decode_documents, document_to_operator, filter_document, patch_document, sort_document,
};
use crate::error::{MongoError, Result};

/// Operator storage backed by a MongoDB collection.
#[derive(Debug, Clone)]
pub struct MongoStorage {
    client: Client,
    database: String,
    collection: Collection<Document>,
}

impl MongoStorage {
    /// Creates a new storage from configuration.
    pub async fn new(config: MongoConfig) -> Result<Self> {
        let client = create_client(&config).await?;
        Ok(Self::from_client(client, &config))
    }

    /// Creates a new storage from an existing client.
    #[must_use]
    pub fn from_client(client: Client, config: &MongoConfig) -> Self {
        let collection = client
            .database(&config.database)
            .collection::<Document>(&config.collection);
        Self {
            client,
            database: config.database.clone(),
            collection,
        }
    }

    async fn insert_document(&self, operator: NewOperator) -> Result<Operator> {
        let document = bson::to_document(&operator)?;
        let inserted = self.collection.insert_one(document).await?;
        let id = match inserted.inserted_id {
            Bson::ObjectId(oid) => oid.to_hex(),
            Bson::String(id) => id,
            other => {
                return Err(MongoError::bson(format!(
                    "unexpected inserted id type: {:?}",
                    other.element_type()
                )));
            }
        };
        Ok(operator.with_id(id))
    }

    async fn find_one_document(&self, filter: &OperatorFilter) -> Result<Option<Operator>> {
        self.collection
            .find_one(filter_document(filter))
            .await?
            .map(document_to_operator)
            .transpose()
    }

    async fn find_documents(
        &self,
        filter: &OperatorFilter,
        options: &FindOptions,
    ) -> Result<Vec<Operator>> {
        let mut action = self
            .collection
            .find(filter_document(filter))
            .sort(sort_document(&options.sort))
            .skip(options.skip);
        if let Some(limit) = options.effective_limit() {
            action = action.limit(i64::try_from(limit).unwrap_or(i64::MAX));
        }

        let documents: Vec<Document> = action.await?.try_collect().await?;
        Ok(decode_documents(documents))
    }

    async fn update_document(
        &self,
        filter: &OperatorFilter,
        patch: &OperatorPatch,
    ) -> Result<Option<Operator>> {
        if patch.is_empty() {
            // `$set: {}` is rejected by the server
            return self.find_one_document(filter).await;
        }

        let set = patch_document(patch)?;
        self.collection
            .find_one_and_update(filter_document(filter), doc! { "$set": set })
            .return_document(ReturnDocument::After)
            .await?
            .map(document_to_operator)
            .transpose()
    }
}

#[async_trait]
impl OperatorStorage for MongoStorage {
    #[instrument(skip_all)]
    async fn insert(&self, operator: NewOperator) -> std::result::Result<Operator, StorageError> {
        let created = self.insert_document(operator).await?;
        debug!(id = %created.id, "inserted operator document");
        Ok(created)
    }

    async fn find_one(
        &self,
        filter: &OperatorFilter,
    ) -> std::result::Result<Option<Operator>, StorageError> {
        Ok(self.find_one_document(filter).await?)
    }

    #[instrument(skip_all, fields(sort = %options.sort, skip = options.skip, limit = options.limit))]
    async fn find(
        &self,
        filter: &OperatorFilter,
        options: &FindOptions,
    ) -> std::result::Result<Vec<Operator>, StorageError> {
        Ok(self.find_documents(filter, options).await?)
    }

    async fn count(&self, filter: &OperatorFilter) -> std::result::Result<u64, StorageError> {
        let count = self
            .collection
            .count_documents(filter_document(filter))
            .await
            .map_err(MongoError::from)?;
        Ok(count)
    }

    async fn find_one_and_update(
        &self,
        filter: &OperatorFilter,
        patch: &OperatorPatch,
    ) -> std::result::Result<Option<Operator>, StorageError> {
        Ok(self.update_document(filter, patch).await?)
    }

    async fn delete_one(&self, filter: &OperatorFilter) -> std::result::Result<bool, StorageError> {
        let result = self
            .collection
            .delete_one(filter_document(filter))
            .await
            .map_err(MongoError::from)?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_many(&self, filter: &OperatorFilter) -> std::result::Result<u64, StorageError> {
        let result = self
            .collection
            .delete_many(filter_document(filter))
            .await
            .map_err(MongoError::from)?;
        debug!(deleted = result.deleted_count, "deleted operator documents");
        Ok(result.deleted_count)
    }

    async fn ping(&self) -> std::result::Result<(), StorageError> {
        Ok(ping(&self.client, &self.database).await?)
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}

//! Collection handle.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use arango_core::protocol::RESPONSE_NOT_FOUND;
use arango_core::Result;

use super::entity::{CollectionEntity, DocumentMeta, IndexEntity};
use super::options::{CollectionCreateOptions, DocumentReadOptions, DocumentWriteOptions};
use super::request;
use crate::executor::{decode, Executor};

/// Operations on one collection and its documents.
#[derive(Debug, Clone)]
pub struct Collection {
    database: String,
    name: String,
    executor: Arc<Executor>,
}

impl Collection {
    pub(crate) fn new(
        executor: Arc<Executor>,
        database: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            database: database.into(),
            name: name.into(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub async fn info(&self) -> Result<CollectionEntity> {
        self.executor
            .execute(
                request::collection_info_request(&self.database, &self.name),
                decode::body(),
                None,
            )
            .await
    }

    /// Creates this collection.
    pub async fn create(&self, options: CollectionCreateOptions) -> Result<CollectionEntity> {
        let request = request::create_collection_request(&self.database, &self.name, &options)?;
        self.executor.execute(request, decode::body(), None).await
    }

    pub async fn drop(&self) -> Result<()> {
        let is_system = self.name.starts_with('_');
        self.executor
            .execute(
                request::drop_collection_request(&self.database, &self.name, is_system),
                decode::unit(),
                None,
            )
            .await
    }

    /// Removes all documents, keeping indexes.
    pub async fn truncate(&self) -> Result<CollectionEntity> {
        self.executor
            .execute(
                request::truncate_collection_request(&self.database, &self.name),
                decode::body(),
                None,
            )
            .await
    }

    pub async fn count(&self) -> Result<u64> {
        self.executor
            .execute(
                request::count_collection_request(&self.database, &self.name),
                decode::field("count"),
                None,
            )
            .await
    }

    pub async fn document<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.read_document(key, DocumentReadOptions::new()).await
    }

    pub async fn read_document<T: DeserializeOwned>(
        &self,
        key: &str,
        options: DocumentReadOptions,
    ) -> Result<T> {
        let request = request::document_request(&self.database, &self.name, key, &options);
        self.executor.execute(request, decode::body(), None).await
    }

    /// Returns whether a document with `key` exists. A 404 means it does not.
    pub async fn document_exists(&self, key: &str) -> Result<bool> {
        let request =
            request::document_exists_request(&self.database, &self.name, key, &DocumentReadOptions::new());
        match self.executor.execute(request, decode::unit(), None).await {
            Ok(()) => Ok(true),
            Err(e) if e.response_code() == Some(RESPONSE_NOT_FOUND) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn insert_document<T: Serialize + ?Sized>(
        &self,
        value: &T,
        options: DocumentWriteOptions,
    ) -> Result<DocumentMeta> {
        let request = request::insert_document_request(&self.database, &self.name, value, &options)?;
        self.executor.execute(request, decode::body(), None).await
    }

    pub async fn replace_document<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: DocumentWriteOptions,
    ) -> Result<DocumentMeta> {
        let request =
            request::replace_document_request(&self.database, &self.name, key, value, &options)?;
        self.executor.execute(request, decode::body(), None).await
    }

    /// Merges `value` into the stored document.
    pub async fn update_document<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        options: DocumentWriteOptions,
    ) -> Result<DocumentMeta> {
        let request =
            request::update_document_request(&self.database, &self.name, key, value, &options)?;
        self.executor.execute(request, decode::body(), None).await
    }

    pub async fn delete_document(
        &self,
        key: &str,
        options: DocumentWriteOptions,
    ) -> Result<DocumentMeta> {
        let request = request::delete_document_request(&self.database, &self.name, key, &options);
        self.executor.execute(request, decode::body(), None).await
    }

    /// Fetches an index. `id` may be the bare index id or `collection/id`.
    pub async fn index(&self, id: &str) -> Result<IndexEntity> {
        let id = self.index_id(id);
        self.executor
            .execute(request::index_request(&self.database, &id), decode::body(), None)
            .await
    }

    pub async fn delete_index(&self, id: &str) -> Result<String> {
        let id = self.index_id(id);
        self.executor
            .execute(
                request::delete_index_request(&self.database, &id),
                decode::field("id"),
                None,
            )
            .await
    }

    pub async fn indexes(&self) -> Result<Vec<IndexEntity>> {
        self.executor
            .execute(
                request::indexes_request(&self.database, &self.name),
                decode::field("indexes"),
                None,
            )
            .await
    }

    fn index_id(&self, id: &str) -> String {
        if id.contains('/') {
            id.to_string()
        } else {
            format!("{}/{}", self.name, id)
        }
    }
}

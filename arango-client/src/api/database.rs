//! Database handle.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use arango_core::protocol::RESPONSE_NOT_FOUND;
use arango_core::{ArangoError, Document, Result};

use super::collection::Collection;
use super::entity::{
    AqlFunctionEntity, ArangoVersion, CollectionEntity, CursorEntity, DatabaseEntity,
    EdgeDefinition, GraphEntity, IndexEntity, Permissions, QueryCacheProperties, QueryEntity,
    QueryTrackingProperties, TraversalEntity, ViewEntity, ViewType,
};
use super::graph::Graph;
use super::options::{
    CollectionCreateOptions, CollectionsReadOptions, DocumentReadOptions, ExplainOptions,
    GraphCreateOptions, QueryOptions, TransactionOptions, TraversalOptions,
};
use super::request;
use super::route::Route;
use super::view::View;
use crate::connection::HostHandle;
use crate::cursor::{Cursor, PinnedCursorExecute};
use crate::executor::{decode, Executor};

/// Operations on one database.
///
/// Cheap to clone; all handles of a client share its executor.
#[derive(Debug, Clone)]
pub struct Database {
    name: String,
    executor: Arc<Executor>,
}

impl Database {
    pub(crate) fn new(executor: Arc<Executor>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            executor,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Server version, as seen from this database.
    pub async fn version(&self) -> Result<ArangoVersion> {
        self.executor
            .execute(request::version_request(&self.name), decode::body(), None)
            .await
    }

    /// Returns whether the database exists.
    ///
    /// A 404 answer means it does not; any other failure is returned.
    pub async fn exists(&self) -> Result<bool> {
        match self.info().await {
            Ok(_) => Ok(true),
            Err(e) if e.response_code() == Some(RESPONSE_NOT_FOUND) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn info(&self) -> Result<DatabaseEntity> {
        self.executor
            .execute(
                request::database_info_request(&self.name),
                decode::field("result"),
                None,
            )
            .await
    }

    /// Creates this database on the server.
    pub async fn create(&self) -> Result<bool> {
        self.executor
            .execute(
                request::create_database_request(&self.name),
                decode::field("result"),
                None,
            )
            .await
    }

    pub async fn drop(&self) -> Result<bool> {
        self.executor
            .execute(
                request::drop_database_request(&self.name),
                decode::field("result"),
                None,
            )
            .await
    }

    /// Databases the current user can access.
    pub async fn accessible_databases(&self) -> Result<Vec<String>> {
        self.executor
            .execute(
                request::accessible_databases_request(&self.name),
                decode::field("result"),
                None,
            )
            .await
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection::new(Arc::clone(&self.executor), self.name.clone(), name)
    }

    pub async fn create_collection(
        &self,
        name: &str,
        options: CollectionCreateOptions,
    ) -> Result<CollectionEntity> {
        let request = request::create_collection_request(&self.name, name, &options)?;
        self.executor.execute(request, decode::body(), None).await
    }

    pub async fn collections(&self, options: CollectionsReadOptions) -> Result<Vec<CollectionEntity>> {
        self.executor
            .execute(
                request::collections_request(&self.name, options),
                decode::field("result"),
                None,
            )
            .await
    }

    /// Fetches an index by its full id (`collection/id`).
    pub async fn index(&self, id: &str) -> Result<IndexEntity> {
        self.executor
            .execute(request::index_request(&self.name, id), decode::body(), None)
            .await
    }

    /// Deletes an index and returns its id.
    pub async fn delete_index(&self, id: &str) -> Result<String> {
        self.executor
            .execute(
                request::delete_index_request(&self.name, id),
                decode::field("id"),
                None,
            )
            .await
    }

    /// Runs an AQL query and returns a cursor over its results.
    ///
    /// The cursor stays on the host that answered this request.
    pub async fn query<T: DeserializeOwned>(
        &self,
        query: &str,
        bind_vars: Option<Document>,
        options: QueryOptions,
    ) -> Result<Cursor<T>> {
        let request = request::query_request(&self.name, query, bind_vars, &options);
        self.open_cursor(request, options.allow_dirty_read).await
    }

    /// Resumes an existing server cursor by id.
    pub async fn cursor<T: DeserializeOwned>(&self, id: &str) -> Result<Cursor<T>> {
        let request = request::query_next_request(&self.name, id);
        self.open_cursor(request, false).await
    }

    async fn open_cursor<T: DeserializeOwned>(
        &self,
        request: arango_core::Request,
        dirty_read: bool,
    ) -> Result<Cursor<T>> {
        let handle = HostHandle::new();
        let first: CursorEntity = self
            .executor
            .execute(request, decode::body(), Some(&handle))
            .await?;
        let host = handle.get().ok_or_else(|| {
            ArangoError::Protocol("cursor response arrived without a host".to_string())
        })?;

        tracing::debug!(cursor = ?first.id, host = %host, has_more = first.has_more, "cursor opened");
        let execute = PinnedCursorExecute::new(
            Arc::clone(&self.executor),
            self.name.clone(),
            host,
            dirty_read,
        );
        Cursor::new(first, Arc::new(execute), *self.executor.decode_options())
    }

    /// Returns the execution plan of a query without running it.
    pub async fn explain_query(
        &self,
        query: &str,
        bind_vars: Option<Document>,
        options: ExplainOptions,
    ) -> Result<Document> {
        self.executor
            .execute(
                request::explain_query_request(&self.name, query, bind_vars, options),
                decode::document(),
                None,
            )
            .await
    }

    /// Parses a query and returns the syntax tree, collections and bind parameters.
    pub async fn parse_query(&self, query: &str) -> Result<Document> {
        self.executor
            .execute(
                request::parse_query_request(&self.name, query),
                decode::document(),
                None,
            )
            .await
    }

    pub async fn clear_query_cache(&self) -> Result<()> {
        self.executor
            .execute(
                request::clear_query_cache_request(&self.name),
                decode::unit(),
                None,
            )
            .await
    }

    pub async fn query_cache_properties(&self) -> Result<QueryCacheProperties> {
        self.executor
            .execute(
                request::query_cache_properties_request(&self.name),
                decode::body(),
                None,
            )
            .await
    }

    pub async fn set_query_cache_properties(
        &self,
        properties: &QueryCacheProperties,
    ) -> Result<QueryCacheProperties> {
        let request = request::set_query_cache_properties_request(&self.name, properties)?;
        self.executor.execute(request, decode::body(), None).await
    }

    pub async fn query_tracking_properties(&self) -> Result<QueryTrackingProperties> {
        self.executor
            .execute(
                request::query_tracking_properties_request(&self.name),
                decode::body(),
                None,
            )
            .await
    }

    pub async fn set_query_tracking_properties(
        &self,
        properties: &QueryTrackingProperties,
    ) -> Result<QueryTrackingProperties> {
        let request = request::set_query_tracking_properties_request(&self.name, properties)?;
        self.executor.execute(request, decode::body(), None).await
    }

    pub async fn current_queries(&self) -> Result<Vec<QueryEntity>> {
        self.executor
            .execute(
                request::current_queries_request(&self.name),
                decode::body(),
                None,
            )
            .await
    }

    pub async fn slow_queries(&self) -> Result<Vec<QueryEntity>> {
        self.executor
            .execute(request::slow_queries_request(&self.name), decode::body(), None)
            .await
    }

    pub async fn clear_slow_queries(&self) -> Result<()> {
        self.executor
            .execute(
                request::clear_slow_queries_request(&self.name),
                decode::unit(),
                None,
            )
            .await
    }

    pub async fn kill_query(&self, id: &str) -> Result<()> {
        self.executor
            .execute(
                request::kill_query_request(&self.name, id),
                decode::unit(),
                None,
            )
            .await
    }

    pub async fn create_aql_function(
        &self,
        name: &str,
        code: &str,
        is_deterministic: bool,
    ) -> Result<()> {
        self.executor
            .execute(
                request::create_aql_function_request(&self.name, name, code, is_deterministic),
                decode::unit(),
                None,
            )
            .await
    }

    /// Deletes a user function, or a whole namespace when `group` is set.
    /// Returns the number of functions deleted.
    pub async fn delete_aql_function(&self, name: &str, group: bool) -> Result<u64> {
        self.executor
            .execute(
                request::delete_aql_function_request(&self.name, name, group),
                decode::field("deletedCount"),
                None,
            )
            .await
    }

    pub async fn aql_functions(&self, namespace: Option<&str>) -> Result<Vec<AqlFunctionEntity>> {
        self.executor
            .execute(
                request::aql_functions_request(&self.name, namespace),
                decode::field("result"),
                None,
            )
            .await
    }

    pub fn graph(&self, name: impl Into<String>) -> Graph {
        Graph::new(Arc::clone(&self.executor), self.name.clone(), name)
    }

    pub async fn create_graph(
        &self,
        name: &str,
        edge_definitions: &[EdgeDefinition],
        options: GraphCreateOptions,
    ) -> Result<GraphEntity> {
        let request =
            request::create_graph_request(&self.name, name, edge_definitions, &options)?;
        self.executor
            .execute(request, decode::field("graph"), None)
            .await
    }

    pub async fn graphs(&self) -> Result<Vec<GraphEntity>> {
        self.executor
            .execute(
                request::graphs_request(&self.name),
                decode::field("graphs"),
                None,
            )
            .await
    }

    /// Runs a JavaScript transaction and decodes its return value.
    pub async fn transaction<T: DeserializeOwned>(
        &self,
        action: &str,
        options: TransactionOptions,
    ) -> Result<T> {
        let request = request::transaction_request(&self.name, action, &options)?;
        self.executor
            .execute(request, decode::field("result"), None)
            .await
    }

    /// Runs a server-side traversal and returns the visited vertices and paths.
    pub async fn traversal<V, E>(
        &self,
        options: &TraversalOptions,
    ) -> Result<TraversalEntity<V, E>>
    where
        V: DeserializeOwned,
        E: DeserializeOwned,
    {
        #[derive(Deserialize)]
        struct Traversal<V, E> {
            visited: TraversalEntity<V, E>,
        }

        let request = request::traversal_request(&self.name, options)?;
        let result: Traversal<V, E> = self
            .executor
            .execute(request, decode::field("result"), None)
            .await?;
        Ok(result.visited)
    }

    /// Reads a document by its handle (`collection/key`).
    pub async fn document<T: DeserializeOwned>(&self, id: &str) -> Result<T> {
        let (collection, key) = request::split_document_id(id)?;
        let request =
            request::document_request(&self.name, collection, key, &DocumentReadOptions::new());
        self.executor.execute(request, decode::body(), None).await
    }

    pub async fn views(&self) -> Result<Vec<ViewEntity>> {
        self.executor
            .execute(
                request::views_request(&self.name),
                decode::field("result"),
                None,
            )
            .await
    }

    pub fn view(&self, name: impl Into<String>) -> View {
        View::new(Arc::clone(&self.executor), self.name.clone(), name)
    }

    pub async fn create_view(&self, name: &str, view_type: ViewType) -> Result<ViewEntity> {
        self.executor
            .execute(
                request::create_view_request(&self.name, name, view_type),
                decode::body(),
                None,
            )
            .await
    }

    pub async fn grant_access(&self, user: &str, permissions: Permissions) -> Result<()> {
        self.executor
            .execute(
                request::grant_access_request(&self.name, user, permissions),
                decode::unit(),
                None,
            )
            .await
    }

    pub async fn revoke_access(&self, user: &str) -> Result<()> {
        self.grant_access(user, Permissions::None).await
    }

    /// Removes the user's explicit access level, falling back to the default.
    pub async fn reset_access(&self, user: &str) -> Result<()> {
        self.executor
            .execute(
                request::reset_access_request(&self.name, user),
                decode::unit(),
                None,
            )
            .await
    }

    pub async fn grant_default_collection_access(
        &self,
        user: &str,
        permissions: Permissions,
    ) -> Result<()> {
        self.executor
            .execute(
                request::grant_default_collection_access_request(&self.name, user, permissions),
                decode::unit(),
                None,
            )
            .await
    }

    /// The user's access level on this database.
    pub async fn permissions(&self, user: &str) -> Result<Permissions> {
        self.executor
            .execute(
                request::permissions_request(&self.name, user),
                decode::field("result"),
                None,
            )
            .await
    }

    /// A handle for a user-defined route below this database, built from
    /// the given path segments.
    pub fn route<S: AsRef<str>>(&self, segments: &[S]) -> Route {
        Route::new(
            Arc::clone(&self.executor),
            self.name.clone(),
            request::route_path(segments),
        )
    }

    pub async fn reload_routing(&self) -> Result<()> {
        self.executor
            .execute(
                request::reload_routing_request(&self.name),
                decode::unit(),
                None,
            )
            .await
    }
}

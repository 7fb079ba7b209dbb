//! Named graph handle.

use std::sync::Arc;

use arango_core::Result;

use super::entity::{EdgeDefinition, GraphEntity};
use super::options::GraphCreateOptions;
use super::request;
use crate::executor::{decode, Executor};

/// Operations on one named graph.
#[derive(Debug, Clone)]
pub struct Graph {
    database: String,
    name: String,
    executor: Arc<Executor>,
}

impl Graph {
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

    pub async fn create(
        &self,
        edge_definitions: &[EdgeDefinition],
        options: GraphCreateOptions,
    ) -> Result<GraphEntity> {
        let request =
            request::create_graph_request(&self.database, &self.name, edge_definitions, &options)?;
        self.executor
            .execute(request, decode::field("graph"), None)
            .await
    }

    pub async fn info(&self) -> Result<GraphEntity> {
        self.executor
            .execute(
                request::graph_info_request(&self.database, &self.name),
                decode::field("graph"),
                None,
            )
            .await
    }

    /// Drops the graph, and its collections too when `drop_collections` is set.
    pub async fn drop(&self, drop_collections: bool) -> Result<()> {
        self.executor
            .execute(
                request::drop_graph_request(&self.database, &self.name, drop_collections),
                decode::unit(),
                None,
            )
            .await
    }

    pub async fn vertex_collections(&self) -> Result<Vec<String>> {
        self.executor
            .execute(
                request::vertex_collections_request(&self.database, &self.name),
                decode::field("collections"),
                None,
            )
            .await
    }

    pub async fn add_vertex_collection(&self, collection: &str) -> Result<GraphEntity> {
        self.executor
            .execute(
                request::add_vertex_collection_request(&self.database, &self.name, collection),
                decode::field("graph"),
                None,
            )
            .await
    }

    /// Names of the graph's edge collections.
    pub async fn edge_definitions(&self) -> Result<Vec<String>> {
        self.executor
            .execute(
                request::edge_definitions_request(&self.database, &self.name),
                decode::field("collections"),
                None,
            )
            .await
    }

    pub async fn add_edge_definition(&self, definition: &EdgeDefinition) -> Result<GraphEntity> {
        let request = request::add_edge_definition_request(&self.database, &self.name, definition)?;
        self.executor
            .execute(request, decode::field("graph"), None)
            .await
    }

    pub async fn replace_edge_definition(
        &self,
        definition: &EdgeDefinition,
    ) -> Result<GraphEntity> {
        let request =
            request::replace_edge_definition_request(&self.database, &self.name, definition)?;
        self.executor
            .execute(request, decode::field("graph"), None)
            .await
    }

    pub async fn remove_edge_definition(
        &self,
        collection: &str,
        drop_collections: bool,
    ) -> Result<GraphEntity> {
        self.executor
            .execute(
                request::remove_edge_definition_request(
                    &self.database,
                    &self.name,
                    collection,
                    drop_collections,
                ),
                decode::field("graph"),
                None,
            )
            .await
    }
}

//! Optional parameters for façade operations.
//!
//! Each options type uses consuming setters, so calls read as
//! `QueryOptions::new().batch_size(100).count(true)`.

use std::time::Duration;

use serde::Serialize;

use arango_core::Document;

use super::entity::CollectionType;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionCreateOptions {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    collection_type: Option<CollectionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wait_for_sync: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    number_of_shards: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replication_factor: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    is_system: Option<bool>,
}

impl CollectionCreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection_type(mut self, collection_type: CollectionType) -> Self {
        self.collection_type = Some(collection_type);
        self
    }

    pub fn wait_for_sync(mut self, wait: bool) -> Self {
        self.wait_for_sync = Some(wait);
        self
    }

    pub fn number_of_shards(mut self, shards: u32) -> Self {
        self.number_of_shards = Some(shards);
        self
    }

    pub fn replication_factor(mut self, factor: u32) -> Self {
        self.replication_factor = Some(factor);
        self
    }

    pub fn is_system(mut self, system: bool) -> Self {
        self.is_system = Some(system);
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CollectionsReadOptions {
    pub(crate) exclude_system: bool,
}

impl CollectionsReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude_system(mut self, exclude: bool) -> Self {
        self.exclude_system = exclude;
        self
    }
}

/// Options for an AQL query.
///
/// Top-level fields go into the cursor request body; the rest are nested
/// under `options`. `allow_dirty_read` becomes a request header and lets
/// the query run on a follower.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub(crate) count: Option<bool>,
    pub(crate) batch_size: Option<u32>,
    pub(crate) ttl: Option<Duration>,
    pub(crate) cache: Option<bool>,
    pub(crate) memory_limit: Option<u64>,
    pub(crate) full_count: Option<bool>,
    pub(crate) max_runtime: Option<Duration>,
    pub(crate) stream: Option<bool>,
    pub(crate) fail_on_warning: Option<bool>,
    pub(crate) allow_dirty_read: bool,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the server for the total result count.
    pub fn count(mut self, count: bool) -> Self {
        self.count = Some(count);
        self
    }

    /// Maximum number of results per page.
    pub fn batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Server-side lifetime of an idle cursor.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn cache(mut self, cache: bool) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn memory_limit(mut self, bytes: u64) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    pub fn full_count(mut self, full_count: bool) -> Self {
        self.full_count = Some(full_count);
        self
    }

    pub fn max_runtime(mut self, max_runtime: Duration) -> Self {
        self.max_runtime = Some(max_runtime);
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = Some(stream);
        self
    }

    pub fn fail_on_warning(mut self, fail: bool) -> Self {
        self.fail_on_warning = Some(fail);
        self
    }

    pub fn allow_dirty_read(mut self, allow: bool) -> Self {
        self.allow_dirty_read = allow;
        self
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ExplainOptions {
    pub(crate) all_plans: Option<bool>,
    pub(crate) max_number_of_plans: Option<u32>,
}

impl ExplainOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all_plans(mut self, all: bool) -> Self {
        self.all_plans = Some(all);
        self
    }

    pub fn max_number_of_plans(mut self, max: u32) -> Self {
        self.max_number_of_plans = Some(max);
        self
    }
}

/// Options for document reads.
#[derive(Debug, Clone, Default)]
pub struct DocumentReadOptions {
    pub(crate) if_none_match: Option<String>,
    pub(crate) if_match: Option<String>,
    pub(crate) allow_dirty_read: bool,
}

impl DocumentReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn if_none_match(mut self, rev: impl Into<String>) -> Self {
        self.if_none_match = Some(rev.into());
        self
    }

    pub fn if_match(mut self, rev: impl Into<String>) -> Self {
        self.if_match = Some(rev.into());
        self
    }

    pub fn allow_dirty_read(mut self, allow: bool) -> Self {
        self.allow_dirty_read = allow;
        self
    }
}

/// Options shared by document insert, replace, update and delete.
#[derive(Debug, Clone, Default)]
pub struct DocumentWriteOptions {
    pub(crate) wait_for_sync: Option<bool>,
    pub(crate) return_new: Option<bool>,
    pub(crate) return_old: Option<bool>,
    pub(crate) overwrite: Option<bool>,
    pub(crate) keep_null: Option<bool>,
    pub(crate) merge_objects: Option<bool>,
    pub(crate) silent: Option<bool>,
    pub(crate) if_match: Option<String>,
}

impl DocumentWriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wait_for_sync(mut self, wait: bool) -> Self {
        self.wait_for_sync = Some(wait);
        self
    }

    pub fn return_new(mut self, return_new: bool) -> Self {
        self.return_new = Some(return_new);
        self
    }

    pub fn return_old(mut self, return_old: bool) -> Self {
        self.return_old = Some(return_old);
        self
    }

    /// For inserts: replace an existing document with the same key.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = Some(overwrite);
        self
    }

    /// For updates: keep attributes set to null instead of removing them.
    pub fn keep_null(mut self, keep_null: bool) -> Self {
        self.keep_null = Some(keep_null);
        self
    }

    pub fn merge_objects(mut self, merge: bool) -> Self {
        self.merge_objects = Some(merge);
        self
    }

    pub fn silent(mut self, silent: bool) -> Self {
        self.silent = Some(silent);
        self
    }

    /// Fails the write unless the stored revision matches.
    pub fn if_match(mut self, rev: impl Into<String>) -> Self {
        self.if_match = Some(rev.into());
        self
    }
}

/// Options for a JavaScript transaction.
#[derive(Debug, Clone, Default)]
pub struct TransactionOptions {
    pub(crate) read: Vec<String>,
    pub(crate) write: Vec<String>,
    pub(crate) exclusive: Vec<String>,
    pub(crate) params: Option<Document>,
    pub(crate) wait_for_sync: Option<bool>,
    pub(crate) lock_timeout: Option<Duration>,
    pub(crate) max_transaction_size: Option<u64>,
    pub(crate) allow_implicit: Option<bool>,
}

impl TransactionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read = collections.into_iter().map(Into::into).collect();
        self
    }

    pub fn write_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.write = collections.into_iter().map(Into::into).collect();
        self
    }

    pub fn exclusive_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusive = collections.into_iter().map(Into::into).collect();
        self
    }

    /// Value passed to the action as its single argument.
    pub fn params(mut self, params: impl Into<Document>) -> Self {
        self.params = Some(params.into());
        self
    }

    pub fn wait_for_sync(mut self, wait: bool) -> Self {
        self.wait_for_sync = Some(wait);
        self
    }

    pub fn lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    pub fn max_transaction_size(mut self, bytes: u64) -> Self {
        self.max_transaction_size = Some(bytes);
        self
    }

    pub fn allow_implicit(mut self, allow: bool) -> Self {
        self.allow_implicit = Some(allow);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct GraphCreateOptions {
    pub(crate) orphan_collections: Vec<String>,
    pub(crate) number_of_shards: Option<u32>,
    pub(crate) replication_factor: Option<u32>,
    pub(crate) wait_for_sync: Option<bool>,
}

impl GraphCreateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn orphan_collections<I, S>(mut self, collections: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orphan_collections = collections.into_iter().map(Into::into).collect();
        self
    }

    pub fn number_of_shards(mut self, shards: u32) -> Self {
        self.number_of_shards = Some(shards);
        self
    }

    pub fn replication_factor(mut self, factor: u32) -> Self {
        self.replication_factor = Some(factor);
        self
    }

    pub fn wait_for_sync(mut self, wait: bool) -> Self {
        self.wait_for_sync = Some(wait);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outbound,
    Inbound,
    Any,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TraversalStrategy {
    DepthFirst,
    BreadthFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TraversalOrder {
    #[serde(rename = "preorder")]
    Preorder,
    #[serde(rename = "postorder")]
    Postorder,
    #[serde(rename = "preorder-expander")]
    PreorderExpander,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemOrder {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Uniqueness {
    None,
    Global,
    Path,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct TraversalUniqueness {
    #[serde(skip_serializing_if = "Option::is_none")]
    vertices: Option<Uniqueness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edges: Option<Uniqueness>,
}

/// Options for a server-side graph traversal.
///
/// Either `graph_name` or `edge_collection` selects the edges to follow.
/// The JavaScript hooks (`filter`, `visitor`, `init`, `expander`, `sort`)
/// are sent verbatim as function bodies.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalOptions {
    start_vertex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    graph_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edge_collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    direction: Option<Direction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    min_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_depth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    strategy: Option<TraversalStrategy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    order: Option<TraversalOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    item_order: Option<ItemOrder>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uniqueness: Option<TraversalUniqueness>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_iterations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visitor: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    init: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expander: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    sort: Option<String>,
}

impl TraversalOptions {
    pub fn new(start_vertex: impl Into<String>) -> Self {
        Self {
            start_vertex: start_vertex.into(),
            ..Self::default()
        }
    }

    pub(crate) fn has_edge_source(&self) -> bool {
        self.graph_name.is_some() || self.edge_collection.is_some()
    }

    pub fn graph_name(mut self, graph: impl Into<String>) -> Self {
        self.graph_name = Some(graph.into());
        self
    }

    pub fn edge_collection(mut self, collection: impl Into<String>) -> Self {
        self.edge_collection = Some(collection.into());
        self
    }

    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = Some(direction);
        self
    }

    pub fn min_depth(mut self, depth: u32) -> Self {
        self.min_depth = Some(depth);
        self
    }

    pub fn max_depth(mut self, depth: u32) -> Self {
        self.max_depth = Some(depth);
        self
    }

    pub fn strategy(mut self, strategy: TraversalStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn order(mut self, order: TraversalOrder) -> Self {
        self.order = Some(order);
        self
    }

    pub fn item_order(mut self, order: ItemOrder) -> Self {
        self.item_order = Some(order);
        self
    }

    pub fn vertex_uniqueness(mut self, uniqueness: Uniqueness) -> Self {
        self.uniqueness.get_or_insert_with(Default::default).vertices = Some(uniqueness);
        self
    }

    pub fn edge_uniqueness(mut self, uniqueness: Uniqueness) -> Self {
        self.uniqueness.get_or_insert_with(Default::default).edges = Some(uniqueness);
        self
    }

    pub fn max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = Some(max);
        self
    }

    pub fn filter(mut self, body: impl Into<String>) -> Self {
        self.filter = Some(body.into());
        self
    }

    pub fn visitor(mut self, body: impl Into<String>) -> Self {
        self.visitor = Some(body.into());
        self
    }

    pub fn init(mut self, body: impl Into<String>) -> Self {
        self.init = Some(body.into());
        self
    }

    pub fn expander(mut self, body: impl Into<String>) -> Self {
        self.expander = Some(body.into());
        self
    }

    pub fn sort(mut self, body: impl Into<String>) -> Self {
        self.sort = Some(body.into());
        self
    }
}

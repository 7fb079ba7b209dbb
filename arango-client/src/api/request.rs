//! Free functions that build the request for each server endpoint.
//!
//! Nothing here performs I/O; façade handles pair each request with a
//! decoder and hand both to the executor.

use serde::Serialize;

use arango_core::protocol::{Method, Request};
use arango_core::{to_document, ArangoError, Document, Result};

use super::entity::{
    EdgeDefinition, Permissions, QueryCacheProperties, QueryTrackingProperties, ViewType,
};
use super::options::{
    CollectionCreateOptions, CollectionsReadOptions, DocumentReadOptions, DocumentWriteOptions,
    ExplainOptions, GraphCreateOptions, QueryOptions, TransactionOptions, TraversalOptions,
};

/// Database used for server-wide operations.
pub const SYSTEM_DATABASE: &str = "_system";

const PATH_API_VERSION: &str = "/_api/version";
const PATH_API_DATABASE: &str = "/_api/database";
const PATH_API_COLLECTION: &str = "/_api/collection";
const PATH_API_DOCUMENT: &str = "/_api/document";
const PATH_API_INDEX: &str = "/_api/index";
const PATH_API_CURSOR: &str = "/_api/cursor";
const PATH_API_EXPLAIN: &str = "/_api/explain";
const PATH_API_QUERY: &str = "/_api/query";
const PATH_API_QUERY_CACHE: &str = "/_api/query-cache";
const PATH_API_AQLFUNCTION: &str = "/_api/aqlfunction";
const PATH_API_GHARIAL: &str = "/_api/gharial";
const PATH_API_TRANSACTION: &str = "/_api/transaction";
const PATH_API_TRAVERSAL: &str = "/_api/traversal";
const PATH_API_VIEW: &str = "/_api/view";
const PATH_API_USER: &str = "/_api/user";
const PATH_API_CLUSTER_ENDPOINTS: &str = "/_api/cluster/endpoints";
const PATH_ADMIN_ROUTING_RELOAD: &str = "/_admin/routing/reload";

const HEADER_IF_MATCH: &str = "if-match";
const HEADER_IF_NONE_MATCH: &str = "if-none-match";

/// Splits a document handle `collection/key` into its parts.
pub fn split_document_id(id: &str) -> Result<(&str, &str)> {
    match id.split_once('/') {
        Some((collection, key))
            if !collection.is_empty() && !key.is_empty() && !key.contains('/') =>
        {
            Ok((collection, key))
        }
        _ => Err(ArangoError::Configuration(format!(
            "document id must have the form 'collection/key', got '{}'",
            id
        ))),
    }
}

/// Copies the entries of `extra` into `target`. Both must be objects.
fn merge(mut target: Document, extra: Document) -> Document {
    if let Document::Object(entries) = extra {
        for (key, value) in entries {
            target.insert(key, value);
        }
    }
    target
}

// server

pub fn version_request(database: &str) -> Request {
    Request::new(database, Method::Get, PATH_API_VERSION)
}

pub fn cluster_endpoints_request() -> Request {
    Request::new(SYSTEM_DATABASE, Method::Get, PATH_API_CLUSTER_ENDPOINTS)
}

pub fn create_database_request(name: &str) -> Request {
    Request::new(SYSTEM_DATABASE, Method::Post, PATH_API_DATABASE)
        .body(Document::object().with("name", name))
}

pub fn drop_database_request(name: &str) -> Request {
    Request::new(
        SYSTEM_DATABASE,
        Method::Delete,
        format!("{}/{}", PATH_API_DATABASE, name),
    )
}

pub fn databases_request() -> Request {
    Request::new(SYSTEM_DATABASE, Method::Get, PATH_API_DATABASE)
}

pub fn accessible_databases_request(database: &str) -> Request {
    Request::new(database, Method::Get, format!("{}/user", PATH_API_DATABASE))
}

pub fn database_info_request(database: &str) -> Request {
    Request::new(database, Method::Get, format!("{}/current", PATH_API_DATABASE))
}

pub fn reload_routing_request(database: &str) -> Request {
    Request::new(database, Method::Post, PATH_ADMIN_ROUTING_RELOAD)
}

pub fn grant_access_request(database: &str, user: &str, permissions: Permissions) -> Request {
    Request::new(
        SYSTEM_DATABASE,
        Method::Put,
        format!("{}/{}/database/{}", PATH_API_USER, user, database),
    )
    .body(Document::object().with("grant", permissions.as_str()))
}

pub fn reset_access_request(database: &str, user: &str) -> Request {
    Request::new(
        SYSTEM_DATABASE,
        Method::Delete,
        format!("{}/{}/database/{}", PATH_API_USER, user, database),
    )
}

/// Sets the user's access level for every collection of the database.
pub fn grant_default_collection_access_request(
    database: &str,
    user: &str,
    permissions: Permissions,
) -> Request {
    Request::new(
        SYSTEM_DATABASE,
        Method::Put,
        format!("{}/{}/database/{}/*", PATH_API_USER, user, database),
    )
    .body(Document::object().with("grant", permissions.as_str()))
}

pub fn permissions_request(database: &str, user: &str) -> Request {
    Request::new(
        database,
        Method::Get,
        format!("{}/{}/database/{}", PATH_API_USER, user, database),
    )
}

// user-defined routes

/// Joins route segments into one absolute path, dropping empty segments.
pub fn route_path<S: AsRef<str>>(segments: &[S]) -> String {
    let mut path = String::new();
    for segment in segments {
        for part in segment.as_ref().split('/').filter(|p| !p.is_empty()) {
            path.push('/');
            path.push_str(part);
        }
    }
    if path.is_empty() {
        path.push('/');
    }
    path
}

pub fn route_request(
    database: &str,
    method: Method,
    path: &str,
    headers: &[(String, String)],
    query: &[(String, String)],
    body: Option<&Document>,
) -> Request {
    let mut request = Request::new(database, method, path);
    for (key, value) in headers {
        request = request.header(key.as_str(), value.as_str());
    }
    for (key, value) in query {
        request = request.query(key.as_str(), value);
    }
    match body {
        Some(body) => request.body(body.clone()),
        None => request,
    }
}

// collections

pub fn create_collection_request(
    database: &str,
    name: &str,
    options: &CollectionCreateOptions,
) -> Result<Request> {
    let body = merge(Document::object().with("name", name), to_document(options)?);
    Ok(Request::new(database, Method::Post, PATH_API_COLLECTION).body(body))
}

pub fn collections_request(database: &str, options: CollectionsReadOptions) -> Request {
    Request::new(database, Method::Get, PATH_API_COLLECTION)
        .query("excludeSystem", options.exclude_system)
}

pub fn collection_info_request(database: &str, name: &str) -> Request {
    Request::new(
        database,
        Method::Get,
        format!("{}/{}", PATH_API_COLLECTION, name),
    )
}

pub fn drop_collection_request(database: &str, name: &str, is_system: bool) -> Request {
    let request = Request::new(
        database,
        Method::Delete,
        format!("{}/{}", PATH_API_COLLECTION, name),
    );
    if is_system {
        request.query("isSystem", true)
    } else {
        request
    }
}

pub fn truncate_collection_request(database: &str, name: &str) -> Request {
    Request::new(
        database,
        Method::Put,
        format!("{}/{}/truncate", PATH_API_COLLECTION, name),
    )
}

pub fn count_collection_request(database: &str, name: &str) -> Request {
    Request::new(
        database,
        Method::Get,
        format!("{}/{}/count", PATH_API_COLLECTION, name),
    )
}

// documents

fn document_path(collection: &str, key: &str) -> String {
    format!("{}/{}/{}", PATH_API_DOCUMENT, collection, key)
}

fn apply_read_options(request: Request, options: &DocumentReadOptions) -> Request {
    let mut request = request.dirty_read(options.allow_dirty_read);
    if let Some(rev) = &options.if_none_match {
        request = request.header(HEADER_IF_NONE_MATCH, rev.as_str());
    }
    if let Some(rev) = &options.if_match {
        request = request.header(HEADER_IF_MATCH, rev.as_str());
    }
    request
}

fn apply_write_options(request: Request, options: &DocumentWriteOptions) -> Request {
    let mut request = request
        .query_opt("waitForSync", options.wait_for_sync)
        .query_opt("returnNew", options.return_new)
        .query_opt("returnOld", options.return_old)
        .query_opt("overwrite", options.overwrite)
        .query_opt("keepNull", options.keep_null)
        .query_opt("mergeObjects", options.merge_objects)
        .query_opt("silent", options.silent);
    if let Some(rev) = &options.if_match {
        request = request.header(HEADER_IF_MATCH, rev.as_str());
    }
    request
}

pub fn document_request(
    database: &str,
    collection: &str,
    key: &str,
    options: &DocumentReadOptions,
) -> Request {
    let request = Request::new(database, Method::Get, document_path(collection, key));
    apply_read_options(request, options)
}

pub fn document_exists_request(
    database: &str,
    collection: &str,
    key: &str,
    options: &DocumentReadOptions,
) -> Request {
    let request = Request::new(database, Method::Head, document_path(collection, key));
    apply_read_options(request, options)
}

pub fn insert_document_request<T: Serialize + ?Sized>(
    database: &str,
    collection: &str,
    value: &T,
    options: &DocumentWriteOptions,
) -> Result<Request> {
    let request = Request::new(
        database,
        Method::Post,
        format!("{}/{}", PATH_API_DOCUMENT, collection),
    )
    .body(to_document(value)?);
    Ok(apply_write_options(request, options))
}

pub fn replace_document_request<T: Serialize + ?Sized>(
    database: &str,
    collection: &str,
    key: &str,
    value: &T,
    options: &DocumentWriteOptions,
) -> Result<Request> {
    let request = Request::new(database, Method::Put, document_path(collection, key))
        .body(to_document(value)?);
    Ok(apply_write_options(request, options))
}

pub fn update_document_request<T: Serialize + ?Sized>(
    database: &str,
    collection: &str,
    key: &str,
    value: &T,
    options: &DocumentWriteOptions,
) -> Result<Request> {
    let request = Request::new(database, Method::Patch, document_path(collection, key))
        .body(to_document(value)?);
    Ok(apply_write_options(request, options))
}

pub fn delete_document_request(
    database: &str,
    collection: &str,
    key: &str,
    options: &DocumentWriteOptions,
) -> Request {
    let request = Request::new(database, Method::Delete, document_path(collection, key));
    apply_write_options(request, options)
}

// indexes

pub fn index_request(database: &str, id: &str) -> Request {
    Request::new(database, Method::Get, format!("{}/{}", PATH_API_INDEX, id))
}

pub fn delete_index_request(database: &str, id: &str) -> Request {
    Request::new(database, Method::Delete, format!("{}/{}", PATH_API_INDEX, id))
}

pub fn indexes_request(database: &str, collection: &str) -> Request {
    Request::new(database, Method::Get, PATH_API_INDEX).query("collection", collection)
}

// queries

pub fn query_request(
    database: &str,
    query: &str,
    bind_vars: Option<Document>,
    options: &QueryOptions,
) -> Request {
    let mut body = Document::object().with("query", query);
    if let Some(bind_vars) = bind_vars {
        body.insert("bindVars", bind_vars);
    }
    if let Some(count) = options.count {
        body.insert("count", count);
    }
    if let Some(batch_size) = options.batch_size {
        body.insert("batchSize", batch_size);
    }
    if let Some(ttl) = options.ttl {
        body.insert("ttl", ttl.as_secs());
    }
    if let Some(cache) = options.cache {
        body.insert("cache", cache);
    }
    if let Some(memory_limit) = options.memory_limit {
        body.insert("memoryLimit", memory_limit);
    }

    let mut nested = Document::object();
    if let Some(full_count) = options.full_count {
        nested.insert("fullCount", full_count);
    }
    if let Some(max_runtime) = options.max_runtime {
        nested.insert("maxRuntime", max_runtime.as_secs_f64());
    }
    if let Some(stream) = options.stream {
        nested.insert("stream", stream);
    }
    if let Some(fail) = options.fail_on_warning {
        nested.insert("failOnWarning", fail);
    }
    if nested.as_object().is_some_and(|entries| !entries.is_empty()) {
        body.insert("options", nested);
    }

    Request::new(database, Method::Post, PATH_API_CURSOR)
        .body(body)
        .dirty_read(options.allow_dirty_read)
}

pub fn query_next_request(database: &str, id: &str) -> Request {
    Request::new(database, Method::Post, format!("{}/{}", PATH_API_CURSOR, id))
}

pub fn query_close_request(database: &str, id: &str) -> Request {
    Request::new(database, Method::Delete, format!("{}/{}", PATH_API_CURSOR, id))
}

pub fn explain_query_request(
    database: &str,
    query: &str,
    bind_vars: Option<Document>,
    options: ExplainOptions,
) -> Request {
    let mut body = Document::object().with("query", query);
    if let Some(bind_vars) = bind_vars {
        body.insert("bindVars", bind_vars);
    }
    let mut nested = Document::object();
    if let Some(all) = options.all_plans {
        nested.insert("allPlans", all);
    }
    if let Some(max) = options.max_number_of_plans {
        nested.insert("maxNumberOfPlans", max);
    }
    body.insert("options", nested);
    Request::new(database, Method::Post, PATH_API_EXPLAIN).body(body)
}

pub fn parse_query_request(database: &str, query: &str) -> Request {
    Request::new(database, Method::Post, PATH_API_QUERY).body(Document::object().with("query", query))
}

pub fn clear_query_cache_request(database: &str) -> Request {
    Request::new(database, Method::Delete, PATH_API_QUERY_CACHE)
}

pub fn query_cache_properties_request(database: &str) -> Request {
    Request::new(
        database,
        Method::Get,
        format!("{}/properties", PATH_API_QUERY_CACHE),
    )
}

pub fn set_query_cache_properties_request(
    database: &str,
    properties: &QueryCacheProperties,
) -> Result<Request> {
    Ok(Request::new(
        database,
        Method::Put,
        format!("{}/properties", PATH_API_QUERY_CACHE),
    )
    .body(to_document(properties)?))
}

pub fn current_queries_request(database: &str) -> Request {
    Request::new(database, Method::Get, format!("{}/current", PATH_API_QUERY))
}

pub fn slow_queries_request(database: &str) -> Request {
    Request::new(database, Method::Get, format!("{}/slow", PATH_API_QUERY))
}

pub fn clear_slow_queries_request(database: &str) -> Request {
    Request::new(database, Method::Delete, format!("{}/slow", PATH_API_QUERY))
}

pub fn query_tracking_properties_request(database: &str) -> Request {
    Request::new(database, Method::Get, format!("{}/properties", PATH_API_QUERY))
}

pub fn set_query_tracking_properties_request(
    database: &str,
    properties: &QueryTrackingProperties,
) -> Result<Request> {
    Ok(
        Request::new(database, Method::Put, format!("{}/properties", PATH_API_QUERY))
            .body(to_document(properties)?),
    )
}

pub fn kill_query_request(database: &str, id: &str) -> Request {
    Request::new(database, Method::Delete, format!("{}/{}", PATH_API_QUERY, id))
}

// AQL user functions

pub fn create_aql_function_request(
    database: &str,
    name: &str,
    code: &str,
    is_deterministic: bool,
) -> Request {
    Request::new(database, Method::Post, PATH_API_AQLFUNCTION).body(
        Document::object()
            .with("name", name)
            .with("code", code)
            .with("isDeterministic", is_deterministic),
    )
}

pub fn delete_aql_function_request(database: &str, name: &str, group: bool) -> Request {
    Request::new(
        database,
        Method::Delete,
        format!("{}/{}", PATH_API_AQLFUNCTION, name),
    )
    .query("group", group)
}

pub fn aql_functions_request(database: &str, namespace: Option<&str>) -> Request {
    Request::new(database, Method::Get, PATH_API_AQLFUNCTION).query_opt("namespace", namespace)
}

// graphs

fn graph_path(name: &str) -> String {
    format!("{}/{}", PATH_API_GHARIAL, name)
}

pub fn graphs_request(database: &str) -> Request {
    Request::new(database, Method::Get, PATH_API_GHARIAL)
}

pub fn create_graph_request(
    database: &str,
    name: &str,
    edge_definitions: &[EdgeDefinition],
    options: &GraphCreateOptions,
) -> Result<Request> {
    let mut body = Document::object()
        .with("name", name)
        .with("edgeDefinitions", to_document(edge_definitions)?);
    if !options.orphan_collections.is_empty() {
        body.insert("orphanCollections", to_document(&options.orphan_collections)?);
    }
    let mut nested = Document::object();
    if let Some(shards) = options.number_of_shards {
        nested.insert("numberOfShards", shards);
    }
    if let Some(factor) = options.replication_factor {
        nested.insert("replicationFactor", factor);
    }
    if nested.as_object().is_some_and(|entries| !entries.is_empty()) {
        body.insert("options", nested);
    }
    Ok(Request::new(database, Method::Post, PATH_API_GHARIAL)
        .body(body)
        .query_opt("waitForSync", options.wait_for_sync))
}

pub fn graph_info_request(database: &str, name: &str) -> Request {
    Request::new(database, Method::Get, graph_path(name))
}

pub fn drop_graph_request(database: &str, name: &str, drop_collections: bool) -> Request {
    Request::new(database, Method::Delete, graph_path(name))
        .query("dropCollections", drop_collections)
}

pub fn vertex_collections_request(database: &str, graph: &str) -> Request {
    Request::new(database, Method::Get, format!("{}/vertex", graph_path(graph)))
}

pub fn add_vertex_collection_request(database: &str, graph: &str, collection: &str) -> Request {
    Request::new(database, Method::Post, format!("{}/vertex", graph_path(graph)))
        .body(Document::object().with("collection", collection))
}

pub fn edge_definitions_request(database: &str, graph: &str) -> Request {
    Request::new(database, Method::Get, format!("{}/edge", graph_path(graph)))
}

pub fn add_edge_definition_request(
    database: &str,
    graph: &str,
    definition: &EdgeDefinition,
) -> Result<Request> {
    Ok(
        Request::new(database, Method::Post, format!("{}/edge", graph_path(graph)))
            .body(to_document(definition)?),
    )
}

pub fn replace_edge_definition_request(
    database: &str,
    graph: &str,
    definition: &EdgeDefinition,
) -> Result<Request> {
    Ok(Request::new(
        database,
        Method::Put,
        format!("{}/edge/{}", graph_path(graph), definition.collection),
    )
    .body(to_document(definition)?))
}

pub fn remove_edge_definition_request(
    database: &str,
    graph: &str,
    collection: &str,
    drop_collections: bool,
) -> Request {
    Request::new(
        database,
        Method::Delete,
        format!("{}/edge/{}", graph_path(graph), collection),
    )
    .query("dropCollections", drop_collections)
}

// transactions

pub fn transaction_request(database: &str, action: &str, options: &TransactionOptions) -> Result<Request> {
    let collections = Document::object()
        .with("read", to_document(&options.read)?)
        .with("write", to_document(&options.write)?)
        .with("exclusive", to_document(&options.exclusive)?);
    let mut body = Document::object()
        .with("collections", collections)
        .with("action", action);
    if let Some(params) = &options.params {
        body.insert("params", params.clone());
    }
    if let Some(wait) = options.wait_for_sync {
        body.insert("waitForSync", wait);
    }
    if let Some(timeout) = options.lock_timeout {
        body.insert("lockTimeout", timeout.as_secs());
    }
    if let Some(size) = options.max_transaction_size {
        body.insert("maxTransactionSize", size);
    }
    if let Some(allow) = options.allow_implicit {
        body.insert("allowImplicit", allow);
    }
    Ok(Request::new(database, Method::Post, PATH_API_TRANSACTION).body(body))
}

// traversals

pub fn traversal_request(database: &str, options: &TraversalOptions) -> Result<Request> {
    if !options.has_edge_source() {
        return Err(ArangoError::Configuration(
            "traversal needs a graph name or an edge collection".to_string(),
        ));
    }
    Ok(Request::new(database, Method::Post, PATH_API_TRAVERSAL).body(to_document(options)?))
}

// views

fn view_path(name: &str) -> String {
    format!("{}/{}", PATH_API_VIEW, name)
}

pub fn views_request(database: &str) -> Request {
    Request::new(database, Method::Get, PATH_API_VIEW)
}

pub fn create_view_request(database: &str, name: &str, view_type: ViewType) -> Request {
    Request::new(database, Method::Post, PATH_API_VIEW).body(
        Document::object()
            .with("name", name)
            .with("type", String::from(view_type)),
    )
}

pub fn view_info_request(database: &str, name: &str) -> Request {
    Request::new(database, Method::Get, view_path(name))
}

pub fn drop_view_request(database: &str, name: &str) -> Request {
    Request::new(database, Method::Delete, view_path(name))
}

pub fn rename_view_request(database: &str, name: &str, new_name: &str) -> Request {
    Request::new(database, Method::Put, format!("{}/rename", view_path(name)))
        .body(Document::object().with("name", new_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use arango_core::protocol::HEADER_ALLOW_DIRTY_READ;

    #[test]
    fn test_split_document_id() {
        assert_eq!(split_document_id("users/42").unwrap(), ("users", "42"));
        assert!(split_document_id("users").is_err());
        assert!(split_document_id("/42").is_err());
        assert!(split_document_id("users/").is_err());
        assert!(split_document_id("a/b/c").is_err());
    }

    #[test]
    fn test_create_database_goes_to_system() {
        let request = create_database_request("shop");
        assert_eq!(request.database_name(), SYSTEM_DATABASE);
        assert_eq!(request.method(), Method::Post);
        let body = request.body_document().unwrap().unwrap();
        assert_eq!(body.get("name").and_then(Document::as_str), Some("shop"));
    }

    #[test]
    fn test_create_collection_merges_options() {
        let options = CollectionCreateOptions::new()
            .collection_type(super::super::entity::CollectionType::Edge)
            .wait_for_sync(true);
        let request = create_collection_request("db", "edges", &options).unwrap();
        let body = request.body_document().unwrap().unwrap();
        assert_eq!(body.get("name").and_then(Document::as_str), Some("edges"));
        assert_eq!(body.get("type").and_then(Document::as_i64), Some(3));
        assert_eq!(body.get("waitForSync").and_then(Document::as_bool), Some(true));
        assert!(body.get("numberOfShards").is_none());
    }

    #[test]
    fn test_query_request_body() {
        let options = QueryOptions::new()
            .batch_size(100)
            .count(true)
            .full_count(true)
            .allow_dirty_read(true);
        let request = query_request(
            "db",
            "FOR i IN 1..250 RETURN i",
            Some(Document::object().with("x", 1)),
            &options,
        );
        assert_eq!(request.path(), "/_api/cursor");
        assert!(request.is_dirty_read());
        assert_eq!(request.header_value(HEADER_ALLOW_DIRTY_READ), Some("true"));

        let body = request.body_document().unwrap().unwrap();
        let keys: Vec<&str> = body
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["query", "bindVars", "count", "batchSize", "options"]);
        let nested = body.get("options").unwrap();
        assert_eq!(nested.get("fullCount").and_then(Document::as_bool), Some(true));
    }

    #[test]
    fn test_query_request_without_nested_options() {
        let request = query_request("db", "RETURN 1", None, &QueryOptions::new());
        let body = request.body_document().unwrap().unwrap();
        assert!(body.get("options").is_none());
        assert!(!request.is_dirty_read());
    }

    #[test]
    fn test_write_options_as_query_params() {
        let options = DocumentWriteOptions::new()
            .return_new(true)
            .wait_for_sync(false)
            .if_match("_rev1");
        let request = delete_document_request("db", "users", "1", &options);
        assert_eq!(request.path(), "/_api/document/users/1");
        assert_eq!(
            request.query_params(),
            &[
                ("waitForSync".to_string(), "false".to_string()),
                ("returnNew".to_string(), "true".to_string()),
            ]
        );
        assert_eq!(request.header_value("if-match"), Some("_rev1"));
    }

    #[test]
    fn test_transaction_request() {
        let options = TransactionOptions::new()
            .write_collections(["users"])
            .params(5);
        let request = transaction_request("db", "function (p) { return p; }", &options).unwrap();
        let body = request.body_document().unwrap().unwrap();
        let write = body.get("collections").and_then(|c| c.get("write")).unwrap();
        assert_eq!(write.as_array().map(|a| a.len()), Some(1));
        assert_eq!(body.get("params").and_then(Document::as_i64), Some(5));
    }

    #[test]
    fn test_grant_access_request() {
        let request = grant_access_request("shop", "alice", Permissions::ReadOnly);
        assert_eq!(request.path(), "/_api/user/alice/database/shop");
        assert_eq!(request.method(), Method::Put);
        let body = request.body_document().unwrap().unwrap();
        assert_eq!(body.get("grant").and_then(Document::as_str), Some("ro"));
    }

    #[test]
    fn test_default_collection_access_request() {
        let request =
            grant_default_collection_access_request("shop", "alice", Permissions::ReadWrite);
        assert_eq!(request.database_name(), SYSTEM_DATABASE);
        assert_eq!(request.method(), Method::Put);
        assert_eq!(request.path(), "/_api/user/alice/database/shop/*");
        let body = request.body_document().unwrap().unwrap();
        assert_eq!(body.get("grant").and_then(Document::as_str), Some("rw"));
    }

    #[test]
    fn test_permissions_request() {
        let request = permissions_request("shop", "alice");
        assert_eq!(request.database_name(), "shop");
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/_api/user/alice/database/shop");
        assert!(request.body_ref().is_none());
    }

    #[test]
    fn test_query_tracking_requests() {
        let request = query_tracking_properties_request("db");
        assert_eq!(request.method(), Method::Get);
        assert_eq!(request.path(), "/_api/query/properties");

        let properties = QueryTrackingProperties {
            enabled: true,
            track_slow_queries: true,
            max_slow_queries: 64,
            slow_query_threshold: 2.5,
            ..Default::default()
        };
        let request = set_query_tracking_properties_request("db", &properties).unwrap();
        assert_eq!(request.method(), Method::Put);
        let body = request.body_document().unwrap().unwrap();
        assert_eq!(body.get("trackSlowQueries").and_then(Document::as_bool), Some(true));
        assert_eq!(body.get("maxSlowQueries").and_then(Document::as_i64), Some(64));
        assert_eq!(body.get("slowQueryThreshold").and_then(Document::as_f64), Some(2.5));
    }

    #[test]
    fn test_traversal_request_body() {
        use super::super::options::{Direction, Uniqueness};

        let options = TraversalOptions::new("persons/alice")
            .graph_name("knows_graph")
            .direction(Direction::Outbound)
            .max_depth(2)
            .vertex_uniqueness(Uniqueness::Global);
        let request = traversal_request("db", &options).unwrap();
        assert_eq!(request.method(), Method::Post);
        assert_eq!(request.path(), "/_api/traversal");

        let body = request.body_document().unwrap().unwrap();
        assert_eq!(
            body.get("startVertex").and_then(Document::as_str),
            Some("persons/alice")
        );
        assert_eq!(body.get("graphName").and_then(Document::as_str), Some("knows_graph"));
        assert_eq!(body.get("direction").and_then(Document::as_str), Some("outbound"));
        assert_eq!(body.get("maxDepth").and_then(Document::as_i64), Some(2));
        let uniqueness = body.get("uniqueness").unwrap();
        assert_eq!(uniqueness.get("vertices").and_then(Document::as_str), Some("global"));
        assert!(uniqueness.get("edges").is_none());
        assert!(body.get("edgeCollection").is_none());
    }

    #[test]
    fn test_traversal_request_needs_edge_source() {
        let options = TraversalOptions::new("persons/alice");
        assert!(matches!(
            traversal_request("db", &options),
            Err(ArangoError::Configuration(_))
        ));
    }

    #[test]
    fn test_route_path_joins_segments() {
        assert_eq!(route_path(&["_admin", "echo"]), "/_admin/echo");
        assert_eq!(route_path(&["/my-service/", "/items/1"]), "/my-service/items/1");
        assert_eq!(route_path::<&str>(&[]), "/");
    }

    #[test]
    fn test_route_request_carries_headers_query_and_body() {
        let headers = vec![("x-trace".to_string(), "abc".to_string())];
        let query = vec![("limit".to_string(), "5".to_string())];
        let body = Document::object().with("name", "lamp");
        let request = route_request(
            "shop",
            Method::Patch,
            "/my-service/items",
            &headers,
            &query,
            Some(&body),
        );
        assert_eq!(request.database_name(), "shop");
        assert_eq!(request.method(), Method::Patch);
        assert_eq!(request.header_value("x-trace"), Some("abc"));
        assert_eq!(
            request.query_params(),
            &[("limit".to_string(), "5".to_string())]
        );
        assert_eq!(request.body_document().unwrap(), Some(body));
    }
}

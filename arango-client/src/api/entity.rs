//! Entities returned by the server.
//!
//! Field names follow the server's camelCase keys through explicit renames,
//! so entities decode the same way whatever field naming the client is
//! configured with.

use serde::{Deserialize, Serialize};

use arango_core::protocol::Response;
use arango_core::{from_document, ArangoError, Document};

/// Server error body: `{error, errorNum, code, errorMessage}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEntity {
    pub error: bool,
    pub error_num: i64,
    pub code: i32,
    pub error_message: String,
}

impl ErrorEntity {
    /// Converts a failed response into `ArangoError::Server`.
    ///
    /// A body that is missing or not an error object still yields a server
    /// error carrying the response code, with error number 0.
    pub fn into_error(response: Response) -> ArangoError {
        let code = response.code;
        let entity = response
            .body
            .and_then(|body| from_document::<ErrorEntity>(body).ok())
            .filter(|entity| entity.error || entity.error_num != 0);

        match entity {
            Some(entity) => {
                let code = if entity.code != 0 { entity.code } else { code };
                ArangoError::server(entity.error_num, code, entity.error_message)
            }
            None => ArangoError::server(0, code, format!("response code {}", code)),
        }
    }
}

/// Server version information.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ArangoVersion {
    pub server: String,
    pub version: String,
    pub license: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseEntity {
    pub id: String,
    pub name: String,
    pub path: String,
    pub is_system: bool,
}

/// Collection kind. The server encodes it as 2 (document) or 3 (edge).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum CollectionType {
    #[default]
    Document,
    Edge,
}

impl From<i64> for CollectionType {
    fn from(value: i64) -> Self {
        match value {
            3 => CollectionType::Edge,
            _ => CollectionType::Document,
        }
    }
}

impl From<CollectionType> for i64 {
    fn from(value: CollectionType) -> Self {
        match value {
            CollectionType::Document => 2,
            CollectionType::Edge => 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionEntity {
    pub id: String,
    pub name: String,
    pub wait_for_sync: bool,
    pub is_system: bool,
    pub status: i64,
    #[serde(rename = "type")]
    pub collection_type: CollectionType,
    pub count: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub index_type: String,
    pub fields: Vec<String>,
    pub unique: bool,
    pub sparse: bool,
    pub is_newly_created: bool,
}

/// Execution statistics attached to a cursor's `extra` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorStats {
    pub writes_executed: u64,
    pub writes_ignored: u64,
    pub scanned_full: u64,
    pub scanned_index: u64,
    pub filtered: u64,
    pub full_count: Option<u64>,
    pub execution_time: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CursorExtra {
    pub stats: Option<CursorStats>,
    pub warnings: Vec<Document>,
}

/// One page of a server cursor.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CursorEntity {
    pub id: Option<String>,
    pub result: Vec<Document>,
    pub has_more: bool,
    pub count: Option<u64>,
    pub cached: bool,
    pub extra: Option<CursorExtra>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeDefinition {
    pub collection: String,
    pub from: Vec<String>,
    pub to: Vec<String>,
}

impl EdgeDefinition {
    pub fn new(
        collection: impl Into<String>,
        from: impl IntoIterator<Item = impl Into<String>>,
        to: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            collection: collection.into(),
            from: from.into_iter().map(Into::into).collect(),
            to: to.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphEntity {
    #[serde(rename = "_key")]
    pub key: String,
    pub name: String,
    pub edge_definitions: Vec<EdgeDefinition>,
    pub orphan_collections: Vec<String>,
}

/// View kind. Unrecognised kinds are kept verbatim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ViewType {
    #[default]
    ArangoSearch,
    SearchAlias,
    Other(String),
}

impl From<String> for ViewType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "arangosearch" => ViewType::ArangoSearch,
            "search-alias" => ViewType::SearchAlias,
            _ => ViewType::Other(value),
        }
    }
}

impl From<ViewType> for String {
    fn from(value: ViewType) -> Self {
        match value {
            ViewType::ArangoSearch => "arangosearch".to_string(),
            ViewType::SearchAlias => "search-alias".to_string(),
            ViewType::Other(other) => other,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ViewEntity {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub view_type: ViewType,
}

/// Identity of a stored document: `_id`, `_key`, `_rev`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DocumentMeta {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_key")]
    pub key: String,
    #[serde(rename = "_rev")]
    pub rev: String,
    #[serde(rename = "_oldRev")]
    pub old_rev: Option<String>,
    pub new: Option<Document>,
    pub old: Option<Document>,
}

/// A running or slow query as reported by the query tracker.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryEntity {
    pub id: String,
    pub query: String,
    pub bind_vars: Option<Document>,
    pub started: String,
    pub run_time: f64,
    pub state: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AqlFunctionEntity {
    pub name: String,
    pub code: String,
    pub is_deterministic: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryCacheProperties {
    pub mode: String,
    pub max_results: u64,
}

/// Slow-query tracking settings of a database.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTrackingProperties {
    pub enabled: bool,
    pub track_slow_queries: bool,
    pub track_bind_vars: bool,
    pub max_slow_queries: u64,
    /// Seconds after which a query counts as slow.
    pub slow_query_threshold: f64,
    pub max_query_string_length: u64,
}

/// Vertices and paths visited by a traversal.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TraversalEntity<V, E> {
    pub vertices: Vec<V>,
    pub paths: Vec<PathEntity<V, E>>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PathEntity<V, E> {
    pub edges: Vec<E>,
    pub vertices: Vec<V>,
}

/// Access level for a user on a database or collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Permissions {
    #[serde(rename = "rw")]
    ReadWrite,
    #[serde(rename = "ro")]
    ReadOnly,
    #[serde(rename = "none")]
    None,
}

impl Permissions {
    pub fn as_str(self) -> &'static str {
        match self {
            Permissions::ReadWrite => "rw",
            Permissions::ReadOnly => "ro",
            Permissions::None => "none",
        }
    }
}

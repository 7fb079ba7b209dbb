//! Integration tests for the client and database handles against a mock server.

mod common;

use std::time::Duration;

use arango_client::api::entity::Permissions;
use arango_client::api::options::{
    CollectionCreateOptions, Direction, DocumentReadOptions, DocumentWriteOptions,
    TraversalOptions,
};
use arango_client::core::protocol::HEADER_AUTHORIZATION;
use arango_client::core::Method;
use arango_client::{ArangoClient, ArangoError, ClientConfig, Document};
use common::{config_for, error, ok, version_body, MockServer, Reply};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Product {
    name: String,
    price: i64,
}

#[tokio::test]
async fn test_version_decodes() {
    common::init_tracing();
    let server = MockServer::start(|request| match request.path() {
        "/_api/version" => ok(version_body()),
        _ => error(404, 1202, "not found"),
    })
    .await;

    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();
    let version = client.version().await.unwrap();

    assert_eq!(version.server, "arango");
    assert_eq!(version.version, "3.11.4");
    assert_eq!(version.license, "community");

    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].database, "_system");
    assert_eq!(requests[0].method, Method::Get);

    client.shutdown().await;
}

#[tokio::test]
async fn test_credentials_sent_at_handshake_and_per_request() {
    let server = MockServer::start_with_password("secret", |_| ok(version_body())).await;

    let config = ClientConfig::builder()
        .add_host("127.0.0.1", server.port())
        .credentials("root", "secret")
        .build()
        .unwrap();
    let client = ArangoClient::new(config).await.unwrap();
    client.version().await.unwrap();

    assert_eq!(server.authentication_count(), 1);
    let requests = server.requests();
    assert_eq!(
        requests[0].header(HEADER_AUTHORIZATION),
        Some("basic cm9vdDpzZWNyZXQ=")
    );

    client.shutdown().await;
}

#[tokio::test]
async fn test_rejected_authentication_surfaces_server_error() {
    let server = MockServer::start_with_password("secret", |_| ok(version_body())).await;

    let config = ClientConfig::builder()
        .add_host("127.0.0.1", server.port())
        .credentials("root", "wrong")
        .build()
        .unwrap();
    let client = ArangoClient::new(config).await.unwrap();
    let err = client.version().await.unwrap_err();

    assert_eq!(err.response_code(), Some(401));
    assert_eq!(err.server_error_num(), Some(11));
    assert!(server.requests().is_empty());

    client.shutdown().await;
}

#[tokio::test]
async fn test_server_error_carries_error_num_code_and_message() {
    let server = MockServer::start(|request| match (request.method(), request.path()) {
        (Method::Post, "/_api/collection") => error(409, 1207, "duplicate name"),
        _ => error(404, 1202, "not found"),
    })
    .await;

    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();
    let err = client
        .db("shop")
        .create_collection("products", CollectionCreateOptions::new())
        .await
        .unwrap_err();

    match err {
        ArangoError::Server {
            error_num,
            code,
            message,
        } => {
            assert_eq!(error_num, 1207);
            assert_eq!(code, 409);
            assert_eq!(message, "duplicate name");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(server.count(Method::Post, "/_api/collection"), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn test_database_exists_maps_not_found_to_false() {
    let server = MockServer::start(|request| match request.database_name() {
        "shop" => ok(serde_json::json!({
            "result": { "name": "shop", "id": "1", "path": "/data/shop", "isSystem": false }
        })),
        _ => error(404, 1228, "database not found"),
    })
    .await;

    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();

    assert!(client.db("shop").exists().await.unwrap());
    assert!(!client.db("missing").exists().await.unwrap());

    let info = client.db("shop").info().await.unwrap();
    assert_eq!(info.name, "shop");
    assert!(!info.is_system);

    client.shutdown().await;
}

#[tokio::test]
async fn test_databases_reads_result_field() {
    let server = MockServer::start(|request| match request.path() {
        "/_api/database" => ok(serde_json::json!({ "error": false, "code": 200, "result": ["_system", "shop"] })),
        _ => error(404, 1202, "not found"),
    })
    .await;

    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();
    let names = client.databases().await.unwrap();
    assert_eq!(names, vec!["_system".to_string(), "shop".to_string()]);

    client.shutdown().await;
}

#[tokio::test]
async fn test_document_round_trip_through_collection_handle() {
    let server = MockServer::start(|request| match (request.method(), request.path()) {
        (Method::Post, "/_api/document/products") => ok(serde_json::json!({
            "_id": "products/1", "_key": "1", "_rev": "_a1",
            "new": { "name": "lamp", "price": 40 },
        })),
        (Method::Get, "/_api/document/products/1") => ok(serde_json::json!({
            "_id": "products/1", "_key": "1", "_rev": "_a1", "name": "lamp", "price": 40,
        })),
        (Method::Head, "/_api/document/products/1") => Reply::Respond(arango_client::core::Response::new(200)),
        _ => error(404, 1202, "document not found"),
    })
    .await;

    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();
    let products = client.db("shop").collection("products");

    let lamp = Product {
        name: "lamp".to_string(),
        price: 40,
    };
    let meta = products
        .insert_document(&lamp, DocumentWriteOptions::new().return_new(true).wait_for_sync(true))
        .await
        .unwrap();
    assert_eq!(meta.key, "1");
    assert_eq!(meta.id, "products/1");

    let fetched: Product = products.document("1").await.unwrap();
    assert_eq!(fetched, lamp);

    let by_id: Product = client.db("shop").document("products/1").await.unwrap();
    assert_eq!(by_id, lamp);

    assert!(products.document_exists("1").await.unwrap());
    assert!(!products.document_exists("2").await.unwrap());

    let requests = server.requests();
    let insert = &requests[0];
    assert_eq!(insert.query_value("returnNew"), Some("true"));
    assert_eq!(insert.query_value("waitForSync"), Some("true"));
    let body = insert.body.as_ref().unwrap();
    assert_eq!(body.get("name").and_then(|v| v.as_str()), Some("lamp"));

    client.shutdown().await;
}

#[tokio::test]
async fn test_dirty_read_sets_header() {
    let server = MockServer::start(|_| {
        ok(serde_json::json!({ "_key": "1", "name": "lamp", "price": 40 }))
    })
    .await;

    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();
    let _: Product = client
        .db("shop")
        .collection("products")
        .read_document("1", DocumentReadOptions::new().allow_dirty_read(true))
        .await
        .unwrap();

    let requests = server.requests();
    let request = &requests[0];
    assert_eq!(request.header("x-arango-allow-dirty-read"), Some("true"));

    client.shutdown().await;
}

#[tokio::test]
async fn test_malformed_document_id_is_rejected_locally() {
    let server = MockServer::start(|_| ok(serde_json::json!({}))).await;
    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();

    let err = client
        .db("shop")
        .document::<Product>("no-slash")
        .await
        .unwrap_err();
    assert!(matches!(err, ArangoError::Configuration(_)));
    assert!(server.requests().is_empty());

    client.shutdown().await;
}

#[tokio::test]
async fn test_acquire_host_list_replaces_hosts() {
    let second = MockServer::start(|_| ok(version_body())).await;
    let endpoint = format!("tcp://127.0.0.1:{}", second.port());
    let first = MockServer::start(move |request| match request.path() {
        "/_api/cluster/endpoints" => ok(serde_json::json!({
            "error": false,
            "code": 200,
            "endpoints": [ { "endpoint": endpoint.clone() }, { "endpoint": "ftp://127.0.0.1:1" } ],
        })),
        _ => ok(version_body()),
    })
    .await;

    let config = config_for(&[&first])
        .acquire_host_list(true)
        .build()
        .unwrap();
    let client = ArangoClient::new(config).await.unwrap();

    assert_eq!(client.executor().resolver().hosts(), vec![second.endpoint()]);
    client.version().await.unwrap();
    assert_eq!(second.count(Method::Get, "/_api/version"), 1);

    client.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_closes_pooled_connections() {
    let server = MockServer::start(|_| ok(version_body())).await;
    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();

    client.version().await.unwrap();
    assert_eq!(client.executor().pool().idle_count(&server.endpoint()), 1);

    client.shutdown().await;
    assert_eq!(client.executor().pool().idle_count(&server.endpoint()), 0);

    let err = tokio::time::timeout(Duration::from_secs(2), client.version())
        .await
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, ArangoError::ConnectionClosed(_)));
}

#[tokio::test]
async fn test_permissions_and_tracking_properties() {
    let server = MockServer::start(|request| match (request.method(), request.path()) {
        (Method::Get, "/_api/user/alice/database/shop") => {
            ok(serde_json::json!({ "error": false, "code": 200, "result": "ro" }))
        }
        (Method::Put, "/_api/user/alice/database/shop/*") => {
            ok(serde_json::json!({ "error": false, "code": 200 }))
        }
        (_, "/_api/query/properties") => ok(serde_json::json!({
            "enabled": true,
            "trackSlowQueries": true,
            "trackBindVars": false,
            "maxSlowQueries": 64,
            "slowQueryThreshold": 10.0,
            "maxQueryStringLength": 4096,
        })),
        _ => error(404, 1202, "not found"),
    })
    .await;
    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();
    let shop = client.db("shop");

    assert_eq!(shop.permissions("alice").await.unwrap(), Permissions::ReadOnly);
    shop.grant_default_collection_access("alice", Permissions::ReadWrite)
        .await
        .unwrap();

    let mut properties = shop.query_tracking_properties().await.unwrap();
    assert!(properties.track_slow_queries);
    assert_eq!(properties.max_slow_queries, 64);
    properties.max_slow_queries = 128;
    shop.set_query_tracking_properties(&properties).await.unwrap();

    let requests = server.requests();
    let grant = &requests[1];
    assert_eq!(grant.database, "_system");
    let body = grant.body.as_ref().unwrap();
    assert_eq!(body.get("grant").and_then(|v| v.as_str()), Some("rw"));
    let update = requests.last().unwrap();
    assert_eq!(update.method, Method::Put);
    let body = update.body.as_ref().unwrap();
    assert_eq!(body.get("maxSlowQueries").and_then(|v| v.as_i64()), Some(128));

    client.shutdown().await;
}

#[tokio::test]
async fn test_traversal_decodes_visited_vertices_and_paths() {
    let server = MockServer::start(|request| match request.path() {
        "/_api/traversal" => ok(serde_json::json!({
            "result": {
                "visited": {
                    "vertices": [ { "_key": "alice" }, { "_key": "bob" } ],
                    "paths": [
                        { "edges": [], "vertices": [ { "_key": "alice" } ] },
                        {
                            "edges": [ { "_from": "persons/alice", "_to": "persons/bob" } ],
                            "vertices": [ { "_key": "alice" }, { "_key": "bob" } ],
                        },
                    ],
                }
            },
            "error": false,
            "code": 200,
        })),
        _ => error(404, 1202, "not found"),
    })
    .await;
    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();

    #[derive(Debug, Deserialize)]
    struct Person {
        #[serde(rename = "_key")]
        key: String,
    }
    #[derive(Debug, Deserialize)]
    struct Knows {
        #[serde(rename = "_to")]
        to: String,
    }

    let options = TraversalOptions::new("persons/alice")
        .graph_name("social")
        .direction(Direction::Outbound);
    let traversal = client
        .db("shop")
        .traversal::<Person, Knows>(&options)
        .await
        .unwrap();

    let keys: Vec<&str> = traversal.vertices.iter().map(|p| p.key.as_str()).collect();
    assert_eq!(keys, vec!["alice", "bob"]);
    assert_eq!(traversal.paths.len(), 2);
    assert_eq!(traversal.paths[1].edges[0].to, "persons/bob");

    let requests = server.requests();
    let body = requests[0].body.as_ref().unwrap();
    assert_eq!(body.get("startVertex").and_then(|v| v.as_str()), Some("persons/alice"));

    client.shutdown().await;
}

#[tokio::test]
async fn test_route_sends_custom_request() {
    let server = MockServer::start(|request| match (request.method(), request.path()) {
        (Method::Post, "/my-service/items") => ok(serde_json::json!({ "created": true })),
        _ => error(404, 1202, "not found"),
    })
    .await;
    let client = ArangoClient::new(config_for(&[&server]).build().unwrap())
        .await
        .unwrap();

    let response = client
        .db("shop")
        .route(&["my-service"])
        .route(&["items"])
        .with_header("x-trace", "abc")
        .with_query_param("dryRun", false)
        .with_body(Document::object().with("name", "lamp"))
        .post()
        .await
        .unwrap();
    assert_eq!(response.code, 200);
    assert_eq!(
        response.into_body().get("created").and_then(|v| v.as_bool()),
        Some(true)
    );

    let requests = server.requests();
    let sent = &requests[0];
    assert_eq!(sent.database, "shop");
    assert_eq!(sent.header("x-trace"), Some("abc"));
    assert_eq!(sent.query_value("dryRun"), Some("false"));

    let err = client.db("shop").route(&["missing"]).get().await.unwrap_err();
    assert_eq!(err.response_code(), Some(404));

    client.shutdown().await;
}

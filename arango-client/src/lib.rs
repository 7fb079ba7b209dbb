//! Async Rust client for a multi-model database speaking the VelocyStream
//! binary protocol.
//!
//! The client multiplexes requests over a pool of persistent connections per
//! host, retries idempotent requests on another host after transient
//! failures, and exposes server-side query cursors as lazy sequences of
//! typed values. It is built on [Tokio](https://tokio.rs/) and every
//! operation is an `async fn`.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use arango_client::{ArangoClient, ClientConfig};
//! use arango_client::api::options::QueryOptions;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ClientConfig::builder()
//!         .add_host("127.0.0.1", 8529)
//!         .user("root")
//!         .build()?;
//!     let client = ArangoClient::new(config).await?;
//!
//!     let version = client.version().await?;
//!     println!("{} {}", version.server, version.version);
//!
//!     let db = client.db("_system");
//!     let numbers: Vec<i64> = db
//!         .query("FOR i IN 1..250 RETURN i", None, QueryOptions::new().batch_size(100))
//!         .await?
//!         .collect_all()
//!         .await?;
//!     assert_eq!(numbers.len(), 250);
//!
//!     client.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Hosts and failover
//!
//! | Policy | Behaviour |
//! |--------|-----------|
//! | `LoadBalancing::None` | first alive host in configuration order |
//! | `LoadBalancing::RoundRobin` | rotates over alive hosts |
//! | `LoadBalancing::OneRandom` | one random host, kept while it stays alive |
//!
//! A host that fails with a transport error, a 503 or a "no leader" answer is
//! marked dead for the configured cool-down (15 s by default) and skipped by
//! the resolver. Only idempotent methods (GET, HEAD, OPTIONS, PUT, DELETE)
//! and requests marked [`retryable`](arango_core::Request::retryable) are
//! retried.
//!
//! # Cursors
//!
//! [`Cursor`] fetches further pages from the host that answered the query.
//! Dropping a cursor before the server reported exhaustion deletes it on the
//! server; a fully consumed cursor sends nothing.
//!
//! ## TLS (requires `tls` feature)
//!
//! ```rust,ignore
//! let config = ClientConfig::builder()
//!     .add_host_str("ssl://db.example.com:8530")
//!     .tls(|t| t.ca_cert_path("/etc/ssl/db-ca.pem"))
//!     .build()?;
//! ```

pub mod api;
mod client;
pub mod config;
pub mod connection;
pub mod cursor;
pub mod executor;

pub use api::{Collection, Database, Graph, Route, View};
pub use arango_core as core;
pub use arango_core::{ArangoError, Document, Result};
pub use client::ArangoClient;
pub use config::{
    ClientConfig, ClientConfigBuilder, ConfigError, Credentials, LoadBalancing, NetworkConfig,
    NetworkConfigBuilder, OverflowPolicy, PoolConfig, PoolConfigBuilder, RetryConfig,
    RetryConfigBuilder, TlsConfig, TlsConfigBuilder,
};
pub use connection::{HostEndpoint, HostHandle};
pub use cursor::{Cursor, CursorExecute, SharedCursor};
pub use executor::{Executor, Invocation};

//! Client entry point.

use std::sync::Arc;

use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use arango_core::Result;

use crate::api::entity::ArangoVersion;
use crate::api::{request, Database};
use crate::config::ClientConfig;
use crate::connection::{Connector, HostEndpoint, TcpConnector};
use crate::executor::{decode, Executor};

#[derive(Debug, Default, Deserialize)]
struct EndpointEntry {
    endpoint: String,
}

/// The main entry point for talking to a server or cluster.
///
/// Connections are opened lazily on first use. Each client owns its pool,
/// dead-host table and load-balancing state.
///
/// # Example
///
/// ```ignore
/// use arango_client::{ArangoClient, ClientConfig};
/// use arango_client::api::options::QueryOptions;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = ClientConfig::builder()
///         .add_host("127.0.0.1", 8529)
///         .credentials("root", "secret")
///         .build()?;
///
///     let client = ArangoClient::new(config).await?;
///     let db = client.db("shop");
///     let mut cursor = db
///         .query::<i64>("FOR i IN 1..10 RETURN i", None, QueryOptions::new())
///         .await?;
///     while let Some(value) = cursor.next().await? {
///         println!("{}", value);
///     }
///
///     client.shutdown().await;
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct ArangoClient {
    config: Arc<ClientConfig>,
    executor: Arc<Executor>,
    shutdown: CancellationToken,
    refresher: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl ArangoClient {
    /// Creates a client over TCP, or TLS for hosts flagged as such.
    ///
    /// With `acquire_host_list` enabled the host list is fetched once here
    /// and then refreshed in the background.
    pub async fn new(config: ClientConfig) -> Result<Self> {
        let connector = Arc::new(TcpConnector::new(config.network().tls().clone()));
        Self::with_connector(config, connector).await
    }

    /// Creates a client that opens transports through `connector`.
    pub async fn with_connector(config: ClientConfig, connector: Arc<dyn Connector>) -> Result<Self> {
        tracing::info!(
            hosts = config.network().hosts().len(),
            load_balancing = ?config.load_balancing(),
            "creating client"
        );

        let executor = Arc::new(Executor::new(&config, connector));
        let client = Self {
            config: Arc::new(config),
            executor,
            shutdown: CancellationToken::new(),
            refresher: parking_lot::Mutex::new(None),
        };

        if client.config.network().acquire_host_list() {
            if let Err(e) = refresh_hosts(&client.executor).await {
                tracing::warn!(error = %e, "initial host list acquisition failed");
            }
            client.spawn_refresher();
        }
        Ok(client)
    }

    fn spawn_refresher(&self) {
        let executor = Arc::clone(&self.executor);
        let token = self.shutdown.clone();
        let interval = self.config.network().acquire_host_list_interval();

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = refresh_hosts(&executor).await {
                            tracing::debug!(error = %e, "host list refresh failed");
                        }
                    }
                }
            }
        });
        *self.refresher.lock() = Some(handle);
    }

    /// Returns a handle to the database `name`.
    pub fn db(&self, name: impl Into<String>) -> Database {
        Database::new(Arc::clone(&self.executor), name)
    }

    /// Returns a handle to `_system`.
    pub fn system_db(&self) -> Database {
        self.db(request::SYSTEM_DATABASE)
    }

    pub async fn version(&self) -> Result<ArangoVersion> {
        self.system_db().version().await
    }

    /// Creates a database and returns its handle.
    pub async fn create_database(&self, name: &str) -> Result<Database> {
        let db = self.db(name);
        db.create().await?;
        Ok(db)
    }

    /// Names of all databases. Requires access to `_system`.
    pub async fn databases(&self) -> Result<Vec<String>> {
        self.executor
            .execute(request::databases_request(), decode::field("result"), None)
            .await
    }

    /// Returns the executor, for requests the handles do not cover.
    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Stops background work and closes all connections.
    #[instrument(name = "client.shutdown", skip(self))]
    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let refresher = self.refresher.lock().take();
        if let Some(handle) = refresher {
            let _ = handle.await;
        }
        self.executor.close().await;
        tracing::info!("client shut down");
    }
}

impl Drop for ArangoClient {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Replaces the resolver's hosts with the server's endpoint list.
///
/// Unparseable entries are skipped. An empty list leaves the hosts unchanged.
async fn refresh_hosts(executor: &Executor) -> Result<()> {
    let entries: Vec<EndpointEntry> = executor
        .execute(
            request::cluster_endpoints_request(),
            decode::field("endpoints"),
            None,
        )
        .await?;

    let hosts: Vec<HostEndpoint> = entries
        .iter()
        .filter_map(|entry| match HostEndpoint::parse(&entry.endpoint) {
            Ok(host) => Some(host),
            Err(e) => {
                tracing::debug!(endpoint = %entry.endpoint, error = %e, "skipping endpoint");
                None
            }
        })
        .collect();

    tracing::debug!(count = hosts.len(), "acquired host list");
    executor.resolver().set_hosts(hosts);
    Ok(())
}

//! Per-host connection pooling.

use std::collections::HashMap;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::timeout;
use tracing::instrument;

use arango_core::{ArangoError, Result};

use super::connection::{Connection, ConnectionOptions};
use super::connector::Connector;
use super::resolver::DeadHosts;
use super::HostEndpoint;
use crate::config::{OverflowPolicy, PoolConfig};

/// Connections of one host and the permits bounding them.
#[derive(Debug)]
struct HostSlots {
    permits: Arc<Semaphore>,
    idle: Mutex<Vec<Arc<Connection>>>,
}

impl HostSlots {
    fn new(max_connections: usize) -> Self {
        Self {
            permits: Arc::new(Semaphore::new(max_connections)),
            idle: Mutex::new(Vec::new()),
        }
    }
}

/// Pool of connections, keyed by host.
///
/// Each host has at most `max_connections` leased connections. Connections
/// are opened lazily and returned to the idle list on release; a connection
/// that is no longer ready when released is discarded, and the next acquire
/// opens a replacement.
#[derive(Debug)]
pub struct HostPool {
    connector: Arc<dyn Connector>,
    options: ConnectionOptions,
    config: PoolConfig,
    dead: Arc<DeadHosts>,
    hosts: Mutex<HashMap<HostEndpoint, Arc<HostSlots>>>,
    closed: AtomicBool,
}

impl HostPool {
    pub fn new(
        connector: Arc<dyn Connector>,
        options: ConnectionOptions,
        config: PoolConfig,
        dead: Arc<DeadHosts>,
    ) -> Self {
        Self {
            connector,
            options,
            config,
            dead,
            hosts: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    fn slots(&self, host: &HostEndpoint) -> Arc<HostSlots> {
        let mut hosts = self.hosts.lock();
        Arc::clone(
            hosts
                .entry(host.clone())
                .or_insert_with(|| Arc::new(HostSlots::new(self.config.max_connections()))),
        )
    }

    /// Leases a ready connection to `host`.
    ///
    /// Waits up to the acquire timeout when every connection is leased, unless
    /// the overflow policy is `New`, in which case a transient connection is
    /// opened and closed again on release.
    #[instrument(name = "pool.acquire", skip(self), fields(host = %host))]
    pub async fn acquire(&self, host: &HostEndpoint) -> Result<PooledConnection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(ArangoError::ConnectionClosed("pool is closed".to_string()));
        }
        let slots = self.slots(host);

        let permit = match self.config.overflow() {
            OverflowPolicy::Wait => Some(self.wait_for_permit(&slots, host).await?),
            OverflowPolicy::New => Arc::clone(&slots.permits).try_acquire_owned().ok(),
        };

        let Some(permit) = permit else {
            tracing::debug!("pool exhausted, opening transient connection");
            let connection = self.open(host).await?;
            return Ok(PooledConnection {
                connection,
                lease: Lease::Transient,
            });
        };

        let connection = match self.take_idle(&slots) {
            Some(connection) => connection,
            None => self.open(host).await?,
        };

        Ok(PooledConnection {
            connection,
            lease: Lease::Pooled {
                slots,
                _permit: permit,
            },
        })
    }

    async fn wait_for_permit(
        &self,
        slots: &HostSlots,
        host: &HostEndpoint,
    ) -> Result<OwnedSemaphorePermit> {
        let acquire_timeout = self.config.acquire_timeout();
        match timeout(acquire_timeout, Arc::clone(&slots.permits).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(permit),
            Ok(Err(_)) => Err(ArangoError::ConnectionClosed(format!(
                "pool for {} is closed",
                host
            ))),
            Err(_) => {
                tracing::warn!(timeout = ?acquire_timeout, "connection acquire timed out");
                Err(ArangoError::Timeout(format!(
                    "no connection to {} available within {:?}",
                    host, acquire_timeout
                )))
            }
        }
    }

    /// Pops a reusable idle connection, discarding closed or stale ones.
    fn take_idle(&self, slots: &HostSlots) -> Option<Arc<Connection>> {
        let keep_alive = self.config.keep_alive_interval();
        let mut idle = slots.idle.lock();
        while let Some(connection) = idle.pop() {
            if !connection.is_ready() {
                tracing::debug!(id = %connection.id(), "discarding closed connection");
                continue;
            }
            if connection.last_used().elapsed() > keep_alive {
                tracing::debug!(id = %connection.id(), "recycling idle connection");
                spawn_close(connection);
                continue;
            }
            return Some(connection);
        }
        None
    }

    async fn open(&self, host: &HostEndpoint) -> Result<Arc<Connection>> {
        Connection::open(host.clone(), self.connector.as_ref(), &self.options).await
    }

    /// Returns a leased connection. Equivalent to dropping it.
    pub fn release(&self, connection: PooledConnection) {
        drop(connection);
    }

    /// Marks `host` dead for the cool-down interval and drops its idle connections.
    pub fn mark_dead(&self, host: &HostEndpoint) {
        self.dead.mark(host);
        let slots = self.hosts.lock().get(host).cloned();
        if let Some(slots) = slots {
            for connection in slots.idle.lock().drain(..) {
                spawn_close(connection);
            }
        }
    }

    pub fn is_dead(&self, host: &HostEndpoint) -> bool {
        self.dead.is_dead(host)
    }

    /// Number of idle connections held for `host`.
    pub fn idle_count(&self, host: &HostEndpoint) -> usize {
        self.hosts
            .lock()
            .get(host)
            .map(|slots| slots.idle.lock().len())
            .unwrap_or(0)
    }

    /// Number of leased connections to `host`, transient ones excluded.
    pub fn leased_count(&self, host: &HostEndpoint) -> usize {
        self.hosts
            .lock()
            .get(host)
            .map(|slots| self.config.max_connections() - slots.permits.available_permits())
            .unwrap_or(0)
    }

    /// Closes every idle connection and rejects further acquires.
    #[instrument(name = "pool.close", skip(self))]
    pub async fn close(&self) {
        self.closed.store(true, Ordering::Release);
        let all: Vec<Arc<HostSlots>> = self.hosts.lock().drain().map(|(_, s)| s).collect();
        for slots in all {
            slots.permits.close();
            let idle: Vec<_> = slots.idle.lock().drain(..).collect();
            for connection in idle {
                connection.close().await;
            }
        }
        tracing::debug!("pool closed");
    }
}

fn spawn_close(connection: Arc<Connection>) {
    if let Ok(runtime) = tokio::runtime::Handle::try_current() {
        runtime.spawn(async move { connection.close().await });
    }
}

#[derive(Debug)]
enum Lease {
    Pooled {
        slots: Arc<HostSlots>,
        _permit: OwnedSemaphorePermit,
    },
    Transient,
}

/// A leased connection. Dropping it returns the connection to its pool.
#[derive(Debug)]
pub struct PooledConnection {
    connection: Arc<Connection>,
    lease: Lease,
}

impl PooledConnection {
    /// Returns true for an overflow connection that closes on release.
    pub fn is_transient(&self) -> bool {
        matches!(self.lease, Lease::Transient)
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        &self.connection
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        match &self.lease {
            Lease::Pooled { slots, .. } => {
                if self.connection.is_ready() {
                    slots.idle.lock().push(Arc::clone(&self.connection));
                } else {
                    tracing::debug!(id = %self.connection.id(), "discarding failed connection");
                }
            }
            Lease::Transient => spawn_close(Arc::clone(&self.connection)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Credentials;
    use crate::connection::TcpConnector;
    use std::time::Duration;

    fn options() -> ConnectionOptions {
        ConnectionOptions {
            connect_timeout: Duration::from_millis(200),
            request_timeout: Duration::from_secs(1),
            chunk_size: 30_000,
            credentials: Credentials::default(),
        }
    }

    fn pool(config: PoolConfig) -> HostPool {
        HostPool::new(
            Arc::new(TcpConnector::default()),
            options(),
            config,
            Arc::new(DeadHosts::new(Duration::from_secs(15))),
        )
    }

    #[test]
    fn test_mark_dead() {
        let pool = pool(PoolConfig::default());
        let host = HostEndpoint::new("127.0.0.1", 1);
        assert!(!pool.is_dead(&host));
        pool.mark_dead(&host);
        assert!(pool.is_dead(&host));
        assert_eq!(pool.idle_count(&host), 0);
    }

    #[tokio::test]
    async fn test_acquire_failure_returns_permit() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let pool = pool(PoolConfig::default());
        let host = HostEndpoint::new("127.0.0.1", port);
        assert!(pool.acquire(&host).await.is_err());
        assert_eq!(pool.leased_count(&host), 0);
        assert!(pool.acquire(&host).await.is_err());
    }

    #[tokio::test]
    async fn test_acquire_after_close_fails() {
        let pool = pool(PoolConfig::default());
        pool.close().await;
        let result = pool.acquire(&HostEndpoint::new("127.0.0.1", 1)).await;
        assert!(matches!(result, Err(ArangoError::ConnectionClosed(_))));
    }
}

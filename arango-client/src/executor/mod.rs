//! Request execution: host selection, retry and failover, response decoding.

pub mod decode;
mod invocation;

pub use invocation::Invocation;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::instrument;

use arango_core::protocol::{
    Request, Response, ERROR_CLUSTER_NO_LEADER, HEADER_ENDPOINT, RESPONSE_SERVICE_UNAVAILABLE,
};
use arango_core::{ArangoError, DecodeOptions, Result};

use crate::api::entity::ErrorEntity;
use crate::config::{ClientConfig, RetryConfig};
use crate::connection::{
    ConnectionOptions, Connector, DeadHosts, HostEndpoint, HostHandle, HostPool, HostResolver,
};

/// Calculates the next backoff duration with jitter applied.
fn calculate_backoff_with_jitter(
    current_backoff: Duration,
    multiplier: f64,
    max_backoff: Duration,
    jitter: f64,
) -> Duration {
    let base_backoff = current_backoff.as_secs_f64() * multiplier;

    let jitter_factor = if jitter > 0.0 {
        let mut rng = rand::thread_rng();
        1.0 + rng.gen_range(-jitter..=jitter)
    } else {
        1.0
    };

    let jittered_backoff = base_backoff * jitter_factor;

    std::cmp::min(Duration::from_secs_f64(jittered_backoff), max_backoff)
}

/// Returns true for server answers the executor treats like a lost connection.
fn is_transient_server_error(error: &ArangoError) -> bool {
    match error {
        ArangoError::Server {
            error_num, code, ..
        } => *code == RESPONSE_SERVICE_UNAVAILABLE || *error_num == ERROR_CLUSTER_NO_LEADER,
        _ => false,
    }
}

/// Executes requests against the configured hosts.
///
/// Owns the host pool and the resolver; one executor per client, so
/// dead-host marks and the round-robin counter are never shared between
/// clients.
#[derive(Debug)]
pub struct Executor {
    resolver: HostResolver,
    pool: HostPool,
    retry: RetryConfig,
    decode: DecodeOptions,
}

impl Executor {
    pub fn new(config: &ClientConfig, connector: Arc<dyn Connector>) -> Self {
        let dead = Arc::new(DeadHosts::new(config.pool().dead_host_cooldown()));
        let resolver = HostResolver::new(
            config.network().hosts().to_vec(),
            config.load_balancing(),
            Arc::clone(&dead),
        );
        let pool = HostPool::new(
            connector,
            ConnectionOptions::from_config(config),
            config.pool().clone(),
            dead,
        );
        Self {
            resolver,
            pool,
            retry: config.retry().clone(),
            decode: *config.decode_options(),
        }
    }

    pub fn resolver(&self) -> &HostResolver {
        &self.resolver
    }

    pub fn pool(&self) -> &HostPool {
        &self.pool
    }

    pub fn decode_options(&self) -> &DecodeOptions {
        &self.decode
    }

    /// Executes `request` and hands the successful response to `decoder`.
    ///
    /// When `handle` is given, the host chosen for the request is recorded in
    /// it and later requests sharing the handle go to the same host.
    pub async fn execute<T, D>(
        &self,
        request: Request,
        decoder: D,
        handle: Option<&HostHandle>,
    ) -> Result<T>
    where
        D: FnOnce(Response, &DecodeOptions) -> Result<T>,
    {
        let response = self.dispatch(&request, handle).await?;
        decoder(response, &self.decode)
    }

    /// Spawns the execution and returns a cancellable handle to it.
    pub fn submit<T, D>(self: &Arc<Self>, request: Request, decoder: D) -> Invocation<T>
    where
        T: Send + 'static,
        D: FnOnce(Response, &DecodeOptions) -> Result<T> + Send + 'static,
    {
        let executor = Arc::clone(self);
        Invocation::spawn(async move { executor.execute(request, decoder, None).await })
    }

    /// Sends `request` until it succeeds, fails for good, or runs out of retries.
    ///
    /// Transient failures (503, no leader, lost connection) are retried on
    /// another host when the method is idempotent or the request is marked
    /// retryable. The failing host is marked dead first. A response code of
    /// 400 or more that is not transient becomes `ArangoError::Server`.
    #[instrument(
        name = "executor.dispatch",
        skip(self, request, handle),
        fields(request = %request)
    )]
    pub async fn dispatch(
        &self,
        request: &Request,
        handle: Option<&HostHandle>,
    ) -> Result<Response> {
        let local = HostHandle::new();
        let handle = handle.unwrap_or(&local);
        let retryable = request.is_retryable();
        let mut backoff = self.retry.initial_backoff();
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let host = self.resolver.resolve(handle, request.is_dirty_read())?;

            let error = match self.attempt(&host, request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_transient() || is_transient_server_error(&e) => e,
                Err(e) => return Err(e),
            };

            if !retryable || attempt > self.retry.max_retries() {
                tracing::debug!(
                    attempt = attempt,
                    host = %host,
                    error = %error,
                    retryable = retryable,
                    "giving up"
                );
                return Err(error);
            }

            tracing::warn!(
                attempt = attempt,
                host = %host,
                error = %error,
                backoff = ?backoff,
                "transient failure, retrying on another host"
            );
            self.mark_dead(&host);
            handle.clear_if(&host);

            tokio::time::sleep(backoff).await;
            backoff = calculate_backoff_with_jitter(
                backoff,
                self.retry.multiplier(),
                self.retry.max_backoff(),
                self.retry.jitter(),
            );
        }
    }

    /// Sends `request` to `host` only. Used by cursors, which never change host.
    ///
    /// A dead host or a transport failure yields `CursorHostLost`.
    pub async fn dispatch_pinned(&self, request: &Request, host: &HostEndpoint) -> Result<Response> {
        if !self.resolver.is_alive(host) {
            return Err(ArangoError::CursorHostLost(format!("{} is marked dead", host)));
        }
        match self.attempt(host, request).await {
            Err(e) if e.is_transient() => {
                self.mark_dead(host);
                Err(ArangoError::CursorHostLost(format!("{}: {}", host, e)))
            }
            other => other,
        }
    }

    async fn attempt(&self, host: &HostEndpoint, request: &Request) -> Result<Response> {
        let connection = self.pool.acquire(host).await?;
        let response = connection.send(request).await?;
        drop(connection);

        if response.is_success() {
            return Ok(response);
        }

        if response.code == RESPONSE_SERVICE_UNAVAILABLE {
            if let Some(endpoint) = response.header(HEADER_ENDPOINT) {
                match HostEndpoint::parse(endpoint) {
                    Ok(leader) => {
                        self.resolver.set_leader(leader);
                    }
                    Err(e) => tracing::debug!(endpoint = endpoint, error = %e, "bad leader endpoint"),
                }
            }
        }
        Err(ErrorEntity::into_error(response))
    }

    fn mark_dead(&self, host: &HostEndpoint) {
        self.resolver.mark_dead(host);
        self.pool.mark_dead(host);
    }

    /// Closes all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_without_jitter() {
        let next = calculate_backoff_with_jitter(
            Duration::from_millis(100),
            2.0,
            Duration::from_secs(10),
            0.0,
        );
        assert_eq!(next, Duration::from_millis(200));
    }

    #[test]
    fn test_backoff_capped() {
        let next = calculate_backoff_with_jitter(
            Duration::from_secs(8),
            2.0,
            Duration::from_secs(10),
            0.5,
        );
        assert!(next <= Duration::from_secs(10));
    }

    #[test]
    fn test_backoff_jitter_range() {
        for _ in 0..50 {
            let next = calculate_backoff_with_jitter(
                Duration::from_millis(100),
                2.0,
                Duration::from_secs(10),
                0.25,
            );
            assert!(next >= Duration::from_millis(150));
            assert!(next <= Duration::from_millis(250));
        }
    }

    #[test]
    fn test_transient_server_errors() {
        assert!(is_transient_server_error(&ArangoError::server(0, 503, "unavailable")));
        assert!(is_transient_server_error(&ArangoError::server(1496, 500, "no leader")));
        assert!(!is_transient_server_error(&ArangoError::server(1207, 409, "duplicate")));
        assert!(!is_transient_server_error(&ArangoError::Timeout("slow".into())));
    }
}

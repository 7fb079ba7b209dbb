//! Client configuration types and builders.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use arango_core::protocol::{DEFAULT_CHUNK_SIZE, MIN_CHUNK_SIZE};
use arango_core::{ArangoError, DecodeOptions, FieldNaming};

use crate::connection::HostEndpoint;

/// Default user.
const DEFAULT_USER: &str = "root";
/// Default host.
const DEFAULT_HOST: &str = "127.0.0.1";
/// Default port.
const DEFAULT_PORT: u16 = 8529;
/// Default request deadline.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default maximum connections per host.
const DEFAULT_MAX_CONNECTIONS: usize = 1;
/// Default deadline for acquiring a pooled connection.
const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
/// Default age after which idle connections are recycled.
const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);
/// Default cool-down for hosts marked dead.
const DEFAULT_DEAD_HOST_COOLDOWN: Duration = Duration::from_secs(15);
/// Default host list refresh interval.
const DEFAULT_ACQUIRE_HOST_LIST_INTERVAL: Duration = Duration::from_secs(60);
/// Default initial retry backoff.
const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(50);
/// Default maximum retry backoff.
const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(2);
/// Default retry multiplier.
const DEFAULT_RETRY_MULTIPLIER: f64 = 2.0;
/// Default retry jitter.
const DEFAULT_JITTER: f64 = 0.2;
/// Default maximum retry attempts.
const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration error returned when validation fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "configuration error: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ArangoError {
    fn from(err: ConfigError) -> Self {
        ArangoError::Configuration(err.message)
    }
}

/// Host selection policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadBalancing {
    /// Always the first alive host.
    #[default]
    None,
    /// Rotate over the alive hosts.
    RoundRobin,
    /// Pick one random host and stay on it while it is alive.
    OneRandom,
}

/// What `acquire` does when every pooled connection to a host is leased.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Suspend until a connection is released or the acquire deadline expires.
    #[default]
    Wait,
    /// Open a transient connection that is closed on release.
    New,
}

/// Network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    hosts: Vec<HostEndpoint>,
    connect_timeout: Duration,
    chunk_size: usize,
    acquire_host_list: bool,
    acquire_host_list_interval: Duration,
    tls: TlsConfig,
}

impl NetworkConfig {
    /// Returns the configured hosts.
    pub fn hosts(&self) -> &[HostEndpoint] {
        &self.hosts
    }

    /// Returns the connection timeout duration.
    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    /// Returns the maximum chunk size for outbound messages.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns whether the host list is refreshed from the server.
    pub fn acquire_host_list(&self) -> bool {
        self.acquire_host_list
    }

    /// Returns the host list refresh interval.
    pub fn acquire_host_list_interval(&self) -> Duration {
        self.acquire_host_list_interval
    }

    /// Returns the TLS configuration.
    pub fn tls(&self) -> &TlsConfig {
        &self.tls
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hosts: vec![HostEndpoint::new(DEFAULT_HOST, DEFAULT_PORT)],
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            acquire_host_list: false,
            acquire_host_list_interval: DEFAULT_ACQUIRE_HOST_LIST_INTERVAL,
            tls: TlsConfig::default(),
        }
    }
}

/// Builder for `NetworkConfig`.
#[derive(Debug, Clone, Default)]
pub struct NetworkConfigBuilder {
    hosts: Vec<(String, u16)>,
    host_strings: Vec<String>,
    connect_timeout: Option<Duration>,
    chunk_size: Option<usize>,
    acquire_host_list: Option<bool>,
    acquire_host_list_interval: Option<Duration>,
    tls: TlsConfigBuilder,
}

impl NetworkConfigBuilder {
    /// Creates a new network configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a host.
    pub fn add_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.hosts.push((host.into(), port));
        self
    }

    /// Adds a host given as `host:port`, parsed at build time.
    pub fn add_host_str(mut self, host: impl Into<String>) -> Self {
        self.host_strings.push(host.into());
        self
    }

    /// Sets the hosts, replacing any previously configured.
    pub fn hosts<H: Into<String>>(mut self, hosts: impl IntoIterator<Item = (H, u16)>) -> Self {
        self.hosts = hosts.into_iter().map(|(h, p)| (h.into(), p)).collect();
        self.host_strings.clear();
        self
    }

    /// Sets the connection timeout duration.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the maximum chunk size.
    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = Some(chunk_size);
        self
    }

    /// Enables refreshing the host list from the server.
    pub fn acquire_host_list(mut self, enabled: bool) -> Self {
        self.acquire_host_list = Some(enabled);
        self
    }

    /// Sets the host list refresh interval.
    pub fn acquire_host_list_interval(mut self, interval: Duration) -> Self {
        self.acquire_host_list_interval = Some(interval);
        self
    }

    /// Configures TLS settings using a builder function.
    pub fn tls<F>(mut self, f: F) -> Self
    where
        F: FnOnce(TlsConfigBuilder) -> TlsConfigBuilder,
    {
        self.tls = f(self.tls);
        self
    }

    /// Enables TLS with default settings.
    pub fn enable_tls(mut self) -> Self {
        self.tls = self.tls.enabled(true);
        self
    }

    /// Builds the network configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - a host has port 0 or an empty name
    /// - a host string cannot be parsed
    /// - `chunk_size` is below the protocol minimum
    /// - a timeout or interval is zero
    pub fn build(self) -> Result<NetworkConfig, ConfigError> {
        let tls = self.tls.build()?;

        let mut hosts = Vec::with_capacity(self.hosts.len() + self.host_strings.len());
        for (host, port) in self.hosts {
            hosts.push(HostEndpoint::with_tls(host, port, tls.enabled()));
        }
        for s in &self.host_strings {
            let parsed = HostEndpoint::parse(s).map_err(|e| match e {
                ArangoError::Configuration(message) => ConfigError::new(message),
                other => ConfigError::new(other.to_string()),
            })?;
            let tls_flag = parsed.is_tls() || tls.enabled();
            hosts.push(HostEndpoint::with_tls(parsed.host(), parsed.port(), tls_flag));
        }
        if hosts.is_empty() {
            hosts.push(HostEndpoint::with_tls(DEFAULT_HOST, DEFAULT_PORT, tls.enabled()));
        }
        for host in &hosts {
            if host.host().is_empty() {
                return Err(ConfigError::new("host name must not be empty"));
            }
            if host.port() == 0 {
                return Err(ConfigError::new(format!(
                    "host {} must have a non-zero port",
                    host.host()
                )));
            }
        }
        let mut seen = HashSet::new();
        hosts.retain(|host| seen.insert(host.clone()));

        let connect_timeout = self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT);
        if connect_timeout.is_zero() {
            return Err(ConfigError::new("connect_timeout must be greater than zero"));
        }

        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        if chunk_size < MIN_CHUNK_SIZE {
            return Err(ConfigError::new(format!(
                "chunk_size must be at least {}",
                MIN_CHUNK_SIZE
            )));
        }

        let acquire_host_list_interval = self
            .acquire_host_list_interval
            .unwrap_or(DEFAULT_ACQUIRE_HOST_LIST_INTERVAL);
        if acquire_host_list_interval.is_zero() {
            return Err(ConfigError::new(
                "acquire_host_list_interval must be greater than zero",
            ));
        }

        Ok(NetworkConfig {
            hosts,
            connect_timeout,
            chunk_size,
            acquire_host_list: self.acquire_host_list.unwrap_or(false),
            acquire_host_list_interval,
            tls,
        })
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    max_connections: usize,
    acquire_timeout: Duration,
    keep_alive_interval: Duration,
    overflow: OverflowPolicy,
    dead_host_cooldown: Duration,
}

impl PoolConfig {
    /// Returns the maximum number of pooled connections per host.
    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    /// Returns the acquire deadline.
    pub fn acquire_timeout(&self) -> Duration {
        self.acquire_timeout
    }

    /// Returns the age after which idle connections are recycled.
    pub fn keep_alive_interval(&self) -> Duration {
        self.keep_alive_interval
    }

    /// Returns the overflow policy.
    pub fn overflow(&self) -> OverflowPolicy {
        self.overflow
    }

    /// Returns how long a dead host is skipped.
    pub fn dead_host_cooldown(&self) -> Duration {
        self.dead_host_cooldown
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: DEFAULT_ACQUIRE_TIMEOUT,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            overflow: OverflowPolicy::Wait,
            dead_host_cooldown: DEFAULT_DEAD_HOST_COOLDOWN,
        }
    }
}

/// Builder for `PoolConfig`.
#[derive(Debug, Clone, Default)]
pub struct PoolConfigBuilder {
    max_connections: Option<usize>,
    acquire_timeout: Option<Duration>,
    keep_alive_interval: Option<Duration>,
    overflow: Option<OverflowPolicy>,
    dead_host_cooldown: Option<Duration>,
}

impl PoolConfigBuilder {
    /// Creates a new pool configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of pooled connections per host.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = Some(max);
        self
    }

    /// Sets the acquire deadline.
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Sets the idle connection recycle age.
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = Some(interval);
        self
    }

    /// Sets the overflow policy.
    pub fn overflow(mut self, policy: OverflowPolicy) -> Self {
        self.overflow = Some(policy);
        self
    }

    /// Sets the dead host cool-down.
    pub fn dead_host_cooldown(mut self, cooldown: Duration) -> Self {
        self.dead_host_cooldown = Some(cooldown);
        self
    }

    /// Builds the pool configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `max_connections` is zero or `acquire_timeout` is zero.
    pub fn build(self) -> Result<PoolConfig, ConfigError> {
        let max_connections = self.max_connections.unwrap_or(DEFAULT_MAX_CONNECTIONS);
        if max_connections == 0 {
            return Err(ConfigError::new("max_connections must be at least 1"));
        }

        let acquire_timeout = self.acquire_timeout.unwrap_or(DEFAULT_ACQUIRE_TIMEOUT);
        if acquire_timeout.is_zero() {
            return Err(ConfigError::new("acquire_timeout must be greater than zero"));
        }

        Ok(PoolConfig {
            max_connections,
            acquire_timeout,
            keep_alive_interval: self
                .keep_alive_interval
                .unwrap_or(DEFAULT_KEEP_ALIVE_INTERVAL),
            overflow: self.overflow.unwrap_or_default(),
            dead_host_cooldown: self.dead_host_cooldown.unwrap_or(DEFAULT_DEAD_HOST_COOLDOWN),
        })
    }
}

/// Retry configuration for transient request failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    initial_backoff: Duration,
    max_backoff: Duration,
    multiplier: f64,
    jitter: f64,
    max_retries: u32,
}

impl RetryConfig {
    /// Returns the initial backoff duration.
    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    /// Returns the maximum backoff duration.
    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    /// Returns the backoff multiplier.
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Returns the jitter factor in `[0, 1]`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Returns the maximum number of retry attempts.
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            multiplier: DEFAULT_RETRY_MULTIPLIER,
            jitter: DEFAULT_JITTER,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl From<RetryConfig> for RetryConfigBuilder {
    fn from(config: RetryConfig) -> Self {
        Self {
            initial_backoff: Some(config.initial_backoff),
            max_backoff: Some(config.max_backoff),
            multiplier: Some(config.multiplier),
            jitter: Some(config.jitter),
            max_retries: Some(config.max_retries),
        }
    }
}

/// Builder for `RetryConfig`.
#[derive(Debug, Clone, Default)]
pub struct RetryConfigBuilder {
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
    max_retries: Option<u32>,
}

impl RetryConfigBuilder {
    /// Creates a new retry configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the initial backoff duration.
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = Some(backoff);
        self
    }

    /// Sets the maximum backoff duration.
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    /// Sets the backoff multiplier.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier);
        self
    }

    /// Sets the jitter factor.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter);
        self
    }

    /// Sets the maximum number of retry attempts.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Builds the retry configuration, returning an error if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - `initial_backoff` exceeds `max_backoff`
    /// - `multiplier` is less than 1.0
    /// - `jitter` is outside `[0, 1]`
    pub fn build(self) -> Result<RetryConfig, ConfigError> {
        let initial_backoff = self.initial_backoff.unwrap_or(DEFAULT_INITIAL_BACKOFF);
        let max_backoff = self.max_backoff.unwrap_or(DEFAULT_MAX_BACKOFF);
        let multiplier = self.multiplier.unwrap_or(DEFAULT_RETRY_MULTIPLIER);
        let jitter = self.jitter.unwrap_or(DEFAULT_JITTER);
        let max_retries = self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES);

        if initial_backoff > max_backoff {
            return Err(ConfigError::new(
                "initial_backoff must not exceed max_backoff",
            ));
        }

        if multiplier < 1.0 {
            return Err(ConfigError::new("multiplier must be at least 1.0"));
        }

        if !(0.0..=1.0).contains(&jitter) {
            return Err(ConfigError::new("jitter must be between 0.0 and 1.0"));
        }

        Ok(RetryConfig {
            initial_backoff,
            max_backoff,
            multiplier,
            jitter,
            max_retries,
        })
    }
}

/// TLS configuration for secure connections.
#[derive(Debug, Clone)]
pub struct TlsConfig {
    enabled: bool,
    ca_cert_path: Option<PathBuf>,
    client_cert_path: Option<PathBuf>,
    client_key_path: Option<PathBuf>,
}

impl TlsConfig {
    /// Returns whether TLS is enabled for every configured host.
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the path to the CA certificate file.
    pub fn ca_cert_path(&self) -> Option<&PathBuf> {
        self.ca_cert_path.as_ref()
    }

    /// Returns the path to the client certificate file.
    pub fn client_cert_path(&self) -> Option<&PathBuf> {
        self.client_cert_path.as_ref()
    }

    /// Returns the path to the client private key file.
    pub fn client_key_path(&self) -> Option<&PathBuf> {
        self.client_key_path.as_ref()
    }

    /// Returns true if client authentication is configured.
    pub fn has_client_auth(&self) -> bool {
        self.client_cert_path.is_some() && self.client_key_path.is_some()
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ca_cert_path: None,
            client_cert_path: None,
            client_key_path: None,
        }
    }
}

/// Builder for `TlsConfig`.
#[derive(Debug, Clone, Default)]
pub struct TlsConfigBuilder {
    enabled: Option<bool>,
    ca_cert_path: Option<PathBuf>,
    client_cert_path: Option<PathBuf>,
    client_key_path: Option<PathBuf>,
}

impl TlsConfigBuilder {
    /// Creates a new TLS configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables TLS.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Sets the path to the CA certificate file for server verification.
    pub fn ca_cert_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert_path = Some(path.into());
        self
    }

    /// Sets client certificate and key paths for mutual TLS.
    pub fn client_auth(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
        self.client_cert_path = Some(cert_path.into());
        self.client_key_path = Some(key_path.into());
        self
    }

    /// Builds the TLS configuration.
    pub fn build(self) -> Result<TlsConfig, ConfigError> {
        Ok(TlsConfig {
            enabled: self.enabled.unwrap_or(false),
            ca_cert_path: self.ca_cert_path,
            client_cert_path: self.client_cert_path,
            client_key_path: self.client_key_path,
        })
    }
}

/// User credentials attached to every connection.
#[derive(Clone)]
pub struct Credentials {
    user: String,
    password: Option<String>,
}

impl Credentials {
    /// Creates credentials.
    pub fn new(user: impl Into<String>, password: Option<String>) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    /// Returns the user name.
    pub fn user(&self) -> &str {
        &self.user
    }

    /// Returns the password, if any.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Default for Credentials {
    fn default() -> Self {
        Self::new(DEFAULT_USER, None)
    }
}

/// Main client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    network: NetworkConfig,
    pool: PoolConfig,
    retry: RetryConfig,
    credentials: Credentials,
    timeout: Duration,
    load_balancing: LoadBalancing,
    decode: DecodeOptions,
}

impl ClientConfig {
    /// Creates a new client configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }

    /// Returns the network configuration.
    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    /// Returns the pool configuration.
    pub fn pool(&self) -> &PoolConfig {
        &self.pool
    }

    /// Returns the retry configuration.
    pub fn retry(&self) -> &RetryConfig {
        &self.retry
    }

    /// Returns the credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the default request deadline.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the host selection policy.
    pub fn load_balancing(&self) -> LoadBalancing {
        self.load_balancing
    }

    /// Returns the typed decoding options.
    pub fn decode_options(&self) -> &DecodeOptions {
        &self.decode
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            pool: PoolConfig::default(),
            retry: RetryConfig::default(),
            credentials: Credentials::default(),
            timeout: DEFAULT_TIMEOUT,
            load_balancing: LoadBalancing::default(),
            decode: DecodeOptions::default(),
        }
    }
}

/// Builder for `ClientConfig`.
#[derive(Debug, Clone, Default)]
pub struct ClientConfigBuilder {
    network: NetworkConfigBuilder,
    pool: PoolConfigBuilder,
    retry: RetryConfigBuilder,
    user: Option<String>,
    password: Option<String>,
    timeout: Option<Duration>,
    load_balancing: Option<LoadBalancing>,
    naming: Option<FieldNaming>,
    strict: Option<bool>,
}

impl ClientConfigBuilder {
    /// Creates a new client configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures network settings using a builder function.
    pub fn network<F>(mut self, f: F) -> Self
    where
        F: FnOnce(NetworkConfigBuilder) -> NetworkConfigBuilder,
    {
        self.network = f(self.network);
        self
    }

    /// Configures pool settings using a builder function.
    pub fn pool<F>(mut self, f: F) -> Self
    where
        F: FnOnce(PoolConfigBuilder) -> PoolConfigBuilder,
    {
        self.pool = f(self.pool);
        self
    }

    /// Configures retry settings using a builder function.
    pub fn retry<F>(mut self, f: F) -> Self
    where
        F: FnOnce(RetryConfigBuilder) -> RetryConfigBuilder,
    {
        self.retry = f(self.retry);
        self
    }

    /// Configures TLS settings using a builder function.
    pub fn tls<F>(mut self, f: F) -> Self
    where
        F: FnOnce(TlsConfigBuilder) -> TlsConfigBuilder,
    {
        self.network = self.network.tls(f);
        self
    }

    /// Enables TLS for every configured host.
    pub fn use_tls(mut self, enabled: bool) -> Self {
        self.network = self.network.tls(|t| t.enabled(enabled));
        self
    }

    /// Adds a host.
    pub fn add_host(mut self, host: impl Into<String>, port: u16) -> Self {
        self.network = self.network.add_host(host, port);
        self
    }

    /// Adds a host given as `host:port`.
    pub fn add_host_str(mut self, host: impl Into<String>) -> Self {
        self.network = self.network.add_host_str(host);
        self
    }

    /// Sets the hosts, replacing any previously configured.
    pub fn hosts<H: Into<String>>(mut self, hosts: impl IntoIterator<Item = (H, u16)>) -> Self {
        self.network = self.network.hosts(hosts);
        self
    }

    /// Sets the user.
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Sets the password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Sets user and password.
    pub fn credentials(self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user(user).password(password)
    }

    /// Sets the default request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.network = self.network.connect_timeout(timeout);
        self
    }

    /// Sets the maximum number of pooled connections per host.
    pub fn max_connections(mut self, max: usize) -> Self {
        self.pool = self.pool.max_connections(max);
        self
    }

    /// Sets the host selection policy.
    pub fn load_balancing(mut self, policy: LoadBalancing) -> Self {
        self.load_balancing = Some(policy);
        self
    }

    /// Enables refreshing the host list from the server.
    pub fn acquire_host_list(mut self, enabled: bool) -> Self {
        self.network = self.network.acquire_host_list(enabled);
        self
    }

    /// Sets the field naming convention for typed decoding.
    pub fn field_naming(mut self, naming: FieldNaming) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Rejects unknown fields during typed decoding.
    pub fn strict_decoding(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Builds the client configuration, returning an error if validation fails.
    pub fn build(self) -> Result<ClientConfig, ConfigError> {
        let user = self.user.unwrap_or_else(|| DEFAULT_USER.to_string());
        if user.is_empty() {
            return Err(ConfigError::new("user must not be empty"));
        }

        let timeout = self.timeout.unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(ConfigError::new("timeout must be greater than zero"));
        }

        let network = self.network.build()?;
        let pool = self.pool.build()?;
        let retry = self.retry.build()?;

        Ok(ClientConfig {
            network,
            pool,
            retry,
            credentials: Credentials::new(user, self.password),
            timeout,
            load_balancing: self.load_balancing.unwrap_or_default(),
            decode: DecodeOptions {
                naming: self.naming.unwrap_or_default(),
                strict: self.strict.unwrap_or(false),
            },
        })
    }
}

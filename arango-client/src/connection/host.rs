//! Host endpoints and host handles.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use arango_core::{ArangoError, Result};

/// Default server port.
pub const DEFAULT_PORT: u16 = 8529;

/// One server endpoint. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostEndpoint {
    host: String,
    port: u16,
    tls: bool,
}

impl HostEndpoint {
    /// Creates a plain TCP endpoint.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            tls: false,
        }
    }

    /// Creates an endpoint with the given TLS flag.
    pub fn with_tls(host: impl Into<String>, port: u16, tls: bool) -> Self {
        Self {
            host: host.into(),
            port,
            tls,
        }
    }

    /// Parses `host:port`, optionally prefixed by a scheme.
    ///
    /// `tcp://` and `http://` give plain endpoints; `ssl://`, `tls://` and
    /// `https://` give TLS endpoints. A missing port defaults to 8529.
    /// Bracketed IPv6 literals (`[::1]:8529`) are accepted.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (rest, tls) = match s.split_once("://") {
            Some(("tcp" | "http" | "vst", rest)) => (rest, false),
            Some(("ssl" | "tls" | "https" | "vsts", rest)) => (rest, true),
            Some((scheme, _)) => {
                return Err(ArangoError::Configuration(format!(
                    "unsupported endpoint scheme '{}' in '{}'",
                    scheme, s
                )))
            }
            None => (s, false),
        };
        let rest = rest.trim_end_matches('/');

        let (host, port) = if let Some(stripped) = rest.strip_prefix('[') {
            let (host, tail) = stripped.split_once(']').ok_or_else(|| {
                ArangoError::Configuration(format!("unterminated IPv6 literal in '{}'", s))
            })?;
            let port = match tail.strip_prefix(':') {
                Some(port) => parse_port(port, s)?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => {
                    return Err(ArangoError::Configuration(format!(
                        "invalid endpoint '{}'",
                        s
                    )))
                }
            };
            (host, port)
        } else if rest.matches(':').count() > 1 {
            return Err(ArangoError::Configuration(format!(
                "IPv6 address in '{}' must be enclosed in brackets",
                s
            )));
        } else {
            match rest.rsplit_once(':') {
                Some((host, port)) => (host, parse_port(port, s)?),
                None => (rest, DEFAULT_PORT),
            }
        };

        if host.is_empty() {
            return Err(ArangoError::Configuration(format!(
                "endpoint '{}' has no host",
                s
            )));
        }
        Ok(Self::with_tls(host, port, tls))
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_tls(&self) -> bool {
        self.tls
    }

    /// Returns the `host:port` string used to connect.
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

fn parse_port(port: &str, endpoint: &str) -> Result<u16> {
    port.parse::<u16>().map_err(|_| {
        ArangoError::Configuration(format!("invalid port '{}' in '{}'", port, endpoint))
    })
}

impl fmt::Display for HostEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = if self.tls { "ssl" } else { "tcp" };
        write!(f, "{}://{}", scheme, self.address())
    }
}

/// A single-slot holder that pins a request or cursor to one host.
///
/// Empty at creation; the executor fills it on the first successful
/// dispatch and later dispatches sharing the handle go to the same host.
/// Clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct HostHandle {
    slot: Arc<Mutex<Option<HostEndpoint>>>,
}

impl HostHandle {
    /// Creates an empty handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle already pointing at `host`.
    pub fn pinned_to(host: HostEndpoint) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(host))),
        }
    }

    /// Returns the current host.
    pub fn get(&self) -> Option<HostEndpoint> {
        self.slot.lock().clone()
    }

    /// Replaces the current host.
    pub fn set(&self, host: HostEndpoint) {
        *self.slot.lock() = Some(host);
    }

    /// Empties the handle.
    pub fn clear(&self) {
        *self.slot.lock() = None;
    }

    /// Empties the handle only if it points at `host`.
    pub fn clear_if(&self, host: &HostEndpoint) -> bool {
        let mut slot = self.slot.lock();
        if slot.as_ref() == Some(host) {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn is_empty(&self) -> bool {
        self.slot.lock().is_none()
    }
}

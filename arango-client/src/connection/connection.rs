//! Single multiplexed connection to one host.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use arango_core::protocol::{
    decode_response, encode_authentication, encode_request, Message, Request, Response, VstCodec,
    HEADER_AUTHORIZATION, PREAMBLE,
};
use arango_core::{ArangoError, Result};

use super::connector::{BoxedTransport, Connector};
use super::HostEndpoint;
use crate::api::entity::ErrorEntity;
use crate::config::{ClientConfig, Credentials};

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generates a new unique connection ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw ID value.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Connection lifecycle.
///
/// `Disconnected → Connecting → Ready → Closing → Closed`. Only `Ready`
/// accepts new sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Ready = 2,
    Closing = 3,
    Closed = 4,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Disconnected,
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Ready,
            3 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// Settings a connection needs from the client configuration.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub chunk_size: usize,
    pub credentials: Credentials,
}

impl ConnectionOptions {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            connect_timeout: config.network().connect_timeout(),
            request_timeout: config.timeout(),
            chunk_size: config.network().chunk_size(),
            credentials: config.credentials().clone(),
        }
    }
}

type PendingTable = Mutex<HashMap<u64, oneshot::Sender<Result<Response>>>>;
type Writer = FramedWrite<WriteHalf<BoxedTransport>, VstCodec>;
type Reader = FramedRead<ReadHalf<BoxedTransport>, VstCodec>;

/// State shared between the connection handle and its reader task.
#[derive(Debug)]
struct Shared {
    id: ConnectionId,
    host: HostEndpoint,
    state: AtomicU8,
    pending: PendingTable,
}

impl Shared {
    fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Moves `Ready` or `Connecting` to `Closing`. Returns false if already closing.
    fn begin_close(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current >= ConnectionState::Closing as u8 {
                return false;
            }
            match self.state.compare_exchange(
                current,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    fn complete(&self, message_id: u64, result: Result<Response>) {
        match self.pending.lock().remove(&message_id) {
            Some(sender) => {
                let _ = sender.send(result);
            }
            None => {
                tracing::warn!(
                    id = %self.id,
                    host = %self.host,
                    message_id,
                    "dropping response for unknown message id"
                );
            }
        }
    }

    fn fail_all(&self, error: &ArangoError) {
        let drained: Vec<_> = self.pending.lock().drain().collect();
        if !drained.is_empty() {
            tracing::debug!(
                id = %self.id,
                count = drained.len(),
                error = %error,
                "failing pending requests"
            );
        }
        for (_, sender) in drained {
            let _ = sender.send(Err(error.duplicate()));
        }
    }
}

/// Removes a pending entry when the awaiting send finishes, times out or is dropped.
struct PendingGuard<'a> {
    shared: &'a Shared,
    message_id: u64,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.shared.pending.lock().remove(&self.message_id);
    }
}

/// A connection to a single host.
///
/// Requests are multiplexed: every send gets a fresh message id, and a reader
/// task routes each response to its waiting caller through the pending table.
/// Responses may complete in any order.
pub struct Connection {
    shared: Arc<Shared>,
    writer: tokio::sync::Mutex<Writer>,
    next_message_id: AtomicU64,
    authorization: String,
    request_timeout: Duration,
    shutdown: CancellationToken,
    reader: Mutex<Option<JoinHandle<()>>>,
    created_at: Instant,
    last_used: Mutex<Instant>,
}

impl Connection {
    /// Connects to `host`, writes the preamble, authenticates and starts the reader.
    #[instrument(
        name = "connection.open",
        skip(connector, options),
        fields(host = %host)
    )]
    pub async fn open(
        host: HostEndpoint,
        connector: &dyn Connector,
        options: &ConnectionOptions,
    ) -> Result<Arc<Self>> {
        let connect_timeout = options.connect_timeout;
        tracing::debug!(timeout = ?connect_timeout, "attempting connection");

        let handshake = async {
            let mut transport = connector.connect(&host).await?;
            transport.write_all(PREAMBLE).await?;
            transport.flush().await?;

            let (read_half, write_half) = tokio::io::split(transport);
            let mut reader = FramedRead::new(read_half, VstCodec::with_chunk_size(options.chunk_size));
            let mut writer =
                FramedWrite::new(write_half, VstCodec::with_chunk_size(options.chunk_size));

            authenticate(&mut reader, &mut writer, &options.credentials).await?;
            Ok::<_, ArangoError>((reader, writer))
        };

        let (reader, writer) = timeout(connect_timeout, handshake).await.map_err(|_| {
            tracing::warn!(timeout = ?connect_timeout, "connection attempt timed out");
            ArangoError::Timeout(format!(
                "connection to {} timed out after {:?}",
                host, connect_timeout
            ))
        })??;

        let shared = Arc::new(Shared {
            id: ConnectionId::new(),
            host,
            state: AtomicU8::new(ConnectionState::Connecting as u8),
            pending: Mutex::new(HashMap::new()),
        });
        let shutdown = CancellationToken::new();

        let now = Instant::now();
        let connection = Arc::new(Self {
            shared: Arc::clone(&shared),
            writer: tokio::sync::Mutex::new(writer),
            next_message_id: AtomicU64::new(AUTH_MESSAGE_ID + 1),
            authorization: authorization_header(&options.credentials),
            request_timeout: options.request_timeout,
            shutdown: shutdown.clone(),
            reader: Mutex::new(None),
            created_at: now,
            last_used: Mutex::new(now),
        });

        shared.set_state(ConnectionState::Ready);
        let handle = tokio::spawn(read_loop(shared, reader, shutdown));
        *connection.reader.lock() = Some(handle);

        tracing::info!(id = %connection.id(), "connection ready");
        Ok(connection)
    }

    /// Returns the connection's unique identifier.
    pub fn id(&self) -> ConnectionId {
        self.shared.id
    }

    /// Returns the host this connection talks to.
    pub fn host(&self) -> &HostEndpoint {
        &self.shared.host
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ConnectionState::Ready
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Returns when this connection was opened.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns when this connection last carried a request.
    pub fn last_used(&self) -> Instant {
        *self.last_used.lock()
    }

    /// Sends a request and waits for its response.
    ///
    /// The deadline is the request's own timeout or the connection default.
    /// On expiry the pending entry is removed and `Timeout` is returned; the
    /// connection stays open and a late response is dropped.
    pub async fn send(&self, request: &Request) -> Result<Response> {
        let deadline = request.request_timeout().unwrap_or(self.request_timeout);
        match timeout(deadline, self.send_inner(request)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::debug!(
                    id = %self.id(),
                    request = %request,
                    timeout = ?deadline,
                    "request timed out"
                );
                Err(ArangoError::Timeout(format!(
                    "{} on {} timed out after {:?}",
                    request,
                    self.host(),
                    deadline
                )))
            }
        }
    }

    async fn send_inner(&self, request: &Request) -> Result<Response> {
        if !self.is_ready() {
            return Err(self.closed_error());
        }

        let message_id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let payload = encode_request(
            request,
            &[(HEADER_AUTHORIZATION, self.authorization.as_str())],
        )?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().insert(message_id, tx);
        let _guard = PendingGuard {
            shared: &self.shared,
            message_id,
        };

        // The reader drains the table after leaving Ready; an entry inserted
        // after that drain would never complete.
        if !self.is_ready() {
            return Err(self.closed_error());
        }

        *self.last_used.lock() = Instant::now();
        tracing::trace!(id = %self.id(), message_id, request = %request, "sending request");

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.send(Message::new(message_id, payload)).await {
                tracing::warn!(id = %self.id(), error = %e, "write failed, closing connection");
                if self.shared.begin_close() {
                    self.shutdown.cancel();
                }
                return Err(e);
            }
        }

        match rx.await {
            Ok(result) => result,
            Err(_) => Err(self.closed_error()),
        }
    }

    /// Closes the connection. Pending requests fail with `ConnectionClosed`.
    #[instrument(name = "connection.close", skip(self), fields(id = %self.id()))]
    pub async fn close(&self) {
        if self.shared.begin_close() {
            self.shutdown.cancel();
        }

        {
            let mut writer = self.writer.lock().await;
            let _ = writer.close().await;
        }

        let handle = self.reader.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        self.shared.set_state(ConnectionState::Closed);
        tracing::debug!(host = %self.host(), "connection closed");
    }

    fn closed_error(&self) -> ArangoError {
        ArangoError::ConnectionClosed(format!(
            "{} to {} is {:?}",
            self.id(),
            self.host(),
            self.state()
        ))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.shared.id)
            .field("host", &self.shared.host)
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Message id used by the authentication exchange.
const AUTH_MESSAGE_ID: u64 = 1;

async fn authenticate(
    reader: &mut Reader,
    writer: &mut Writer,
    credentials: &Credentials,
) -> Result<()> {
    let payload =
        encode_authentication(credentials.user(), credentials.password().unwrap_or_default())?;
    writer.send(Message::new(AUTH_MESSAGE_ID, payload)).await?;

    let message = match reader.next().await {
        Some(message) => message?,
        None => {
            return Err(ArangoError::ConnectionClosed(
                "connection closed during authentication".to_string(),
            ))
        }
    };
    if message.id != AUTH_MESSAGE_ID {
        return Err(ArangoError::Protocol(format!(
            "expected authentication response, got message {}",
            message.id
        )));
    }

    let response = decode_response(&message.payload)?;
    if response.code != 200 {
        tracing::warn!(code = response.code, user = credentials.user(), "authentication rejected");
        return Err(ErrorEntity::into_error(response));
    }
    Ok(())
}

fn authorization_header(credentials: &Credentials) -> String {
    let raw = format!(
        "{}:{}",
        credentials.user(),
        credentials.password().unwrap_or_default()
    );
    format!("basic {}", BASE64.encode(raw))
}

async fn read_loop(shared: Arc<Shared>, mut reader: Reader, shutdown: CancellationToken) {
    let reason = loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                break ArangoError::ConnectionClosed(format!("{} closed", shared.id));
            }
            frame = reader.next() => match frame {
                Some(Ok(message)) => match decode_response(&message.payload) {
                    Ok(response) => shared.complete(message.id, Ok(response)),
                    Err(e) => {
                        tracing::error!(id = %shared.id, error = %e, "undecodable response, closing");
                        break e;
                    }
                },
                Some(Err(e)) => {
                    tracing::error!(id = %shared.id, error = %e, "read failed, closing");
                    break e;
                }
                None => {
                    tracing::debug!(id = %shared.id, host = %shared.host, "closed by peer");
                    break ArangoError::ConnectionClosed(format!(
                        "{} closed by {}",
                        shared.id, shared.host
                    ));
                }
            }
        }
    };

    shared.begin_close();
    shared.fail_all(&reason);
    shared.set_state(ConnectionState::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_uniqueness() {
        let id1 = ConnectionId::new();
        let id2 = ConnectionId::new();
        let id3 = ConnectionId::new();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId(42);
        assert_eq!(id.to_string(), "conn-42");
        assert_eq!(id.value(), 42);
    }

    #[test]
    fn test_state_roundtrip() {
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Ready,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            assert_eq!(ConnectionState::from_u8(state as u8), state);
        }
    }

    #[test]
    fn test_authorization_header() {
        let credentials = Credentials::new("root", Some("pw".to_string()));
        assert_eq!(authorization_header(&credentials), "basic cm9vdDpwdw==");

        let credentials = Credentials::new("root", None);
        assert_eq!(authorization_header(&credentials), "basic cm9vdDo=");
    }

    fn shared() -> Shared {
        Shared {
            id: ConnectionId::new(),
            host: HostEndpoint::new("h", 8529),
            state: AtomicU8::new(ConnectionState::Ready as u8),
            pending: Mutex::new(HashMap::new()),
        }
    }

    #[test]
    fn test_begin_close_once() {
        let shared = shared();
        assert!(shared.begin_close());
        assert!(!shared.begin_close());
        assert_eq!(shared.state(), ConnectionState::Closing);
    }

    #[tokio::test]
    async fn test_complete_routes_by_message_id() {
        let shared = shared();
        let (tx1, rx1) = oneshot::channel();
        let (tx2, rx2) = oneshot::channel();
        shared.pending.lock().insert(1, tx1);
        shared.pending.lock().insert(2, tx2);

        shared.complete(2, Ok(Response::new(202)));
        shared.complete(1, Ok(Response::new(201)));
        shared.complete(99, Ok(Response::new(200)));

        assert_eq!(rx1.await.unwrap().unwrap().code, 201);
        assert_eq!(rx2.await.unwrap().unwrap().code, 202);
        assert!(shared.pending.lock().is_empty());
    }

    #[tokio::test]
    async fn test_fail_all_drains_table() {
        let shared = shared();
        let (tx, rx) = oneshot::channel();
        shared.pending.lock().insert(7, tx);

        shared.fail_all(&ArangoError::ConnectionClosed("gone".into()));
        assert!(shared.pending.lock().is_empty());
        assert!(matches!(
            rx.await.unwrap(),
            Err(ArangoError::ConnectionClosed(_))
        ));
    }

    #[test]
    fn test_pending_guard_removes_entry() {
        let shared = shared();
        let (tx, _rx) = oneshot::channel();
        shared.pending.lock().insert(5, tx);
        {
            let _guard = PendingGuard {
                shared: &shared,
                message_id: 5,
            };
        }
        assert!(shared.pending.lock().is_empty());
    }
}

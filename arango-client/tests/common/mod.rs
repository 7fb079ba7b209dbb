//! In-process VelocyStream server for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use arango_client::core::protocol::{
    decode_incoming, encode_response, Incoming, Message, VstCodec, PREAMBLE,
};
use arango_client::core::{Method, Request, Response};
use arango_client::{ClientConfig, ClientConfigBuilder, Document, HostEndpoint, LoadBalancing};

/// What the server does with a request.
#[derive(Debug, Clone)]
pub enum Reply {
    Respond(Response),
    Delayed(Duration, Response),
    /// Closes the connection without answering.
    Close,
    /// Never answers.
    Silent,
}

/// A request as the server saw it.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub message_id: u64,
    pub database: String,
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Document>,
}

impl Recorded {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

type Handler = Arc<dyn Fn(&Request) -> Reply + Send + Sync>;

struct ServerState {
    handler: Handler,
    password: Option<String>,
    requests: Mutex<Vec<Recorded>>,
    connections: AtomicUsize,
    authentications: AtomicUsize,
}

pub struct MockServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
    shutdown: CancellationToken,
    task: JoinHandle<()>,
}

impl MockServer {
    /// Starts a server accepting any credentials.
    pub async fn start<F>(handler: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + Sync + 'static,
    {
        Self::start_inner(Arc::new(handler), None).await
    }

    /// Starts a server rejecting authentication unless the password matches.
    pub async fn start_with_password<F>(password: &str, handler: F) -> Self
    where
        F: Fn(&Request) -> Reply + Send + Sync + 'static,
    {
        Self::start_inner(Arc::new(handler), Some(password.to_string())).await
    }

    async fn start_inner(handler: Handler, password: Option<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(ServerState {
            handler,
            password,
            requests: Mutex::new(Vec::new()),
            connections: AtomicUsize::new(0),
            authentications: AtomicUsize::new(0),
        });
        let shutdown = CancellationToken::new();

        let accept_state = Arc::clone(&state);
        let accept_token = shutdown.clone();
        let task = tokio::spawn(async move {
            loop {
                let stream = tokio::select! {
                    _ = accept_token.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => stream,
                        Err(_) => break,
                    },
                };
                accept_state.connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve(
                    stream,
                    Arc::clone(&accept_state),
                    accept_token.child_token(),
                ));
            }
        });

        Self {
            addr,
            state,
            shutdown,
            task,
        }
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    pub fn endpoint(&self) -> HostEndpoint {
        HostEndpoint::new("127.0.0.1", self.port())
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.requests.lock().clone()
    }

    /// Number of requests with `method` whose path starts with `prefix`.
    pub fn count(&self, method: Method, prefix: &str) -> usize {
        self.state
            .requests
            .lock()
            .iter()
            .filter(|r| r.method == method && r.path.starts_with(prefix))
            .count()
    }

    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    pub fn authentication_count(&self) -> usize {
        self.state.authentications.load(Ordering::SeqCst)
    }

    /// Stops accepting and drops every open connection.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.task.abort();
    }
}

async fn serve(mut stream: TcpStream, state: Arc<ServerState>, token: CancellationToken) {
    let mut preamble = [0u8; 11];
    if stream.read_exact(&mut preamble).await.is_err() || preamble[..] != PREAMBLE[..] {
        return;
    }

    let (read_half, write_half) = stream.into_split();
    let mut reader = FramedRead::new(read_half, VstCodec::new());
    let (tx, mut rx) = mpsc::unbounded_channel::<Option<Message>>();

    let writer_token = token.clone();
    let writer = tokio::spawn(async move {
        let mut writer = FramedWrite::new(write_half, VstCodec::new());
        loop {
            let item = tokio::select! {
                _ = writer_token.cancelled() => break,
                item = rx.recv() => item,
            };
            match item {
                Some(Some(message)) => {
                    if writer.send(message).await.is_err() {
                        break;
                    }
                }
                _ => break,
            }
        }
    });

    loop {
        let next = tokio::select! {
            _ = token.cancelled() => break,
            next = reader.next() => next,
        };
        let Some(Ok(message)) = next else { break };

        match decode_incoming(&message.payload) {
            Ok(Incoming::Authentication(auth)) => {
                state.authentications.fetch_add(1, Ordering::SeqCst);
                let accepted = match &state.password {
                    Some(expected) => &auth.password == expected,
                    None => true,
                };
                let response = if accepted {
                    Response::new(200)
                } else {
                    error_response(401, 11, "not authorized to execute this request")
                };
                reply(&tx, message.id, &response);
            }
            Ok(Incoming::Request(request)) => {
                state.requests.lock().push(Recorded {
                    message_id: message.id,
                    database: request.database_name().to_string(),
                    method: request.method(),
                    path: request.path().to_string(),
                    query: request.query_params().to_vec(),
                    headers: request.headers().to_vec(),
                    body: request.body_document().ok().flatten(),
                });

                match (state.handler)(&request) {
                    Reply::Respond(response) => reply(&tx, message.id, &response),
                    Reply::Delayed(delay, response) => {
                        let tx = tx.clone();
                        let id = message.id;
                        tokio::spawn(async move {
                            tokio::time::sleep(delay).await;
                            reply(&tx, id, &response);
                        });
                    }
                    Reply::Close => {
                        let _ = tx.send(None);
                        break;
                    }
                    Reply::Silent => {}
                }
            }
            Err(_) => break,
        }
    }

    drop(reader);
    let _ = tx.send(None);
    let _ = writer.await;
}

fn reply(tx: &mpsc::UnboundedSender<Option<Message>>, id: u64, response: &Response) {
    let payload = encode_response(response).unwrap();
    let _ = tx.send(Some(Message::new(id, payload)));
}

/// A 200 response carrying `body`.
pub fn ok(body: serde_json::Value) -> Reply {
    Reply::Respond(Response::new(200).with_body(Document::from(body)))
}

/// A response in the server's error body format.
pub fn error_response(code: i32, error_num: i64, message: &str) -> Response {
    Response::new(code).with_body(Document::from(serde_json::json!({
        "error": true,
        "errorNum": error_num,
        "code": code,
        "errorMessage": message,
    })))
}

pub fn error(code: i32, error_num: i64, message: &str) -> Reply {
    Reply::Respond(error_response(code, error_num, message))
}

pub fn version_body() -> serde_json::Value {
    serde_json::json!({
        "server": "arango",
        "version": "3.11.4",
        "license": "community",
    })
}

/// Serves one query cursor named `c1` over the integers `1..=total`.
///
/// `POST /_api/cursor` opens it, `POST /_api/cursor/c1` continues it and
/// `DELETE /_api/cursor/c1` discards it. Anything else is a 404.
pub fn cursor_handler(total: usize, batch: usize) -> impl Fn(&Request) -> Reply + Send + Sync {
    let offsets: Mutex<HashMap<String, usize>> = Mutex::new(HashMap::new());
    move |request: &Request| match (request.method(), request.path()) {
        (Method::Post, "/_api/cursor") => {
            offsets.lock().insert("c1".to_string(), 0);
            page(&offsets, total, batch)
        }
        (Method::Post, "/_api/cursor/c1") => page(&offsets, total, batch),
        (Method::Delete, "/_api/cursor/c1") => {
            offsets.lock().remove("c1");
            Reply::Respond(Response::new(202))
        }
        _ => error(404, 1202, "not found"),
    }
}

fn page(offsets: &Mutex<HashMap<String, usize>>, total: usize, batch: usize) -> Reply {
    let mut offsets = offsets.lock();
    let Some(offset) = offsets.get_mut("c1") else {
        return error(404, 1600, "cursor not found");
    };
    let start = *offset;
    let end = (start + batch).min(total);
    *offset = end;

    let items: Vec<i64> = ((start + 1)..=end).map(|i| i as i64).collect();
    let has_more = end < total;
    let mut body = serde_json::json!({
        "result": items,
        "hasMore": has_more,
        "count": total,
        "cached": false,
        "extra": { "stats": { "writesExecuted": 0, "scannedFull": total }, "warnings": [] },
    });
    if has_more {
        body["id"] = serde_json::json!("c1");
    }
    ok(body)
}

pub fn config_for(servers: &[&MockServer]) -> ClientConfigBuilder {
    let mut builder = ClientConfig::builder()
        .user("root")
        .timeout(Duration::from_secs(5))
        .connect_timeout(Duration::from_secs(2))
        .load_balancing(LoadBalancing::None)
        .retry(|r| {
            r.initial_backoff(Duration::from_millis(10))
                .max_backoff(Duration::from_millis(50))
        });
    for server in servers {
        builder = builder.add_host("127.0.0.1", server.port());
    }
    builder
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

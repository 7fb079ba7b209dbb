//! Request and response envelopes.
//!
//! A message payload is a packed header array immediately followed by the
//! packed body. Requests carry
//! `[version, kind, database, method, path, query, headers]`, responses carry
//! `[version, kind, code, headers]`.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use bytes::Bytes;

use super::constants::*;
use crate::document::{pack, Document};
use crate::error::{ArangoError, Result};

/// Request method. The discriminant is the wire code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Delete = 0,
    Get = 1,
    Post = 2,
    Put = 3,
    Head = 4,
    Patch = 5,
    Options = 6,
}

impl Method {
    /// Returns the wire code.
    pub fn code(self) -> i64 {
        self as i64
    }

    /// Looks up a method by wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            0 => Method::Delete,
            1 => Method::Get,
            2 => Method::Post,
            3 => Method::Put,
            4 => Method::Head,
            5 => Method::Patch,
            6 => Method::Options,
            _ => return None,
        })
    }

    /// Returns true if repeating the request has no additional effect.
    pub fn is_idempotent(self) -> bool {
        matches!(
            self,
            Method::Get | Method::Head | Method::Options | Method::Put | Method::Delete
        )
    }

    /// Returns the method name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Delete => "DELETE",
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request body.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// A document, packed when the request is encoded.
    Document(Document),
    /// Bytes that are already packed.
    Raw(Bytes),
}

/// An immutable description of one logical request.
///
/// Built with the chained setters below; nothing about connections or
/// message ids lives here.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    database: String,
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    headers: Vec<(String, String)>,
    body: Option<Body>,
    retryable: bool,
    dirty_read: bool,
    timeout: Option<Duration>,
}

impl Request {
    /// Creates a request against a database. An empty name means server-wide.
    pub fn new(database: impl Into<String>, method: Method, path: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
            retryable: false,
            dirty_read: false,
            timeout: None,
        }
    }

    /// Appends a query parameter. Insertion order is kept on the wire.
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Appends a query parameter when `value` is `Some`.
    pub fn query_opt<V: ToString>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(v) => self.query(key, v),
            None => self,
        }
    }

    /// Sets a header, replacing an existing value with the same name.
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.headers.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.headers.push((key, value)),
        }
        self
    }

    /// Sets a document body.
    pub fn body(mut self, body: impl Into<Document>) -> Self {
        self.body = Some(Body::Document(body.into()));
        self
    }

    /// Sets an already packed body.
    pub fn raw_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(Body::Raw(body.into()));
        self
    }

    /// Marks a non-idempotent request as safe to repeat.
    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    /// Allows the request to be served by a follower.
    pub fn dirty_read(mut self, dirty_read: bool) -> Self {
        self.dirty_read = dirty_read;
        if dirty_read {
            self.header(HEADER_ALLOW_DIRTY_READ, "true")
        } else {
            self.headers.retain(|(k, _)| k != HEADER_ALLOW_DIRTY_READ);
            self
        }
    }

    /// Overrides the client's request deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn database_name(&self) -> &str {
        &self.database
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_params(&self) -> &[(String, String)] {
        &self.query
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Returns a header value by name.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn body_ref(&self) -> Option<&Body> {
        self.body.as_ref()
    }

    /// Returns the body as a document, unpacking raw bodies.
    pub fn body_document(&self) -> Result<Option<Document>> {
        match &self.body {
            None => Ok(None),
            Some(Body::Document(doc)) => Ok(Some(doc.clone())),
            Some(Body::Raw(bytes)) => pack::decode(bytes).map(Some),
        }
    }

    /// Returns true if the executor may repeat this request after a transient failure.
    pub fn is_retryable(&self) -> bool {
        self.retryable || self.method.is_idempotent()
    }

    pub fn is_dirty_read(&self) -> bool {
        self.dirty_read
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.database.is_empty() {
            write!(f, "{} {}", self.method, self.path)
        } else {
            write!(f, "{} /_db/{}{}", self.method, self.database, self.path)
        }
    }
}

/// A decoded response envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Envelope version.
    pub version: i64,
    /// Envelope kind, always [`KIND_RESPONSE`] for decoded responses.
    pub kind: i64,
    /// HTTP-like response code.
    pub code: i32,
    /// Header parameters, including unknown positional fields.
    pub headers: HashMap<String, String>,
    /// Response body.
    pub body: Option<Document>,
}

impl Response {
    /// Creates a response with the given code and no body.
    pub fn new(code: i32) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            kind: KIND_RESPONSE,
            code,
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Sets the body.
    pub fn with_body(mut self, body: impl Into<Document>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Sets a header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Returns a header value by name.
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(String::as_str)
    }

    /// Returns true for codes below 400.
    pub fn is_success(&self) -> bool {
        self.code < 400
    }

    /// Returns the body, or `Null` if there is none.
    pub fn into_body(self) -> Document {
        self.body.unwrap_or_default()
    }
}

/// The first message a client sends after the preamble.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub user: String,
    pub password: String,
}

/// Messages a server receives.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Authentication(Authentication),
    Request(Request),
}

/// Encodes a request payload. `extra_headers` are added to the request's own
/// headers without replacing them.
pub fn encode_request(request: &Request, extra_headers: &[(&str, &str)]) -> Result<Bytes> {
    let mut headers = Document::object();
    for (key, value) in &request.headers {
        headers.insert(key.clone(), value.as_str());
    }
    for (key, value) in extra_headers {
        if request.header_value(key).is_none() {
            headers.insert(*key, *value);
        }
    }

    let header = Document::Array(vec![
        PROTOCOL_VERSION.into(),
        KIND_REQUEST.into(),
        request.database.as_str().into(),
        request.method.code().into(),
        request.path.as_str().into(),
        request
            .query
            .iter()
            .map(|(k, v)| (k.clone(), Document::from(v.as_str())))
            .collect(),
        headers,
    ]);

    let mut buf = Vec::with_capacity(128);
    pack::encode_into(&header, &mut buf)?;
    match &request.body {
        None => {}
        Some(Body::Document(doc)) => pack::encode_into(doc, &mut buf)?,
        Some(Body::Raw(bytes)) => buf.extend_from_slice(bytes),
    }
    Ok(Bytes::from(buf))
}

/// Decodes a response payload.
pub fn decode_response(payload: &[u8]) -> Result<Response> {
    let (header, consumed) = pack::decode_prefix(payload)?;
    let fields = header_fields(header, RESPONSE_HEADER_FIELDS)?;

    let mut fields = fields.into_iter();
    let version = integer_field(fields.next(), "version")?;
    check_version(version)?;
    let kind = integer_field(fields.next(), "kind")?;
    if kind != KIND_RESPONSE {
        return Err(ArangoError::Protocol(format!(
            "expected response envelope, got kind {}",
            kind
        )));
    }
    let code = integer_field(fields.next(), "response code")?;
    let code = i32::try_from(code)
        .map_err(|_| ArangoError::Protocol(format!("response code {} out of range", code)))?;

    let mut headers = HashMap::new();
    string_map(fields.next(), "header", |k, v| {
        headers.insert(k, v);
    })?;
    for (idx, extra) in fields.enumerate() {
        headers.insert(
            format!("{}{}", EXTRA_FIELD_PREFIX, RESPONSE_HEADER_FIELDS + idx),
            extra.to_json().to_string(),
        );
    }

    Ok(Response {
        version,
        kind,
        code,
        headers,
        body: decode_body(&payload[consumed..])?,
    })
}

/// Encodes a response payload.
pub fn encode_response(response: &Response) -> Result<Bytes> {
    let mut keys: Vec<&String> = response.headers.keys().collect();
    keys.sort();
    let headers: Document = keys
        .into_iter()
        .map(|k| (k.clone(), Document::from(response.headers[k].as_str())))
        .collect();

    let header = Document::Array(vec![
        response.version.into(),
        response.kind.into(),
        i64::from(response.code).into(),
        headers,
    ]);

    let mut buf = Vec::with_capacity(128);
    pack::encode_into(&header, &mut buf)?;
    if let Some(body) = &response.body {
        pack::encode_into(body, &mut buf)?;
    }
    Ok(Bytes::from(buf))
}

/// Encodes the plain user/password authentication message.
pub fn encode_authentication(user: &str, password: &str) -> Result<Bytes> {
    let header = Document::Array(vec![
        PROTOCOL_VERSION.into(),
        KIND_AUTHENTICATION.into(),
        AUTH_PLAIN.into(),
        user.into(),
        password.into(),
    ]);
    pack::encode(&header).map(Bytes::from)
}

/// Decodes a payload received by a server: an authentication message or a request.
pub fn decode_incoming(payload: &[u8]) -> Result<Incoming> {
    let (header, consumed) = pack::decode_prefix(payload)?;
    let fields = header_fields(header, 2)?;
    let version = integer_field(fields.first().cloned(), "version")?;
    check_version(version)?;
    let kind = integer_field(fields.get(1).cloned(), "kind")?;

    match kind {
        KIND_AUTHENTICATION => {
            let mut fields = fields.into_iter().skip(2);
            let method = string_field(fields.next(), "authentication method")?;
            if method != AUTH_PLAIN {
                return Err(ArangoError::Protocol(format!(
                    "unsupported authentication method {}",
                    method
                )));
            }
            Ok(Incoming::Authentication(Authentication {
                user: string_field(fields.next(), "user")?,
                password: string_field(fields.next(), "password")?,
            }))
        }
        KIND_REQUEST => {
            if fields.len() < REQUEST_HEADER_FIELDS {
                return Err(ArangoError::Protocol(format!(
                    "request header has {} fields, expected {}",
                    fields.len(),
                    REQUEST_HEADER_FIELDS
                )));
            }
            let mut fields = fields.into_iter().skip(2);
            let database = string_field(fields.next(), "database")?;
            let code = integer_field(fields.next(), "method")?;
            let method = Method::from_code(code)
                .ok_or_else(|| ArangoError::Protocol(format!("unknown method code {}", code)))?;
            let path = string_field(fields.next(), "path")?;

            let mut request = Request::new(database, method, path);
            string_map(fields.next(), "query", |k, v| request.query.push((k, v)))?;
            string_map(fields.next(), "header", |k, v| request.headers.push((k, v)))?;
            for (idx, extra) in fields.enumerate() {
                request.headers.push((
                    format!("{}{}", EXTRA_FIELD_PREFIX, REQUEST_HEADER_FIELDS + idx),
                    extra.to_json().to_string(),
                ));
            }
            request.dirty_read = request.header_value(HEADER_ALLOW_DIRTY_READ) == Some("true");
            request.body = decode_body(&payload[consumed..])?.map(Body::Document);
            Ok(Incoming::Request(request))
        }
        other => Err(ArangoError::Protocol(format!(
            "unexpected envelope kind {}",
            other
        ))),
    }
}

fn decode_body(rest: &[u8]) -> Result<Option<Document>> {
    if rest.is_empty() {
        Ok(None)
    } else {
        pack::decode(rest).map(Some)
    }
}

fn check_version(version: i64) -> Result<()> {
    if version != PROTOCOL_VERSION {
        return Err(ArangoError::IncompatibleServer {
            expected: PROTOCOL_VERSION,
            actual: version,
        });
    }
    Ok(())
}

fn header_fields(header: Document, min: usize) -> Result<Vec<Document>> {
    match header {
        Document::Array(fields) if fields.len() >= min => Ok(fields),
        Document::Array(fields) => Err(ArangoError::Protocol(format!(
            "envelope header has {} fields, expected at least {}",
            fields.len(),
            min
        ))),
        other => Err(ArangoError::Protocol(format!(
            "envelope header must be an array, found {}",
            other.type_name()
        ))),
    }
}

fn integer_field(field: Option<Document>, name: &str) -> Result<i64> {
    field
        .as_ref()
        .and_then(Document::as_i64)
        .ok_or_else(|| ArangoError::Protocol(format!("envelope {} is not an integer", name)))
}

fn string_field(field: Option<Document>, name: &str) -> Result<String> {
    match field {
        Some(Document::String(s)) => Ok(s),
        _ => Err(ArangoError::Protocol(format!(
            "envelope {} is not a string",
            name
        ))),
    }
}

fn string_map(
    field: Option<Document>,
    name: &str,
    mut insert: impl FnMut(String, String),
) -> Result<()> {
    match field {
        None | Some(Document::Null) => Ok(()),
        Some(Document::Object(entries)) => {
            for (key, value) in entries {
                let value = match value {
                    Document::String(s) => s,
                    other => other.to_json().to_string(),
                };
                insert(key, value);
            }
            Ok(())
        }
        Some(other) => Err(ArangoError::Protocol(format!(
            "envelope {} map must be an object, found {}",
            name,
            other.type_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> Request {
        Request::new("_system", Method::Post, "/_api/cursor")
            .query("b", 2)
            .query("a", "1")
            .header("x-custom", "yes")
            .body(
                Document::object()
                    .with("query", "FOR i IN 1..250 RETURN i")
                    .with("batchSize", 100),
            )
    }

    fn unwrap_request(incoming: Incoming) -> Request {
        match incoming {
            Incoming::Request(request) => request,
            other => panic!("expected request, got {:?}", other),
        }
    }

    #[test]
    fn test_method_codes() {
        assert_eq!(Method::Delete.code(), 0);
        assert_eq!(Method::Get.code(), 1);
        assert_eq!(Method::Options.code(), 6);
        for code in 0..7 {
            assert_eq!(Method::from_code(code).unwrap().code(), code);
        }
        assert_eq!(Method::from_code(7), None);
    }

    #[test]
    fn test_method_idempotence() {
        assert!(Method::Get.is_idempotent());
        assert!(Method::Put.is_idempotent());
        assert!(Method::Delete.is_idempotent());
        assert!(!Method::Post.is_idempotent());
        assert!(!Method::Patch.is_idempotent());
    }

    #[test]
    fn test_retryable_override() {
        let request = Request::new("", Method::Post, "/_api/cursor");
        assert!(!request.is_retryable());
        assert!(request.retryable(true).is_retryable());
    }

    #[test]
    fn test_idempotent_methods_are_retryable_by_default() {
        for method in [Method::Get, Method::Head, Method::Put, Method::Delete] {
            assert!(Request::new("", method, "/_api/version").is_retryable());
        }
        let patch = Request::new("", Method::Patch, "/_api/document/c/1");
        assert!(!patch.is_retryable());
    }

    #[test]
    fn test_request_header_layout() {
        let bytes = encode_request(&sample_request(), &[]).unwrap();
        let (header, _) = pack::decode_prefix(&bytes).unwrap();
        let fields = header.as_array().unwrap();
        assert_eq!(fields.len(), REQUEST_HEADER_FIELDS);
        assert_eq!(fields[0], Document::from(1));
        assert_eq!(fields[1], Document::from(1));
        assert_eq!(fields[2], Document::from("_system"));
        assert_eq!(fields[3], Document::from(2));
        assert_eq!(fields[4], Document::from("/_api/cursor"));

        let keys: Vec<&str> = fields[5]
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(keys, vec!["b", "a"]);
    }

    #[test]
    fn test_request_decode_reencode_is_identical() {
        let first = encode_request(&sample_request(), &[]).unwrap();
        let decoded = unwrap_request(decode_incoming(&first).unwrap());
        let second = encode_request(&decoded, &[]).unwrap();
        assert_eq!(first, second);
        assert_eq!(decoded.query_params()[0], ("b".to_string(), "2".to_string()));
    }

    #[test]
    fn test_extra_headers_do_not_override() {
        let request = Request::new("", Method::Get, "/_api/version").header("authorization", "mine");
        let bytes = encode_request(&request, &[("authorization", "basic x"), ("x-other", "1")]).unwrap();
        let decoded = unwrap_request(decode_incoming(&bytes).unwrap());
        assert_eq!(decoded.header_value("authorization"), Some("mine"));
        assert_eq!(decoded.header_value("x-other"), Some("1"));
    }

    #[test]
    fn test_raw_body_is_written_verbatim() {
        let body = pack::encode(&Document::object().with("k", 1)).unwrap();
        let request = Request::new("db", Method::Put, "/x").raw_body(body.clone());
        let bytes = encode_request(&request, &[]).unwrap();
        assert!(bytes.ends_with(&body));
        assert_eq!(
            request.body_document().unwrap(),
            Some(Document::object().with("k", 1))
        );
    }

    #[test]
    fn test_dirty_read_header() {
        let request = Request::new("", Method::Get, "/_api/document/c/1").dirty_read(true);
        assert!(request.is_dirty_read());
        assert_eq!(request.header_value(HEADER_ALLOW_DIRTY_READ), Some("true"));

        let request = request.dirty_read(false);
        assert_eq!(request.header_value(HEADER_ALLOW_DIRTY_READ), None);
    }

    #[test]
    fn test_response_roundtrip() {
        let response = Response::new(201)
            .with_header("location", "/_api/collection/users")
            .with_body(Document::object().with("name", "users"));
        let bytes = encode_response(&response).unwrap();
        let decoded = decode_response(&bytes).unwrap();
        assert_eq!(decoded, response);
    }

    #[test]
    fn test_response_without_body() {
        let bytes = encode_response(&Response::new(202)).unwrap();
        let decoded = decode_response(&bytes).unwrap();
        assert_eq!(decoded.code, 202);
        assert!(decoded.body.is_none());
        assert_eq!(decoded.into_body(), Document::Null);
    }

    #[test]
    fn test_response_extra_fields_preserved() {
        let header = Document::Array(vec![
            1.into(),
            2.into(),
            200.into(),
            Document::object(),
            "meta".into(),
        ]);
        let bytes = pack::encode(&header).unwrap();
        let decoded = decode_response(&bytes).unwrap();
        assert_eq!(decoded.header("x-vst-field-4"), Some("\"meta\""));
    }

    #[test]
    fn test_response_version_mismatch() {
        let header = Document::Array(vec![2.into(), 2.into(), 200.into(), Document::object()]);
        let bytes = pack::encode(&header).unwrap();
        assert!(matches!(
            decode_response(&bytes),
            Err(ArangoError::IncompatibleServer {
                expected: 1,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_response_short_header() {
        let header = Document::Array(vec![1.into(), 2.into()]);
        let bytes = pack::encode(&header).unwrap();
        assert!(matches!(
            decode_response(&bytes),
            Err(ArangoError::Protocol(_))
        ));
    }

    #[test]
    fn test_response_malformed_body() {
        let mut bytes = encode_response(&Response::new(200)).unwrap().to_vec();
        bytes.push(0xc1);
        assert!(matches!(
            decode_response(&bytes),
            Err(ArangoError::Codec(_))
        ));
    }

    #[test]
    fn test_authentication_roundtrip() {
        let bytes = encode_authentication("root", "secret").unwrap();
        match decode_incoming(&bytes).unwrap() {
            Incoming::Authentication(auth) => {
                assert_eq!(auth.user, "root");
                assert_eq!(auth.password, "secret");
            }
            other => panic!("expected authentication, got {:?}", other),
        }
    }

    #[test]
    fn test_request_display() {
        let request = Request::new("shop", Method::Get, "/_api/version");
        assert_eq!(request.to_string(), "GET /_db/shop/_api/version");
        let request = Request::new("", Method::Delete, "/_api/cursor/1");
        assert_eq!(request.to_string(), "DELETE /_api/cursor/1");
    }
}

//! Handle for user-defined server routes.

use std::sync::Arc;

use arango_core::protocol::{Method, Response};
use arango_core::{Document, Result};

use super::request;
use crate::executor::Executor;

/// A path below a database, with the headers, query parameters and body
/// to send on each call.
///
/// Sub-routes extend the path and inherit everything else.
#[derive(Debug, Clone)]
pub struct Route {
    database: String,
    path: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<Document>,
    executor: Arc<Executor>,
}

impl Route {
    pub(crate) fn new(executor: Arc<Executor>, database: impl Into<String>, path: String) -> Self {
        Self {
            database: database.into(),
            path,
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            executor,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn route<S: AsRef<str>>(&self, segments: &[S]) -> Route {
        let tail = request::route_path(segments);
        let mut route = self.clone();
        route.path = request::route_path(&[self.path.as_str(), tail.as_str()]);
        route
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_query_param(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Document>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub async fn get(&self) -> Result<Response> {
        self.call(Method::Get).await
    }

    pub async fn head(&self) -> Result<Response> {
        self.call(Method::Head).await
    }

    pub async fn post(&self) -> Result<Response> {
        self.call(Method::Post).await
    }

    pub async fn put(&self) -> Result<Response> {
        self.call(Method::Put).await
    }

    pub async fn patch(&self) -> Result<Response> {
        self.call(Method::Patch).await
    }

    pub async fn delete(&self) -> Result<Response> {
        self.call(Method::Delete).await
    }

    async fn call(&self, method: Method) -> Result<Response> {
        let request = request::route_request(
            &self.database,
            method,
            &self.path,
            &self.headers,
            &self.query,
            self.body.as_ref(),
        );
        self.executor
            .execute(request, |response, _| Ok(response), None)
            .await
    }
}

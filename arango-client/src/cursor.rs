//! Server-side query cursors.
//!
//! A [`Cursor`] holds one decoded page of results and fetches the next page
//! from the host that answered the original query. Dropping a cursor that
//! still has pages on the server closes it there.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;

use arango_core::protocol::{Method, Request, RESPONSE_NOT_FOUND};
use arango_core::{from_document_with, ArangoError, DecodeOptions, Document, Result};

use crate::api::entity::{CursorEntity, CursorStats};
use crate::connection::HostEndpoint;
use crate::executor::{decode, Executor};

/// Continuation and teardown of one server cursor.
#[async_trait]
pub trait CursorExecute: Send + Sync + fmt::Debug {
    /// Fetches the next page of cursor `id`.
    async fn fetch_next(&self, id: &str) -> Result<CursorEntity>;

    /// Deletes cursor `id` on the server. A cursor already gone is not an error.
    async fn close(&self, id: &str) -> Result<()>;
}

/// Runs cursor requests on the host that created the cursor.
#[derive(Debug)]
pub struct PinnedCursorExecute {
    executor: Arc<Executor>,
    database: String,
    host: HostEndpoint,
    dirty_read: bool,
}

impl PinnedCursorExecute {
    pub fn new(
        executor: Arc<Executor>,
        database: impl Into<String>,
        host: HostEndpoint,
        dirty_read: bool,
    ) -> Self {
        Self {
            executor,
            database: database.into(),
            host,
            dirty_read,
        }
    }

    pub fn host(&self) -> &HostEndpoint {
        &self.host
    }
}

#[async_trait]
impl CursorExecute for PinnedCursorExecute {
    async fn fetch_next(&self, id: &str) -> Result<CursorEntity> {
        let request = Request::new(&self.database, Method::Post, format!("/_api/cursor/{}", id))
            .dirty_read(self.dirty_read);
        let response = self.executor.dispatch_pinned(&request, &self.host).await?;
        decode::body()(response, self.executor.decode_options())
    }

    async fn close(&self, id: &str) -> Result<()> {
        let request = Request::new(&self.database, Method::Delete, format!("/_api/cursor/{}", id));
        match self.executor.dispatch_pinned(&request, &self.host).await {
            Ok(_) => Ok(()),
            Err(e) if e.response_code() == Some(RESPONSE_NOT_FOUND) => {
                tracing::debug!(cursor = id, "cursor already gone");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// A lazy sequence of `T` backed by a server cursor.
///
/// Pages are decoded eagerly as they arrive. [`next`](Self::next) takes
/// `&mut self`, so a cursor never has more than one page request in flight;
/// use [`shared`](Self::shared) to consume one cursor from several tasks.
pub struct Cursor<T> {
    id: Option<String>,
    execute: Arc<dyn CursorExecute>,
    options: DecodeOptions,
    buffer: VecDeque<T>,
    has_more: bool,
    closed: bool,
    lost: Option<String>,
    count: Option<u64>,
    cached: bool,
    stats: Option<CursorStats>,
    warnings: Vec<Document>,
}

impl<T: DeserializeOwned> Cursor<T> {
    /// Builds a cursor from the first page of a query response.
    pub fn new(
        first: CursorEntity,
        execute: Arc<dyn CursorExecute>,
        options: DecodeOptions,
    ) -> Result<Self> {
        let mut cursor = Self {
            id: first.id.clone(),
            execute,
            options,
            buffer: VecDeque::new(),
            has_more: false,
            closed: false,
            lost: None,
            count: first.count,
            cached: first.cached,
            stats: None,
            warnings: Vec::new(),
        };
        cursor.absorb(first)?;
        Ok(cursor)
    }

    fn absorb(&mut self, page: CursorEntity) -> Result<()> {
        self.has_more = page.has_more && self.id.is_some();
        if let Some(extra) = page.extra {
            if extra.stats.is_some() {
                self.stats = extra.stats;
            }
            self.warnings.extend(extra.warnings);
        }
        for value in page.result {
            self.buffer.push_back(from_document_with(value, &self.options)?);
        }
        Ok(())
    }

    /// Returns the next element, fetching a page when the buffer is empty.
    ///
    /// Returns `Ok(None)` once the server reported no more pages and the
    /// buffer is drained.
    pub async fn next(&mut self) -> Result<Option<T>> {
        if self.closed {
            return Err(ArangoError::CursorClosed);
        }
        if let Some(reason) = &self.lost {
            return Err(ArangoError::CursorHostLost(reason.clone()));
        }

        if self.buffer.is_empty() && self.has_more {
            let Some(id) = self.id.clone() else {
                return Ok(None);
            };
            tracing::debug!(cursor = %id, "fetching next page");
            match self.execute.fetch_next(&id).await {
                Ok(page) => self.absorb(page)?,
                Err(ArangoError::CursorHostLost(reason)) => {
                    tracing::warn!(cursor = %id, reason = %reason, "cursor host lost");
                    self.lost = Some(reason.clone());
                    self.has_more = false;
                    return Err(ArangoError::CursorHostLost(reason));
                }
                Err(e) => return Err(e),
            }
        }

        Ok(self.buffer.pop_front())
    }

    /// Drains the cursor into a vector.
    pub async fn collect_all(mut self) -> Result<Vec<T>> {
        let mut items = Vec::with_capacity(self.buffer.len());
        while let Some(item) = self.next().await? {
            items.push(item);
        }
        Ok(items)
    }

    /// Converts the cursor into a stream. The stream ends after the first error.
    pub fn into_stream(self) -> impl Stream<Item = Result<T>>
    where
        T: Send + 'static,
    {
        stream::unfold(Some(self), |state| async move {
            let mut cursor = state?;
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(cursor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }

    /// Wraps the cursor for use from several tasks.
    pub fn shared(self) -> SharedCursor<T> {
        SharedCursor {
            inner: Arc::new(tokio::sync::Mutex::new(self)),
        }
    }
}

impl<T> Cursor<T> {
    /// Returns the server cursor id, if the result spans several pages.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the total result count, when requested with the query.
    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn stats(&self) -> Option<&CursorStats> {
        self.stats.as_ref()
    }

    pub fn warnings(&self) -> &[Document] {
        &self.warnings
    }

    /// Returns true if the result came from the query cache.
    pub fn is_cached(&self) -> bool {
        self.cached
    }

    /// Returns true while elements remain locally or on the server.
    pub fn has_next(&self) -> bool {
        !self.closed && self.lost.is_none() && (!self.buffer.is_empty() || self.has_more)
    }

    /// Closes the cursor. Idempotent.
    ///
    /// The server cursor is deleted only if the server has not already
    /// reported exhaustion.
    pub async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.buffer.clear();

        let pending_on_server = std::mem::take(&mut self.has_more);
        match (&self.id, pending_on_server, &self.lost) {
            (Some(id), true, None) => {
                tracing::debug!(cursor = %id, "closing cursor");
                self.execute.close(id).await
            }
            _ => Ok(()),
        }
    }
}

impl<T> Drop for Cursor<T> {
    fn drop(&mut self) {
        if self.closed || !self.has_more || self.lost.is_some() {
            return;
        }
        let Some(id) = self.id.take() else {
            return;
        };
        self.has_more = false;
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                let execute = Arc::clone(&self.execute);
                runtime.spawn(async move {
                    if let Err(e) = execute.close(&id).await {
                        tracing::warn!(cursor = %id, error = %e, "failed to close dropped cursor");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(cursor = %id, "cursor dropped outside a runtime, left open on server");
            }
        }
    }
}

impl<T> fmt::Debug for Cursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("id", &self.id)
            .field("buffered", &self.buffer.len())
            .field("has_more", &self.has_more)
            .field("closed", &self.closed)
            .field("count", &self.count)
            .finish()
    }
}

/// A cursor shared between tasks. Concurrent `next` calls run one at a time.
pub struct SharedCursor<T> {
    inner: Arc<tokio::sync::Mutex<Cursor<T>>>,
}

impl<T> Clone for SharedCursor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: DeserializeOwned> SharedCursor<T> {
    pub async fn next(&self) -> Result<Option<T>> {
        self.inner.lock().await.next().await
    }

    pub async fn has_next(&self) -> bool {
        self.inner.lock().await.has_next()
    }

    pub async fn close(&self) -> Result<()> {
        self.inner.lock().await.close().await
    }
}

impl<T> fmt::Debug for SharedCursor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedCursor").finish_non_exhaustive()
    }
}

//! Cancellable handle to a spawned request.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use arango_core::{ArangoError, Result};

/// A request running on the Tokio runtime.
///
/// Awaiting an `Invocation` yields its result. [`cancel`](Self::cancel)
/// stops the request: its pending entry is removed from the connection, the
/// invocation resolves to `ArangoError::Cancelled`, and a late response is
/// dropped.
#[derive(Debug)]
pub struct Invocation<T> {
    handle: JoinHandle<Result<T>>,
    token: CancellationToken,
}

impl<T: Send + 'static> Invocation<T> {
    /// Spawns `future` under a fresh cancellation token.
    pub fn spawn<F>(future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => Err(ArangoError::Cancelled),
                result = future => result,
            }
        });
        Self { handle, token }
    }

    /// Maps a successful result. The new invocation shares this one's token.
    pub fn then<U, F>(self, f: F) -> Invocation<U>
    where
        U: Send + 'static,
        F: FnOnce(T) -> Result<U> + Send + 'static,
    {
        let token = self.token.clone();
        Invocation::chain(token, async move { self.await.and_then(f) })
    }

    /// Replaces a failure with the value produced by `f`.
    ///
    /// Cancellation is not recovered from.
    pub fn recover<F>(self, f: F) -> Invocation<T>
    where
        F: FnOnce(ArangoError) -> Result<T> + Send + 'static,
    {
        let token = self.token.clone();
        Invocation::chain(token, async move {
            match self.await {
                Err(ArangoError::Cancelled) => Err(ArangoError::Cancelled),
                Err(e) => f(e),
                ok => ok,
            }
        })
    }

    fn chain<F>(token: CancellationToken, future: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let child = token.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = child.cancelled() => Err(ArangoError::Cancelled),
                result = future => result,
            }
        });
        Self { handle, token }
    }

    /// Waits for the result with a timeout. Expiry cancels the invocation.
    pub async fn get_timeout(self, timeout: Duration) -> Result<T> {
        let token = self.token.clone();
        match tokio::time::timeout(timeout, self).await {
            Ok(result) => result,
            Err(_) => {
                token.cancel();
                Err(ArangoError::Timeout(format!(
                    "invocation timed out after {:?}",
                    timeout
                )))
            }
        }
    }
}

impl<T> Invocation<T> {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<T> Future for Invocation<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.handle).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(e)) if e.is_cancelled() => Poll::Ready(Err(ArangoError::Cancelled)),
            Poll::Ready(Err(e)) => Poll::Ready(Err(ArangoError::ConnectionClosed(format!(
                "invocation task failed: {}",
                e
            )))),
            Poll::Pending => Poll::Pending,
        }
    }
}

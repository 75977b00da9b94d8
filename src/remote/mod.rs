//! Remote backend collaborator.
//!
//! The orchestrator talks to the backend through [`RemoteBackend`]: a
//! table-like API with "select rows by owner" and "batch upsert by primary
//! key". Rows travel as JSON objects.
//!
//! - [`RestRemote`] - PostgREST-style HTTP client
//! - [`MemoryRemote`] - in-process backend for tests and offline demos
//! - [`BoxedRemote`] - either of the above behind dynamic dispatch

mod memory;
mod rest;

pub use memory::MemoryRemote;
pub use rest::RestRemote;

use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Errors from the remote backend.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The backend refused the whole batch.
    #[error("batch rejected: {0}")]
    Rejected(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Sort order for a select.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Order {
    pub column: &'static str,
    pub descending: bool,
}

/// A "select rows" request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteQuery {
    pub table: &'static str,
    /// `(column, value)` restricting rows to one owner
    pub owner: Option<(&'static str, String)>,
    pub order: Option<Order>,
    pub limit: Option<u32>,
}

impl RemoteQuery {
    /// Every row of `table`.
    #[must_use]
    pub const fn table(table: &'static str) -> Self {
        Self {
            table,
            owner: None,
            order: None,
            limit: None,
        }
    }

    /// Restrict to rows where `column` equals `owner`.
    #[must_use]
    pub fn owned_by(mut self, column: &'static str, owner: impl Into<String>) -> Self {
        self.owner = Some((column, owner.into()));
        self
    }

    #[must_use]
    pub const fn order_by(mut self, column: &'static str, descending: bool) -> Self {
        self.order = Some(Order { column, descending });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: Option<u32>) -> Self {
        self.limit = limit;
        self
    }
}

/// Table-like access to the remote backend.
///
/// `upsert` must be idempotent per primary key; a failure on any row fails
/// the whole batch.
pub trait RemoteBackend: Send + Sync {
    /// Fetch rows matching `query`.
    fn select(&self, query: &RemoteQuery) -> impl Future<Output = Result<Vec<Value>, RemoteError>> + Send;

    /// Insert or update `rows` in `table`, keyed by their `id`.
    fn upsert(&self, table: &'static str, rows: Vec<Value>) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

/// Boxed backend for dynamic dispatch.
///
/// [`RemoteBackend`] uses `impl Future` returns, so the CLI picks a concrete
/// backend at runtime through this wrapper.
pub struct BoxedRemote {
    inner: Box<dyn RemoteBackendBoxed>,
}

/// Object-safe version of [`RemoteBackend`] for boxing.
trait RemoteBackendBoxed: Send + Sync {
    fn select_boxed<'a>(
        &'a self,
        query: &'a RemoteQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, RemoteError>> + Send + 'a>>;

    fn upsert_boxed(
        &self,
        table: &'static str,
        rows: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + '_>>;
}

struct BoxedRemoteWrapper<R: RemoteBackend + 'static>(R);

impl<R: RemoteBackend + 'static> RemoteBackendBoxed for BoxedRemoteWrapper<R> {
    fn select_boxed<'a>(
        &'a self,
        query: &'a RemoteQuery,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Value>, RemoteError>> + Send + 'a>> {
        Box::pin(self.0.select(query))
    }

    fn upsert_boxed(
        &self,
        table: &'static str,
        rows: Vec<Value>,
    ) -> Pin<Box<dyn Future<Output = Result<(), RemoteError>> + Send + '_>> {
        Box::pin(self.0.upsert(table, rows))
    }
}

impl BoxedRemote {
    pub fn new<R: RemoteBackend + 'static>(remote: R) -> Self {
        Self {
            inner: Box::new(BoxedRemoteWrapper(remote)),
        }
    }
}

impl std::fmt::Debug for BoxedRemote {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxedRemote").finish_non_exhaustive()
    }
}

impl RemoteBackend for BoxedRemote {
    async fn select(&self, query: &RemoteQuery) -> Result<Vec<Value>, RemoteError> {
        self.inner.select_boxed(query).await
    }

    async fn upsert(&self, table: &'static str, rows: Vec<Value>) -> Result<(), RemoteError> {
        self.inner.upsert_boxed(table, rows).await
    }
}

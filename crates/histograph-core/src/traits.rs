use std::future::Future;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::Node;
use crate::page::Page;
use crate::session::{NewSession, SessionStatus};

/// Fetches raw HTML content from a URL.
pub trait Fetcher: Send + Sync + Clone {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Turns raw HTML into a queryable [`Page`].
pub trait PageParser: Send + Sync + Clone {
    fn parse(&self, html: &str) -> Result<Page, AppError>;
}

/// Given an absolute URL, returns the parsed page or a fetch failure.
///
/// This is the only way the traversal engine reaches the document source.
pub trait PageSource: Send + Sync {
    fn fetch_page(&self, url: &str) -> impl Future<Output = Result<Page, AppError>> + Send;
}

/// Persists fully-populated nodes and hands back their stable identifier
/// (`eN` for events, `pN` for persons).
pub trait NodeSink: Send + Sync {
    /// Store `node`, linking it to `session` when one is given.
    fn persist(
        &self,
        node: &Node,
        session: Option<Uuid>,
    ) -> impl Future<Output = Result<String, AppError>> + Send;
}

/// Bookkeeping for extraction sessions.
pub trait SessionStore: Send + Sync {
    /// Record a new running session. Returns its id.
    fn create_session(
        &self,
        session: &NewSession,
    ) -> impl Future<Output = Result<Uuid, AppError>> + Send;

    /// Move a session to `status`, recording the node count and failure reason.
    fn update_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        total_nodes: u64,
        error: Option<&str>,
    ) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// A no-op SessionStore for outputs that keep no session history.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSessions;

impl SessionStore for NullSessions {
    async fn create_session(&self, _session: &NewSession) -> Result<Uuid, AppError> {
        Ok(Uuid::nil())
    }

    async fn update_status(
        &self,
        _id: Uuid,
        _status: SessionStatus,
        _total_nodes: u64,
        _error: Option<&str>,
    ) -> Result<(), AppError> {
        Ok(())
    }
}

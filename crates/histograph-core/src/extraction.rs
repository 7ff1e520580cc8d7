//! One extraction from start to finish: session bookkeeping, traversal,
//! persistence of the discovered nodes.

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::NodeRecord;
use crate::session::{NewSession, SessionStatus};
use crate::traits::{NodeSink, PageSource, SessionStore};
use crate::traversal::{RunStatus, TraversalEngine, TraversalEvent, TraversalReporter};

/// What to extract.
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    pub seed_url: String,
    /// Defaults to a name derived from the seed url.
    pub session_name: Option<String>,
}

impl ExtractionRequest {
    pub fn new(seed_url: impl Into<String>) -> Self {
        Self {
            seed_url: seed_url.into(),
            session_name: None,
        }
    }

    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }
}

/// Result of [`ExtractionService::extract`].
#[derive(Debug, Clone)]
pub struct ExtractionReport {
    /// `Uuid::nil()` when the session store keeps no history.
    pub session_id: Uuid,
    pub status: RunStatus,
    /// Persisted nodes, with their assigned ids, in discovery order.
    pub records: Vec<NodeRecord>,
}

/// Runs the traversal engine and hands every resulting node to a sink.
pub struct ExtractionService<S, K, T> {
    engine: TraversalEngine<S>,
    sink: K,
    sessions: T,
}

impl<S, K, T> ExtractionService<S, K, T>
where
    S: PageSource,
    K: NodeSink,
    T: SessionStore,
{
    pub fn new(engine: TraversalEngine<S>, sink: K, sessions: T) -> Self {
        Self {
            engine,
            sink,
            sessions,
        }
    }

    /// Validate, open a session, traverse, persist, and close the session.
    ///
    /// Cancelled runs still persist what was found. A sink failure stops
    /// persistence, marks the session failed and is reported through
    /// [`RunStatus::Failed`] rather than as an `Err`.
    pub async fn extract<R: TraversalReporter>(
        &self,
        request: &ExtractionRequest,
        cancel: &CancellationToken,
        reporter: &R,
    ) -> Result<ExtractionReport, AppError> {
        let config = self.engine.config();
        config.validate(&request.seed_url)?;

        let name = request
            .session_name
            .clone()
            .unwrap_or_else(|| format!("Extraction from {}", request.seed_url.trim()));
        let session_id = self
            .sessions
            .create_session(&NewSession::new(
                name,
                request.seed_url.trim(),
                config.max_degree,
            ))
            .await?;
        let session = (!session_id.is_nil()).then_some(session_id);

        let outcome = match self.engine.run(&request.seed_url, cancel, reporter).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.sessions
                    .update_status(session_id, SessionStatus::Failed, 0, Some(&e.to_string()))
                    .await?;
                return Err(e);
            }
        };

        let mut status = outcome.status;
        let mut records = Vec::with_capacity(outcome.nodes.len());
        for node in &outcome.nodes {
            match self.sink.persist(node, session).await {
                Ok(node_id) => records.push(node.to_record(node_id)),
                Err(e) => {
                    tracing::error!(url = %node.url(), error = %e, "Failed to persist node");
                    status = RunStatus::Failed(e.to_string());
                    break;
                }
            }
        }

        let error = match &status {
            RunStatus::Failed(reason) => Some(reason.as_str()),
            _ => None,
        };
        // Nodes are already persisted; report them even if the status write fails.
        if let Err(e) = self
            .sessions
            .update_status(
                session_id,
                SessionStatus::from(&status),
                records.len() as u64,
                error,
            )
            .await
        {
            tracing::error!(%session_id, error = %e, "Failed to record session status");
        }

        if status == RunStatus::Completed {
            let message = format!("Extraction completed. {} nodes saved", records.len());
            reporter.report(TraversalEvent::Progress {
                percent: 100,
                message: &message,
            });
        }

        tracing::info!(%session_id, %status, nodes = records.len(), "Extraction session closed");

        Ok(ExtractionReport {
            session_id,
            status,
            records,
        })
    }
}

use std::sync::Mutex;

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Node, NodeKind};
use crate::traits::NodeSink;

/// In-memory [`NodeSink`] that numbers nodes per kind in the order they are
/// persisted: `e1, e2, ...` for events and `p1, p2, ...` for persons.
#[derive(Debug, Default)]
pub struct SequentialIds {
    counters: Mutex<(u64, u64)>,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&self, kind: NodeKind) -> Result<String, AppError> {
        let mut counters = self
            .counters
            .lock()
            .map_err(|_| AppError::Generic("id counter lock poisoned".into()))?;
        let counter = match kind {
            NodeKind::Event => &mut counters.0,
            NodeKind::Person => &mut counters.1,
        };
        *counter += 1;
        Ok(format!("{}{}", kind.id_prefix(), counter))
    }
}

impl NodeSink for SequentialIds {
    async fn persist(&self, node: &Node, _session: Option<Uuid>) -> Result<String, AppError> {
        self.next(node.kind())
    }
}

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::traversal::RunStatus;

/// Status of an extraction session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

impl From<&RunStatus> for SessionStatus {
    fn from(status: &RunStatus) -> Self {
        match status {
            RunStatus::Completed => SessionStatus::Completed,
            RunStatus::Cancelled => SessionStatus::Cancelled,
            RunStatus::Failed(_) => SessionStatus::Failed,
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "running" => Ok(SessionStatus::Running),
            "completed" => Ok(SessionStatus::Completed),
            "cancelled" => Ok(SessionStatus::Cancelled),
            "failed" => Ok(SessionStatus::Failed),
            _ => Err(format!("Unknown session status: {}", s)),
        }
    }
}

/// Request to record a new extraction session.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub name: String,
    pub seed_url: String,
    pub max_degree: usize,
}

impl NewSession {
    pub fn new(name: impl Into<String>, seed_url: impl Into<String>, max_degree: usize) -> Self {
        Self {
            name: name.into(),
            seed_url: seed_url.into(),
            max_degree,
        }
    }
}

/// A recorded extraction session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionSession {
    pub id: Uuid,
    pub name: String,
    pub seed_url: String,
    pub max_degree: usize,
    pub total_nodes: u64,
    pub status: SessionStatus,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Node counts per kind at one degree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCounts {
    pub events: u64,
    pub people: u64,
}

/// A session plus its per-degree node counts.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session: ExtractionSession,
    pub degree_counts: BTreeMap<usize, KindCounts>,
}

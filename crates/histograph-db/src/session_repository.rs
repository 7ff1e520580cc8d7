use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use histograph_core::error::AppError;
use histograph_core::models::NodeRecord;
use histograph_core::session::{
    ExtractionSession, KindCounts, NewSession, SessionStatus, SessionSummary,
};
use histograph_core::traits::SessionStore;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

use crate::node_repository::{NodeRow, SELECT_NODE, db_error};

/// Repository for extraction sessions and their node links.
#[derive(Clone)]
pub struct SessionRepository {
    pool: Pool<Postgres>,
}

impl SessionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a new `running` session. Returns its id.
    pub async fn create(&self, session: &NewSession) -> Result<Uuid, AppError> {
        let (id,): (Uuid,) = sqlx::query_as(
            r#"
            INSERT INTO extraction_sessions (name, seed_url, max_degree, status)
            VALUES ($1, $2, $3, 'running')
            RETURNING id
            "#,
        )
        .bind(&session.name)
        .bind(&session.seed_url)
        .bind(session.max_degree as i32)
        .fetch_one(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(id)
    }

    /// Move a session to `status`. Terminal states stamp `completed_at`.
    pub async fn update_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        total_nodes: u64,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE extraction_sessions
            SET status = $2,
                total_nodes = $3,
                error_message = $4,
                completed_at = CASE WHEN $5 THEN now() ELSE NULL END
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(total_nodes as i64)
        .bind(error)
        .bind(status.is_terminal())
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::DatabaseError(format!("Session {id} not found")));
        }
        Ok(())
    }

    /// Sessions, newest first.
    pub async fn list(&self, limit: usize) -> Result<Vec<ExtractionSession>, AppError> {
        let rows = sqlx::query_as::<_, SessionRow>(&format!(
            "{SELECT_SESSION} ORDER BY started_at DESC LIMIT $1"
        ))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<ExtractionSession>, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(&format!("{SELECT_SESSION} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        row.map(TryInto::try_into).transpose()
    }

    /// Nodes linked to a session ordered by degree, type, and title.
    pub async fn session_nodes(&self, id: Uuid) -> Result<Vec<NodeRecord>, AppError> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            r#"{SELECT_NODE}
            JOIN session_nodes sn ON sn.node_id = n.id
            WHERE sn.session_id = $1
            ORDER BY n.degree, n.node_type, n.title"#
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// Nodes of a session at one degree, ordered by type and title.
    pub async fn nodes_at_degree(
        &self,
        id: Uuid,
        degree: usize,
    ) -> Result<Vec<NodeRecord>, AppError> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            r#"{SELECT_NODE}
            JOIN session_nodes sn ON sn.node_id = n.id
            WHERE sn.session_id = $1 AND n.degree = $2
            ORDER BY n.node_type, n.title"#
        ))
        .bind(id)
        .bind(degree as i32)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    /// The session plus per-degree Event/Person counts. `None` if unknown.
    pub async fn summary(&self, id: Uuid) -> Result<Option<SessionSummary>, AppError> {
        let Some(session) = self.get(id).await? else {
            return Ok(None);
        };

        let counts: Vec<(i32, String, i64)> = sqlx::query_as(
            r#"
            SELECT n.degree, n.node_type, COUNT(*)
            FROM nodes n
            JOIN session_nodes sn ON sn.node_id = n.id
            WHERE sn.session_id = $1
            GROUP BY n.degree, n.node_type
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut degree_counts: BTreeMap<usize, KindCounts> = BTreeMap::new();
        for (degree, node_type, count) in counts {
            let entry = degree_counts
                .entry(usize::try_from(degree).unwrap_or_default())
                .or_default();
            match node_type.as_str() {
                "Event" => entry.events = count as u64,
                "Person" => entry.people = count as u64,
                other => tracing::warn!(node_type = %other, "Unexpected node type in summary"),
            }
        }

        Ok(Some(SessionSummary {
            session,
            degree_counts,
        }))
    }
}

// -- Internal row type for sqlx deserialization --

const SELECT_SESSION: &str = r#"
    SELECT id, name, seed_url, max_degree, total_nodes, status, error_message,
           started_at, completed_at
    FROM extraction_sessions
"#;

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    name: String,
    seed_url: String,
    max_degree: i32,
    total_nodes: i64,
    status: String,
    error_message: Option<String>,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for ExtractionSession {
    type Error = AppError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(ExtractionSession {
            id: row.id,
            name: row.name,
            seed_url: row.seed_url,
            max_degree: usize::try_from(row.max_degree).unwrap_or_default(),
            total_nodes: u64::try_from(row.total_nodes).unwrap_or_default(),
            status: row.status.parse().map_err(AppError::DatabaseError)?,
            error_message: row.error_message,
            started_at: row.started_at,
            completed_at: row.completed_at,
        })
    }
}

// -- Trait implementation --

impl SessionStore for SessionRepository {
    async fn create_session(&self, session: &NewSession) -> Result<Uuid, AppError> {
        SessionRepository::create(self, session).await
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: SessionStatus,
        total_nodes: u64,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        SessionRepository::update_status(self, id, status, total_nodes, error).await
    }
}

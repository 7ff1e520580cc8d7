use std::collections::BTreeMap;

use histograph_core::error::AppError;
use histograph_core::models::{Node, NodeKind, NodeRecord};
use histograph_core::traits::NodeSink;
use sqlx::types::Json;
use sqlx::{PgPool, Pool, Postgres};
use uuid::Uuid;

/// Serialises node-id allocation across connections.
const NODE_ID_LOCK: i64 = 0x6869_7374_6f67;

/// Repository for graph nodes in PostgreSQL.
#[derive(Clone)]
pub struct NodeRepository {
    pool: Pool<Postgres>,
}

impl NodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or refresh a node, keyed by url, and link it to `session`.
    ///
    /// A new url gets the next `e{n}`/`p{n}` for its kind; an existing url
    /// keeps its identifier while every other column is refreshed.
    pub async fn save_node(&self, node: &Node, session: Option<Uuid>) -> Result<String, AppError> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(NODE_ID_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;

        let existing: Option<(Uuid, String)> =
            sqlx::query_as("SELECT id, node_id FROM nodes WHERE url = $1")
                .bind(node.url())
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_error)?;

        let (row_id, node_id) = match existing {
            Some((row_id, node_id)) => {
                sqlx::query(
                    r#"
                    UPDATE nodes
                    SET node_type = $2, title = $3, degree = $4, parent_url = $5,
                        description = $6, start_date = $7, end_date = $8, metadata = $9,
                        updated_at = now()
                    WHERE id = $1
                    "#,
                )
                .bind(row_id)
                .bind(node.kind().as_str())
                .bind(node.title())
                .bind(node.degree() as i32)
                .bind(node.parent_url())
                .bind(node.description())
                .bind(node.start_date())
                .bind(node.end_date())
                .bind(Json(node.metadata()))
                .execute(&mut *tx)
                .await
                .map_err(db_error)?;
                (row_id, node_id)
            }
            None => {
                let (last,): (i32,) = sqlx::query_as(
                    r#"
                    SELECT COALESCE(MAX(CAST(SUBSTRING(node_id FROM 2) AS INTEGER)), 0)
                    FROM nodes
                    WHERE node_type = $1
                    "#,
                )
                .bind(node.kind().as_str())
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?;
                let node_id = format!("{}{}", node.kind().id_prefix(), last + 1);

                let (row_id,): (Uuid,) = sqlx::query_as(
                    r#"
                    INSERT INTO nodes (node_id, node_type, title, url, degree, parent_url,
                                       description, start_date, end_date, metadata)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    RETURNING id
                    "#,
                )
                .bind(&node_id)
                .bind(node.kind().as_str())
                .bind(node.title())
                .bind(node.url())
                .bind(node.degree() as i32)
                .bind(node.parent_url())
                .bind(node.description())
                .bind(node.start_date())
                .bind(node.end_date())
                .bind(Json(node.metadata()))
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?;
                (row_id, node_id)
            }
        };

        if let Some(session_id) = session {
            sqlx::query(
                "INSERT INTO session_nodes (session_id, node_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(session_id)
            .bind(row_id)
            .execute(&mut *tx)
            .await
            .map_err(db_error)?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(node_id)
    }

    pub async fn find_by_node_id(&self, node_id: &str) -> Result<Option<NodeRecord>, AppError> {
        let row = sqlx::query_as::<_, NodeRow>(&format!("{SELECT_NODE} WHERE n.node_id = $1"))
            .bind(node_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    pub async fn find_by_url(&self, url: &str) -> Result<Option<NodeRecord>, AppError> {
        let row = sqlx::query_as::<_, NodeRow>(&format!("{SELECT_NODE} WHERE n.url = $1"))
            .bind(url)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    /// Lookup by the `(title, parent_url)` pair; a `None` parent matches the seed.
    pub async fn find_by_title_parent(
        &self,
        title: &str,
        parent_url: Option<&str>,
    ) -> Result<Option<NodeRecord>, AppError> {
        let row = sqlx::query_as::<_, NodeRow>(&format!(
            "{SELECT_NODE} WHERE n.title = $1 AND n.parent_url IS NOT DISTINCT FROM $2 LIMIT 1"
        ))
        .bind(title)
        .bind(parent_url)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;
        row.map(TryInto::try_into).transpose()
    }

    /// Every stored node ordered by degree, type, and title.
    pub async fn all_nodes(&self) -> Result<Vec<NodeRecord>, AppError> {
        let rows = sqlx::query_as::<_, NodeRow>(&format!(
            "{SELECT_NODE} ORDER BY n.degree, n.node_type, n.title"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;
        rows.into_iter().map(TryInto::try_into).collect()
    }
}

pub(crate) fn db_error(e: sqlx::Error) -> AppError {
    AppError::DatabaseError(e.to_string())
}

// -- Internal row type for sqlx deserialization --

pub(crate) const SELECT_NODE: &str = r#"
    SELECT n.node_id, n.node_type, n.title, n.url, n.degree, n.parent_url,
           n.description, n.start_date, n.end_date, n.metadata
    FROM nodes n
"#;

#[derive(sqlx::FromRow)]
pub(crate) struct NodeRow {
    node_id: String,
    node_type: String,
    title: String,
    url: String,
    degree: i32,
    parent_url: Option<String>,
    description: String,
    start_date: String,
    end_date: String,
    metadata: Json<BTreeMap<String, String>>,
}

impl TryFrom<NodeRow> for NodeRecord {
    type Error = AppError;

    fn try_from(row: NodeRow) -> Result<Self, Self::Error> {
        let node_type: NodeKind = row.node_type.parse().map_err(AppError::DatabaseError)?;
        Ok(NodeRecord {
            node_id: row.node_id,
            node_type,
            title: row.title,
            url: row.url,
            degree: usize::try_from(row.degree).unwrap_or_default(),
            parent_url: row.parent_url,
            description: row.description,
            start_date: row.start_date,
            end_date: row.end_date,
            metadata: row.metadata.0,
        })
    }
}

// -- Trait implementation --

impl NodeSink for NodeRepository {
    async fn persist(&self, node: &Node, session: Option<Uuid>) -> Result<String, AppError> {
        NodeRepository::save_node(self, node, session).await
    }
}

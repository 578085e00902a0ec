//! PostgreSQL implementation of NodeRepository.
//!
//! Persists the node registry in `cluster.node`. Timestamps are stored as
//! unix seconds so the master claim procedure can compare them directly.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::cluster::{MasterClaim, Node, NodeCheckIn};
use crate::domain::foundation::{DomainError, ErrorCode, NodeId, Timestamp};
use crate::ports::NodeRepository;

/// PostgreSQL implementation of NodeRepository.
#[derive(Clone)]
pub struct PostgresNodeRepository {
    pool: PgPool,
}

impl PostgresNodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NodeRepository for PostgresNodeRepository {
    async fn find(&self, id: &NodeId) -> Result<Option<Node>, DomainError> {
        let row = sqlx::query(
            r#"
            SELECT id, name, hostname, is_master, date_check_in, date_started,
                   stat_sessions, stat_memory, running
            FROM cluster.node
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch node", e))?;

        row.map(row_to_node).transpose()
    }

    async fn list(&self) -> Result<Vec<Node>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, hostname, is_master, date_check_in, date_started,
                   stat_sessions, stat_memory, running
            FROM cluster.node
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to list nodes", e))?;

        rows.into_iter().map(row_to_node).collect()
    }

    async fn count(&self) -> Result<i64, DomainError> {
        let result: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cluster.node")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to count nodes", e))?;

        Ok(result.0)
    }

    async fn insert(&self, node: &Node) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO cluster.node (
                id, name, hostname, is_master, date_check_in, date_started,
                stat_sessions, stat_memory, running
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(node.id.as_uuid())
        .bind(&node.name)
        .bind(&node.hostname)
        .bind(node.is_master)
        .bind(node.last_check_in.as_unix_secs())
        .bind(node.started_at.as_unix_secs())
        .bind(node.stat_sessions)
        .bind(node.stat_memory_mb)
        .bind(node.running)
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to insert node", e))?;

        Ok(())
    }

    async fn reset_on_startup(&self, id: &NodeId, hostname: &str, now: Timestamp) -> Result<(), DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to start transaction", e))?;

        let result = sqlx::query(
            r#"
            UPDATE cluster.node SET
                hostname = $2,
                date_started = $3,
                date_check_in = $3,
                is_master = FALSE,
                running = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(hostname)
        .bind(now.as_unix_secs())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database("Failed to reset node", e))?;

        if result.rows_affected() == 0 {
            return Err(node_not_found(id));
        }

        sqlx::query("DELETE FROM cluster.node_event WHERE node_id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| DomainError::database("Failed to purge node events", e))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit transaction", e))?;

        Ok(())
    }

    async fn check_in(&self, id: &NodeId, check_in: &NodeCheckIn) -> Result<(), DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE cluster.node SET
                hostname = $2,
                stat_sessions = $3,
                stat_memory = $4,
                date_check_in = $5,
                running = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id.as_uuid())
        .bind(&check_in.hostname)
        .bind(check_in.sessions)
        .bind(check_in.memory_mb)
        .bind(check_in.at.as_unix_secs())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to update node check-in", e))?;

        if result.rows_affected() == 0 {
            return Err(node_not_found(id));
        }

        Ok(())
    }

    async fn master_check_in(&self) -> Result<Option<Timestamp>, DomainError> {
        let row: Option<(i64,)> =
            sqlx::query_as("SELECT date_check_in FROM cluster.node WHERE is_master")
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| DomainError::database("Failed to read master check-in", e))?;

        Ok(row.map(|(secs,)| Timestamp::from_unix_secs(secs)))
    }

    async fn request_master_role(&self, id: &NodeId, missing_after_secs: i64) -> Result<MasterClaim, DomainError> {
        let missing_after = i32::try_from(missing_after_secs).map_err(|_| {
            DomainError::new(
                ErrorCode::ValidationFailed,
                format!("Master threshold out of range: {}", missing_after_secs),
            )
        })?;

        let status: (i32,) = sqlx::query_as("SELECT cluster.master_role_request($1, $2)")
            .bind(id.as_uuid())
            .bind(missing_after)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to request master role", e))?;

        Ok(MasterClaim::from_status(status.0))
    }

    async fn shut_down(&self, id: &NodeId) -> Result<(), DomainError> {
        sqlx::query("UPDATE cluster.node SET running = FALSE, is_master = FALSE WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to mark node as stopped", e))?;

        Ok(())
    }
}

fn node_not_found(id: &NodeId) -> DomainError {
    DomainError::new(ErrorCode::NodeNotFound, format!("Node not found: {}", id))
}

fn row_to_node(row: PgRow) -> Result<Node, DomainError> {
    let decode = |e: sqlx::Error| DomainError::database("Failed to decode node row", e);

    let id: uuid::Uuid = row.try_get("id").map_err(decode)?;
    Ok(Node {
        id: NodeId::from_uuid(id),
        name: row.try_get("name").map_err(decode)?,
        hostname: row.try_get("hostname").map_err(decode)?,
        is_master: row.try_get("is_master").map_err(decode)?,
        last_check_in: Timestamp::from_unix_secs(row.try_get("date_check_in").map_err(decode)?),
        started_at: Timestamp::from_unix_secs(row.try_get("date_started").map_err(decode)?),
        stat_sessions: row.try_get("stat_sessions").map_err(decode)?,
        stat_memory_mb: row.try_get("stat_memory").map_err(decode)?,
        running: row.try_get("running").map_err(decode)?,
    })
}

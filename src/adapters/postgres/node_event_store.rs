//! PostgreSQL implementation of NodeEventStore.
//!
//! `cluster.node_event` is the per-node mailbox. Rows are only ever read and
//! deleted by the node they are addressed to.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::domain::cluster::NodeEventContent;
use crate::domain::foundation::{DomainError, ErrorCode, NodeId};
use crate::ports::{MailboxRow, NodeEventStore};

#[derive(Clone)]
pub struct PostgresNodeEventStore {
    pool: PgPool,
}

impl PostgresNodeEventStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NodeEventStore for PostgresNodeEventStore {
    async fn enqueue(&self, targets: &[NodeId], content: &NodeEventContent) -> Result<(), DomainError> {
        if targets.is_empty() {
            return Ok(());
        }

        let payload = content
            .encode_payload()
            .map_err(|e| DomainError::new(ErrorCode::EventDecodeFailed, e.to_string()))?;
        let tag = content.tag().as_str();

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database("Failed to start transaction", e))?;

        for target in targets {
            sqlx::query("INSERT INTO cluster.node_event (node_id, content, payload) VALUES ($1, $2, $3)")
                .bind(target.as_uuid())
                .bind(tag)
                .bind(payload.as_slice())
                .execute(&mut *tx)
                .await
                .map_err(|e| DomainError::database("Failed to insert node event", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::database("Failed to commit transaction", e))?;

        Ok(())
    }

    async fn fetch_pending(&self, node: &NodeId) -> Result<Vec<MailboxRow>, DomainError> {
        let rows = sqlx::query(
            r#"
            SELECT id, node_id, content, payload
            FROM cluster.node_event
            WHERE node_id = $1
            ORDER BY id
            "#,
        )
        .bind(node.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database("Failed to fetch node events", e))?;

        rows.into_iter()
            .map(|row| {
                let decode = |e: sqlx::Error| DomainError::database("Failed to decode node event row", e);
                let target: uuid::Uuid = row.try_get("node_id").map_err(decode)?;
                Ok(MailboxRow {
                    id: row.try_get("id").map_err(decode)?,
                    target: NodeId::from_uuid(target),
                    content: row.try_get("content").map_err(decode)?,
                    payload: row.try_get("payload").map_err(decode)?,
                })
            })
            .collect()
    }

    async fn delete(&self, ids: &[i64]) -> Result<u64, DomainError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM cluster.node_event WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database("Failed to delete node events", e))?;

        Ok(result.rows_affected())
    }
}

//! Author resolution: name to id, creating the author on first reference.

use crate::db::TxHandle;
use crate::error::AppError;
use crate::sql::{insert_author, select_author_by_name};
use sqlx::Row;

pub struct AuthorResolver;

impl AuthorResolver {
    /// Return the id of the author named `name`, inserting it if absent.
    ///
    /// Only accepts a transaction handle so the lookup and the insert share one
    /// connection. A concurrent transaction inserting the same name makes our
    /// insert a no-op (`ON CONFLICT DO NOTHING`); the name is then re-read once.
    pub async fn resolve_or_create(tx: &mut TxHandle, name: &str) -> Result<i64, AppError> {
        if let Some(id) = Self::find(tx, name).await? {
            return Ok(id);
        }

        let q = insert_author(name);
        let created = tx.query(&q.sql, &q.params).await?;
        if let Some(id) = created.inserted_id {
            tracing::debug!(author_id = id, "author created");
            return Ok(id);
        }

        tracing::debug!(author = %name, "author created concurrently, re-reading");
        Self::find(tx, name)
            .await?
            .ok_or_else(|| AppError::Conflict(format!("author '{}' could not be resolved", name)))
    }

    async fn find(tx: &mut TxHandle, name: &str) -> Result<Option<i64>, AppError> {
        let q = select_author_by_name(name);
        let result = tx.query(&q.sql, &q.params).await?;
        match result.rows.first() {
            Some(row) => Ok(Some(row.try_get::<i64, _>("id")?)),
            None => Ok(None),
        }
    }
}

//! Connection provider: owns the PostgreSQL pool, runs single statements and transactions.
//!
//! Both modes return the same [`QueryResult`] shape. Transactions are scoped: the
//! dedicated connection goes back to the pool on commit, on rollback, and on drop.

use crate::config::DatabaseSettings;
use crate::error::AppError;
use crate::sql::{bind_all, SqlValue};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, Postgres, Row, Transaction};
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;

/// Outcome of one statement.
#[derive(Debug, Default)]
pub struct QueryResult {
    pub rows: Vec<PgRow>,
    /// `id` column of the first returned row, when the statement returns one.
    pub inserted_id: Option<i64>,
    pub affected_rows: u64,
}

impl QueryResult {
    fn from_rows(rows: Vec<PgRow>) -> Self {
        let inserted_id = rows.first().and_then(|r| r.try_get::<i64, _>("id").ok());
        let affected_rows = rows.len() as u64;
        QueryResult {
            rows,
            inserted_id,
            affected_rows,
        }
    }

    fn from_affected(affected_rows: u64) -> Self {
        QueryResult {
            affected_rows,
            ..Default::default()
        }
    }
}

/// Future returned by a transaction body; borrows the handle for `'c`.
pub type TxFuture<'c, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'c>>;

/// Pooled database handle. Cheap to clone; clones share the pool.
#[derive(Clone, Debug)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Open the pool. Pair with [`Database::stop`] on shutdown.
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect(&settings.url)
            .await?;
        tracing::info!(max_connections = settings.max_connections, "database pool connected");
        Ok(Database { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Database { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Close the pool, waiting for checked-out connections to return.
    pub async fn stop(&self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }

    /// Run a row-returning statement on any pooled connection.
    pub async fn query(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query");
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&self.pool)
            .await?;
        Ok(QueryResult::from_rows(rows))
    }

    /// Run a statement for its affected-row count on any pooled connection.
    pub async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "execute");
        let done = bind_all(sqlx::query(sql), params)
            .execute(&self.pool)
            .await?;
        Ok(QueryResult::from_affected(done.rows_affected()))
    }

    /// Run `body` inside one transaction: commit on `Ok`, roll back on `Err`.
    pub async fn with_transaction<T, F>(&self, body: F) -> Result<T, AppError>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut TxHandle) -> TxFuture<'c, T> + Send,
    {
        let tx = self.pool.begin().await?;
        let mut handle = TxHandle { tx };
        match body(&mut handle).await {
            Ok(value) => {
                handle.tx.commit().await?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = handle.tx.rollback().await {
                    tracing::warn!(error = %rollback_err, "rollback failed");
                }
                Err(err)
            }
        }
    }
}

/// Statement runner bound to one open transaction.
pub struct TxHandle {
    tx: Transaction<'static, Postgres>,
}

impl TxHandle {
    pub async fn query(&mut self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "query (tx)");
        let rows = bind_all(sqlx::query(sql), params)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(QueryResult::from_rows(rows))
    }

    pub async fn execute(&mut self, sql: &str, params: &[SqlValue]) -> Result<QueryResult, AppError> {
        tracing::debug!(sql = %sql, params = ?params, "execute (tx)");
        let done = bind_all(sqlx::query(sql), params)
            .execute(&mut *self.tx)
            .await?;
        Ok(QueryResult::from_affected(done.rows_affected()))
    }
}

/// Ensure the database in `database_url` exists; create it if not. Connects to the
/// default `postgres` database to run CREATE DATABASE. Call before [`Database::connect`].
pub async fn ensure_database_exists(database_url: &str) -> Result<(), AppError> {
    let (admin_url, db_name) = parse_db_name_from_url(database_url)?;
    if db_name.is_empty() || db_name == "postgres" {
        return Ok(());
    }
    let opts = sqlx::postgres::PgConnectOptions::from_str(&admin_url)
        .map_err(|e| AppError::BadRequest(format!("invalid DATABASE_URL: {}", e)))?;
    let mut conn: sqlx::PgConnection = opts.connect().await?;
    let exists: (bool,) = sqlx::query_as("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
        .bind(&db_name)
        .fetch_one(&mut conn)
        .await?;
    if !exists.0 {
        tracing::info!(database = %db_name, "creating database");
        sqlx::query(&format!("CREATE DATABASE {}", quote_ident(&db_name)))
            .execute(&mut conn)
            .await?;
    }
    Ok(())
}

fn parse_db_name_from_url(url: &str) -> Result<(String, String), AppError> {
    let path_start = url
        .rfind('/')
        .ok_or_else(|| AppError::BadRequest("DATABASE_URL: no path".into()))?
        + 1;
    let path_and_query = url.get(path_start..).unwrap_or("");
    let (db_name, query) = match path_and_query.split_once('?') {
        Some((name, q)) => (name.trim(), Some(q)),
        None => (path_and_query.trim(), None),
    };
    let base = url.get(..path_start).unwrap_or(url);
    let admin_url = match query {
        Some(q) => format!("{}postgres?{}", base, q),
        None => format!("{}postgres", base),
    };
    Ok((admin_url, db_name.to_string()))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

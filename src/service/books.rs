//! Book repository: the data-access surface used by the HTTP handlers.

use crate::db::Database;
use crate::error::AppError;
use crate::model::{Book, BookListing, BookPatch, GroupCount, GroupField, ListQuery, NewBook, StoredBook};
use crate::service::authors::AuthorResolver;
use crate::sql::{
    create_tables, delete_all, insert_book, select_book_by_id, select_book_for_update, select_list,
    update_book, AUTHORS_TABLE, BOOKS_TABLE,
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, Row};

#[derive(Clone, Debug)]
pub struct BookRepository {
    db: Database,
}

impl BookRepository {
    pub fn new(db: Database) -> Self {
        BookRepository { db }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Create both tables if missing. Provisioning only, not on the request path.
    pub async fn create_table(&self) -> Result<(), AppError> {
        for ddl in create_tables() {
            self.db.execute(&ddl, &[]).await?;
        }
        tracing::info!("book tables ensured");
        Ok(())
    }

    /// One book joined with its author name, or `None`.
    pub async fn get_one(&self, id: i64) -> Result<Option<Book>, AppError> {
        let q = select_book_by_id(id);
        let result = self.db.query(&q.sql, &q.params).await?;
        let book = result.rows.first().map(Book::from_row).transpose()?;
        Ok(book)
    }

    /// Flat books, or per-group counts when `query.group` is set.
    pub async fn get_many(&self, query: &ListQuery) -> Result<BookListing, AppError> {
        let q = select_list(&query.sort, query.group, &query.pagination);
        let result = self.db.query(&q.sql, &q.params).await?;
        match query.group {
            None => {
                let books = result
                    .rows
                    .iter()
                    .map(Book::from_row)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BookListing::Books(books))
            }
            Some(field) => {
                let groups = result
                    .rows
                    .iter()
                    .map(|row| group_row(row, field))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(BookListing::Groups(groups))
            }
        }
    }

    /// Insert a book, resolving or creating its author in the same transaction.
    pub async fn create(&self, book: NewBook) -> Result<i64, AppError> {
        let id = self
            .db
            .with_transaction(move |tx| {
                Box::pin(async move {
                    let author_id = AuthorResolver::resolve_or_create(tx, &book.author).await?;
                    let q = insert_book(&book, author_id);
                    let result = tx.query(&q.sql, &q.params).await?;
                    result.inserted_id.ok_or(AppError::Db(sqlx::Error::RowNotFound))
                })
            })
            .await?;
        tracing::debug!(book_id = id, "book created");
        Ok(id)
    }

    /// Apply a partial update. Returns the number of rows changed (0 when `id` is unknown).
    ///
    /// The stored row is read and locked, the patch merged in process, and the full
    /// row written back, so omitted fields (date included) keep their values.
    pub async fn update(&self, id: i64, patch: BookPatch) -> Result<u64, AppError> {
        self.db
            .with_transaction(move |tx| {
                Box::pin(async move {
                    let q = select_book_for_update(id);
                    let current = tx.query(&q.sql, &q.params).await?;
                    let Some(row) = current.rows.first() else {
                        return Ok(0);
                    };
                    let stored = StoredBook::from_row(row)?;

                    let author_id = match patch.author.as_deref() {
                        Some(name) => AuthorResolver::resolve_or_create(tx, name).await?,
                        None => stored.author,
                    };
                    let merged = stored.merge(patch, author_id);

                    let q = update_book(id, &merged);
                    let result = tx.query(&q.sql, &q.params).await?;
                    Ok(result.affected_rows)
                })
            })
            .await
    }

    /// Remove every book, then every author. Administrative reset only.
    pub async fn delete_all(&self) -> Result<(), AppError> {
        self.db
            .with_transaction(|tx| {
                Box::pin(async move {
                    let books = delete_all(BOOKS_TABLE);
                    let removed = tx.execute(&books.sql, &books.params).await?;
                    let authors = delete_all(AUTHORS_TABLE);
                    tx.execute(&authors.sql, &authors.params).await?;
                    tracing::warn!(books = removed.affected_rows, "all books and authors deleted");
                    Ok(())
                })
            })
            .await
    }
}

fn group_row(row: &PgRow, field: GroupField) -> Result<GroupCount, sqlx::Error> {
    let key = field.name();
    let value = match field {
        GroupField::Date => {
            let date: DateTime<Utc> = row.try_get(key)?;
            Value::String(date.to_rfc3339_opts(SecondsFormat::AutoSi, true))
        }
        _ => row
            .try_get::<Option<String>, _>(key)?
            .map(Value::String)
            .unwrap_or(Value::Null),
    };
    let count: i64 = row.try_get("count")?;
    Ok(GroupCount { field, value, count })
}

//! Builds the parameterized statements for books and authors.
//! Identifiers come from the closed field enums only; values are always bound.

use crate::model::{GroupField, NewBook, Pagination, Sort, SortField, StoredBook};
use crate::sql::params::SqlValue;

pub const BOOKS_TABLE: &str = "books";
pub const AUTHORS_TABLE: &str = "authors";

const BOOK_ALIAS: &str = "book";
const AUTHOR_ALIAS: &str = "author";

/// Quote identifier for PostgreSQL (safe: only from the field enums and constants).
fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

fn column(alias: &str, name: &str) -> String {
    format!("{}.{}", alias, quoted(name))
}

#[derive(Debug, Default)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf::default()
    }

    fn push_param(&mut self, v: impl Into<SqlValue>) -> String {
        self.params.push(v.into());
        format!("${}", self.params.len())
    }
}

/// Expression a sort field orders by. Author sorts by the joined name.
fn sort_expr(field: SortField) -> String {
    match field {
        SortField::Author => column(AUTHOR_ALIAS, "name"),
        other => column(BOOK_ALIAS, other.name()),
    }
}

fn from_books() -> String {
    format!("{} {}", quoted(BOOKS_TABLE), BOOK_ALIAS)
}

fn author_join() -> String {
    format!(
        "LEFT JOIN {} {} ON {} = {}",
        quoted(AUTHORS_TABLE),
        AUTHOR_ALIAS,
        column(AUTHOR_ALIAS, "id"),
        column(BOOK_ALIAS, "author")
    )
}

/// Book columns with the author id replaced by the author name.
fn book_select_list() -> String {
    [
        column(BOOK_ALIAS, "id"),
        column(BOOK_ALIAS, "title"),
        format!("{} AS {}", column(AUTHOR_ALIAS, "name"), quoted("author")),
        column(BOOK_ALIAS, "description"),
        column(BOOK_ALIAS, "image"),
        column(BOOK_ALIAS, "date"),
    ]
    .join(", ")
}

/// SELECT one book by id, joined with its author name. Caller's id is `$1`.
pub fn select_book_by_id(id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id);
    q.sql = format!(
        "SELECT {} FROM {} {} WHERE {} = {}",
        book_select_list(),
        from_books(),
        author_join(),
        column(BOOK_ALIAS, "id"),
        ph
    );
    q
}

/// SELECT for the list endpoint.
///
/// Without `group`: every book column plus the author name, always through a left join.
/// With `group`: the grouped expression and `COUNT(*) AS "count"`; the join is only
/// present when grouping by author. A grouped listing always orders by the grouped
/// expression in `sort.direction`; `sort.field` only applies to flat listings.
pub fn select_list(sort: &Sort, group: Option<GroupField>, pagination: &Pagination) -> QueryBuf {
    let mut q = QueryBuf::new();
    let join_needed = matches!(group, None | Some(GroupField::Author));

    let (select_parts, group_clause) = match group {
        None => (book_select_list(), String::new()),
        Some(g) => {
            let expr = sort_expr(g.into());
            (
                format!("{} AS {}, COUNT(*) AS {}", expr, quoted(g.name()), quoted("count")),
                format!(" GROUP BY {}", expr),
            )
        }
    };
    let join_clause = if join_needed {
        format!(" {}", author_join())
    } else {
        String::new()
    };

    let order_field = group.map(SortField::from).unwrap_or(sort.field);
    let mut order_parts = vec![format!("{} {}", sort_expr(order_field), sort.direction.keyword())];
    if group.is_none() && sort.field != SortField::Id {
        order_parts.push(format!("{} ASC", column(BOOK_ALIAS, "id")));
    }
    let order_clause = format!(" ORDER BY {}", order_parts.join(", "));

    let limit_ph = q.push_param(pagination.limit());
    let offset_ph = q.push_param(pagination.offset());
    q.sql = format!(
        "SELECT {} FROM {}{}{}{} LIMIT {} OFFSET {}",
        select_parts,
        from_books(),
        join_clause,
        group_clause,
        order_clause,
        limit_ph,
        offset_ph
    );
    q
}

/// INSERT a book referencing an already resolved author. Returns the new id.
pub fn insert_book(book: &NewBook, author_id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let placeholders = [
        q.push_param(book.title.as_str()),
        q.push_param(author_id),
        q.push_param(book.description.as_str()),
        q.push_param(book.image.as_str()),
        q.push_param(book.date),
    ];
    q.sql = format!(
        "INSERT INTO {} ({}, {}, {}, {}, {}) VALUES ({}) RETURNING {}",
        quoted(BOOKS_TABLE),
        quoted("title"),
        quoted("author"),
        quoted("description"),
        quoted("image"),
        quoted("date"),
        placeholders.join(", "),
        quoted("id")
    );
    q
}

/// SELECT the stored row (author as id) and lock it for the rest of the transaction.
pub fn select_book_for_update(id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(id);
    q.sql = format!(
        "SELECT {}, {}, {}, {}, {} FROM {} WHERE {} = {} FOR UPDATE",
        quoted("title"),
        quoted("author"),
        quoted("description"),
        quoted("image"),
        quoted("date"),
        quoted(BOOKS_TABLE),
        quoted("id"),
        ph
    );
    q
}

/// UPDATE every column of one book with a fully merged row.
pub fn update_book(id: i64, row: &StoredBook) -> QueryBuf {
    let mut q = QueryBuf::new();
    let sets = [
        format!("{} = {}", quoted("title"), q.push_param(row.title.as_str())),
        format!("{} = {}", quoted("author"), q.push_param(row.author)),
        format!("{} = {}", quoted("description"), q.push_param(row.description.as_str())),
        format!("{} = {}", quoted("image"), q.push_param(row.image.as_str())),
        format!("{} = {}", quoted("date"), q.push_param(row.date)),
    ];
    let id_ph = q.push_param(id);
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        quoted(BOOKS_TABLE),
        sets.join(", "),
        quoted("id"),
        id_ph,
        quoted("id")
    );
    q
}

/// SELECT author id by exact name.
pub fn select_author_by_name(name: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(name);
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {} LIMIT 1",
        quoted("id"),
        quoted(AUTHORS_TABLE),
        quoted("name"),
        ph
    );
    q
}

/// INSERT an author; yields no row when the name already exists.
pub fn insert_author(name: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    let ph = q.push_param(name);
    q.sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT ({}) DO NOTHING RETURNING {}",
        quoted(AUTHORS_TABLE),
        quoted("name"),
        ph,
        quoted("name"),
        quoted("id")
    );
    q
}

/// DELETE every row of a table. Books must go before authors (restrict FK).
pub fn delete_all(table: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!("DELETE FROM {}", quoted(table));
    q
}

/// Idempotent DDL for both tables, authors first.
pub fn create_tables() -> [String; 2] {
    let authors = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {authors} (
            "id" BIGSERIAL PRIMARY KEY,
            "name" TEXT NOT NULL,
            CONSTRAINT "authors_name_key" UNIQUE ("name")
        )
        "#,
        authors = quoted(AUTHORS_TABLE)
    );
    let books = format!(
        r#"
        CREATE TABLE IF NOT EXISTS {books} (
            "id" BIGSERIAL PRIMARY KEY,
            "title" TEXT NOT NULL,
            "author" BIGINT NOT NULL,
            "description" TEXT NOT NULL,
            "image" TEXT NOT NULL,
            "date" TIMESTAMPTZ NOT NULL,
            CONSTRAINT "books_author_fkey" FOREIGN KEY ("author")
                REFERENCES {authors} ("id")
                ON UPDATE CASCADE
                ON DELETE RESTRICT
        )
        "#,
        books = quoted(BOOKS_TABLE),
        authors = quoted(AUTHORS_TABLE)
    );
    [authors, books]
}

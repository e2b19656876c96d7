//! Per-test PostgreSQL schema.
//!
//! Tests using this are `#[ignore]`d by default. Run them with
//! `TEST_DATABASE_URL=postgres://... cargo test -- --ignored`.

#![allow(dead_code)]

use book_store::{BookRepository, Database, NewBook};
use chrono::{TimeZone, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

pub struct TestDb {
    pub repo: BookRepository,
    admin: PgPool,
    schema: String,
}

/// Connect, create an isolated schema and the book tables inside it.
pub async fn setup() -> TestDb {
    let url = std::env::var("TEST_DATABASE_URL")
        .expect("TEST_DATABASE_URL must point at a PostgreSQL server for ignored tests");
    let admin = PgPoolOptions::new()
        .max_connections(1)
        .connect(&url)
        .await
        .expect("connect admin pool");
    let schema = format!("book_store_test_{}", uuid::Uuid::new_v4().simple());
    sqlx::query(&format!("CREATE SCHEMA \"{}\"", schema))
        .execute(&admin)
        .await
        .expect("create schema");

    let search_path = schema.clone();
    let pool = PgPoolOptions::new()
        .max_connections(8)
        .after_connect(move |conn, _meta| {
            let sql = format!("SET search_path TO \"{}\"", search_path);
            Box::pin(async move {
                sqlx::query(&sql).execute(conn).await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .expect("connect test pool");

    let repo = BookRepository::new(Database::from_pool(pool));
    repo.create_table().await.expect("create tables");
    TestDb { repo, admin, schema }
}

impl TestDb {
    pub async fn teardown(self) {
        self.repo.database().stop().await;
        sqlx::query(&format!("DROP SCHEMA \"{}\" CASCADE", self.schema))
            .execute(&self.admin)
            .await
            .expect("drop schema");
        self.admin.close().await;
    }

    pub async fn count(&self, sql: &str) -> i64 {
        let result = self.repo.database().query(sql, &[]).await.expect("count query");
        result.rows[0].try_get::<i64, _>(0).expect("count column")
    }
}

pub fn book(title: &str, author: &str, description: &str) -> NewBook {
    NewBook {
        title: title.into(),
        author: author.into(),
        description: description.into(),
        image: "image url".into(),
        date: Utc.with_ymd_and_hms(2017, 12, 22, 0, 0, 0).unwrap(),
    }
}

/// Insert `n` books: two distinct descriptions and two distinct authors,
/// alternating. Returns the ids in insertion order.
pub async fn fill_with_books(repo: &BookRepository, n: usize) -> Vec<i64> {
    let mut ids = Vec::with_capacity(n);
    for i in 0..n {
        let b = book(
            &format!("book title{}", i),
            &format!("Author name{}", 4 - i % 2),
            &format!("book description{}", i % 2),
        );
        ids.push(repo.create(b).await.expect("create book"));
    }
    ids
}

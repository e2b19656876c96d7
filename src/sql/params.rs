//! Positional statement parameters and their binding onto sqlx queries.

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgArguments, Postgres};
use sqlx::query::Query;

/// A value bound to a `$n` placeholder. Identifiers never travel as parameters.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlValue {
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Int(n)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::Text(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::Text(s)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(d: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(d)
    }
}

/// Bind params in order, so the i-th value fills `$i+1`.
pub fn bind_all<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for p in params {
        query = match p {
            SqlValue::Int(n) => query.bind(*n),
            SqlValue::Text(s) => query.bind(s.as_str()),
            SqlValue::Timestamp(d) => query.bind(*d),
        };
    }
    query
}

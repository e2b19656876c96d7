//! Book catalogue backend: a PostgreSQL-backed book/author store with sortable,
//! groupable, paginated listing, served over axum.

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod sql;
pub mod state;

pub use config::{Environment, Settings};
pub use db::{ensure_database_exists, Database, QueryResult, TxHandle};
pub use error::{AppError, ConfigError};
pub use model::{Book, BookListing, BookPatch, GroupCount, GroupField, ListQuery, NewBook, Pagination, Sort, SortDirection, SortField};
pub use routes::{app, book_routes, common_routes};
pub use service::{AuthorResolver, BookRepository};
pub use state::AppState;

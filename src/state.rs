//! Shared application state for all routes.

use crate::config::Environment;
use crate::service::BookRepository;

#[derive(Clone)]
pub struct AppState {
    pub books: BookRepository,
    /// Gates administrative operations such as the bulk wipe.
    pub environment: Environment,
}

//! Book resource routes.

use crate::handlers::books::{create, delete_all, list, patch, read};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn book_routes(state: AppState) -> Router {
    Router::new()
        .route("/books", get(list).post(create).delete(delete_all))
        .route("/books/:id", get(read).patch(patch))
        .with_state(state)
}

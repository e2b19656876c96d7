//! Book handlers: list, read, create, patch, bulk delete.

use crate::error::AppError;
use crate::response::{success_many, success_one, success_one_ok, CreatedId};
use crate::service::{CreateBookRequest, ListParams, PatchBookRequest, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

fn body_to<T: DeserializeOwned>(value: Value) -> Result<T, AppError> {
    if !value.is_object() {
        return Err(AppError::BadRequest("body must be a JSON object".into()));
    }
    serde_json::from_value(value).map_err(|e| AppError::Validation(e.to_string()))
}

/// GET /books
pub async fn list(
    State(state): State<AppState>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(params) = params.map_err(|e| AppError::Validation(e.body_text()))?;
    let query = RequestValidator::list(params)?;
    let rows = state.books.get_many(&query).await?;
    let count = rows.len();
    Ok(success_many(rows, count))
}

/// GET /books/:id
pub async fn read(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = RequestValidator::book_id(&id_str)?;
    let book = state
        .books
        .get_one(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("no such book: {}", id)))?;
    Ok(success_one_ok(book))
}

/// POST /books
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: CreateBookRequest = body_to(body)?;
    let book = RequestValidator::create(req)?;
    let id = state.books.create(book).await?;
    Ok(success_one(CreatedId { id }))
}

/// PATCH /books/:id
pub async fn patch(
    State(state): State<AppState>,
    Path(id_str): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let id = RequestValidator::book_id(&id_str)?;
    let req: PatchBookRequest = body_to(body)?;
    let patch = RequestValidator::patch(req)?;
    let affected = state.books.update(id, patch).await?;
    if affected == 0 {
        return Err(AppError::NotFound(format!("no such book: {}", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /books: wipes every book and author. Refused in production.
pub async fn delete_all(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    if !state.environment.allows_bulk_delete() {
        return Err(AppError::Forbidden("bulk delete is disabled in production".into()));
    }
    state.books.delete_all().await?;
    Ok(StatusCode::NO_CONTENT)
}

//! Request validation: raw HTTP input to vetted domain values.

use crate::error::AppError;
use crate::model::{
    BookPatch, GroupField, ListQuery, NewBook, Pagination, Sort, SortDirection, SortField,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const MAX_BOOK_ID: i64 = 100_000_000;
pub const MAX_PAGE: u32 = 100_000_000;
pub const MAX_PAGE_SIZE: u32 = 100;

const TITLE_MAX: usize = 1000;
const DESCRIPTION_MAX: usize = 10_000;
const AUTHOR_MAX: usize = 500;
const IMAGE_MAX: usize = 3000;

/// Query string of `GET /books`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ListParams {
    pub sort: Option<String>,
    pub sort_direction: Option<i64>,
    pub group: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Body of `POST /books`. Fields are optional here so a missing one is reported by name.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub date: Option<String>,
}

/// Body of `PATCH /books/:id`.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PatchBookRequest {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub date: Option<String>,
}

pub struct RequestValidator;

impl RequestValidator {
    /// Path id: integer in 1..=100_000_000.
    pub fn book_id(raw: &str) -> Result<i64, AppError> {
        let id: i64 = raw
            .trim()
            .parse()
            .map_err(|_| AppError::Validation(format!("id must be an integer, got '{}'", raw)))?;
        if !(1..=MAX_BOOK_ID).contains(&id) {
            return Err(AppError::Validation(format!(
                "id must be between 1 and {}",
                MAX_BOOK_ID
            )));
        }
        Ok(id)
    }

    /// Allow-list sort and group fields; when grouping, sort must be the group field.
    pub fn list(params: ListParams) -> Result<ListQuery, AppError> {
        let sort_field = params
            .sort
            .as_deref()
            .map(|s| s.parse::<SortField>())
            .transpose()
            .map_err(|e| AppError::Validation(format!("sort: {}", e)))?;
        let group = params
            .group
            .as_deref()
            .map(|s| s.parse::<GroupField>())
            .transpose()
            .map_err(|e| AppError::Validation(format!("group: {}", e)))?;

        let field = match (sort_field, group) {
            (Some(s), Some(g)) if s != SortField::from(g) => {
                return Err(AppError::BadRequest(
                    "sort should be equal to group if group is defined".into(),
                ))
            }
            (Some(s), _) => s,
            (None, Some(g)) => g.into(),
            (None, None) => SortField::default(),
        };

        let direction = match params.sort_direction {
            None => SortDirection::default(),
            Some(code @ (1 | -1)) => SortDirection::from_code(code),
            Some(other) => {
                return Err(AppError::Validation(format!(
                    "sortDirection must be 1 or -1, got {}",
                    other
                )))
            }
        };

        let page = params.page.unwrap_or(0);
        if page > MAX_PAGE {
            return Err(AppError::Validation(format!("page must be at most {}", MAX_PAGE)));
        }
        let page_size = params.page_size.unwrap_or(Pagination::DEFAULT_PAGE_SIZE);
        if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
            return Err(AppError::Validation(format!(
                "pageSize must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        Ok(ListQuery {
            sort: Sort { field, direction },
            group,
            pagination: Pagination { page, page_size },
        })
    }

    /// Every field required and within bounds.
    pub fn create(req: CreateBookRequest) -> Result<NewBook, AppError> {
        let title = required("title", req.title)?;
        let author = required("author", req.author)?;
        let description = required("description", req.description)?;
        let image = required("image", req.image)?;
        let date = required("date", req.date)?;
        Ok(NewBook {
            title: text("title", title, TITLE_MAX)?,
            author: text("author", author, AUTHOR_MAX)?,
            description: text("description", description, DESCRIPTION_MAX)?,
            image: text("image", image, IMAGE_MAX)?,
            date: timestamp(&date)?,
        })
    }

    /// Same bounds as create; at least one field must be present.
    pub fn patch(req: PatchBookRequest) -> Result<BookPatch, AppError> {
        let patch = BookPatch {
            title: req.title.map(|v| text("title", v, TITLE_MAX)).transpose()?,
            author: req.author.map(|v| text("author", v, AUTHOR_MAX)).transpose()?,
            description: req
                .description
                .map(|v| text("description", v, DESCRIPTION_MAX))
                .transpose()?,
            image: req.image.map(|v| text("image", v, IMAGE_MAX)).transpose()?,
            date: req.date.as_deref().map(timestamp).transpose()?,
        };
        if patch.is_empty() {
            return Err(AppError::Validation(
                "patch must contain at least one of title, author, description, image, date".into(),
            ));
        }
        Ok(patch)
    }
}

fn required(field: &str, value: Option<String>) -> Result<String, AppError> {
    value.ok_or_else(|| AppError::Validation(format!("{} is required", field)))
}

fn text(field: &str, value: String, max: usize) -> Result<String, AppError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    // PostgreSQL TEXT cannot store NUL; reject before it becomes a 500.
    if value.contains('\0') {
        return Err(AppError::Validation(format!(
            "{} must not contain NUL characters",
            field
        )));
    }
    if len > max {
        return Err(AppError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(value)
}

fn timestamp(raw: &str) -> Result<DateTime<Utc>, AppError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|d| d.with_timezone(&Utc))
        .map_err(|_| AppError::Validation(format!("date must be an ISO 8601 timestamp, got '{}'", raw)))
}

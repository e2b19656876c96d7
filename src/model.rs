//! Book and author domain types, plus the closed sets of sortable and groupable fields.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// A book as exposed by the API: author by name.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Book {
    pub id: i64,
    pub title: String,
    /// `None` only if the author row is missing, which the foreign key prevents.
    pub author: Option<String>,
    pub description: String,
    pub image: String,
    pub date: DateTime<Utc>,
}

/// Input for create: every field, author by name.
#[derive(Clone, Debug, PartialEq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub image: String,
    pub date: DateTime<Utc>,
}

/// Partial update. `None` keeps the stored value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BookPatch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

impl BookPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.author.is_none()
            && self.description.is_none()
            && self.image.is_none()
            && self.date.is_none()
    }
}

/// A book row as stored: author by id.
#[derive(Clone, Debug, PartialEq, sqlx::FromRow)]
pub struct StoredBook {
    pub title: String,
    pub author: i64,
    pub description: String,
    pub image: String,
    pub date: DateTime<Utc>,
}

impl StoredBook {
    /// Merge a patch over the stored row. `author_id` is the already resolved
    /// id for `patch.author`, or the current one when the patch has no author.
    pub fn merge(self, patch: BookPatch, author_id: i64) -> StoredBook {
        StoredBook {
            title: patch.title.unwrap_or(self.title),
            author: author_id,
            description: patch.description.unwrap_or(self.description),
            image: patch.image.unwrap_or(self.image),
            date: patch.date.unwrap_or(self.date),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SortField {
    #[default]
    Id,
    Title,
    Description,
    Author,
    Image,
    Date,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupField {
    Title,
    Description,
    Author,
    Image,
    Date,
}

impl SortField {
    pub fn name(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Title => "title",
            SortField::Description => "description",
            SortField::Author => "author",
            SortField::Image => "image",
            SortField::Date => "date",
        }
    }
}

impl GroupField {
    /// Key of the grouped value in a group row; also the API name of the field.
    pub fn name(self) -> &'static str {
        SortField::from(self).name()
    }
}

impl From<GroupField> for SortField {
    fn from(g: GroupField) -> Self {
        match g {
            GroupField::Title => SortField::Title,
            GroupField::Description => SortField::Description,
            GroupField::Author => SortField::Author,
            GroupField::Image => SortField::Image,
            GroupField::Date => SortField::Date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownField(pub String);

impl fmt::Display for UnknownField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown field '{}'", self.0)
    }
}

impl FromStr for SortField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" => Ok(SortField::Id),
            "title" => Ok(SortField::Title),
            "description" => Ok(SortField::Description),
            "author" => Ok(SortField::Author),
            "image" => Ok(SortField::Image),
            "date" => Ok(SortField::Date),
            _ => Err(UnknownField(s.to_string())),
        }
    }
}

impl FromStr for GroupField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<SortField>()? {
            SortField::Id => Err(UnknownField(s.to_string())),
            SortField::Title => Ok(GroupField::Title),
            SortField::Description => Ok(GroupField::Description),
            SortField::Author => Ok(GroupField::Author),
            SortField::Image => Ok(GroupField::Image),
            SortField::Date => Ok(GroupField::Date),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Positive codes sort ascending, everything else descending.
    pub fn from_code(code: i64) -> Self {
        if code > 0 {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Zero-based page index and page size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: u32 = 100;

    pub fn limit(&self) -> i64 {
        i64::from(self.page_size)
    }

    pub fn offset(&self) -> i64 {
        i64::from(self.page) * i64::from(self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 0,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }
}

/// Vetted list request: sort, optional grouping, pagination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct ListQuery {
    pub sort: Sort,
    pub group: Option<GroupField>,
    pub pagination: Pagination,
}

/// One row of a grouped listing. Serializes as `{"<field>": value, "count": n}`.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupCount {
    pub field: GroupField,
    pub value: Value,
    pub count: i64,
}

impl Serialize for GroupCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry(self.field.name(), &self.value)?;
        map.serialize_entry("count", &self.count)?;
        map.end()
    }
}

/// Result of a list request: flat books, or per-group counts.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BookListing {
    Books(Vec<Book>),
    Groups(Vec<GroupCount>),
}

impl BookListing {
    pub fn len(&self) -> usize {
        match self {
            BookListing::Books(rows) => rows.len(),
            BookListing::Groups(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Book repository, author resolution and request validation.

mod authors;
mod books;
mod validation;
pub use authors::AuthorResolver;
pub use books::BookRepository;
pub use validation::{CreateBookRequest, ListParams, PatchBookRequest, RequestValidator};

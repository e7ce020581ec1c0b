pub mod micropost;
pub mod page;
pub mod user;
pub mod validation;

pub use page::{Page, PageQuery, Paged};
pub use validation::{FieldError, ValidationErrors};

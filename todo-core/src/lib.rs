//! Domain model, validation and SQLite storage for todo records.

mod db;
mod envelope;
mod error;
mod models;
pub mod query;
pub mod validation;

pub use db::Database;
pub use envelope::{Envelope, ErrorBody};
pub use error::{StoreError, StoreResult};
pub use models::{NewTodo, Todo, TodoPatch, TodoPriority, TodoStatus, UnknownVariant};
pub use query::{FieldFilter, SortDirection, SortField, SortSpec, TodoQuery};
pub use validation::{
    FieldViolation, TodoPayload, ValidationErrors, validate_create, validate_update,
};

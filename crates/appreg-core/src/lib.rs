//! Core domain types for the application registration cache.
//!
//! This crate defines the vocabulary the rest of the workspace speaks:
//! typed ids, the error taxonomy, the wire models for the mirrored slice of
//! the application object, the field names for scoped reads, and the
//! [`repository::DirectoryRepository`] contract that separates the cache
//! from any concrete backend.

pub mod error;
pub mod fields;
pub mod ids;
pub mod model;
pub mod repository;

pub use error::{DirectoryError, DirectoryResult};
pub use fields::{select_clause, ApplicationField};
pub use ids::{AppId, ObjectId, ParseIdError};
pub use repository::DirectoryRepository;

//! Chorelog-Common: Shared types, constants, and utilities.
//!
//! This crate provides common functionality used across chorelog:
//!
//! - **Typed IDs**: Type-safe wrappers for contributor and record row ids
//! - **Path Utilities**: Extension handling and object key generation for uploads
//! - **Error Handling**: Common error type, field-level validation messages,
//!   and the result alias
//!
//! # Examples
//!
//! ```
//! use chorelog_common::{Error, RecordId, Result};
//! use chorelog_common::paths::object_key_for;
//!
//! let id = RecordId::from(12);
//! let key = object_key_for(Some("jpg"));
//! assert!(key.ends_with(".jpg"));
//!
//! fn example() -> Result<()> {
//!     Err(Error::field("points", "A valid integer is required."))
//! }
//! assert_eq!(example().unwrap_err().http_status(), 400);
//! # let _ = id;
//! ```

pub mod error;
pub mod ids;
pub mod paths;

pub use error::{Error, FieldErrors, Result};
pub use ids::*;

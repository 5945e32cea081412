//! Chorelog-DB: Database schema, migrations, and query operations
//!
//! This crate provides database functionality for chorelog using SQLite
//! with rusqlite and r2d2 connection pooling.
//!
//! # Modules
//!
//! - `migrations` - Database schema migrations
//! - `pool` - Connection pool management
//! - `models` - Rust models matching database schema
//! - `queries` - Database query operations
//!
//! # Example
//!
//! ```
//! use chorelog_db::pool::{init_memory_pool, get_conn};
//! use chorelog_db::queries::contributors;
//!
//! let pool = init_memory_pool().unwrap();
//! let conn = get_conn(&pool).unwrap();
//!
//! let (contributor, created) = contributors::get_or_create_contributor(&conn, "John Doe").unwrap();
//! assert!(created);
//! assert_eq!(contributor.name, "John Doe");
//! ```

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;

//! Database reflection layer
//!
//! This module provides a database-agnostic interface for schema reflection
//! and row retrieval.

pub mod traits;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use traits::{DatabaseError, DatabaseProvider};

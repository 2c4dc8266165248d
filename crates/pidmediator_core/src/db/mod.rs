//! SQLite bootstrap for the reference object store.
//!
//! Connections handed out here are migrated and have foreign keys on, so
//! the object repository can rely on cascades and the identifier
//! uniqueness constraint.

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, DbError, DbResult};

//! Object store contracts and persistence implementations.
//!
//! # Responsibility
//! - Define data access contracts for repository objects.
//! - Keep SQLite details out of the identifier dispatch layer.
//!
//! # Invariants
//! - Repository APIs return semantic errors (`NotFound`, `Conflict`) in
//!   addition to DB transport errors.

pub mod object_repo;

//! Domain model for repository objects and their persistent identifiers.
//!
//! # Responsibility
//! - Define the object shape identifier providers read and mutate.
//! - Define scheme tags and identifier values shared by providers.
//!
//! # Invariants
//! - Every repository object is identified by a stable `ObjectId`.
//! - Identifier metadata lives on the object and is written by persistence.

pub mod identifier;
pub mod object;

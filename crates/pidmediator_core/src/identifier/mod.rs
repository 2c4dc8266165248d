//! Persistent identifier dispatch.
//!
//! # Responsibility
//! - Define the provider capability contract and its error taxonomy.
//! - Route identifier operations across an ordered provider sequence.
//! - Ship a sequence-based reference provider for hosts and tests.
//!
//! # Invariants
//! - The mediator itself mints, stores and resolves nothing.

pub mod config;
pub mod error;
pub mod mediator;
pub mod provider;
pub mod sequence;

//! Unit-of-work contract threaded through identifier operations.
//!
//! # Responsibility
//! - Give the mediator a way to persist a mutated object once per call.
//! - Give providers read access to the object store within the session.
//!
//! # Invariants
//! - The mediator never inspects a unit of work beyond `persist`/`flush`.
//! - One unit of work is used by one call at a time (`&mut`).

mod sqlite;

pub use sqlite::SqliteUnitOfWork;

use crate::model::object::{ObjectId, RepositoryObject};
use crate::repo::object_repo::RepoResult;

/// Session/transaction handle passed unchanged to every provider.
pub trait UnitOfWork {
    /// Records the object's current in-memory state for writing.
    fn persist(&mut self, object: &RepositoryObject) -> RepoResult<()>;

    /// Pushes recorded writes to the store without ending the session.
    fn flush(&mut self) -> RepoResult<()>;

    fn find_object(&self, id: ObjectId) -> RepoResult<Option<RepositoryObject>>;

    /// Returns the object owning an identifier value, as the store sees it.
    fn find_by_identifier(&self, value: &str) -> RepoResult<Option<RepositoryObject>>;
}

//! Identifier provider contract.
//!
//! # Responsibility
//! - Define the fixed capability set every identifier scheme implements.
//! - Define the non-owning back-reference providers use to re-enter the
//!   mediator.
//!
//! # Invariants
//! - `supports_*` predicates are pure.
//! - A provider must not re-enter a mediator operation that would dispatch
//!   back to itself.

use crate::identifier::error::IdentifierResult;
use crate::identifier::mediator::IdentifierMediator;
use crate::model::identifier::IdentifierType;
use crate::model::object::RepositoryObject;
use crate::unit_of_work::UnitOfWork;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, Weak};

/// Weak back-reference from a provider to the mediator that owns it.
#[derive(Clone)]
pub struct ParentHandle {
    mediator: Weak<IdentifierMediator>,
}

impl ParentHandle {
    pub(crate) fn new(mediator: Weak<IdentifierMediator>) -> Self {
        Self { mediator }
    }

    /// Returns the mediator, or `None` once it has been dropped.
    pub fn upgrade(&self) -> Option<Arc<IdentifierMediator>> {
        self.mediator.upgrade()
    }
}

impl Debug for ParentHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParentHandle")
            .field("alive", &(self.mediator.strong_count() > 0))
            .finish()
    }
}

/// One persistent identifier scheme.
///
/// Every operation receives the caller's unit of work unchanged. Writes may
/// mutate `object`; the mediator persists it afterwards.
pub trait IdentifierProvider: Send + Sync {
    /// Stable label used in logs and failure reports.
    fn provider_id(&self) -> &str;

    /// Receives the mediator back-reference at construction time.
    fn attach_parent(&self, _parent: ParentHandle) {}

    /// Whether this provider handles the given identifier value.
    fn supports_value(&self, identifier: &str) -> bool;

    /// Whether this provider handles identifiers of the given scheme.
    fn supports_type(&self, kind: &IdentifierType) -> bool;

    /// Allocates a new identifier for `object`.
    fn mint(&self, ctx: &mut dyn UnitOfWork, object: &mut RepositoryObject)
        -> IdentifierResult<()>;

    /// Reserves a caller-chosen identifier for `object`.
    fn reserve(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> IdentifierResult<()>;

    /// Registers (mints if needed, then publishes) this scheme's identifier.
    fn register(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<()>;

    /// Registers a caller-chosen identifier for `object`.
    fn register_identifier(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> IdentifierResult<()>;

    fn lookup(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &RepositoryObject,
        kind: &IdentifierType,
    ) -> IdentifierResult<Option<String>>;

    fn resolve(
        &self,
        ctx: &mut dyn UnitOfWork,
        identifier: &str,
    ) -> IdentifierResult<Option<RepositoryObject>>;

    /// Removes every identifier this provider manages for `object`.
    fn delete(&self, ctx: &mut dyn UnitOfWork, object: &mut RepositoryObject)
        -> IdentifierResult<()>;

    fn delete_identifier(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> IdentifierResult<()>;
}

//! Persistent identifier mediation core.
//!
//! Routes reserve/register/lookup/resolve/delete requests for repository
//! objects across an ordered list of identifier providers, one per scheme.

pub mod db;
pub mod identifier;
pub mod logging;
pub mod model;
pub mod repo;
pub mod unit_of_work;

pub use identifier::config::MediatorConfig;
pub use identifier::error::{IdentifierError, IdentifierResult};
pub use identifier::mediator::{IdentifierMediator, Operation, Outcome, ProviderFailure};
pub use identifier::provider::{IdentifierProvider, ParentHandle};
pub use identifier::sequence::{ProviderConfigError, SequenceProvider, SequenceProviderConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::identifier::{
    normalize_identifier, IdentifierStatus, IdentifierType, ObjectIdentifier,
};
pub use model::object::{ObjectId, ObjectKind, RepositoryObject};
pub use repo::object_repo::{ObjectRepository, RepoError, RepoResult, SqliteObjectRepository};
pub use unit_of_work::{SqliteUnitOfWork, UnitOfWork};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

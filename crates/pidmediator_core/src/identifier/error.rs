//! Identifier operation errors.

use crate::repo::object_repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type IdentifierResult<T> = Result<T, IdentifierError>;

/// Failure raised by an identifier provider or by the mediator's persist.
#[derive(Debug)]
pub enum IdentifierError {
    /// Caller lacks rights to mutate the object or register the identifier.
    Unauthorized(String),
    /// Scheme-specific failure, e.g. an exhausted registry quota.
    Scheme(String),
    /// No object carries the identifier.
    NotFound(String),
    /// The identifier is known but cannot currently be resolved.
    NotResolvable(String),
    /// Object store failure.
    Store(RepoError),
}

impl IdentifierError {
    /// Short machine-readable code used in log events.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::Scheme(_) => "scheme",
            Self::NotFound(_) => "not_found",
            Self::NotResolvable(_) => "not_resolvable",
            Self::Store(_) => "store",
        }
    }
}

impl Display for IdentifierError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unauthorized(message) => write!(f, "not authorized: {message}"),
            Self::Scheme(message) => write!(f, "identifier error: {message}"),
            Self::NotFound(value) => write!(f, "identifier not found: {value}"),
            Self::NotResolvable(value) => write!(f, "identifier not resolvable: {value}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IdentifierError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for IdentifierError {
    fn from(value: RepoError) -> Self {
        Self::Store(value)
    }
}

//! Sequence-based reference identifier provider.
//!
//! # Responsibility
//! - Mint `prefix/<n>` identifiers for one scheme, skipping values the store
//!   already knows.
//! - Optionally depend on another scheme being assigned first, checked
//!   through the mediator back-reference.
//!
//! # Invariants
//! - An object holds at most one minted identifier per provider scheme.
//! - Values are stored normalized (no `doi:`/`hdl:` resolver prefix).

use crate::identifier::error::{IdentifierError, IdentifierResult};
use crate::identifier::provider::{IdentifierProvider, ParentHandle};
use crate::model::identifier::{normalize_identifier, IdentifierType, ObjectIdentifier};
use crate::model::object::RepositoryObject;
use crate::unit_of_work::UnitOfWork;
use log::debug;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};

const MAX_MINT_ATTEMPTS: u32 = 1000;

/// Settings for one `SequenceProvider`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceProviderConfig {
    /// Provider label: lowercase ascii, digits, `_` or `-`.
    pub id: String,
    pub scheme: IdentifierType,
    /// Naming authority, e.g. `123456789` for handles or `10.5072` for DOIs.
    pub prefix: String,
    /// Scheme that must already be assigned before this one can mint.
    #[serde(default)]
    pub requires: Option<IdentifierType>,
    /// First suffix to try when minting.
    #[serde(default = "default_first_suffix")]
    pub first_suffix: u64,
}

fn default_first_suffix() -> u64 {
    1
}

/// Invalid provider settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderConfigError {
    InvalidProviderId(String),
    EmptyPrefix(String),
    SelfDependency(String),
    /// Values minted under the prefix would be detected as another scheme.
    PrefixSchemeMismatch {
        id: String,
        prefix: String,
        scheme: IdentifierType,
    },
}

impl Display for ProviderConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidProviderId(value) => write!(f, "provider id is invalid: {value}"),
            Self::EmptyPrefix(id) => write!(f, "provider `{id}` has an empty prefix"),
            Self::SelfDependency(id) => write!(f, "provider `{id}` requires its own scheme"),
            Self::PrefixSchemeMismatch { id, prefix, scheme } => write!(
                f,
                "provider `{id}` prefix `{prefix}` does not yield {scheme} identifiers"
            ),
        }
    }
}

impl Error for ProviderConfigError {}

/// Provider minting sequential identifiers under one prefix.
#[derive(Debug)]
pub struct SequenceProvider {
    config: SequenceProviderConfig,
    id: String,
    prefix: String,
    next_suffix: AtomicU64,
    parent: OnceCell<ParentHandle>,
}

impl SequenceProvider {
    pub fn new(config: SequenceProviderConfig) -> Result<Self, ProviderConfigError> {
        let id = config.id.trim().to_string();
        if !is_valid_provider_id(&id) {
            return Err(ProviderConfigError::InvalidProviderId(id));
        }
        let prefix = normalize_identifier(&config.prefix)
            .trim_end_matches('/')
            .to_string();
        if prefix.is_empty() {
            return Err(ProviderConfigError::EmptyPrefix(id));
        }
        if config.requires.as_ref() == Some(&config.scheme) {
            return Err(ProviderConfigError::SelfDependency(id));
        }
        // Minted values must route back here by shape alone.
        if !matches!(config.scheme, IdentifierType::Other(_))
            && IdentifierType::detect(&format!("{prefix}/1")).as_ref() != Some(&config.scheme)
        {
            return Err(ProviderConfigError::PrefixSchemeMismatch {
                id,
                prefix,
                scheme: config.scheme.clone(),
            });
        }

        Ok(Self {
            id,
            next_suffix: AtomicU64::new(config.first_suffix),
            prefix,
            parent: OnceCell::new(),
            config,
        })
    }

    pub fn scheme(&self) -> &IdentifierType {
        &self.config.scheme
    }

    fn owns(&self, normalized: &str) -> bool {
        normalized
            .strip_prefix(self.prefix.as_str())
            .is_some_and(|rest| rest.starts_with('/') && rest.len() > 1)
    }

    fn check_dependency(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &RepositoryObject,
    ) -> IdentifierResult<()> {
        let Some(required) = self.config.requires.as_ref() else {
            return Ok(());
        };
        let mediator = self
            .parent
            .get()
            .and_then(ParentHandle::upgrade)
            .ok_or_else(|| {
                IdentifierError::Scheme(format!(
                    "provider `{}` is not attached to a mediator",
                    self.id
                ))
            })?;

        match mediator.lookup(ctx, object, required).into_value() {
            Some(_) => Ok(()),
            None => Err(IdentifierError::Scheme(format!(
                "{} identifier requires a {required} identifier first",
                self.config.scheme
            ))),
        }
    }

    fn mint_value(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<String> {
        if let Some(existing) = object.identifier_of(&self.config.scheme) {
            return Ok(existing.value.clone());
        }
        self.check_dependency(ctx, object)?;

        for _ in 0..MAX_MINT_ATTEMPTS {
            let suffix = self.next_suffix.fetch_add(1, Ordering::Relaxed);
            let value = format!("{}/{suffix}", self.prefix);
            if object.has_identifier(&value) || ctx.find_by_identifier(&value)?.is_some() {
                continue;
            }
            object.attach_identifier(ObjectIdentifier::reserved(
                self.config.scheme.clone(),
                value.clone(),
            ));
            debug!(
                "event=identifier_mint module=identifier provider={} status=ok object_id={} value={value}",
                self.id, object.id
            );
            return Ok(value);
        }

        Err(IdentifierError::Scheme(format!(
            "no free {} suffix under `{}` after {MAX_MINT_ATTEMPTS} attempts",
            self.config.scheme, self.prefix
        )))
    }

    fn claim(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &RepositoryObject,
        normalized: &str,
    ) -> IdentifierResult<()> {
        match ctx.find_by_identifier(normalized)? {
            Some(owner) if owner.id != object.id => Err(IdentifierError::Scheme(format!(
                "{normalized} is already assigned to object {}",
                owner.id
            ))),
            _ => Ok(()),
        }
    }
}

impl IdentifierProvider for SequenceProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    fn attach_parent(&self, parent: ParentHandle) {
        // First mediator wins; a provider shared by two mediators keeps its
        // original parent.
        let _ = self.parent.set(parent);
    }

    fn supports_value(&self, identifier: &str) -> bool {
        let scheme_matches = match &self.config.scheme {
            IdentifierType::Other(_) => true,
            scheme => IdentifierType::detect(identifier).as_ref() == Some(scheme),
        };
        scheme_matches && self.owns(&normalize_identifier(identifier))
    }

    fn supports_type(&self, kind: &IdentifierType) -> bool {
        kind == &self.config.scheme
    }

    fn mint(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<()> {
        self.mint_value(ctx, object).map(|_| ())
    }

    fn reserve(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> IdentifierResult<()> {
        let normalized = normalize_identifier(identifier);
        self.claim(ctx, object, &normalized)?;
        object.attach_identifier(ObjectIdentifier::reserved(
            self.config.scheme.clone(),
            normalized,
        ));
        Ok(())
    }

    fn register(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<()> {
        let value = self.mint_value(ctx, object)?;
        object.attach_identifier(ObjectIdentifier::registered(
            self.config.scheme.clone(),
            value,
        ));
        Ok(())
    }

    fn register_identifier(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> IdentifierResult<()> {
        // Foreign identifiers reach every provider; ignore them here.
        if !self.supports_value(identifier) {
            return Ok(());
        }
        let normalized = normalize_identifier(identifier);
        self.claim(ctx, object, &normalized)?;
        object.attach_identifier(ObjectIdentifier::registered(
            self.config.scheme.clone(),
            normalized,
        ));
        Ok(())
    }

    fn lookup(
        &self,
        _ctx: &mut dyn UnitOfWork,
        object: &RepositoryObject,
        kind: &IdentifierType,
    ) -> IdentifierResult<Option<String>> {
        if kind != &self.config.scheme {
            return Ok(None);
        }
        Ok(object
            .identifier_of(kind)
            .map(|identifier| identifier.value.clone()))
    }

    fn resolve(
        &self,
        ctx: &mut dyn UnitOfWork,
        identifier: &str,
    ) -> IdentifierResult<Option<RepositoryObject>> {
        let normalized = normalize_identifier(identifier);
        match ctx.find_by_identifier(&normalized)? {
            Some(object) => Ok(Some(object)),
            None => Err(IdentifierError::NotFound(normalized)),
        }
    }

    fn delete(
        &self,
        _ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<()> {
        object.remove_identifiers_of(&self.config.scheme);
        Ok(())
    }

    fn delete_identifier(
        &self,
        _ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> IdentifierResult<()> {
        let normalized = normalize_identifier(identifier);
        if object.remove_identifier(&normalized) {
            Ok(())
        } else {
            Err(IdentifierError::NotFound(normalized))
        }
    }
}

fn is_valid_provider_id(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

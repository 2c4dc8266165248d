//! Identifier mediator: routes identifier operations to providers.
//!
//! # Responsibility
//! - Hold the ordered provider sequence and hand each provider a weak
//!   back-reference at construction.
//! - Apply one of three dispatch policies per operation:
//!   fail-fast broadcast (`reserve`, `register`), first-match-wins
//!   (`lookup`, `resolve`) and fail-isolated broadcast (`delete`).
//!
//! # Invariants
//! - Providers are visited strictly in construction order; never reordered
//!   or deduplicated.
//! - A successful write persists the object exactly once, after the last
//!   provider call. A failed write never persists.
//! - Fail-isolated operations never return provider errors; they log them
//!   and report them in `Outcome::failures`.
//! - `register_identifier` does not apply the `supports_value` filter.

use crate::identifier::config::MediatorConfig;
use crate::identifier::error::{IdentifierError, IdentifierResult};
use crate::identifier::provider::{IdentifierProvider, ParentHandle};
use crate::model::identifier::IdentifierType;
use crate::model::object::RepositoryObject;
use crate::unit_of_work::UnitOfWork;
use log::{debug, error, info, warn};
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Provider operation kind, used in logs and failure reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Mint,
    Reserve,
    Register,
    Lookup,
    Resolve,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mint => "mint",
            Self::Reserve => "reserve",
            Self::Register => "register",
            Self::Lookup => "lookup",
            Self::Resolve => "resolve",
            Self::Delete => "delete",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provider error swallowed by a fail-isolated operation.
#[derive(Debug)]
pub struct ProviderFailure {
    pub provider_id: String,
    pub operation: Operation,
    pub error: IdentifierError,
}

/// Result of a fail-isolated operation plus the failures it absorbed.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    /// In the order the failures happened.
    pub failures: Vec<ProviderFailure>,
}

impl<T> Outcome<T> {
    pub fn into_value(self) -> T {
        self.value
    }

    /// True when no provider failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed_providers(&self) -> Vec<&str> {
        self.failures
            .iter()
            .map(|failure| failure.provider_id.as_str())
            .collect()
    }
}

enum WriteCall<'a> {
    Mint,
    Reserve(&'a str),
    Register,
    RegisterIdentifier(&'a str),
}

impl WriteCall<'_> {
    fn operation(&self) -> Operation {
        match self {
            Self::Mint => Operation::Mint,
            Self::Reserve(_) => Operation::Reserve,
            Self::Register | Self::RegisterIdentifier(_) => Operation::Register,
        }
    }

    fn selects(&self, provider: &dyn IdentifierProvider) -> bool {
        match self {
            Self::Reserve(identifier) => provider.supports_value(identifier),
            // Unfiltered: every provider sees register_identifier.
            Self::Mint | Self::Register | Self::RegisterIdentifier(_) => true,
        }
    }

    fn invoke(
        &self,
        provider: &dyn IdentifierProvider,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<()> {
        match self {
            Self::Mint => provider.mint(ctx, object),
            Self::Reserve(identifier) => provider.reserve(ctx, object, identifier),
            Self::Register => provider.register(ctx, object),
            Self::RegisterIdentifier(identifier) => {
                provider.register_identifier(ctx, object, identifier)
            }
        }
    }
}

/// Dispatcher over an ordered sequence of identifier providers.
pub struct IdentifierMediator {
    providers: Vec<Arc<dyn IdentifierProvider>>,
    config: MediatorConfig,
}

impl IdentifierMediator {
    /// Builds a mediator with default configuration.
    pub fn new(providers: Vec<Arc<dyn IdentifierProvider>>) -> Arc<Self> {
        Self::with_config(providers, MediatorConfig::default())
    }

    /// Builds a mediator and attaches it as parent of every provider.
    pub fn with_config(
        providers: Vec<Arc<dyn IdentifierProvider>>,
        config: MediatorConfig,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak| {
            for provider in &providers {
                provider.attach_parent(ParentHandle::new(weak.clone()));
            }
            info!(
                "event=mediator_init module=identifier status=ok providers={} flush_between_providers={}",
                providers.len(),
                config.flush_between_providers
            );
            Self { providers, config }
        })
    }

    /// Provider ids in dispatch order.
    pub fn provider_ids(&self) -> Vec<&str> {
        self.providers
            .iter()
            .map(|provider| provider.provider_id())
            .collect()
    }

    pub fn config(&self) -> &MediatorConfig {
        &self.config
    }

    /// Mints an identifier with every provider, then persists `object`.
    pub fn reserve(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<()> {
        self.broadcast_write(WriteCall::Mint, ctx, object)
    }

    /// Reserves `identifier` with every provider supporting it, then persists.
    pub fn reserve_identifier(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> IdentifierResult<()> {
        self.broadcast_write(WriteCall::Reserve(identifier), ctx, object)
    }

    /// Registers with every provider, then persists `object`.
    pub fn register(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<()> {
        self.broadcast_write(WriteCall::Register, ctx, object)
    }

    /// Registers `identifier` with every provider, supporting or not, then
    /// persists `object`.
    pub fn register_identifier(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> IdentifierResult<()> {
        self.broadcast_write(WriteCall::RegisterIdentifier(identifier), ctx, object)
    }

    /// Returns the first identifier of `kind` any supporting provider knows.
    pub fn lookup(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &RepositoryObject,
        kind: &IdentifierType,
    ) -> Outcome<Option<String>> {
        let mut failures = Vec::new();
        for provider in self.providers.iter().filter(|p| p.supports_type(kind)) {
            match provider.lookup(ctx, object, kind) {
                Ok(Some(value)) => {
                    return Outcome {
                        value: Some(value),
                        failures,
                    }
                }
                Ok(None) => {}
                Err(err) => failures.push(isolate(Operation::Lookup, provider.as_ref(), err)),
            }
        }
        Outcome {
            value: None,
            failures,
        }
    }

    /// Returns the object the first supporting provider resolves
    /// `identifier` to.
    pub fn resolve(
        &self,
        ctx: &mut dyn UnitOfWork,
        identifier: &str,
    ) -> Outcome<Option<RepositoryObject>> {
        let mut failures = Vec::new();
        for provider in self
            .providers
            .iter()
            .filter(|p| p.supports_value(identifier))
        {
            match provider.resolve(ctx, identifier) {
                Ok(Some(object)) => {
                    return Outcome {
                        value: Some(object),
                        failures,
                    }
                }
                Ok(None) => {}
                Err(err) => failures.push(isolate(Operation::Resolve, provider.as_ref(), err)),
            }
        }
        Outcome {
            value: None,
            failures,
        }
    }

    /// Asks every provider to drop its identifiers for `object`.
    ///
    /// Best effort: failures are isolated and `object` is not persisted.
    pub fn delete(&self, ctx: &mut dyn UnitOfWork, object: &mut RepositoryObject) -> Outcome<()> {
        let mut failures = Vec::new();
        for provider in &self.providers {
            if let Err(err) = provider.delete(ctx, object) {
                failures.push(isolate(Operation::Delete, provider.as_ref(), err));
            }
        }
        Outcome {
            value: (),
            failures,
        }
    }

    /// Asks every provider supporting `identifier` to drop it from `object`.
    pub fn delete_identifier(
        &self,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
        identifier: &str,
    ) -> Outcome<()> {
        let mut failures = Vec::new();
        for provider in self
            .providers
            .iter()
            .filter(|p| p.supports_value(identifier))
        {
            if let Err(err) = provider.delete_identifier(ctx, object, identifier) {
                failures.push(isolate(Operation::Delete, provider.as_ref(), err));
            }
        }
        Outcome {
            value: (),
            failures,
        }
    }

    fn broadcast_write(
        &self,
        call: WriteCall<'_>,
        ctx: &mut dyn UnitOfWork,
        object: &mut RepositoryObject,
    ) -> IdentifierResult<()> {
        let operation = call.operation();
        let mut invoked = 0usize;

        for provider in &self.providers {
            if !call.selects(provider.as_ref()) {
                continue;
            }
            if invoked > 0 && self.config.flush_between_providers {
                if let Err(err) = ctx.flush() {
                    let err = IdentifierError::from(err);
                    log_abort(operation, provider.provider_id(), object, &err);
                    return Err(err);
                }
            }
            if let Err(err) = call.invoke(provider.as_ref(), ctx, object) {
                log_abort(operation, provider.provider_id(), object, &err);
                return Err(err);
            }
            invoked += 1;
        }

        ctx.persist(object)?;
        debug!(
            "event=identifier_dispatch module=identifier op={operation} status=ok object_id={} providers_invoked={invoked}",
            object.id
        );
        Ok(())
    }
}

fn isolate(
    operation: Operation,
    provider: &dyn IdentifierProvider,
    err: IdentifierError,
) -> ProviderFailure {
    error!(
        "event=identifier_dispatch module=identifier op={operation} provider={} status=isolated error_code={} error={err}",
        provider.provider_id(),
        err.code()
    );
    ProviderFailure {
        provider_id: provider.provider_id().to_string(),
        operation,
        error: err,
    }
}

fn log_abort(
    operation: Operation,
    provider_id: &str,
    object: &RepositoryObject,
    err: &IdentifierError,
) {
    warn!(
        "event=identifier_dispatch module=identifier op={operation} provider={provider_id} status=aborted object_id={} error_code={} error={err}",
        object.id,
        err.code()
    );
}

use pidmediator_core::db::open_db_in_memory;
use pidmediator_core::{
    IdentifierError, IdentifierMediator, IdentifierProvider, IdentifierResult, IdentifierStatus,
    IdentifierType, MediatorConfig, ObjectIdentifier, ObjectKind, RepositoryObject,
    SequenceProvider, SequenceProviderConfig, SqliteUnitOfWork, UnitOfWork,
};
use std::sync::Arc;

fn handle_provider() -> Arc<dyn IdentifierProvider> {
    Arc::new(
        SequenceProvider::new(SequenceProviderConfig {
            id: "handle".to_string(),
            scheme: IdentifierType::Handle,
            prefix: "123456789".to_string(),
            requires: None,
            first_suffix: 1,
        })
        .unwrap(),
    )
}

fn doi_provider() -> Arc<dyn IdentifierProvider> {
    Arc::new(
        SequenceProvider::new(SequenceProviderConfig {
            id: "doi".to_string(),
            scheme: IdentifierType::Doi,
            prefix: "10.5072".to_string(),
            requires: Some(IdentifierType::Handle),
            first_suffix: 100,
        })
        .unwrap(),
    )
}

#[test]
fn register_assigns_dependent_schemes_and_resolves_after_commit() {
    let conn = open_db_in_memory().unwrap();
    let mediator = IdentifierMediator::new(vec![handle_provider(), doi_provider()]);
    let mut object = RepositoryObject::new(ObjectKind::Item, "survey data");

    let mut uow = SqliteUnitOfWork::new(&conn);
    mediator.register(&mut uow, &mut object).unwrap();
    assert_eq!(uow.pending_len(), 1);
    uow.commit().unwrap();

    assert_eq!(
        object.identifiers,
        vec![
            ObjectIdentifier::registered(IdentifierType::Handle, "123456789/1"),
            ObjectIdentifier::registered(IdentifierType::Doi, "10.5072/100"),
        ]
    );

    let mut reader = SqliteUnitOfWork::new(&conn);
    let by_doi = mediator.resolve(&mut reader, "doi:10.5072/100");
    assert!(by_doi.is_clean());
    assert_eq!(by_doi.value.as_ref().map(|found| found.id), Some(object.id));

    let by_handle = mediator
        .resolve(&mut reader, "hdl:123456789/1")
        .into_value()
        .unwrap();
    assert_eq!(by_handle, object);

    let doi = mediator
        .lookup(&mut reader, &object, &IdentifierType::Doi)
        .into_value();
    assert_eq!(doi.as_deref(), Some("10.5072/100"));
}

#[test]
fn dependent_scheme_ordered_first_aborts_without_persisting() {
    let conn = open_db_in_memory().unwrap();
    let mediator = IdentifierMediator::new(vec![doi_provider(), handle_provider()]);
    let mut object = RepositoryObject::new(ObjectKind::Item, "out of order");

    let mut uow = SqliteUnitOfWork::new(&conn);
    let err = mediator.reserve(&mut uow, &mut object).unwrap_err();

    assert!(matches!(err, IdentifierError::Scheme(ref message) if message.contains("handle")));
    assert!(object.identifiers.is_empty());
    assert_eq!(uow.pending_len(), 0);
}

#[test]
fn reserve_skips_values_already_in_the_store() {
    let conn = open_db_in_memory().unwrap();
    let mediator = IdentifierMediator::new(vec![handle_provider()]);

    let mut squatter = RepositoryObject::new(ObjectKind::Item, "imported");
    squatter.attach_identifier(ObjectIdentifier::registered(
        IdentifierType::Handle,
        "123456789/1",
    ));
    let mut uow = SqliteUnitOfWork::new(&conn);
    uow.persist(&squatter).unwrap();
    uow.flush().unwrap();

    let mut fresh = RepositoryObject::new(ObjectKind::Item, "fresh");
    mediator.reserve(&mut uow, &mut fresh).unwrap();
    uow.commit().unwrap();

    assert_eq!(
        fresh.identifiers,
        vec![ObjectIdentifier::reserved(
            IdentifierType::Handle,
            "123456789/2"
        )]
    );
}

#[test]
fn reserve_identifier_held_by_another_object_fails_fast() {
    let conn = open_db_in_memory().unwrap();
    let mediator = IdentifierMediator::new(vec![handle_provider(), doi_provider()]);

    let mut first = RepositoryObject::new(ObjectKind::Item, "first");
    let mut uow = SqliteUnitOfWork::new(&conn);
    mediator
        .reserve_identifier(&mut uow, &mut first, "hdl:123456789/77")
        .unwrap();
    uow.flush().unwrap();

    let mut second = RepositoryObject::new(ObjectKind::Item, "second");
    let err = mediator
        .reserve_identifier(&mut uow, &mut second, "123456789/77")
        .unwrap_err();

    assert!(matches!(err, IdentifierError::Scheme(_)));
    assert!(second.identifiers.is_empty());
}

#[test]
fn register_identifier_is_ignored_by_foreign_schemes() {
    let conn = open_db_in_memory().unwrap();
    let mediator = IdentifierMediator::new(vec![handle_provider(), doi_provider()]);
    let mut object = RepositoryObject::new(ObjectKind::Collection, "theses");

    let mut uow = SqliteUnitOfWork::new(&conn);
    mediator
        .register_identifier(&mut uow, &mut object, "doi:10.5072/abc")
        .unwrap();
    mediator
        .register_identifier(&mut uow, &mut object, "doi:10.5072/abc")
        .unwrap();

    assert_eq!(
        object.identifiers,
        vec![ObjectIdentifier::registered(
            IdentifierType::Doi,
            "10.5072/abc"
        )]
    );
}

#[test]
fn delete_clears_identifiers_and_resolve_then_reports_not_found() {
    let conn = open_db_in_memory().unwrap();
    let mediator = IdentifierMediator::new(vec![handle_provider(), doi_provider()]);
    let mut object = RepositoryObject::new(ObjectKind::Item, "withdrawn");

    let mut uow = SqliteUnitOfWork::new(&conn);
    mediator.register(&mut uow, &mut object).unwrap();
    uow.commit().unwrap();

    let mut uow = SqliteUnitOfWork::new(&conn);
    let outcome = mediator.delete(&mut uow, &mut object);
    assert!(outcome.is_clean());
    assert!(object.identifiers.is_empty());
    assert_eq!(uow.pending_len(), 0);

    uow.persist(&object).unwrap();
    uow.commit().unwrap();

    let mut reader = SqliteUnitOfWork::new(&conn);
    let resolved = mediator.resolve(&mut reader, "hdl:123456789/1");
    assert!(resolved.value.is_none());
    assert_eq!(resolved.failed_providers(), vec!["handle"]);
    assert!(matches!(
        resolved.failures[0].error,
        IdentifierError::NotFound(ref value) if value == "123456789/1"
    ));
}

#[test]
fn delete_identifier_reports_missing_values_without_failing() {
    let conn = open_db_in_memory().unwrap();
    let mediator = IdentifierMediator::new(vec![handle_provider(), doi_provider()]);
    let mut object = RepositoryObject::new(ObjectKind::Item, "partial");
    object.attach_identifier(ObjectIdentifier::reserved(
        IdentifierType::Handle,
        "123456789/9",
    ));

    let mut uow = SqliteUnitOfWork::new(&conn);
    let removed = mediator.delete_identifier(&mut uow, &mut object, "hdl:123456789/9");
    assert!(removed.is_clean());
    assert!(object.identifiers.is_empty());

    let missing = mediator.delete_identifier(&mut uow, &mut object, "doi:10.5072/9");
    assert_eq!(missing.failed_providers(), vec!["doi"]);
}

/// Writes a marker identifier through the unit of work, standing in for a
/// provider that keeps its own registry table.
struct TableWriter;

impl IdentifierProvider for TableWriter {
    fn provider_id(&self) -> &str {
        "table_writer"
    }

    fn supports_value(&self, _identifier: &str) -> bool {
        false
    }

    fn supports_type(&self, _kind: &IdentifierType) -> bool {
        false
    }

    fn mint(&self, ctx: &mut dyn UnitOfWork, object: &mut RepositoryObject) -> IdentifierResult<()> {
        object.attach_identifier(ObjectIdentifier::reserved(
            IdentifierType::Other("local".to_string()),
            format!("local/{}", object.id),
        ));
        ctx.persist(object)?;
        Ok(())
    }

    fn reserve(
        &self,
        _: &mut dyn UnitOfWork,
        _: &mut RepositoryObject,
        _: &str,
    ) -> IdentifierResult<()> {
        Ok(())
    }

    fn register(&self, _: &mut dyn UnitOfWork, _: &mut RepositoryObject) -> IdentifierResult<()> {
        Ok(())
    }

    fn register_identifier(
        &self,
        _: &mut dyn UnitOfWork,
        _: &mut RepositoryObject,
        _: &str,
    ) -> IdentifierResult<()> {
        Ok(())
    }

    fn lookup(
        &self,
        _: &mut dyn UnitOfWork,
        _: &RepositoryObject,
        _: &IdentifierType,
    ) -> IdentifierResult<Option<String>> {
        Ok(None)
    }

    fn resolve(
        &self,
        _: &mut dyn UnitOfWork,
        _: &str,
    ) -> IdentifierResult<Option<RepositoryObject>> {
        Ok(None)
    }

    fn delete(&self, _: &mut dyn UnitOfWork, _: &mut RepositoryObject) -> IdentifierResult<()> {
        Ok(())
    }

    fn delete_identifier(
        &self,
        _: &mut dyn UnitOfWork,
        _: &mut RepositoryObject,
        _: &str,
    ) -> IdentifierResult<()> {
        Ok(())
    }
}

/// Requires the marker written by `TableWriter` to be readable from the store.
struct TableReader;

impl IdentifierProvider for TableReader {
    fn provider_id(&self) -> &str {
        "table_reader"
    }

    fn supports_value(&self, _identifier: &str) -> bool {
        false
    }

    fn supports_type(&self, _kind: &IdentifierType) -> bool {
        false
    }

    fn mint(&self, ctx: &mut dyn UnitOfWork, object: &mut RepositoryObject) -> IdentifierResult<()> {
        let marker = format!("local/{}", object.id);
        match ctx.find_by_identifier(&marker)? {
            Some(_) => Ok(()),
            None => Err(IdentifierError::NotFound(marker)),
        }
    }

    fn reserve(
        &self,
        _: &mut dyn UnitOfWork,
        _: &mut RepositoryObject,
        _: &str,
    ) -> IdentifierResult<()> {
        Ok(())
    }

    fn register(&self, _: &mut dyn UnitOfWork, _: &mut RepositoryObject) -> IdentifierResult<()> {
        Ok(())
    }

    fn register_identifier(
        &self,
        _: &mut dyn UnitOfWork,
        _: &mut RepositoryObject,
        _: &str,
    ) -> IdentifierResult<()> {
        Ok(())
    }

    fn lookup(
        &self,
        _: &mut dyn UnitOfWork,
        _: &RepositoryObject,
        _: &IdentifierType,
    ) -> IdentifierResult<Option<String>> {
        Ok(None)
    }

    fn resolve(
        &self,
        _: &mut dyn UnitOfWork,
        _: &str,
    ) -> IdentifierResult<Option<RepositoryObject>> {
        Ok(None)
    }

    fn delete(&self, _: &mut dyn UnitOfWork, _: &mut RepositoryObject) -> IdentifierResult<()> {
        Ok(())
    }

    fn delete_identifier(
        &self,
        _: &mut dyn UnitOfWork,
        _: &mut RepositoryObject,
        _: &str,
    ) -> IdentifierResult<()> {
        Ok(())
    }
}

#[test]
fn later_provider_sees_earlier_writes_only_when_flushing() {
    let conn = open_db_in_memory().unwrap();
    let providers: Vec<Arc<dyn IdentifierProvider>> = vec![Arc::new(TableWriter), Arc::new(TableReader)];

    let buffered = IdentifierMediator::new(providers.clone());
    let mut object = RepositoryObject::new(ObjectKind::Item, "buffered");
    let mut uow = SqliteUnitOfWork::new(&conn);
    let err = buffered.reserve(&mut uow, &mut object).unwrap_err();
    assert!(matches!(err, IdentifierError::NotFound(_)));
    drop(uow);

    let flushing = IdentifierMediator::with_config(providers, MediatorConfig::flushing());
    let mut object = RepositoryObject::new(ObjectKind::Item, "flushed");
    let mut uow = SqliteUnitOfWork::new(&conn);
    flushing.reserve(&mut uow, &mut object).unwrap();
    assert_eq!(uow.flush_count(), 1);
    uow.commit().unwrap();

    let stored = SqliteUnitOfWork::new(&conn)
        .find_object(object.id)
        .unwrap()
        .unwrap();
    assert_eq!(stored.identifiers[0].status, IdentifierStatus::Reserved);
}

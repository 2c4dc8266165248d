//! Repository object store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist repository objects together with their attached identifiers.
//! - Answer identifier-to-object queries used by `resolve`.
//!
//! # Invariants
//! - `save_object` replaces the stored identifier list as a whole.
//! - An identifier value belongs to at most one object.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::identifier::{IdentifierStatus, IdentifierType, ObjectIdentifier};
use crate::model::object::{ObjectId, ObjectKind, RepositoryObject};
use rusqlite::{params, Connection, OptionalExtension};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type RepoResult<T> = Result<T, RepoError>;

/// Object store error.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound(ObjectId),
    /// Identifier value already attached to another object.
    Conflict(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "object not found: {id}"),
            Self::Conflict(value) => {
                write!(f, "identifier already attached to another object: {value}")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted object data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Object store operations.
pub trait ObjectRepository {
    /// Inserts or updates the object and replaces its identifiers.
    fn save_object(&self, object: &RepositoryObject) -> RepoResult<()>;
    fn get_object(&self, id: ObjectId) -> RepoResult<Option<RepositoryObject>>;
    /// Returns the object owning `value`, if any.
    fn find_by_identifier(&self, value: &str) -> RepoResult<Option<RepositoryObject>>;
    fn delete_object(&self, id: ObjectId) -> RepoResult<()>;
}

/// SQLite-backed object store.
pub struct SqliteObjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteObjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn write_object(&self, object: &RepositoryObject) -> RepoResult<()> {
        let id_text = object.id.to_string();
        for identifier in &object.identifiers {
            check_storable_scheme(&identifier.kind)?;
            let owner: Option<String> = self
                .conn
                .query_row(
                    "SELECT object_uuid FROM object_identifiers WHERE value = ?1;",
                    [identifier.value.as_str()],
                    |row| row.get(0),
                )
                .optional()?;
            if owner.is_some_and(|owner| owner != id_text) {
                return Err(RepoError::Conflict(identifier.value.clone()));
            }
        }

        self.conn.execute(
            "INSERT INTO objects (uuid, kind, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(uuid) DO UPDATE SET
                kind = excluded.kind,
                name = excluded.name,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![id_text, object.kind.as_str(), object.name.as_str()],
        )?;
        self.conn.execute(
            "DELETE FROM object_identifiers WHERE object_uuid = ?1;",
            [id_text.as_str()],
        )?;

        let mut insert = self.conn.prepare(
            "INSERT INTO object_identifiers (object_uuid, position, scheme, value, status)
             VALUES (?1, ?2, ?3, ?4, ?5);",
        )?;
        for (position, identifier) in object.identifiers.iter().enumerate() {
            insert.execute(params![
                id_text,
                position as i64,
                identifier.kind.as_str(),
                identifier.value.as_str(),
                identifier.status.as_str(),
            ])?;
        }
        Ok(())
    }

    fn load_identifiers(&self, id_text: &str) -> RepoResult<Vec<ObjectIdentifier>> {
        let mut stmt = self.conn.prepare(
            "SELECT scheme, value, status
             FROM object_identifiers
             WHERE object_uuid = ?1
             ORDER BY position ASC;",
        )?;
        let mut rows = stmt.query([id_text])?;
        let mut identifiers = Vec::new();

        while let Some(row) = rows.next()? {
            let scheme: String = row.get("scheme")?;
            let kind = IdentifierType::parse(&scheme).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "blank scheme in object_identifiers.scheme for `{id_text}`"
                ))
            })?;
            let status_text: String = row.get("status")?;
            let status = IdentifierStatus::parse(&status_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid identifier status `{status_text}` in object_identifiers.status"
                ))
            })?;
            identifiers.push(ObjectIdentifier {
                kind,
                value: row.get("value")?,
                status,
            });
        }

        Ok(identifiers)
    }
}

/// Rejects scheme names that would read back as a different scheme.
fn check_storable_scheme(kind: &IdentifierType) -> RepoResult<()> {
    let IdentifierType::Other(name) = kind else {
        return Ok(());
    };
    if IdentifierType::parse(name).as_ref() == Some(kind) {
        return Ok(());
    }
    Err(RepoError::InvalidData(format!(
        "custom identifier scheme `{name}` is blank, padded or shadows a built-in scheme"
    )))
}

impl ObjectRepository for SqliteObjectRepository<'_> {
    fn save_object(&self, object: &RepositoryObject) -> RepoResult<()> {
        // Savepoints nest inside an outer transaction opened by a unit of work.
        self.conn.execute_batch("SAVEPOINT save_object;")?;
        match self.write_object(object) {
            Ok(()) => {
                self.conn.execute_batch("RELEASE save_object;")?;
                Ok(())
            }
            Err(err) => {
                self.conn
                    .execute_batch("ROLLBACK TO save_object; RELEASE save_object;")?;
                Err(err)
            }
        }
    }

    fn get_object(&self, id: ObjectId) -> RepoResult<Option<RepositoryObject>> {
        let id_text = id.to_string();
        let row = self
            .conn
            .query_row(
                "SELECT kind, name FROM objects WHERE uuid = ?1;",
                [id_text.as_str()],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        let Some((kind_text, name)) = row else {
            return Ok(None);
        };
        let kind = ObjectKind::parse(&kind_text).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid object kind `{kind_text}` in objects.kind"))
        })?;

        Ok(Some(RepositoryObject {
            id,
            kind,
            name,
            identifiers: self.load_identifiers(&id_text)?,
        }))
    }

    fn find_by_identifier(&self, value: &str) -> RepoResult<Option<RepositoryObject>> {
        let owner: Option<String> = self
            .conn
            .query_row(
                "SELECT object_uuid FROM object_identifiers WHERE value = ?1;",
                [value],
                |row| row.get(0),
            )
            .optional()?;

        let Some(owner) = owner else {
            return Ok(None);
        };
        let id = Uuid::parse_str(&owner).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid uuid value `{owner}` in object_identifiers.object_uuid"
            ))
        })?;
        self.get_object(id)
    }

    fn delete_object(&self, id: ObjectId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM objects WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }
}

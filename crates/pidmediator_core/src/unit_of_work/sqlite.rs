//! SQLite unit of work with buffered writes.
//!
//! # Invariants
//! - `persist` only buffers; the store changes on `flush`/`commit`.
//! - A flush writes all buffered objects in one transaction, or none.
//! - Reads always go to the store, so buffered writes are invisible to
//!   providers until flushed.

use super::UnitOfWork;
use crate::model::object::{ObjectId, RepositoryObject};
use crate::repo::object_repo::{ObjectRepository, RepoResult, SqliteObjectRepository};
use log::{debug, error, warn};
use rusqlite::Connection;

/// Unit of work over one SQLite connection.
pub struct SqliteUnitOfWork<'conn> {
    conn: &'conn Connection,
    pending: Vec<RepositoryObject>,
    flush_count: usize,
}

impl<'conn> SqliteUnitOfWork<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            pending: Vec::new(),
            flush_count: 0,
        }
    }

    /// Number of objects buffered since the last successful flush.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of flushes that wrote at least one object.
    pub fn flush_count(&self) -> usize {
        self.flush_count
    }

    /// Flushes remaining writes and ends the session.
    pub fn commit(mut self) -> RepoResult<()> {
        self.flush()
    }
}

impl UnitOfWork for SqliteUnitOfWork<'_> {
    fn persist(&mut self, object: &RepositoryObject) -> RepoResult<()> {
        match self.pending.iter_mut().find(|entry| entry.id == object.id) {
            Some(entry) => *entry = object.clone(),
            None => self.pending.push(object.clone()),
        }
        Ok(())
    }

    fn flush(&mut self) -> RepoResult<()> {
        if self.pending.is_empty() {
            return Ok(());
        }

        let tx = self.conn.unchecked_transaction()?;
        {
            let repo = SqliteObjectRepository::new(&tx);
            for object in &self.pending {
                if let Err(err) = repo.save_object(object) {
                    error!(
                        "event=uow_flush module=unit_of_work status=error object_id={} error={err}",
                        object.id
                    );
                    return Err(err);
                }
            }
        }
        tx.commit()?;

        debug!(
            "event=uow_flush module=unit_of_work status=ok objects={}",
            self.pending.len()
        );
        self.pending.clear();
        self.flush_count += 1;
        Ok(())
    }

    fn find_object(&self, id: ObjectId) -> RepoResult<Option<RepositoryObject>> {
        SqliteObjectRepository::new(self.conn).get_object(id)
    }

    fn find_by_identifier(&self, value: &str) -> RepoResult<Option<RepositoryObject>> {
        SqliteObjectRepository::new(self.conn).find_by_identifier(value)
    }
}

impl Drop for SqliteUnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.pending.is_empty() {
            warn!(
                "event=uow_drop module=unit_of_work status=discarded objects={}",
                self.pending.len()
            );
        }
    }
}

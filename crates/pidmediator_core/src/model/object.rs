//! Repository object domain model.
//!
//! # Responsibility
//! - Define the mutable record identifier providers attach metadata to.
//! - Provide helpers for attaching, promoting and removing identifiers.
//!
//! # Invariants
//! - `id` is stable and never reused for another object.
//! - An identifier value appears at most once per object.

use crate::model::identifier::{IdentifierStatus, IdentifierType, ObjectIdentifier};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable internal identity of a repository object.
pub type ObjectId = Uuid;

/// Repository object category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    Item,
    Collection,
    Community,
}

impl ObjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Collection => "collection",
            Self::Community => "community",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "item" => Some(Self::Item),
            "collection" => Some(Self::Collection),
            "community" => Some(Self::Community),
            _ => None,
        }
    }
}

/// Repository object carrying attached persistent identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryObject {
    pub id: ObjectId,
    pub kind: ObjectKind,
    pub name: String,
    /// Attachment order is preserved through persistence.
    pub identifiers: Vec<ObjectIdentifier>,
}

impl RepositoryObject {
    /// Creates an object with a generated stable ID and no identifiers.
    pub fn new(kind: ObjectKind, name: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), kind, name)
    }

    /// Creates an object with a caller-provided stable ID.
    pub fn with_id(id: ObjectId, kind: ObjectKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            identifiers: Vec::new(),
        }
    }

    /// Returns the first identifier of `kind`, if any.
    pub fn identifier_of(&self, kind: &IdentifierType) -> Option<&ObjectIdentifier> {
        self.identifiers.iter().find(|entry| &entry.kind == kind)
    }

    pub fn has_identifier(&self, value: &str) -> bool {
        self.identifiers.iter().any(|entry| entry.value == value)
    }

    /// Attaches an identifier, or upgrades its status if already attached.
    ///
    /// A registered identifier never falls back to reserved.
    pub fn attach_identifier(&mut self, identifier: ObjectIdentifier) {
        match self
            .identifiers
            .iter_mut()
            .find(|entry| entry.value == identifier.value)
        {
            Some(existing) => {
                if identifier.status == IdentifierStatus::Registered {
                    existing.status = IdentifierStatus::Registered;
                }
            }
            None => self.identifiers.push(identifier),
        }
    }

    /// Removes one identifier by value. Returns whether anything was removed.
    pub fn remove_identifier(&mut self, value: &str) -> bool {
        let before = self.identifiers.len();
        self.identifiers.retain(|entry| entry.value != value);
        before != self.identifiers.len()
    }

    /// Removes every identifier of `kind`. Returns the removed count.
    pub fn remove_identifiers_of(&mut self, kind: &IdentifierType) -> usize {
        let before = self.identifiers.len();
        self.identifiers.retain(|entry| &entry.kind != kind);
        before - self.identifiers.len()
    }
}

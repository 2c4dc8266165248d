//! Persistent identifier value types.
//!
//! # Responsibility
//! - Name identifier schemes with a closed tag type.
//! - Pair a scheme tag with its string form and lifecycle status.
//! - Classify raw identifier strings by scheme for capability checks.
//!
//! # Invariants
//! - Scheme detection is pure.
//! - `ObjectIdentifier::value` is stored without scheme prefixes such as
//!   `doi:` or `hdl:`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static DOI_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("valid doi regex"));
static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9A-Za-z]+(\.[0-9A-Za-z]+)*/\S+$").expect("valid handle regex"));

const DOI_PREFIXES: &[&str] = &[
    "doi:",
    "https://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
];
const HANDLE_PREFIXES: &[&str] = &["hdl:", "https://hdl.handle.net/", "http://hdl.handle.net/"];
const ARK_PREFIX: &str = "ark:";

/// Identifier scheme tag.
///
/// Used both as a selector (`lookup`) and as the scheme of a concrete value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierType {
    Handle,
    Doi,
    Ark,
    /// Scheme owned by a host-specific provider.
    Other(String),
}

impl IdentifierType {
    /// Stable scheme name used in storage and logs.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Handle => "handle",
            Self::Doi => "doi",
            Self::Ark => "ark",
            Self::Other(name) => name.as_str(),
        }
    }

    /// Parses a stored scheme name.
    ///
    /// Unknown names map to `Other`; blank names are rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "" => None,
            "handle" => Some(Self::Handle),
            "doi" => Some(Self::Doi),
            "ark" => Some(Self::Ark),
            other => Some(Self::Other(other.to_string())),
        }
    }

    /// Detects the scheme of a raw identifier string.
    ///
    /// Explicit prefixes win over shape matching, and DOI shape is checked
    /// before the looser handle shape because every DOI also looks like a
    /// handle.
    pub fn detect(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if DOI_PREFIXES.iter().any(|prefix| trimmed.starts_with(prefix)) {
            return Some(Self::Doi);
        }
        if HANDLE_PREFIXES
            .iter()
            .any(|prefix| trimmed.starts_with(prefix))
        {
            return Some(Self::Handle);
        }
        if trimmed.starts_with(ARK_PREFIX) {
            return Some(Self::Ark);
        }
        if DOI_RE.is_match(trimmed) {
            return Some(Self::Doi);
        }
        if HANDLE_RE.is_match(trimmed) {
            return Some(Self::Handle);
        }
        None
    }
}

impl Display for IdentifierType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Strips known resolver prefixes from a raw identifier.
///
/// `doi:10.1/x`, `https://doi.org/10.1/x` and `https://dx.doi.org/10.1/x`
/// all normalize to `10.1/x`.
/// `ark:` values keep their prefix because it is part of the ARK syntax.
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    for prefix in DOI_PREFIXES.iter().chain(HANDLE_PREFIXES.iter()) {
        if let Some(rest) = trimmed.strip_prefix(prefix) {
            return rest.to_string();
        }
    }
    trimmed.to_string()
}

/// Lifecycle state of one identifier attached to an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierStatus {
    /// Allocated for the object but not yet public.
    Reserved,
    /// Registered with the scheme's registry.
    Registered,
}

impl IdentifierStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reserved => "reserved",
            Self::Registered => "registered",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "reserved" => Some(Self::Reserved),
            "registered" => Some(Self::Registered),
            _ => None,
        }
    }
}

/// One identifier attached to a repository object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectIdentifier {
    pub kind: IdentifierType,
    pub value: String,
    pub status: IdentifierStatus,
}

impl ObjectIdentifier {
    pub fn reserved(kind: IdentifierType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            status: IdentifierStatus::Reserved,
        }
    }

    pub fn registered(kind: IdentifierType, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
            status: IdentifierStatus::Registered,
        }
    }
}

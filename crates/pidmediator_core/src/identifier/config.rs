//! Mediator configuration.

use serde::{Deserialize, Serialize};

/// Host-supplied mediator settings.
///
/// Every field has a default, so an empty JSON object is a valid config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MediatorConfig {
    /// Flush the unit of work between provider invocations of one write
    /// broadcast, so later providers observe earlier providers' writes.
    pub flush_between_providers: bool,
}

impl MediatorConfig {
    pub fn flushing() -> Self {
        Self {
            flush_between_providers: true,
        }
    }
}

//! Event domain model.
//!
//! # Invariants
//! - `external_id` is stable and never reused for another event.
//! - Once `passed` is true it never reverts to false.

use super::EventId;
use serde::{Deserialize, Serialize};

/// Locally stored event mirrored from the remote active-event set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub external_id: EventId,
    /// Name copied verbatim from the remote source.
    pub name: String,
    /// Archived: no longer active remotely, excluded from reconciliation.
    pub passed: bool,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

impl Event {
    /// Returns whether this event still takes part in reconciliation.
    pub fn is_active(&self) -> bool {
        !self.passed
    }
}

//! Participation domain model.
//!
//! # Invariants
//! - At most one participation per `(event_id, user_id)`; enforced by the
//!   table primary key, not only by callers.
//! - Removal is physical; there is no tombstone.

use super::{EventId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participation {
    pub event_id: EventId,
    pub user_id: UserId,
    /// Epoch milliseconds.
    pub created_at: i64,
}

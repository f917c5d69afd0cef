//! Membership change records produced by sync and consumed by notifications.

use super::{EventId, UserId};
use serde::{Deserialize, Serialize};

/// Direction of one membership change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Join,
    Leave,
}

/// One applied membership change, carrying the names needed to render it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MembershipChange {
    pub kind: ChangeKind,
    pub event_id: EventId,
    pub event_name: String,
    pub user_id: UserId,
    pub user_name: String,
}

impl MembershipChange {
    pub fn join(
        event_id: impl Into<EventId>,
        event_name: impl Into<String>,
        user_id: impl Into<UserId>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ChangeKind::Join,
            event_id: event_id.into(),
            event_name: event_name.into(),
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }

    pub fn leave(
        event_id: impl Into<EventId>,
        event_name: impl Into<String>,
        user_id: impl Into<UserId>,
        user_name: impl Into<String>,
    ) -> Self {
        Self {
            kind: ChangeKind::Leave,
            ..Self::join(event_id, event_name, user_id, user_name)
        }
    }
}

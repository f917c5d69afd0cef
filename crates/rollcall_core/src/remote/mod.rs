//! Remote membership source contract.
//!
//! # Responsibility
//! - Define the value types the core sees instead of framework objects.
//! - Define the async capability the reconciliation pass consumes.
//!
//! # Invariants
//! - Adapters translate their native representation into `EventSnapshot` /
//!   `UserSnapshot` before anything reaches the core.

use crate::model::user::placeholder_display_name;
use crate::model::{EventId, UserId};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Failures reported by the remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// The bot lacks permission to read the resource.
    AccessDenied(String),
    /// Network or upstream failure; a later attempt may succeed.
    Transient(String),
}

impl Display for RemoteError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AccessDenied(details) => write!(f, "remote access denied: {details}"),
            Self::Transient(details) => write!(f, "remote request failed: {details}"),
        }
    }
}

impl Error for RemoteError {}

/// One currently active remote event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSnapshot {
    pub id: EventId,
    pub name: String,
}

impl EventSnapshot {
    pub fn new(id: impl Into<EventId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One remote user as seen in a roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSnapshot {
    pub id: UserId,
    /// Richest name the adapter could find (member nickname, then username).
    pub display_name: Option<String>,
}

impl UserSnapshot {
    pub fn new(id: impl Into<UserId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: Some(display_name.into()),
        }
    }

    pub fn anonymous(id: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            display_name: None,
        }
    }

    /// Display name, or a placeholder derived from the id.
    pub fn best_display_name(&self) -> String {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_display_name(&self.id))
    }
}

/// Read access to the authoritative remote membership feed.
///
/// Every call may suspend; callers bound them with a timeout.
#[async_trait]
pub trait MembershipSource: Send + Sync {
    /// Lists currently active events.
    async fn list_active_events(&self) -> RemoteResult<Vec<EventSnapshot>>;
    /// Lists users registered to one event.
    async fn list_event_participants(&self, event_id: &str) -> RemoteResult<Vec<UserSnapshot>>;
    /// Lists members of the community roster.
    async fn list_guild_members(&self) -> RemoteResult<Vec<UserSnapshot>>;
}

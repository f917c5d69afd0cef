//! Domain model for events, users and their participations.
//!
//! # Responsibility
//! - Define canonical records persisted by the store.
//! - Define the membership change record flowing from sync to notifications.
//!
//! # Invariants
//! - Every record is identified by the stable external id assigned remotely.
//! - Relationships are plain id references; joins are explicit queries.

pub mod change;
pub mod event;
pub mod participation;
pub mod user;

/// External identifier of an event, assigned by the remote source.
pub type EventId = String;

/// External identifier of a user, assigned by the remote source.
pub type UserId = String;

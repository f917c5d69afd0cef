//! Membership synchronization between the remote feed and the local store.
//!
//! # Responsibility
//! - Full reconciliation passes (startup and periodic).
//! - Real-time join/leave/member signals between passes.
//! - One cooldown shared by both paths to throttle notifications.
//!
//! # Invariants
//! - No store lock or transaction is held across an `.await`.
//! - Cooldown decisions are recorded only after the state change commits.

pub mod cooldown;
pub mod differ;
pub mod engine;
pub mod error;
pub mod incremental;
pub mod scheduler;
pub mod service;

pub use cooldown::CooldownTracker;
pub use differ::{diff, MembershipDiff};
pub use engine::{ReconcileReport, ReconciliationEngine};
pub use error::{SyncError, SyncResult};
pub use incremental::{IncrementalHandler, MembershipSignal, SignalOutcome};
pub use scheduler::{run_reconciliation_loop, run_signal_loop};
pub use service::{signal_channel, SyncService, SyncTasks, SIGNAL_CHANNEL_CAPACITY};

//! Core of the Rollcall event-registration tracker.
//! Keeps a local mirror of remote event rosters and announces joins/leaves.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod remote;
pub mod repo;
pub mod sync;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, SyncConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult, Store};
pub use logging::{
    default_log_level, init_logging, init_logging_with, logging_status, LoggingError,
};
pub use model::change::{ChangeKind, MembershipChange};
pub use model::event::Event;
pub use model::participation::Participation;
pub use model::user::User;
pub use model::{EventId, UserId};
pub use notify::{
    NotificationChannel, NotificationPublisher, NotificationSink, NotifyError, PublishReport,
    RecordingSink,
};
pub use remote::memory::StaticMembershipSource;
pub use remote::{EventSnapshot, MembershipSource, RemoteError, RemoteResult, UserSnapshot};
pub use repo::stats::{load_stats, StoreStats};
pub use repo::{RepoError, RepoResult};
pub use sync::{
    signal_channel, CooldownTracker, IncrementalHandler, MembershipSignal, ReconcileReport,
    ReconciliationEngine, SignalOutcome, SyncError, SyncResult, SyncService, SyncTasks,
};

/// Minimal health-check API.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

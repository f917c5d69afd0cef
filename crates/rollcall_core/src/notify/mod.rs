//! Membership change notifications.
//!
//! # Responsibility
//! - Render membership changes as human-readable chat lines.
//! - Deliver them to one configured channel, best-effort.
//!
//! # Invariants
//! - Delivery failures are logged and never propagate to sync callers.

mod message;
mod publisher;
mod sink;

pub use message::{format_change_line, format_header};
pub use publisher::{NotificationPublisher, PublishReport};
pub use sink::{NotificationChannel, NotificationSink, NotifyError, NotifyResult, RecordingSink};

//! Notification text rendering.

use crate::model::change::{ChangeKind, MembershipChange};
use chrono::{DateTime, Utc};

/// Header sent once before a batch of change lines.
pub fn format_header(now: DateTime<Utc>) -> String {
    format!(
        "## Registration update\n{}",
        now.format("%d/%m/%Y %H:%M UTC")
    )
}

/// One line per membership change.
pub fn format_change_line(change: &MembershipChange) -> String {
    match change.kind {
        ChangeKind::Join => format!(
            "➕ {} signed up for **{}**.",
            change.user_name, change.event_name
        ),
        ChangeKind::Leave => format!(
            "🛑 {} withdrew from **{}**.",
            change.user_name, change.event_name
        ),
    }
}

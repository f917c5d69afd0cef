//! User domain model.

use super::UserId;
use serde::{Deserialize, Serialize};

/// Locally stored member of the remote community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub external_id: UserId,
    pub display_name: String,
    /// Epoch milliseconds.
    pub created_at: i64,
    /// Epoch milliseconds.
    pub updated_at: i64,
}

/// Display name used when the remote source gives none.
pub fn placeholder_display_name(user_id: &str) -> String {
    format!("User {user_id}")
}

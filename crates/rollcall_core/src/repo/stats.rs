//! Store health statistics.

use super::RepoResult;
use rusqlite::Connection;
use serde::Serialize;

/// Row counts reported at startup and by the CLI when run without a subcommand.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub users: i64,
    pub active_events: i64,
    pub archived_events: i64,
    pub participations: i64,
}

/// Loads row counts in one read.
pub fn load_stats(conn: &Connection) -> RepoResult<StoreStats> {
    let stats = conn.query_row(
        "SELECT
            (SELECT COUNT(*) FROM users),
            (SELECT COUNT(*) FROM events WHERE passed = 0),
            (SELECT COUNT(*) FROM events WHERE passed = 1),
            (SELECT COUNT(*) FROM participations);",
        [],
        |row| {
            Ok(StoreStats {
                users: row.get(0)?,
                active_events: row.get(1)?,
                archived_events: row.get(2)?,
                participations: row.get(3)?,
            })
        },
    )?;
    Ok(stats)
}

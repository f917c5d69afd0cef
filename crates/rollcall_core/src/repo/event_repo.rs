//! Event repository contract and SQLite implementation.
//!
//! # Invariants
//! - `mark_passed` only moves events from active to archived.
//! - Events are never deleted through this repository.

use super::{bool_to_int, int_to_bool, RepoResult};
use crate::model::event::Event;
use rusqlite::{params, Connection, OptionalExtension, Row};

const EVENT_SELECT_SQL: &str = "SELECT
    external_id,
    name,
    passed,
    created_at,
    updated_at
FROM events";

/// Repository interface for event persistence.
pub trait EventRepository {
    /// Creates one active event. Returns `false` when the id already exists.
    fn create(&self, external_id: &str, name: &str) -> RepoResult<bool>;
    fn get(&self, external_id: &str) -> RepoResult<Option<Event>>;
    /// Lists active and archived events, ordered by id.
    fn list_all(&self) -> RepoResult<Vec<Event>>;
    /// Lists events that still take part in reconciliation.
    fn list_active(&self) -> RepoResult<Vec<Event>>;
    /// Renames an active event. Returns whether a row changed.
    fn rename(&self, external_id: &str, name: &str) -> RepoResult<bool>;
    /// Archives an active event. Returns `false` if unknown or already archived.
    fn mark_passed(&self, external_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_events(&self, sql: &str) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query([])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(parse_event_row(row)?);
        }
        Ok(events)
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn create(&self, external_id: &str, name: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO events (external_id, name, passed)
             VALUES (?1, ?2, ?3);",
            params![external_id, name, bool_to_int(false)],
        )?;
        Ok(changed == 1)
    }

    fn get(&self, external_id: &str) -> RepoResult<Option<Event>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{EVENT_SELECT_SQL} WHERE external_id = ?1;"))?;
        let row = stmt
            .query_row([external_id], |row| Ok(parse_event_row(row)))
            .optional()?;
        row.transpose()
    }

    fn list_all(&self) -> RepoResult<Vec<Event>> {
        self.query_events(&format!("{EVENT_SELECT_SQL} ORDER BY external_id ASC;"))
    }

    fn list_active(&self) -> RepoResult<Vec<Event>> {
        self.query_events(&format!(
            "{EVENT_SELECT_SQL} WHERE passed = 0 ORDER BY external_id ASC;"
        ))
    }

    fn rename(&self, external_id: &str, name: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE events
             SET
                name = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE external_id = ?2
               AND passed = 0
               AND name <> ?1;",
            params![name, external_id],
        )?;
        Ok(changed > 0)
    }

    fn mark_passed(&self, external_id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE events
             SET
                passed = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE external_id = ?1
               AND passed = 0;",
            [external_id],
        )?;
        Ok(changed > 0)
    }
}

fn parse_event_row(row: &Row<'_>) -> RepoResult<Event> {
    Ok(Event {
        external_id: row.get("external_id")?,
        name: row.get("name")?,
        passed: int_to_bool(row.get("passed")?, "events.passed")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::{EventRepository, SqliteEventRepository};
    use crate::db::open_db_in_memory;

    #[test]
    fn rename_is_noop_for_same_name_and_archived_events() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteEventRepository::new(&conn);
        repo.create("e1", "Raid").unwrap();

        assert!(!repo.rename("e1", "Raid").unwrap());
        assert!(repo.rename("e1", "Raid night").unwrap());

        repo.mark_passed("e1").unwrap();
        assert!(!repo.rename("e1", "Renamed after archive").unwrap());
        assert_eq!(repo.get("e1").unwrap().unwrap().name, "Raid night");
    }
}

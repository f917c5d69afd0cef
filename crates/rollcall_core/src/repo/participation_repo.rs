//! Participation repository contract and SQLite implementation.
//!
//! # Invariants
//! - The `(event_id, user_id)` primary key makes duplicate inserts impossible,
//!   even for writers racing on separate transactions.
//! - Insert and removal report whether a row changed; neither fails on a
//!   repeated call.

use super::RepoResult;
use crate::model::participation::Participation;
use crate::model::UserId;
use rusqlite::{params, Connection, Row};
use std::collections::BTreeSet;

/// Repository interface for participation persistence.
pub trait ParticipationRepository {
    fn exists(&self, event_id: &str, user_id: &str) -> RepoResult<bool>;
    /// Lists participations of one event ordered by user id.
    fn list_for_event(&self, event_id: &str) -> RepoResult<Vec<Participation>>;
    /// Returns the set of participant ids for one event.
    fn user_ids_for_event(&self, event_id: &str) -> RepoResult<BTreeSet<UserId>>;
    /// Inserts one participation. Returns `false` if it already existed.
    fn insert(&self, event_id: &str, user_id: &str) -> RepoResult<bool>;
    /// Removes one participation. Returns `false` if it was already absent.
    fn remove(&self, event_id: &str, user_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed participation repository.
pub struct SqliteParticipationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteParticipationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ParticipationRepository for SqliteParticipationRepository<'_> {
    fn exists(&self, event_id: &str, user_id: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM participations
                WHERE event_id = ?1 AND user_id = ?2
            );",
            params![event_id, user_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn list_for_event(&self, event_id: &str) -> RepoResult<Vec<Participation>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, user_id, created_at
             FROM participations
             WHERE event_id = ?1
             ORDER BY user_id ASC;",
        )?;
        let participations = stmt
            .query_map([event_id], parse_participation_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(participations)
    }

    fn user_ids_for_event(&self, event_id: &str) -> RepoResult<BTreeSet<UserId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id FROM participations WHERE event_id = ?1;")?;
        let ids = stmt
            .query_map([event_id], |row| row.get::<_, String>(0))?
            .collect::<Result<BTreeSet<_>, _>>()?;
        Ok(ids)
    }

    fn insert(&self, event_id: &str, user_id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO participations (event_id, user_id) VALUES (?1, ?2);",
            params![event_id, user_id],
        )?;
        Ok(changed == 1)
    }

    fn remove(&self, event_id: &str, user_id: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM participations WHERE event_id = ?1 AND user_id = ?2;",
            params![event_id, user_id],
        )?;
        Ok(changed > 0)
    }
}

fn parse_participation_row(row: &Row<'_>) -> rusqlite::Result<Participation> {
    Ok(Participation {
        event_id: row.get("event_id")?,
        user_id: row.get("user_id")?,
        created_at: row.get("created_at")?,
    })
}

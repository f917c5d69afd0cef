//! User repository contract and SQLite implementation.

use super::RepoResult;
use crate::model::user::User;
use rusqlite::{params, Connection, OptionalExtension, Row};

const USER_SELECT_SQL: &str = "SELECT
    external_id,
    display_name,
    created_at,
    updated_at
FROM users";

/// Repository interface for user persistence.
pub trait UserRepository {
    fn get(&self, external_id: &str) -> RepoResult<Option<User>>;
    /// Lists all users ordered by id.
    fn list_all(&self) -> RepoResult<Vec<User>>;
    /// Returns the existing user, or creates one with `display_name`.
    ///
    /// An existing user's name is left untouched; use `rename` for refreshes.
    fn get_or_create(&self, external_id: &str, display_name: &str) -> RepoResult<User>;
    /// Updates the display name. Returns whether a row changed.
    fn rename(&self, external_id: &str, display_name: &str) -> RepoResult<bool>;
    /// Physically removes a user. Returns whether a row was deleted.
    fn delete(&self, external_id: &str) -> RepoResult<bool>;
}

/// SQLite-backed user repository.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn get(&self, external_id: &str) -> RepoResult<Option<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE external_id = ?1;"))?;
        let user = stmt.query_row([external_id], parse_user_row).optional()?;
        Ok(user)
    }

    fn list_all(&self) -> RepoResult<Vec<User>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} ORDER BY external_id ASC;"))?;
        let users = stmt
            .query_map([], parse_user_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(users)
    }

    fn get_or_create(&self, external_id: &str, display_name: &str) -> RepoResult<User> {
        self.conn.execute(
            "INSERT OR IGNORE INTO users (external_id, display_name) VALUES (?1, ?2);",
            params![external_id, display_name],
        )?;
        let mut stmt = self
            .conn
            .prepare(&format!("{USER_SELECT_SQL} WHERE external_id = ?1;"))?;
        let user = stmt.query_row([external_id], parse_user_row)?;
        Ok(user)
    }

    fn rename(&self, external_id: &str, display_name: &str) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "UPDATE users
             SET
                display_name = ?1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE external_id = ?2
               AND display_name <> ?1;",
            params![display_name, external_id],
        )?;
        Ok(changed > 0)
    }

    fn delete(&self, external_id: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM users WHERE external_id = ?1;", [external_id])?;
        Ok(changed > 0)
    }
}

fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        external_id: row.get("external_id")?,
        display_name: row.get("display_name")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

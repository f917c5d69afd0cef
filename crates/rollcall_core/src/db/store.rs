//! Shared, lock-guarded SQLite connection.

use super::{open_db, open_db_in_memory, DbResult};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Cloneable handle to the single migrated connection.
///
/// Both the reconciliation pass and the real-time handlers go through this
/// handle. Each caller opens its own unit of work inside `with_connection`,
/// so transactions are never shared between concurrent operations.
#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
}

impl Store {
    /// Wraps an already migrated connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Opens (and migrates) a database file.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_db(path)?))
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_db_in_memory()?))
    }

    /// Runs `f` with exclusive access to the connection.
    ///
    /// A panic inside an earlier caller drops its transaction, which rolls it
    /// back, so a poisoned lock still guards a consistent connection.
    pub fn with_connection<T>(&self, f: impl FnOnce(&mut Connection) -> T) -> T {
        let mut guard = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[cfg(test)]
mod tests {
    use super::Store;

    #[test]
    fn clones_share_one_connection() {
        let store = Store::open_in_memory().unwrap();
        let other = store.clone();

        store.with_connection(|conn| {
            conn.execute(
                "INSERT INTO users (external_id, display_name) VALUES ('u1', 'Alice');",
                [],
            )
            .unwrap();
        });

        let count: i64 = other.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM users;", [], |row| row.get(0))
                .unwrap()
        });
        assert_eq!(count, 1);
    }
}

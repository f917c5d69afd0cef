//! Transactional unit of work over the event/user/participation repositories.
//!
//! # Invariants
//! - All repository calls made through one unit of work share one SQLite
//!   transaction.
//! - Dropping a unit of work without `commit()` rolls everything back.

use super::event_repo::SqliteEventRepository;
use super::participation_repo::SqliteParticipationRepository;
use super::user_repo::SqliteUserRepository;
use super::RepoResult;
use rusqlite::{Connection, Transaction, TransactionBehavior};

pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
}

impl<'conn> UnitOfWork<'conn> {
    /// Opens an immediate (write-locking) transaction on `conn`.
    pub fn begin(conn: &'conn mut Connection) -> RepoResult<Self> {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(Self { tx })
    }

    pub fn events(&self) -> SqliteEventRepository<'_> {
        SqliteEventRepository::new(&self.tx)
    }

    pub fn users(&self) -> SqliteUserRepository<'_> {
        SqliteUserRepository::new(&self.tx)
    }

    pub fn participations(&self) -> SqliteParticipationRepository<'_> {
        SqliteParticipationRepository::new(&self.tx)
    }

    pub fn commit(self) -> RepoResult<()> {
        self.tx.commit()?;
        Ok(())
    }

    pub fn rollback(self) -> RepoResult<()> {
        self.tx.rollback()?;
        Ok(())
    }
}

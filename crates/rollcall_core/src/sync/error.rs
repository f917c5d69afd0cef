use crate::remote::RemoteError;
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SyncResult<T> = Result<T, SyncError>;

/// Failure of one reconciliation pass or one real-time signal.
#[derive(Debug)]
pub enum SyncError {
    /// Remote active-event list could not be read.
    Remote(RemoteError),
    /// Storage failure; the transaction was rolled back.
    Repo(RepoError),
    /// A bounded remote call did not finish in time.
    Timeout(&'static str),
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Remote(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Timeout(stage) => write!(f, "remote call timed out during {stage}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Remote(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Timeout(_) => None,
        }
    }
}

impl From<RemoteError> for SyncError {
    fn from(value: RemoteError) -> Self {
        Self::Remote(value)
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

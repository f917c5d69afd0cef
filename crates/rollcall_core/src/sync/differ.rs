//! Membership set difference.

use std::collections::BTreeSet;

/// Result of comparing a remote member set with the locally stored one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembershipDiff<T: Ord> {
    /// Present remotely, absent locally.
    pub joined: BTreeSet<T>,
    /// Present locally, absent remotely.
    pub left: BTreeSet<T>,
}

impl<T: Ord> MembershipDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.joined.is_empty() && self.left.is_empty()
    }
}

/// Computes `joined = remote - local` and `left = local - remote`.
pub fn diff<T: Ord + Clone>(remote: &BTreeSet<T>, local: &BTreeSet<T>) -> MembershipDiff<T> {
    MembershipDiff {
        joined: remote.difference(local).cloned().collect(),
        left: local.difference(remote).cloned().collect(),
    }
}

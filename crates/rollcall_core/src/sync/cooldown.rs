//! Per (user, event) notification cooldown.
//!
//! # Invariants
//! - Suppression only gates notifications; callers always apply state first.
//! - A window `<= 0` disables suppression and records nothing.
//! - Read-modify-write on the map happens under one lock.

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

type CooldownKey = (String, String);

/// Volatile map of last join/leave action per (user, event) pair.
///
/// Shared by reference between the reconciliation pass and the real-time
/// handlers; process restarts reset it.
#[derive(Debug)]
pub struct CooldownTracker {
    window: Option<Duration>,
    last_action: Mutex<HashMap<CooldownKey, DateTime<Utc>>>,
}

impl CooldownTracker {
    /// `window_seconds <= 0` disables suppression.
    pub fn new(window_seconds: i64) -> Self {
        Self::with_window((window_seconds > 0).then(|| Duration::seconds(window_seconds)))
    }

    pub fn with_window(window: Option<Duration>) -> Self {
        Self {
            window: window.filter(|window| *window > Duration::zero()),
            last_action: Mutex::new(HashMap::new()),
        }
    }

    pub fn window(&self) -> Option<Duration> {
        self.window
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<CooldownKey, DateTime<Utc>>> {
        self.last_action
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// True iff a previous action on the pair happened less than one window ago.
    pub fn is_suppressed(&self, user_id: &str, event_id: &str, now: DateTime<Utc>) -> bool {
        let Some(window) = self.window else {
            return false;
        };
        let entries = self.entries();
        is_within(&entries, window, user_id, event_id, now)
    }

    /// Overwrites the last-action timestamp of the pair.
    pub fn record_action(&self, user_id: &str, event_id: &str, now: DateTime<Utc>) {
        if self.window.is_none() {
            return;
        }
        self.entries()
            .insert((user_id.to_string(), event_id.to_string()), now);
    }

    /// Checks and records under one lock. Returns whether to notify.
    pub fn register_action(&self, user_id: &str, event_id: &str, now: DateTime<Utc>) -> bool {
        let Some(window) = self.window else {
            return true;
        };
        let mut entries = self.entries();
        let suppressed = is_within(&entries, window, user_id, event_id, now);
        entries.insert((user_id.to_string(), event_id.to_string()), now);
        !suppressed
    }

    /// Drops entries whose window has elapsed. Returns how many were removed.
    pub fn prune_expired(&self, now: DateTime<Utc>) -> usize {
        let Some(window) = self.window else {
            return 0;
        };
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, last| now - *last < window);
        before - entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

fn is_within(
    entries: &HashMap<CooldownKey, DateTime<Utc>>,
    window: Duration,
    user_id: &str,
    event_id: &str,
    now: DateTime<Utc>,
) -> bool {
    entries
        .get(&(user_id.to_string(), event_id.to_string()))
        .is_some_and(|last| now - *last < window)
}

#[cfg(test)]
mod tests {
    use super::CooldownTracker;
    use chrono::{Duration, TimeZone, Utc};

    #[test]
    fn suppresses_inside_window_only() {
        let tracker = CooldownTracker::new(60);
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        assert!(!tracker.is_suppressed("u1", "e1", t0));
        tracker.record_action("u1", "e1", t0);
        assert!(tracker.is_suppressed("u1", "e1", t0 + Duration::seconds(59)));
        assert!(!tracker.is_suppressed("u1", "e1", t0 + Duration::seconds(60)));
        assert!(!tracker.is_suppressed("u1", "e2", t0));
        assert!(!tracker.is_suppressed("u2", "e1", t0));
    }

    #[test]
    fn register_action_notifies_once_per_window() {
        let tracker = CooldownTracker::new(30);
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();

        assert!(tracker.register_action("u1", "e1", t0));
        assert!(!tracker.register_action("u1", "e1", t0 + Duration::seconds(10)));
        // the suppressed action still refreshed the timestamp
        assert!(!tracker.register_action("u1", "e1", t0 + Duration::seconds(35)));
        assert!(tracker.register_action("u1", "e1", t0 + Duration::seconds(70)));
    }

    #[test]
    fn non_positive_window_disables_tracking() {
        for window in [0, -10] {
            let tracker = CooldownTracker::new(window);
            let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
            tracker.record_action("u1", "e1", t0);
            assert!(!tracker.is_suppressed("u1", "e1", t0));
            assert!(tracker.register_action("u1", "e1", t0));
            assert!(tracker.register_action("u1", "e1", t0));
            assert!(tracker.is_empty());
        }
    }

    #[test]
    fn prune_drops_only_expired_entries() {
        let tracker = CooldownTracker::new(60);
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        tracker.record_action("u1", "e1", t0);
        tracker.record_action("u2", "e1", t0 + Duration::seconds(50));

        assert_eq!(tracker.prune_expired(t0 + Duration::seconds(90)), 1);
        assert_eq!(tracker.len(), 1);
        assert!(tracker.is_suppressed("u2", "e1", t0 + Duration::seconds(90)));
    }
}

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use rollcall_core::repo::event_repo::{EventRepository, SqliteEventRepository};
use rollcall_core::repo::participation_repo::{
    ParticipationRepository, SqliteParticipationRepository,
};
use rollcall_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use rollcall_core::{
    Event, EventSnapshot, ManualClock, RecordingSink, StaticMembershipSource, Store, SyncConfig,
    SyncService, User, UserSnapshot,
};
use std::collections::BTreeSet;
use std::sync::Arc;

pub const CHANNEL_ID: &str = "announcements";

pub struct Harness {
    pub store: Store,
    pub source: Arc<StaticMembershipSource>,
    pub sink: RecordingSink,
    pub clock: Arc<ManualClock>,
    pub service: SyncService,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 18, 0, 0).unwrap()
}

pub fn harness(cooldown_seconds: i64) -> Harness {
    harness_with(SyncConfig {
        cooldown_seconds,
        notification_channel_id: Some(CHANNEL_ID.to_string()),
        remote_timeout_seconds: 1,
        signal_timeout_seconds: 1,
        ..SyncConfig::default()
    })
}

pub fn harness_with(config: SyncConfig) -> Harness {
    let store = Store::open_in_memory().unwrap();
    let source = Arc::new(StaticMembershipSource::new());
    let sink = RecordingSink::new();
    let clock = Arc::new(ManualClock::new(start_time()));
    let service = SyncService::new(
        store.clone(),
        source.clone(),
        Arc::new(sink.clone()),
        clock.clone(),
        &config,
    );
    Harness {
        store,
        source,
        sink,
        clock,
        service,
    }
}

pub fn user(id: &str, name: &str) -> UserSnapshot {
    UserSnapshot::new(id, name)
}

impl Harness {
    /// Publishes `event_id` as active with the given roster.
    pub fn set_event(&self, event_id: &str, name: &str, roster: &[UserSnapshot]) {
        self.source
            .set_event(EventSnapshot::new(event_id, name), roster.to_vec());
    }

    pub fn participants(&self, event_id: &str) -> BTreeSet<String> {
        self.store.with_connection(|conn| {
            SqliteParticipationRepository::new(conn)
                .user_ids_for_event(event_id)
                .unwrap()
        })
    }

    pub fn event(&self, event_id: &str) -> Option<Event> {
        self.store
            .with_connection(|conn| SqliteEventRepository::new(conn).get(event_id).unwrap())
    }

    pub fn user(&self, user_id: &str) -> Option<User> {
        self.store
            .with_connection(|conn| SqliteUserRepository::new(conn).get(user_id).unwrap())
    }

    /// Delivered change lines, headers excluded.
    pub fn change_lines(&self) -> Vec<String> {
        self.sink
            .messages()
            .into_iter()
            .filter(|message| !message.starts_with("## "))
            .collect()
    }
}

pub fn ids(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

//! Real-time join/leave handling for one (event, user) pair at a time.
//!
//! # Invariants
//! - A repeated join or a leave for an absent pair changes nothing and
//!   notifies nothing.
//! - State is always applied; the shared cooldown only gates the notification.
//! - Publish failures are logged by the publisher and never surface here.

use super::cooldown::CooldownTracker;
use super::error::SyncResult;
use crate::clock::Clock;
use crate::db::Store;
use crate::model::change::MembershipChange;
use crate::model::user::placeholder_display_name;
use crate::model::{EventId, UserId};
use crate::notify::NotificationPublisher;
use crate::repo::event_repo::EventRepository;
use crate::repo::participation_repo::ParticipationRepository;
use crate::repo::unit_of_work::UnitOfWork;
use crate::repo::user_repo::UserRepository;
use crate::repo::RepoResult;
use log::{debug, info};
use rusqlite::Connection;
use std::sync::Arc;

/// One inbound real-time signal from the remote feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipSignal {
    Join {
        event_id: EventId,
        user_id: UserId,
        display_name: Option<String>,
    },
    Leave {
        event_id: EventId,
        user_id: UserId,
    },
    MemberUpdated {
        user_id: UserId,
        display_name: String,
    },
}

impl MembershipSignal {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Join { .. } => "join",
            Self::Leave { .. } => "leave",
            Self::MemberUpdated { .. } => "member_updated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOutcome {
    /// State changed. `notified` is true only when every message of the
    /// notification was delivered; suppression, a missing channel or a
    /// failed send leave it false.
    Applied { notified: bool },
    /// Join for a pair that already participates.
    Duplicate,
    /// Leave for a pair that no longer participates.
    AlreadyAbsent,
    /// Nothing to change (e.g. same display name, unknown user).
    Unchanged,
}

pub struct IncrementalHandler {
    store: Store,
    publisher: Arc<NotificationPublisher>,
    cooldown: Arc<CooldownTracker>,
    clock: Arc<dyn Clock>,
}

impl IncrementalHandler {
    pub fn new(
        store: Store,
        publisher: Arc<NotificationPublisher>,
        cooldown: Arc<CooldownTracker>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            publisher,
            cooldown,
            clock,
        }
    }

    /// Routes one signal to its handler.
    pub async fn dispatch(&self, signal: MembershipSignal) -> SyncResult<SignalOutcome> {
        match signal {
            MembershipSignal::Join {
                event_id,
                user_id,
                display_name,
            } => {
                self.handle_join(&event_id, &user_id, display_name.as_deref())
                    .await
            }
            MembershipSignal::Leave { event_id, user_id } => {
                self.handle_leave(&event_id, &user_id).await
            }
            MembershipSignal::MemberUpdated {
                user_id,
                display_name,
            } => self.handle_member_update(&user_id, &display_name),
        }
    }

    /// Records a participation the moment the remote feed reports it.
    ///
    /// An existing user record is reused as is; otherwise it is created from
    /// `display_name`, or a placeholder when the feed gave none.
    pub async fn handle_join(
        &self,
        event_id: &str,
        user_id: &str,
        display_name: Option<&str>,
    ) -> SyncResult<SignalOutcome> {
        let display_name = display_name
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| placeholder_display_name(user_id));

        let applied = self
            .store
            .with_connection(|conn| apply_join(conn, event_id, user_id, &display_name))?;
        let Some(change) = applied else {
            debug!(
                "event=signal_join module=sync status=duplicate event_id={event_id} user_id={user_id}"
            );
            return Ok(SignalOutcome::Duplicate);
        };

        info!(
            "event=signal_join module=sync status=ok event_id={} user_id={} user_name={}",
            event_id, user_id, change.user_name
        );
        let notified = self.notify(change).await;
        Ok(SignalOutcome::Applied { notified })
    }

    /// Removes a participation the moment the remote feed reports it.
    pub async fn handle_leave(&self, event_id: &str, user_id: &str) -> SyncResult<SignalOutcome> {
        let applied = self
            .store
            .with_connection(|conn| apply_leave(conn, event_id, user_id))?;
        let Some(change) = applied else {
            debug!(
                "event=signal_leave module=sync status=already_absent event_id={event_id} user_id={user_id}"
            );
            return Ok(SignalOutcome::AlreadyAbsent);
        };

        info!(
            "event=signal_leave module=sync status=ok event_id={} user_id={} user_name={}",
            event_id, user_id, change.user_name
        );
        let notified = self.notify(change).await;
        Ok(SignalOutcome::Applied { notified })
    }

    /// Refreshes a known user's display name. Never notifies.
    pub fn handle_member_update(
        &self,
        user_id: &str,
        display_name: &str,
    ) -> SyncResult<SignalOutcome> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Ok(SignalOutcome::Unchanged);
        }

        let renamed = self.store.with_connection(|conn| -> RepoResult<bool> {
            let uow = UnitOfWork::begin(conn)?;
            let renamed = uow.users().rename(user_id, display_name)?;
            uow.commit()?;
            Ok(renamed)
        })?;

        if renamed {
            info!("event=signal_member_update module=sync status=ok user_id={user_id}");
            Ok(SignalOutcome::Applied { notified: false })
        } else {
            Ok(SignalOutcome::Unchanged)
        }
    }

    async fn notify(&self, change: MembershipChange) -> bool {
        let now = self.clock.now();
        if !self
            .cooldown
            .register_action(&change.user_id, &change.event_id, now)
        {
            debug!(
                "event=notify_suppressed module=sync status=skipped event_id={} user_id={} kind={:?}",
                change.event_id, change.user_id, change.kind
            );
            return false;
        }
        let report = self.publisher.publish(std::slice::from_ref(&change)).await;
        report.sent > 0 && report.failed == 0
    }
}

fn apply_join(
    conn: &mut Connection,
    event_id: &str,
    user_id: &str,
    display_name: &str,
) -> RepoResult<Option<MembershipChange>> {
    let uow = UnitOfWork::begin(conn)?;
    if uow.participations().exists(event_id, user_id)? {
        return Ok(None);
    }

    let user = uow.users().get_or_create(user_id, display_name)?;
    if !uow.participations().insert(event_id, user_id)? {
        return Ok(None);
    }
    let event_name = event_display_name(&uow, event_id)?;
    uow.commit()?;

    Ok(Some(MembershipChange::join(
        event_id,
        event_name,
        user_id,
        user.display_name,
    )))
}

fn apply_leave(
    conn: &mut Connection,
    event_id: &str,
    user_id: &str,
) -> RepoResult<Option<MembershipChange>> {
    let uow = UnitOfWork::begin(conn)?;
    if !uow.participations().remove(event_id, user_id)? {
        return Ok(None);
    }

    let user_name = uow
        .users()
        .get(user_id)?
        .map(|user| user.display_name)
        .unwrap_or_else(|| placeholder_display_name(user_id));
    let event_name = event_display_name(&uow, event_id)?;
    uow.commit()?;

    Ok(Some(MembershipChange::leave(
        event_id, event_name, user_id, user_name,
    )))
}

/// Event name for messages; the id when no full pass has stored it yet.
fn event_display_name(uow: &UnitOfWork<'_>, event_id: &str) -> RepoResult<String> {
    Ok(uow
        .events()
        .get(event_id)?
        .map(|event| event.name)
        .unwrap_or_else(|| event_id.to_string()))
}

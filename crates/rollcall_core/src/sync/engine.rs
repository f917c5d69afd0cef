//! Full reconciliation pass between the remote feed and the local store.
//!
//! # Responsibility
//! - Snapshot remote events, rosters and the member roster (bounded calls).
//! - Apply the snapshot to the store in one transaction.
//! - Gate the resulting changes through the shared cooldown, then publish.
//!
//! # Invariants
//! - All store mutations of one pass commit together or not at all.
//! - A failed roster fetch leaves that event's local state untouched.
//! - Archived events never revert to active.
//! - Cooldown gates notifications only, never state.
//! - Participations written by real-time signals during the remote fetch are
//!   never reverted by the pass.

use super::cooldown::CooldownTracker;
use super::differ::{diff, MembershipDiff};
use super::error::{SyncError, SyncResult};
use crate::clock::Clock;
use crate::db::Store;
use crate::model::change::MembershipChange;
use crate::model::event::Event;
use crate::model::user::placeholder_display_name;
use crate::model::{EventId, UserId};
use crate::notify::{NotificationPublisher, PublishReport};
use crate::remote::{EventSnapshot, MembershipSource, RemoteResult, UserSnapshot};
use crate::repo::event_repo::{EventRepository, SqliteEventRepository};
use crate::repo::participation_repo::{ParticipationRepository, SqliteParticipationRepository};
use crate::repo::unit_of_work::UnitOfWork;
use crate::repo::user_repo::{SqliteUserRepository, UserRepository};
use crate::repo::RepoResult;
use log::{debug, error, info, warn};
use rusqlite::Connection;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Summary of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub pass_id: String,
    pub remote_events: usize,
    pub events_created: usize,
    pub events_renamed: usize,
    pub events_archived: usize,
    /// Remote events whose roster could not be fetched this pass.
    pub skipped_events: Vec<EventId>,
    pub joins: usize,
    pub leaves: usize,
    pub users_added: usize,
    pub users_removed: usize,
    pub users_renamed: usize,
    /// Member roster was available and applied.
    pub roster_synced: bool,
    /// Applied changes, in discovery order.
    pub changes: Vec<MembershipChange>,
    pub notifications_suppressed: usize,
    pub publish: PublishReport,
}

/// Remote state captured before the store transaction opens.
struct RemoteSnapshot {
    events: Vec<EventSnapshot>,
    /// Only events whose roster was fetched successfully.
    rosters: HashMap<EventId, FetchedRoster>,
    members: Option<FetchedRoster>,
}

/// A remote roster plus the local ids read just before fetching it.
///
/// Diffs run against `local`, not the store at apply time, so rows written
/// by real-time signals while the pass awaits the remote are left alone.
struct FetchedRoster {
    remote: Vec<UserSnapshot>,
    local: BTreeSet<UserId>,
}

pub struct ReconciliationEngine {
    store: Store,
    source: Arc<dyn MembershipSource>,
    publisher: Arc<NotificationPublisher>,
    cooldown: Arc<CooldownTracker>,
    clock: Arc<dyn Clock>,
    remote_timeout: Duration,
}

impl ReconciliationEngine {
    pub fn new(
        store: Store,
        source: Arc<dyn MembershipSource>,
        publisher: Arc<NotificationPublisher>,
        cooldown: Arc<CooldownTracker>,
        clock: Arc<dyn Clock>,
        remote_timeout: Duration,
    ) -> Self {
        Self {
            store,
            source,
            publisher,
            cooldown,
            clock,
            remote_timeout,
        }
    }

    /// Runs one full pass.
    ///
    /// # Errors
    /// - `SyncError::Remote` / `SyncError::Timeout` when the active-event list
    ///   cannot be read; nothing is applied.
    /// - `SyncError::Repo` when the transaction fails; it is rolled back.
    pub async fn run_pass(&self) -> SyncResult<ReconcileReport> {
        let pass_id = Uuid::new_v4().to_string();
        let started_at = Instant::now();
        info!("event=reconcile_pass module=sync status=start pass_id={pass_id}");

        let pruned = self.cooldown.prune_expired(self.clock.now());
        if pruned > 0 {
            debug!("event=cooldown_prune module=sync status=ok pass_id={pass_id} pruned={pruned}");
        }

        let result = self.reconcile(pass_id.clone()).await;
        match &result {
            Ok(report) => info!(
                "event=reconcile_pass module=sync status=ok pass_id={} duration_ms={} remote_events={} created={} archived={} joins={} leaves={} skipped={} users_added={} users_removed={} notified={} suppressed={}",
                pass_id,
                started_at.elapsed().as_millis(),
                report.remote_events,
                report.events_created,
                report.events_archived,
                report.joins,
                report.leaves,
                report.skipped_events.len(),
                report.users_added,
                report.users_removed,
                report.changes.len() - report.notifications_suppressed,
                report.notifications_suppressed
            ),
            Err(err) => error!(
                "event=reconcile_pass module=sync status=error pass_id={} duration_ms={} error={}",
                pass_id,
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    async fn reconcile(&self, pass_id: String) -> SyncResult<ReconcileReport> {
        let mut report = ReconcileReport {
            pass_id,
            ..ReconcileReport::default()
        };

        let snapshot = self.fetch_snapshot(&mut report).await?;
        report.remote_events = snapshot.events.len();

        let changes = self
            .store
            .with_connection(|conn| apply_snapshot(conn, &snapshot, &mut report))?;

        let now = self.clock.now();
        let mut to_publish = Vec::new();
        for change in &changes {
            if self
                .cooldown
                .register_action(&change.user_id, &change.event_id, now)
            {
                to_publish.push(change.clone());
            } else {
                report.notifications_suppressed += 1;
                debug!(
                    "event=notify_suppressed module=sync status=skipped pass_id={} event_id={} user_id={} kind={:?}",
                    report.pass_id, change.event_id, change.user_id, change.kind
                );
            }
        }
        report.changes = changes;
        report.publish = self.publisher.publish(&to_publish).await;

        Ok(report)
    }

    async fn fetch_snapshot(&self, report: &mut ReconcileReport) -> SyncResult<RemoteSnapshot> {
        let listed = self
            .bounded("list_active_events", self.source.list_active_events())
            .await?;

        let mut seen = HashSet::new();
        let events: Vec<EventSnapshot> = listed
            .into_iter()
            .filter(|event| seen.insert(event.id.clone()))
            .collect();

        let archived = self.store.with_connection(|conn| archived_event_ids(conn))?;

        let mut rosters = HashMap::new();
        for event in &events {
            if archived.contains(&event.id) {
                continue;
            }
            let local = self.store.with_connection(|conn| {
                SqliteParticipationRepository::new(conn).user_ids_for_event(&event.id)
            })?;
            match self
                .bounded(
                    "list_event_participants",
                    self.source.list_event_participants(&event.id),
                )
                .await
            {
                Ok(remote) => {
                    rosters.insert(event.id.clone(), FetchedRoster { remote, local });
                }
                Err(err) => {
                    warn!(
                        "event=roster_fetch module=sync status=error pass_id={} event_id={} event_name={} error={}",
                        report.pass_id, event.id, event.name, err
                    );
                    report.skipped_events.push(event.id.clone());
                }
            }
        }

        let local_users = self.store.with_connection(|conn| -> RepoResult<BTreeSet<UserId>> {
            Ok(SqliteUserRepository::new(conn)
                .list_all()?
                .into_iter()
                .map(|user| user.external_id)
                .collect())
        })?;
        let members = match self
            .bounded("list_guild_members", self.source.list_guild_members())
            .await
        {
            Ok(members) if members.is_empty() => {
                warn!(
                    "event=member_fetch module=sync status=skipped pass_id={} reason=empty_roster",
                    report.pass_id
                );
                None
            }
            Ok(remote) => Some(FetchedRoster {
                remote,
                local: local_users,
            }),
            Err(err) => {
                warn!(
                    "event=member_fetch module=sync status=error pass_id={} error={}",
                    report.pass_id, err
                );
                None
            }
        };

        Ok(RemoteSnapshot {
            events,
            rosters,
            members,
        })
    }

    async fn bounded<T>(
        &self,
        stage: &'static str,
        call: impl Future<Output = RemoteResult<T>>,
    ) -> SyncResult<T> {
        match tokio::time::timeout(self.remote_timeout, call).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::Timeout(stage)),
        }
    }
}

fn archived_event_ids(conn: &Connection) -> RepoResult<HashSet<EventId>> {
    Ok(SqliteEventRepository::new(conn)
        .list_all()?
        .into_iter()
        .filter(|event| event.passed)
        .map(|event| event.external_id)
        .collect())
}

fn apply_snapshot(
    conn: &mut Connection,
    snapshot: &RemoteSnapshot,
    report: &mut ReconcileReport,
) -> RepoResult<Vec<MembershipChange>> {
    let uow = UnitOfWork::begin(conn)?;
    let local_events: BTreeMap<EventId, Event> = uow
        .events()
        .list_all()?
        .into_iter()
        .map(|event| (event.external_id.clone(), event))
        .collect();

    for remote in &snapshot.events {
        match local_events.get(&remote.id) {
            None => {
                if uow.events().create(&remote.id, &remote.name)? {
                    report.events_created += 1;
                    info!(
                        "event=event_created module=sync status=ok pass_id={} event_id={} event_name={}",
                        report.pass_id, remote.id, remote.name
                    );
                }
            }
            Some(local) if local.passed => {
                debug!(
                    "event=event_archived_seen module=sync status=skipped pass_id={} event_id={}",
                    report.pass_id, remote.id
                );
            }
            Some(local) if local.name != remote.name => {
                if uow.events().rename(&remote.id, &remote.name)? {
                    report.events_renamed += 1;
                }
            }
            Some(_) => {}
        }
    }

    let mut changes = Vec::new();
    for remote in &snapshot.events {
        if local_events.get(&remote.id).is_some_and(|event| event.passed) {
            continue;
        }
        let Some(roster) = snapshot.rosters.get(&remote.id) else {
            continue;
        };
        apply_event_roster(&uow, remote, roster, report, &mut changes)?;
    }

    if let Some(members) = &snapshot.members {
        sync_users(&uow, members, report)?;
        report.roster_synced = true;
    }

    let remote_ids: HashSet<&str> = snapshot.events.iter().map(|e| e.id.as_str()).collect();
    for event in local_events.values() {
        if event.passed || remote_ids.contains(event.external_id.as_str()) {
            continue;
        }
        if uow.events().mark_passed(&event.external_id)? {
            report.events_archived += 1;
            info!(
                "event=event_archived module=sync status=ok pass_id={} event_id={} event_name={}",
                report.pass_id, event.external_id, event.name
            );
        }
    }

    uow.commit()?;
    Ok(changes)
}

fn apply_event_roster(
    uow: &UnitOfWork<'_>,
    event: &EventSnapshot,
    roster: &FetchedRoster,
    report: &mut ReconcileReport,
    changes: &mut Vec<MembershipChange>,
) -> RepoResult<()> {
    let by_id: HashMap<&str, &UserSnapshot> = roster
        .remote
        .iter()
        .map(|user| (user.id.as_str(), user))
        .collect();
    let remote_ids: BTreeSet<UserId> = roster.remote.iter().map(|user| user.id.clone()).collect();

    // Inserts and removals are idempotent; a row already written by a
    // concurrent signal yields no change and no notification.
    let MembershipDiff { joined, left } = diff(&remote_ids, &roster.local);

    for user_id in joined {
        let display_name = by_id
            .get(user_id.as_str())
            .map(|user| user.best_display_name())
            .unwrap_or_else(|| placeholder_display_name(&user_id));
        let user = uow.users().get_or_create(&user_id, &display_name)?;
        if !uow.participations().insert(&event.id, &user_id)? {
            continue;
        }
        report.joins += 1;
        info!(
            "event=participation_join module=sync status=ok pass_id={} event_id={} user_id={} user_name={}",
            report.pass_id, event.id, user_id, user.display_name
        );
        changes.push(MembershipChange::join(
            event.id.clone(),
            event.name.clone(),
            user_id,
            user.display_name,
        ));
    }

    for user_id in left {
        if !uow.participations().remove(&event.id, &user_id)? {
            continue;
        }
        let user_name = uow
            .users()
            .get(&user_id)?
            .map(|user| user.display_name)
            .unwrap_or_else(|| placeholder_display_name(&user_id));
        report.leaves += 1;
        info!(
            "event=participation_leave module=sync status=ok pass_id={} event_id={} user_id={} user_name={}",
            report.pass_id, event.id, user_id, user_name
        );
        changes.push(MembershipChange::leave(
            event.id.clone(),
            event.name.clone(),
            user_id,
            user_name,
        ));
    }

    Ok(())
}

fn sync_users(
    uow: &UnitOfWork<'_>,
    members: &FetchedRoster,
    report: &mut ReconcileReport,
) -> RepoResult<()> {
    let remote: BTreeMap<&str, &UserSnapshot> = members
        .remote
        .iter()
        .map(|member| (member.id.as_str(), member))
        .collect();
    let local: BTreeMap<UserId, String> = uow
        .users()
        .list_all()?
        .into_iter()
        .map(|user| (user.external_id, user.display_name))
        .collect();

    let remote_ids: BTreeSet<UserId> = remote.keys().map(|id| id.to_string()).collect();
    let MembershipDiff { joined, left } = diff(&remote_ids, &members.local);

    for user_id in &joined {
        if local.contains_key(user_id) {
            continue;
        }
        if let Some(member) = remote.get(user_id.as_str()) {
            uow.users()
                .get_or_create(user_id, &member.best_display_name())?;
            report.users_added += 1;
        }
    }

    for user_id in &left {
        if uow.users().delete(user_id)? {
            report.users_removed += 1;
        }
    }

    for (user_id, current_name) in &local {
        let Some(fresh_name) = remote
            .get(user_id.as_str())
            .and_then(|member| member.display_name.as_deref())
            .map(str::trim)
            .filter(|name| !name.is_empty())
        else {
            continue;
        };
        if fresh_name != current_name.as_str() && uow.users().rename(user_id, fresh_name)? {
            report.users_renamed += 1;
        }
    }

    if !joined.is_empty() || !left.is_empty() {
        info!(
            "event=member_sync module=sync status=ok pass_id={} added={} removed={} renamed={}",
            report.pass_id, report.users_added, report.users_removed, report.users_renamed
        );
    }
    Ok(())
}

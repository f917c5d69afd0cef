//! Wiring of the engine, the incremental handler and their shared state.

use super::cooldown::CooldownTracker;
use super::engine::ReconciliationEngine;
use super::incremental::{IncrementalHandler, MembershipSignal};
use super::scheduler::{run_reconciliation_loop, run_signal_loop};
use crate::clock::Clock;
use crate::config::SyncConfig;
use crate::db::Store;
use crate::notify::{NotificationPublisher, NotificationSink};
use crate::remote::MembershipSource;
use crate::repo::stats::load_stats;
use log::{info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Buffer of the real-time signal channel.
pub const SIGNAL_CHANNEL_CAPACITY: usize = 256;

/// Creates the channel feeding [`SyncService::spawn`].
pub fn signal_channel() -> (
    mpsc::Sender<MembershipSignal>,
    mpsc::Receiver<MembershipSignal>,
) {
    mpsc::channel(SIGNAL_CHANNEL_CAPACITY)
}

/// Engine and handler sharing one store, one publisher and one cooldown.
pub struct SyncService {
    store: Store,
    engine: Arc<ReconciliationEngine>,
    handler: Arc<IncrementalHandler>,
    reconcile_interval: Option<Duration>,
    signal_timeout: Duration,
}

impl SyncService {
    pub fn new(
        store: Store,
        source: Arc<dyn MembershipSource>,
        sink: Arc<dyn NotificationSink>,
        clock: Arc<dyn Clock>,
        config: &SyncConfig,
    ) -> Self {
        let cooldown = Arc::new(CooldownTracker::with_window(config.cooldown_window()));
        let publisher = Arc::new(NotificationPublisher::new(
            sink,
            config.notification_channel_id.clone(),
            Arc::clone(&clock),
            config.remote_timeout(),
        ));
        let engine = Arc::new(ReconciliationEngine::new(
            store.clone(),
            source,
            Arc::clone(&publisher),
            Arc::clone(&cooldown),
            Arc::clone(&clock),
            config.remote_timeout(),
        ));
        let handler = Arc::new(IncrementalHandler::new(
            store.clone(),
            publisher,
            cooldown,
            clock,
        ));

        Self {
            store,
            engine,
            handler,
            reconcile_interval: config.reconcile_interval(),
            signal_timeout: config.signal_timeout(),
        }
    }

    pub fn engine(&self) -> Arc<ReconciliationEngine> {
        Arc::clone(&self.engine)
    }

    pub fn handler(&self) -> Arc<IncrementalHandler> {
        Arc::clone(&self.handler)
    }

    /// Starts the reconciliation loop and the signal loop on the current
    /// tokio runtime.
    pub fn spawn(&self, signals: mpsc::Receiver<MembershipSignal>) -> SyncTasks {
        match self.store.with_connection(|conn| load_stats(conn)) {
            Ok(stats) => info!(
                "event=sync_start module=sync status=ok users={} active_events={} archived_events={} participations={}",
                stats.users, stats.active_events, stats.archived_events, stats.participations
            ),
            Err(err) => warn!("event=sync_start module=sync status=degraded error={err}"),
        }

        SyncTasks {
            reconciliation: tokio::spawn(run_reconciliation_loop(
                self.engine(),
                self.reconcile_interval,
            )),
            signals: tokio::spawn(run_signal_loop(
                self.handler(),
                signals,
                self.signal_timeout,
            )),
        }
    }
}

/// Handles of the two background loops.
pub struct SyncTasks {
    pub reconciliation: JoinHandle<()>,
    pub signals: JoinHandle<()>,
}

impl SyncTasks {
    pub fn abort(&self) {
        self.reconciliation.abort();
        self.signals.abort();
    }
}

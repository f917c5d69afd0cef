//! Long-running loops driving the engine and the incremental handler.

use super::engine::ReconciliationEngine;
use super::incremental::{IncrementalHandler, MembershipSignal};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Runs one pass at startup, then one per `interval` until cancelled.
///
/// `None` runs the startup pass only. A failed pass is logged and retried on
/// the next tick; a slow pass delays the following tick instead of bursting.
pub async fn run_reconciliation_loop(
    engine: Arc<ReconciliationEngine>,
    interval: Option<Duration>,
) {
    run_logged(&engine).await;

    let Some(period) = interval else {
        info!("event=reconcile_schedule module=sync status=disabled");
        return;
    };
    info!(
        "event=reconcile_schedule module=sync status=start interval_secs={}",
        period.as_secs()
    );

    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        run_logged(&engine).await;
    }
}

async fn run_logged(engine: &ReconciliationEngine) {
    // run_pass already logs the error with its pass id.
    if engine.run_pass().await.is_err() {
        debug!("event=reconcile_schedule module=sync status=retry_next_tick");
    }
}

/// Applies signals one at a time, in arrival order, until every sender is
/// dropped. Each signal is bounded by `timeout`; failures never stop the loop.
pub async fn run_signal_loop(
    handler: Arc<IncrementalHandler>,
    mut signals: mpsc::Receiver<MembershipSignal>,
    timeout: Duration,
) {
    info!("event=signal_loop module=sync status=start");
    while let Some(signal) = signals.recv().await {
        let kind = signal.kind();
        match tokio::time::timeout(timeout, handler.dispatch(signal)).await {
            Ok(Ok(outcome)) => {
                debug!("event=signal_dispatch module=sync status=ok kind={kind} outcome={outcome:?}")
            }
            Ok(Err(err)) => {
                error!("event=signal_dispatch module=sync status=error kind={kind} error={err}")
            }
            Err(_) => warn!(
                "event=signal_dispatch module=sync status=timeout kind={kind} timeout_ms={}",
                timeout.as_millis()
            ),
        }
    }
    info!("event=signal_loop module=sync status=closed");
}

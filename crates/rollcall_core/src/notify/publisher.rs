//! Best-effort delivery of membership change batches.

use super::message::{format_change_line, format_header};
use super::sink::NotificationSink;
use crate::clock::Clock;
use crate::model::change::MembershipChange;
use log::{debug, error, warn};
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one publish call. Never an error: failures are counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReport {
    /// Messages handed to the channel (header included).
    pub sent: usize,
    /// Messages whose delivery failed or timed out.
    pub failed: usize,
    /// Channel unavailable; nothing was attempted.
    pub skipped: bool,
}

/// Publishes one header plus one line per change to the configured channel.
pub struct NotificationPublisher {
    sink: Arc<dyn NotificationSink>,
    channel_id: Option<String>,
    clock: Arc<dyn Clock>,
    send_timeout: Duration,
}

impl NotificationPublisher {
    /// `channel_id = None` disables publishing entirely.
    pub fn new(
        sink: Arc<dyn NotificationSink>,
        channel_id: Option<String>,
        clock: Arc<dyn Clock>,
        send_timeout: Duration,
    ) -> Self {
        Self {
            sink,
            channel_id,
            clock,
            send_timeout,
        }
    }

    pub fn channel_id(&self) -> Option<&str> {
        self.channel_id.as_deref()
    }

    /// Sends `changes` in order. An empty slice sends nothing.
    ///
    /// # Failure semantics
    /// - Unresolvable channel: logged, whole batch skipped.
    /// - Failed header or line: logged, remaining lines still sent.
    pub async fn publish(&self, changes: &[MembershipChange]) -> PublishReport {
        let mut report = PublishReport::default();
        if changes.is_empty() {
            return report;
        }

        let Some(channel_id) = self.channel_id.as_deref() else {
            debug!(
                "event=notify_publish module=notify status=skipped reason=no_channel changes={}",
                changes.len()
            );
            report.skipped = true;
            return report;
        };

        let channel = match self.sink.resolve_channel(channel_id).await {
            Ok(channel) => channel,
            Err(err) => {
                warn!(
                    "event=notify_resolve module=notify status=error channel_id={} changes={} error={}",
                    channel_id,
                    changes.len(),
                    err
                );
                report.skipped = true;
                return report;
            }
        };

        let messages = std::iter::once(format_header(self.clock.now()))
            .chain(changes.iter().map(format_change_line));
        for message in messages {
            match tokio::time::timeout(self.send_timeout, channel.send(&message)).await {
                Ok(Ok(())) => report.sent += 1,
                Ok(Err(err)) => {
                    report.failed += 1;
                    error!(
                        "event=notify_send module=notify status=error channel_id={} error={}",
                        channel_id, err
                    );
                }
                Err(_) => {
                    report.failed += 1;
                    error!(
                        "event=notify_send module=notify status=timeout channel_id={} timeout_ms={}",
                        channel_id,
                        self.send_timeout.as_millis()
                    );
                }
            }
        }

        debug!(
            "event=notify_publish module=notify status=ok channel_id={} sent={} failed={}",
            channel_id, report.sent, report.failed
        );
        report
    }
}

//! Notification sink contract and a recording implementation.

use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

pub type NotifyResult<T> = Result<T, NotifyError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    ChannelNotFound(String),
    AccessDenied(String),
    /// Transient delivery failure for one message.
    Delivery(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ChannelNotFound(channel_id) => {
                write!(f, "notification channel not found: {channel_id}")
            }
            Self::AccessDenied(channel_id) => {
                write!(f, "access denied to notification channel: {channel_id}")
            }
            Self::Delivery(details) => write!(f, "notification delivery failed: {details}"),
        }
    }
}

impl Error for NotifyError {}

/// A resolved output channel.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn send(&self, text: &str) -> NotifyResult<()>;
}

/// Resolves channel identifiers into sendable channels.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn resolve_channel(&self, channel_id: &str)
        -> NotifyResult<Arc<dyn NotificationChannel>>;
}

#[derive(Default)]
struct RecordingState {
    messages: Vec<(String, String)>,
    resolve_error: Option<NotifyError>,
    failing_sends: usize,
    send_delay: Option<Duration>,
}

/// Sink that records every delivered message, for tests and demos.
///
/// Failures can be injected for channel resolution and for the next `n`
/// sends.
#[derive(Clone, Default)]
pub struct RecordingSink {
    state: Arc<Mutex<RecordingState>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, RecordingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns delivered message texts, in delivery order.
    pub fn messages(&self) -> Vec<String> {
        self.state()
            .messages
            .iter()
            .map(|(_, text)| text.clone())
            .collect()
    }

    /// Returns delivered messages with their channel id.
    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.state().messages.clone()
    }

    pub fn clear(&self) {
        self.state().messages.clear();
    }

    pub fn fail_resolve(&self, error: Option<NotifyError>) {
        self.state().resolve_error = error;
    }

    /// Makes the next `count` sends fail with a delivery error.
    pub fn fail_next_sends(&self, count: usize) {
        self.state().failing_sends = count;
    }

    /// Delays every send, e.g. to trigger timeouts.
    pub fn delay_sends(&self, delay: Option<Duration>) {
        self.state().send_delay = delay;
    }
}

struct RecordingChannel {
    channel_id: String,
    sink: RecordingSink,
}

#[async_trait]
impl NotificationChannel for RecordingChannel {
    async fn send(&self, text: &str) -> NotifyResult<()> {
        let delay = self.sink.state().send_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.sink.state();
        if state.failing_sends > 0 {
            state.failing_sends -= 1;
            return Err(NotifyError::Delivery("injected failure".to_string()));
        }
        state
            .messages
            .push((self.channel_id.clone(), text.to_string()));
        Ok(())
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn resolve_channel(
        &self,
        channel_id: &str,
    ) -> NotifyResult<Arc<dyn NotificationChannel>> {
        if let Some(error) = self.state().resolve_error.clone() {
            return Err(error);
        }
        Ok(Arc::new(RecordingChannel {
            channel_id: channel_id.to_string(),
            sink: self.clone(),
        }))
    }
}

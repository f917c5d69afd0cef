//! In-memory membership source with failure injection.

use super::{EventSnapshot, MembershipSource, RemoteError, RemoteResult, UserSnapshot};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

#[derive(Default)]
struct SourceState {
    events: Vec<EventSnapshot>,
    participants: BTreeMap<String, Vec<UserSnapshot>>,
    members: Vec<UserSnapshot>,
    events_error: Option<RemoteError>,
    participant_errors: HashMap<String, RemoteError>,
    members_error: Option<RemoteError>,
    participant_delays: HashMap<String, Duration>,
}

/// Scriptable `MembershipSource` used by tests and the CLI demo.
#[derive(Default)]
pub struct StaticMembershipSource {
    state: Mutex<SourceState>,
}

impl StaticMembershipSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, SourceState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces one active event and its participant roster.
    pub fn set_event(&self, event: EventSnapshot, participants: Vec<UserSnapshot>) {
        let mut state = self.state();
        state.participants.insert(event.id.clone(), participants);
        state.events.retain(|existing| existing.id != event.id);
        state.events.push(event);
    }

    /// Removes an event from the active set.
    pub fn remove_event(&self, event_id: &str) {
        let mut state = self.state();
        state.events.retain(|existing| existing.id != event_id);
        state.participants.remove(event_id);
    }

    pub fn set_members(&self, members: Vec<UserSnapshot>) {
        self.state().members = members;
    }

    pub fn fail_events(&self, error: Option<RemoteError>) {
        self.state().events_error = error;
    }

    pub fn fail_participants(&self, event_id: &str, error: Option<RemoteError>) {
        let mut state = self.state();
        match error {
            Some(error) => {
                state.participant_errors.insert(event_id.to_string(), error);
            }
            None => {
                state.participant_errors.remove(event_id);
            }
        }
    }

    pub fn fail_members(&self, error: Option<RemoteError>) {
        self.state().members_error = error;
    }

    /// Delays every roster fetch for `event_id`, e.g. to trigger timeouts.
    pub fn delay_participants(&self, event_id: &str, delay: Duration) {
        self.state()
            .participant_delays
            .insert(event_id.to_string(), delay);
    }
}

#[async_trait]
impl MembershipSource for StaticMembershipSource {
    async fn list_active_events(&self) -> RemoteResult<Vec<EventSnapshot>> {
        let state = self.state();
        match &state.events_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.events.clone()),
        }
    }

    async fn list_event_participants(&self, event_id: &str) -> RemoteResult<Vec<UserSnapshot>> {
        let delay = self.state().participant_delays.get(event_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.state();
        if let Some(error) = state.participant_errors.get(event_id) {
            return Err(error.clone());
        }
        Ok(state
            .participants
            .get(event_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn list_guild_members(&self) -> RemoteResult<Vec<UserSnapshot>> {
        let state = self.state();
        match &state.members_error {
            Some(error) => Err(error.clone()),
            None => Ok(state.members.clone()),
        }
    }
}

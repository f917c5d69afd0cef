mod common;

use chrono::Duration;
use common::{harness, ids, user, CHANNEL_ID};
use rollcall_core::{NotifyError, RemoteError, SyncError, UserSnapshot};

#[tokio::test]
async fn startup_pass_creates_events_and_announces_joins() {
    let h = harness(60);
    let roster = [user("u1", "Alice"), user("u2", "Bob")];
    h.source.set_members(roster.to_vec());
    h.set_event("e1", "Raid night", &roster);

    let report = h.service.engine().run_pass().await.unwrap();

    assert!(!report.pass_id.is_empty());
    assert_eq!(report.remote_events, 1);
    assert_eq!(report.events_created, 1);
    assert_eq!(report.joins, 2);
    assert_eq!(report.leaves, 0);
    assert_eq!(report.publish.sent, 3);
    assert_eq!(h.participants("e1"), ids(&["u1", "u2"]));
    assert_eq!(h.user("u2").unwrap().display_name, "Bob");
    assert_eq!(
        h.change_lines(),
        vec![
            "➕ Alice signed up for **Raid night**.",
            "➕ Bob signed up for **Raid night**.",
        ]
    );
    assert!(h
        .sink
        .deliveries()
        .iter()
        .all(|(channel, _)| channel == CHANNEL_ID));
}

#[tokio::test]
async fn withdrawn_participant_is_removed_and_announced() {
    let h = harness(60);
    let alice = user("u1", "Alice");
    let bob = user("u2", "Bob");
    h.source.set_members(vec![alice.clone(), bob.clone()]);
    h.set_event("e1", "Raid night", &[alice, bob.clone()]);
    h.service.engine().run_pass().await.unwrap();
    h.sink.clear();

    h.clock.advance(Duration::seconds(61));
    h.set_event("e1", "Raid night", &[bob]);
    let report = h.service.engine().run_pass().await.unwrap();

    assert_eq!(report.joins, 0);
    assert_eq!(report.leaves, 1);
    assert_eq!(h.participants("e1"), ids(&["u2"]));
    assert_eq!(h.change_lines(), vec!["🛑 Alice withdrew from **Raid night**."]);
}

#[tokio::test]
async fn unchanged_remote_state_is_a_quiet_no_op() {
    let h = harness(60);
    let roster = [user("u1", "Alice")];
    h.source.set_members(roster.to_vec());
    h.set_event("e1", "Raid night", &roster);
    h.service.engine().run_pass().await.unwrap();
    h.sink.clear();

    let report = h.service.engine().run_pass().await.unwrap();

    assert_eq!(report.events_created, 0);
    assert!(report.changes.is_empty());
    assert!(h.sink.messages().is_empty());
}

#[tokio::test]
async fn cooldown_suppresses_notifications_but_not_state() {
    let h = harness(60);
    let alice = user("u1", "Alice");
    h.source.set_members(vec![alice.clone()]);
    h.set_event("e1", "Raid night", &[alice.clone()]);
    h.service.engine().run_pass().await.unwrap();
    h.sink.clear();

    h.clock.advance(Duration::seconds(10));
    h.set_event("e1", "Raid night", &[]);
    let report = h.service.engine().run_pass().await.unwrap();

    assert_eq!(report.leaves, 1);
    assert_eq!(report.notifications_suppressed, 1);
    assert!(h.participants("e1").is_empty());
    assert!(h.sink.messages().is_empty());

    h.clock.advance(Duration::seconds(61));
    h.set_event("e1", "Raid night", &[alice]);
    let report = h.service.engine().run_pass().await.unwrap();

    assert_eq!(report.joins, 1);
    assert_eq!(report.notifications_suppressed, 0);
    assert_eq!(h.change_lines(), vec!["➕ Alice signed up for **Raid night**."]);
}

#[tokio::test]
async fn zero_cooldown_announces_every_change() {
    let h = harness(0);
    let alice = user("u1", "Alice");
    h.source.set_members(vec![alice.clone()]);

    h.set_event("e1", "Raid night", &[alice.clone()]);
    h.service.engine().run_pass().await.unwrap();
    h.set_event("e1", "Raid night", &[]);
    h.service.engine().run_pass().await.unwrap();
    h.set_event("e1", "Raid night", &[alice]);
    h.service.engine().run_pass().await.unwrap();

    assert_eq!(
        h.change_lines(),
        vec![
            "➕ Alice signed up for **Raid night**.",
            "🛑 Alice withdrew from **Raid night**.",
            "➕ Alice signed up for **Raid night**.",
        ]
    );
}

#[tokio::test]
async fn failed_roster_leaves_only_that_event_untouched() {
    let h = harness(0);
    let alice = user("u1", "Alice");
    let bob = user("u2", "Bob");
    h.source.set_members(vec![alice.clone(), bob.clone()]);
    h.set_event("e1", "Raid night", &[alice.clone()]);
    h.set_event("e2", "Quiz", &[alice.clone()]);
    h.service.engine().run_pass().await.unwrap();

    h.set_event("e1", "Raid night", &[bob.clone()]);
    h.set_event("e2", "Quiz", &[bob]);
    h.source.fail_participants(
        "e1",
        Some(RemoteError::AccessDenied("missing permission".to_string())),
    );
    let report = h.service.engine().run_pass().await.unwrap();

    assert_eq!(report.skipped_events, vec!["e1".to_string()]);
    assert_eq!(h.participants("e1"), ids(&["u1"]));
    assert_eq!(h.participants("e2"), ids(&["u2"]));
    assert!(h.event("e1").unwrap().is_active());
}

#[tokio::test]
async fn vanished_event_is_archived_and_never_revived() {
    let h = harness(0);
    let alice = user("u1", "Alice");
    h.source.set_members(vec![alice.clone()]);
    h.set_event("e1", "Raid night", &[alice.clone()]);
    h.service.engine().run_pass().await.unwrap();

    h.source.remove_event("e1");
    let report = h.service.engine().run_pass().await.unwrap();
    assert_eq!(report.events_archived, 1);
    assert!(h.event("e1").unwrap().passed);
    assert_eq!(h.participants("e1"), ids(&["u1"]));

    h.set_event("e1", "Raid night (again)", &[]);
    h.sink.clear();
    let report = h.service.engine().run_pass().await.unwrap();

    let event = h.event("e1").unwrap();
    assert!(event.passed);
    assert_eq!(event.name, "Raid night");
    assert_eq!(report.events_created, 0);
    assert_eq!(report.events_archived, 0);
    assert_eq!(h.participants("e1"), ids(&["u1"]));
    assert!(h.sink.messages().is_empty());
}

#[tokio::test]
async fn renamed_event_updates_name_used_in_messages() {
    let h = harness(0);
    let alice = user("u1", "Alice");
    h.source.set_members(vec![alice.clone()]);
    h.set_event("e1", "Raid night", &[]);
    h.service.engine().run_pass().await.unwrap();

    h.set_event("e1", "Raid night (moved)", &[alice]);
    let report = h.service.engine().run_pass().await.unwrap();

    assert_eq!(report.events_renamed, 1);
    assert_eq!(h.event("e1").unwrap().name, "Raid night (moved)");
    assert_eq!(
        h.change_lines(),
        vec!["➕ Alice signed up for **Raid night (moved)**."]
    );
}

#[tokio::test]
async fn failed_event_listing_aborts_the_pass_without_changes() {
    let h = harness(0);
    let alice = user("u1", "Alice");
    h.source.set_members(vec![alice.clone()]);
    h.set_event("e1", "Raid night", &[alice]);
    h.service.engine().run_pass().await.unwrap();
    h.sink.clear();

    h.set_event("e1", "Raid night", &[]);
    h.source
        .fail_events(Some(RemoteError::Transient("gateway reset".to_string())));
    let err = h.service.engine().run_pass().await.unwrap_err();

    assert!(matches!(err, SyncError::Remote(RemoteError::Transient(_))));
    assert_eq!(h.participants("e1"), ids(&["u1"]));
    assert!(h.event("e1").unwrap().is_active());
    assert!(h.sink.messages().is_empty());

    h.source.fail_events(None);
    let report = h.service.engine().run_pass().await.unwrap();
    assert_eq!(report.leaves, 1);
}

#[tokio::test]
async fn member_roster_adds_removes_and_renames_users() {
    let h = harness(0);
    h.source
        .set_members(vec![user("u1", "Alice"), user("u2", "Bob")]);
    let report = h.service.engine().run_pass().await.unwrap();
    assert!(report.roster_synced);
    assert_eq!(report.users_added, 2);

    h.source
        .set_members(vec![user("u1", "Alicia"), user("u3", "Carol")]);
    let report = h.service.engine().run_pass().await.unwrap();

    assert_eq!(report.users_added, 1);
    assert_eq!(report.users_removed, 1);
    assert_eq!(report.users_renamed, 1);
    assert_eq!(h.user("u1").unwrap().display_name, "Alicia");
    assert!(h.user("u2").is_none());
    assert_eq!(h.user("u3").unwrap().display_name, "Carol");
    assert!(h.sink.messages().is_empty());
}

#[tokio::test]
async fn empty_or_failed_member_roster_is_ignored() {
    let h = harness(0);
    h.source.set_members(vec![user("u1", "Alice")]);
    h.service.engine().run_pass().await.unwrap();

    h.source.set_members(Vec::new());
    let report = h.service.engine().run_pass().await.unwrap();
    assert!(!report.roster_synced);
    assert!(h.user("u1").is_some());

    h.source.set_members(vec![user("u2", "Bob")]);
    h.source
        .fail_members(Some(RemoteError::AccessDenied("members intent".to_string())));
    let report = h.service.engine().run_pass().await.unwrap();
    assert!(!report.roster_synced);
    assert!(h.user("u1").is_some());
    assert!(h.user("u2").is_none());
}

#[tokio::test]
async fn participant_without_display_name_gets_placeholder() {
    let h = harness(0);
    h.set_event("e1", "Raid night", &[UserSnapshot::anonymous("u9")]);

    h.service.engine().run_pass().await.unwrap();

    assert_eq!(h.user("u9").unwrap().display_name, "User u9");
    assert_eq!(h.change_lines(), vec!["➕ User u9 signed up for **Raid night**."]);
}

#[tokio::test]
async fn unreachable_channel_still_applies_state() {
    let h = harness(0);
    h.sink
        .fail_resolve(Some(NotifyError::ChannelNotFound(CHANNEL_ID.to_string())));
    h.set_event("e1", "Raid night", &[user("u1", "Alice")]);

    let report = h.service.engine().run_pass().await.unwrap();

    assert!(report.publish.skipped);
    assert_eq!(report.joins, 1);
    assert_eq!(h.participants("e1"), ids(&["u1"]));
    assert!(h.sink.messages().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_roster_times_out_and_is_skipped() {
    let h = harness(0);
    h.set_event("e1", "Raid night", &[user("u1", "Alice")]);
    h.set_event("e2", "Quiz", &[user("u2", "Bob")]);
    h.source
        .delay_participants("e1", std::time::Duration::from_secs(60));

    let report = h.service.engine().run_pass().await.unwrap();

    assert_eq!(report.skipped_events, vec!["e1".to_string()]);
    assert!(h.participants("e1").is_empty());
    assert_eq!(h.participants("e2"), ids(&["u2"]));
}

#[tokio::test]
async fn storage_failure_rolls_back_the_whole_pass() {
    let h = harness(0);
    h.store
        .with_connection(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_participation BEFORE INSERT ON participations
                 BEGIN SELECT RAISE(ABORT, 'participations are read-only'); END;",
            )
        })
        .unwrap();
    h.set_event("e1", "Raid night", &[user("u1", "Alice")]);

    let err = h.service.engine().run_pass().await.unwrap_err();

    assert!(matches!(err, SyncError::Repo(_)));
    assert!(h.event("e1").is_none());
    assert!(h.user("u1").is_none());
    assert!(h.sink.messages().is_empty());

    h.store
        .with_connection(|conn| conn.execute_batch("DROP TRIGGER reject_participation;"))
        .unwrap();
    let report = h.service.engine().run_pass().await.unwrap();
    assert_eq!(report.events_created, 1);
    assert_eq!(h.participants("e1"), ids(&["u1"]));
}

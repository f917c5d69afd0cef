//! Rollcall command-line entry point.
//!
//! # Responsibility
//! - Load `.env` and environment configuration, start logging when a log
//!   directory is configured.
//! - Print core health and store statistics for quick sanity checks.
//! - `demo`: run the sync engine against a scripted in-memory feed.

use rollcall_core::{
    core_version, init_logging_with, load_stats, ping, EventSnapshot, MembershipSignal,
    RecordingSink, Store, StaticMembershipSource, SyncConfig, SyncService, SystemClock,
    UserSnapshot,
};
use std::error::Error;
use std::sync::Arc;

const DEMO_CHANNEL_ID: &str = "demo-announcements";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv::dotenv().ok();
    let config = SyncConfig::from_env()?;

    if let Some(log_dir) = config.log_dir.as_deref() {
        init_logging_with(&config.log_level, log_dir, true)?;
    }

    println!("rollcall_core ping={}", ping());
    println!("rollcall_core version={}", core_version());

    match std::env::args().nth(1).as_deref() {
        Some("demo") => run_demo(&config).await,
        Some(other) => Err(format!("unknown command `{other}`; expected `demo`").into()),
        None => print_stats(&config),
    }
}

fn print_stats(config: &SyncConfig) -> Result<(), Box<dyn Error>> {
    let store = Store::open(&config.db_path)?;
    let stats = store.with_connection(|conn| load_stats(conn))?;
    println!("db_path={}", config.db_path.display());
    println!(
        "users={} active_events={} archived_events={} participations={}",
        stats.users, stats.active_events, stats.archived_events, stats.participations
    );
    Ok(())
}

/// Two passes and one real-time signal against an in-memory store.
async fn run_demo(config: &SyncConfig) -> Result<(), Box<dyn Error>> {
    let demo_config = SyncConfig {
        cooldown_seconds: 0,
        notification_channel_id: Some(
            config
                .notification_channel_id
                .clone()
                .unwrap_or_else(|| DEMO_CHANNEL_ID.to_string()),
        ),
        ..config.clone()
    };

    let source = Arc::new(StaticMembershipSource::new());
    let alice = UserSnapshot::new("u1", "Alice");
    let bob = UserSnapshot::new("u2", "Bob");
    source.set_members(vec![alice.clone(), bob.clone()]);
    source.set_event(
        EventSnapshot::new("e1", "Raid night"),
        vec![alice.clone(), bob.clone()],
    );

    let sink = RecordingSink::new();
    let service = SyncService::new(
        Store::open_in_memory()?,
        source.clone(),
        Arc::new(sink.clone()),
        Arc::new(SystemClock),
        &demo_config,
    );
    let engine = service.engine();

    let first = engine.run_pass().await?;
    println!(
        "pass={} created={} joins={} leaves={}",
        first.pass_id, first.events_created, first.joins, first.leaves
    );

    source.set_event(EventSnapshot::new("e1", "Raid night"), vec![alice]);
    let second = engine.run_pass().await?;
    println!(
        "pass={} created={} joins={} leaves={}",
        second.pass_id, second.events_created, second.joins, second.leaves
    );

    let outcome = service
        .handler()
        .dispatch(MembershipSignal::Join {
            event_id: "e1".to_string(),
            user_id: "u3".to_string(),
            display_name: Some("Carol".to_string()),
        })
        .await?;
    println!("signal=join outcome={outcome:?}");

    for message in sink.messages() {
        println!("---\n{message}");
    }
    Ok(())
}

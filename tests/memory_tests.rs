//! Memory capacity, session isolation and TTL sweeping.

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use pretty_assertions::assert_eq;

use agenthub::agent::Agent;
use agenthub::hub::Hub;
use agenthub::memory::{MemoryStore, DEFAULT_SWEEP_INTERVAL};
use agenthub::types::Message;

use common::*;

#[test]
fn capacity_keeps_the_latest_messages_of_one_session_only() {
    let store = MemoryStore::new(3, Duration::from_secs(60));
    store.push("other", [Message::user("keep me")]);
    store.push("s", (0..5).map(|i| Message::user(format!("m{i}"))));

    let texts: Vec<_> = store.latest("s", 10).iter().map(Message::text).collect();
    assert_eq!(texts, vec!["m2", "m3", "m4"]);
    assert_eq!(store.len("other"), 1);
}

#[test]
fn system_message_is_outside_the_capacity() {
    let store = MemoryStore::new(2, Duration::from_secs(60));
    store.set_system(Message::system("be brief"));
    store.push("s", ["a", "b", "c"].map(Message::user));

    let context = store.context("s", 10);
    let texts: Vec<_> = context.iter().map(Message::text).collect();
    assert_eq!(texts, vec!["be brief", "b", "c"]);
}

#[test]
fn sweep_evicts_old_messages_and_empty_sessions() {
    let store = MemoryStore::new(10, Duration::from_secs(60));
    let mut old = Message::user("old");
    old.created_at = Utc::now() - chrono::Duration::seconds(120);
    store.push("stale", [old.clone()]);
    store.push("mixed", [old, Message::user("fresh")]);

    let evicted = store.sweep_expired(Utc::now());

    assert_eq!(evicted, 2);
    assert_eq!(store.len("stale"), 0);
    assert_eq!(store.session_ids(), vec!["mixed".to_string()]);
}

#[tokio::test]
async fn concurrent_runs_keep_sessions_apart() {
    let provider = Arc::new(ScriptedProvider::looping(text_response("ok")));
    let agent = Agent::builder("busy")
        .provider(provider)
        .memory_sweep(false)
        .build()
        .unwrap();

    let runs = (0..8).map(|i| {
        let agent = agent.clone();
        tokio::spawn(async move {
            let options = agent.run_options().with_session_id(format!("s{i}"));
            agent.run(options, format!("question {i}")).await
        })
    });
    for handle in futures::future::join_all(runs).await {
        assert!(handle.unwrap().is_ok());
    }

    for i in 0..8 {
        let history = agent.memory().latest(&format!("s{i}"), 10);
        let texts: Vec<_> = history.iter().map(Message::text).collect();
        assert_eq!(texts, vec![format!("question {i}"), "ok".to_string()]);
    }
}

#[tokio::test(start_paused = true)]
async fn idle_sessions_are_reaped_without_caller_action() {
    let agent = Agent::builder("chatty")
        .provider(Arc::new(ScriptedProvider::looping(text_response("hello"))))
        .build()
        .unwrap();
    for _ in 0..5 {
        assert!(agent.ask("hi").await.is_ok());
    }
    assert_eq!(agent.sessions().session_ids().len(), 5);

    let ttl = Duration::from_secs(agent.runtime().memory_timeout_secs);
    tokio::time::sleep(ttl + 2 * DEFAULT_SWEEP_INTERVAL).await;

    assert!(agent.sessions().session_ids().is_empty());
}

#[tokio::test(start_paused = true)]
async fn hub_reaps_its_shared_sessions() {
    let hub = Hub::with_session_ttl(Duration::from_secs(300));
    hub.sessions().create();
    let kept = hub.sessions().get_or_create("busy");

    tokio::time::sleep(Duration::from_secs(200)).await;
    kept.touch();
    tokio::time::sleep(Duration::from_secs(200)).await;

    assert_eq!(hub.sessions().session_ids(), vec!["busy".to_string()]);
}

//! Subscription Replay Integration Tests
//!
//! Tests that registry mutations produce the right control frames while
//! connected, are deferred while disconnected, and are replayed grouped by
//! mode after every (re)connect.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::collections::BTreeMap;
use std::time::Duration;

use common::{Harness, by_mode, fast_backoff, keys};
use upstox_feed::infrastructure::upstox::messages::Method;
use upstox_feed::{ConnectionEvent, FeedError, SubscriptionMode};

const QUIET: Duration = Duration::from_millis(100);

fn expected_groups() -> BTreeMap<SubscriptionMode, Vec<upstox_feed::InstrumentKey>> {
    BTreeMap::from([
        (SubscriptionMode::Ltpc, keys(&["NSE_EQ|A"])),
        (SubscriptionMode::Full, keys(&["NSE_EQ|B", "NSE_EQ|C"])),
        (SubscriptionMode::OptionGreeks, keys(&["NSE_FO|D"])),
    ])
}

fn register_mixed_modes(h: &Harness) {
    h.client.subscribe(["NSE_EQ|A", "NSE_EQ|B"]).unwrap();
    h.client
        .subscribe_with_mode(SubscriptionMode::Full, ["NSE_EQ|C"])
        .unwrap();
    h.client
        .subscribe_with_mode(SubscriptionMode::OptionGreeks, ["NSE_FO|D"])
        .unwrap();
    h.client
        .change_mode(SubscriptionMode::Full, ["NSE_EQ|B"])
        .unwrap();
}

#[tokio::test]
async fn deferred_subscriptions_are_replayed_once_per_mode() {
    let mut h = Harness::new(fast_backoff(10, 3));
    register_mixed_modes(&h);

    let mut server = h.connected().await;
    let replay = server.requests(3).await;

    assert_eq!(by_mode(&replay), expected_groups());
    server.assert_silent(QUIET).await;
}

#[tokio::test]
async fn reconnect_replays_registry_without_duplicates() {
    let mut h = Harness::new(fast_backoff(10, 3));
    register_mixed_modes(&h);

    let mut first = h.connected().await;
    assert_eq!(by_mode(&first.requests(3).await), expected_groups());

    first.hang_up();
    assert!(matches!(
        h.next_event().await,
        ConnectionEvent::Disconnected { .. }
    ));
    assert!(matches!(
        h.next_event().await,
        ConnectionEvent::Reconnecting { .. }
    ));
    assert_eq!(h.next_event().await, ConnectionEvent::Connected);

    let mut second = h.accept().await;
    let replay = second.requests(3).await;

    assert_eq!(by_mode(&replay), expected_groups());
    let total: usize = replay.iter().map(|r| r.data.instrument_keys.len()).sum();
    assert_eq!(total, 4);
    second.assert_silent(QUIET).await;
}

#[tokio::test]
async fn empty_registry_replays_nothing() {
    let mut h = Harness::new(fast_backoff(10, 3));
    let mut server = h.connected().await;
    server.assert_silent(QUIET).await;
}

#[tokio::test]
async fn connected_subscribe_sends_exactly_the_given_keys() {
    let mut h = Harness::new(fast_backoff(10, 3));
    h.client.subscribe(["NSE_EQ|A"]).unwrap();

    let mut server = h.connected().await;
    let _replay = server.next_request().await;

    h.client.subscribe(["NSE_EQ|B"]).unwrap();
    let request = server.next_request().await;

    assert_eq!(request.method, Method::Sub);
    assert_eq!(request.data.mode, SubscriptionMode::Ltpc);
    assert_eq!(request.data.instrument_keys, keys(&["NSE_EQ|B"]));
    assert_eq!(h.client.subscriptions().len(), 2);
}

#[tokio::test]
async fn duplicate_keys_are_sent_once() {
    let mut h = Harness::new(fast_backoff(10, 3));
    let mut server = h.connected().await;

    h.client
        .subscribe(["NSE_EQ|A", "NSE_EQ|B", "NSE_EQ|A"])
        .unwrap();
    let request = server.next_request().await;
    assert_eq!(request.data.instrument_keys, keys(&["NSE_EQ|A", "NSE_EQ|B"]));

    h.client
        .change_mode(SubscriptionMode::Full, ["NSE_EQ|B", "NSE_EQ|B"])
        .unwrap();
    let request = server.next_request().await;
    assert_eq!(request.method, Method::ChangeMode);
    assert_eq!(request.data.instrument_keys, keys(&["NSE_EQ|B"]));

    server.assert_silent(QUIET).await;
}

#[tokio::test]
async fn unsubscribe_sends_one_request_per_recorded_mode() {
    let mut h = Harness::new(fast_backoff(10, 3));
    let mut server = h.connected().await;

    h.client.subscribe(["NSE_EQ|A"]).unwrap();
    h.client
        .subscribe_with_mode(SubscriptionMode::Full, ["NSE_EQ|B"])
        .unwrap();
    let _subs = server.requests(2).await;

    h.client
        .unsubscribe(["NSE_EQ|A", "NSE_EQ|B", "NSE_EQ|UNKNOWN"])
        .unwrap();
    let requests = server.requests(2).await;

    assert!(requests.iter().all(|r| r.method == Method::Unsub));
    assert_eq!(requests[0].data.mode, SubscriptionMode::Ltpc);
    assert_eq!(requests[0].data.instrument_keys, keys(&["NSE_EQ|A"]));
    assert_eq!(requests[1].data.mode, SubscriptionMode::Full);
    assert_eq!(requests[1].data.instrument_keys, keys(&["NSE_EQ|B"]));
    assert!(h.client.subscriptions().is_empty());
    server.assert_silent(QUIET).await;
}

#[tokio::test]
async fn unsubscribe_of_unknown_keys_sends_nothing() {
    let mut h = Harness::new(fast_backoff(10, 3));
    let mut server = h.connected().await;

    h.client.unsubscribe(["NSE_EQ|UNKNOWN"]).unwrap();
    server.assert_silent(QUIET).await;
}

#[tokio::test]
async fn change_mode_sends_only_registered_keys() {
    let mut h = Harness::new(fast_backoff(10, 3));
    h.client.subscribe(["NSE_EQ|X"]).unwrap();

    let mut server = h.connected().await;
    let _replay = server.next_request().await;

    h.client
        .change_mode(SubscriptionMode::Full, ["NSE_EQ|X", "NSE_EQ|UNKNOWN"])
        .unwrap();
    let request = server.next_request().await;

    assert_eq!(request.method, Method::ChangeMode);
    assert_eq!(request.data.mode, SubscriptionMode::Full);
    assert_eq!(request.data.instrument_keys, keys(&["NSE_EQ|X"]));

    let subscriptions = h.client.subscriptions();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].1.mode, SubscriptionMode::Full);

    h.client
        .change_mode(SubscriptionMode::OptionGreeks, ["NSE_EQ|UNKNOWN"])
        .unwrap();
    server.assert_silent(QUIET).await;
}

#[tokio::test]
async fn empty_key_lists_are_rejected_without_network_effect() {
    let mut h = Harness::new(fast_backoff(10, 3));
    let mut server = h.connected().await;

    assert!(matches!(
        h.client.subscribe(Vec::<&str>::new()),
        Err(FeedError::NoInstrumentKeys)
    ));
    assert!(matches!(
        h.client
            .subscribe_with_mode(SubscriptionMode::Full, Vec::<String>::new()),
        Err(FeedError::NoInstrumentKeys)
    ));
    assert!(matches!(
        h.client.unsubscribe(Vec::<&str>::new()),
        Err(FeedError::NoInstrumentKeys)
    ));

    server.assert_silent(QUIET).await;
    assert!(h.client.subscriptions().is_empty());
}

#[tokio::test]
async fn mutations_while_reconnecting_are_replayed() {
    let mut h = Harness::new(fast_backoff(150, 3));
    h.client.subscribe(["NSE_EQ|A"]).unwrap();

    let mut first = h.connected().await;
    let _replay = first.next_request().await;

    first.hang_up();
    assert!(matches!(
        h.next_event().await,
        ConnectionEvent::Disconnected { .. }
    ));
    assert!(matches!(
        h.next_event().await,
        ConnectionEvent::Reconnecting { .. }
    ));

    // Disconnected: registry only.
    h.client
        .subscribe_with_mode(SubscriptionMode::FullD30, ["NSE_EQ|Z"])
        .unwrap();
    h.client.unsubscribe(["NSE_EQ|A"]).unwrap();

    assert_eq!(h.next_event().await, ConnectionEvent::Connected);
    let mut second = h.accept().await;
    let replay = second.requests(1).await;

    assert_eq!(
        by_mode(&replay),
        BTreeMap::from([(SubscriptionMode::FullD30, keys(&["NSE_EQ|Z"]))])
    );
    second.assert_silent(QUIET).await;
}

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tweak_client::TweakClientError;
use tweak_server::shared::{ConnectionState, ItemOptions, StoreError, Value};
use tweak_test::{assert_eventually, assert_mirror_converges, ObserverProbe, TestPair};

/// Server writes reach the client, client writes come back through the server
#[test]
fn bool_item_round_trip() {
    let pair = TestPair::new();
    let id = pair
        .server
        .add("/a/testBool1", false, ItemOptions::new())
        .unwrap();
    assert_eq!(pair.server.find("/a/testBool1"), Ok(id));

    let client = pair.client();
    assert_eq!(client.connection_state(), ConnectionState::Active);
    let collected = client.collect(&["/a/testBool1"]).unwrap();
    assert_eq!(collected, vec![Ok(id)]);
    assert_eq!(client.get(id), Ok(Value::Bool(false)));

    // every mirrored value, next to what the server held at that moment
    let authority = Arc::clone(pair.server.context());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    client
        .on_change(id, move |id, value| {
            let committed = authority.store().get(id).unwrap();
            sink.lock().unwrap().push((value.clone(), committed));
            Ok(())
        })
        .unwrap();

    pair.server.set(id, true).unwrap();
    assert_mirror_converges!(client, id, true);

    client.set(id, false).unwrap();
    // acknowledged means committed on the server
    assert_eq!(pair.server.get(id), Ok(Value::Bool(false)));
    assert_mirror_converges!(client, id, false);
    client.flush_observers();

    let seen = seen.lock().unwrap();
    assert_eq!(
        seen.iter()
            .map(|(mirrored, _)| mirrored.clone())
            .collect::<Vec<_>>(),
        vec![Value::Bool(true), Value::Bool(false)]
    );
    // the client's own write only shows up once the server holds it
    for (mirrored, committed) in seen.iter() {
        if *mirrored == Value::Bool(false) {
            assert_eq!(committed, &Value::Bool(false));
        }
    }
}

/// Read-after-write on the authoritative store needs no waiting
#[test]
fn server_reads_its_own_writes() {
    let pair = TestPair::new();
    let id = pair.server.add("/counter", 0_i64, ItemOptions::new()).unwrap();
    for i in 1..=50_i64 {
        pair.server.set(id, i).unwrap();
        assert_eq!(pair.server.get(id), Ok(Value::Int(i)));
    }
}

/// A client never sees values go backwards while the server counts up
#[test]
fn mirror_values_never_regress() {
    let pair = TestPair::new();
    let id = pair.server.add("/counter", 0_i64, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/counter"]).unwrap();

    let probe = ObserverProbe::new();
    client.set_observer(id, probe.observer()).unwrap();

    for i in 1..=200_i64 {
        pair.server.set(id, i).unwrap();
    }
    assert_mirror_converges!(client, id, 200_i64);
    client.flush_observers();

    let seen: Vec<i64> = probe
        .values()
        .iter()
        .map(|value| value.as_int().unwrap())
        .collect();
    assert!(!seen.is_empty());
    assert!(
        seen.windows(2).all(|pair| pair[0] < pair[1]),
        "observer saw values out of order: {:?}",
        seen
    );
    assert_eq!(seen.last(), Some(&200));
}

/// Collect answers every uri in order, missing ones as NotFound
#[test]
fn collect_preserves_order() {
    let pair = TestPair::new();
    let first = pair.server.add("/b/first", 1_i64, ItemOptions::new()).unwrap();
    let second = pair.server.add("/a/second", "two", ItemOptions::new()).unwrap();
    let client = pair.client();

    let collected = client
        .collect(&["/a/second", "/missing", "/b/first"])
        .unwrap();
    assert_eq!(
        collected,
        vec![
            Ok(second),
            Err(StoreError::not_found("/missing")),
            Ok(first),
        ]
    );
    assert_eq!(client.find("/b/first"), Ok(first));
    assert!(client.find("/missing").is_err());
}

/// Uncollected items don't exist on the client
#[test]
fn client_store_starts_empty() {
    let pair = TestPair::new();
    pair.server.add("/hidden", 1.5, ItemOptions::new()).unwrap();
    let client = pair.client();

    assert!(matches!(
        client.get("/hidden"),
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        client.set("/hidden", 2.5),
        Err(TweakClientError::Store(StoreError::NotFound { .. }))
    ));
    assert_eq!(pair.server.get("/hidden"), Ok(Value::Float(1.5)));
}

/// Type errors from a write are reported by the client without a round trip
#[test]
fn client_write_type_checked() {
    let pair = TestPair::new();
    let id = pair.server.add("/flag", true, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/flag"]).unwrap();

    assert!(matches!(
        client.set(id, 3_i64),
        Err(TweakClientError::Store(StoreError::TypeMismatch { .. }))
    ));
    assert_eq!(pair.server.get(id), Ok(Value::Bool(true)));
}

/// Reset on either side restores the value the item was created with
#[test]
fn reset_restores_default() {
    let pair = TestPair::new();
    let id = pair.server.add("/gain", 0.25, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/gain"]).unwrap();

    pair.server.set(id, 0.75).unwrap();
    assert_mirror_converges!(client, id, 0.75);

    client.reset(id).unwrap();
    assert_eq!(pair.server.get(id), Ok(Value::Float(0.25)));
    assert_mirror_converges!(client, id, 0.25);

    pair.server.set(id, 1.0).unwrap();
    pair.server.reset(id).unwrap();
    assert_mirror_converges!(client, id, 0.25);
}

/// Two clients both converge on each other's writes
#[test]
fn writes_fan_out_to_every_subscriber() {
    let pair = TestPair::new();
    let id = pair.server.add("/shared", "a", ItemOptions::new()).unwrap();
    let alice = pair.client();
    let bob = pair.client();
    alice.collect(&["/shared"]).unwrap();
    bob.collect(&["/shared"]).unwrap();
    assert_eq!(pair.server.connection_count(), 2);

    alice.set(id, "from alice").unwrap();
    assert_mirror_converges!(bob, id, "from alice");
    assert_mirror_converges!(alice, id, "from alice");

    bob.set(id, "from bob").unwrap();
    assert_mirror_converges!(alice, id, "from bob");
}

/// A waiter on the mirror resolves once the pushed value lands
#[test]
fn client_waiter_resolves_on_update() {
    let pair = TestPair::new();
    let id = pair.server.add("/level", 1_i64, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/level"]).unwrap();

    let waiter = client.wait_for(id, 9_i64).unwrap();
    assert!(waiter.try_value().is_none());
    pair.server.set(id, 9_i64).unwrap();
    assert_eq!(
        waiter.wait_timeout(Duration::from_secs(30)),
        Ok(Value::Int(9))
    );

    // already satisfied
    let waiter = client.wait_for(id, 9_i64).unwrap();
    assert_eq!(
        waiter.wait_timeout(Duration::from_secs(1)),
        Ok(Value::Int(9))
    );
}

/// Disconnecting drops the server's connection count
#[test]
fn graceful_disconnect() {
    let pair = TestPair::new();
    let client = pair.client();
    assert_eq!(pair.server.connection_count(), 1);

    client.disconnect();
    assert_eq!(client.connection_state(), ConnectionState::Closed);
    assert_eventually!(
        pair.server.connection_count() == 0,
        "server still counts a disconnected client"
    );
}

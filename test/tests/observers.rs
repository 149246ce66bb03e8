use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use tweak_server::shared::{CallbackError, ItemOptions, Value};
use tweak_test::{assert_eventually, assert_mirror_converges, ObserverProbe, TestPair};

/// A failing observer is counted, the next change still dispatches,
/// and a re-armed observer on the same item fires
#[test]
fn failing_observer_does_not_stop_dispatch() {
    let pair = TestPair::new();
    let failing = ObserverProbe::new();
    let id = pair
        .server
        .add(
            "/a/flaky",
            0_i64,
            ItemOptions::new().with_observer(failing.failing_observer("boom")),
        )
        .unwrap();

    pair.server.set(id, 1_i64).unwrap();
    pair.server.set(id, 2_i64).unwrap();
    pair.server.flush_observers();
    assert_eq!(failing.count(), 2, "failing observer is called on every change");
    assert_eq!(pair.server.callback_failures(), 2);

    let probe = ObserverProbe::new();
    pair.server.set_observer(id, probe.observer()).unwrap();
    pair.server.set(id, 3_i64).unwrap();
    pair.server.flush_observers();
    assert_eq!(probe.values(), vec![Value::Int(3)]);
    assert_eq!(failing.count(), 2);
    assert_eq!(pair.server.callback_failures(), 2);
}

/// Panics inside an observer are contained the same way as errors
#[test]
fn panicking_observer_is_contained() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/panicky", false, ItemOptions::new()).unwrap();
    let other = pair.server.add("/a/other", false, ItemOptions::new()).unwrap();
    pair.server
        .on_change(id, |_, _| -> Result<(), CallbackError> {
            panic!("observer exploded")
        })
        .unwrap();
    let probe = ObserverProbe::new();
    pair.server.set_observer(other, probe.observer()).unwrap();

    pair.server.set(id, true).unwrap();
    pair.server.set(other, true).unwrap();
    pair.server.flush_observers();

    assert_eq!(pair.server.callback_failures(), 1);
    assert_eq!(probe.values(), vec![Value::Bool(true)]);
}

/// Observers run only once the value is readable from the store
#[test]
fn observer_sees_committed_value() {
    let pair = Arc::new(TestPair::new());
    let id = pair.server.add("/a/seen", 0_i64, ItemOptions::new()).unwrap();
    let matched = Arc::new(Mutex::new(Vec::new()));

    let weak_pair = Arc::downgrade(&pair);
    let observed = matched.clone();
    pair.server
        .on_change(id, move |id, value| -> Result<(), CallbackError> {
            if let Some(pair) = weak_pair.upgrade() {
                let stored = pair.server.get(id);
                observed.lock().unwrap().push(stored == Ok(value.clone()));
            }
            Ok(())
        })
        .unwrap();

    pair.server.set(id, 5_i64).unwrap();
    pair.server.flush_observers();
    assert_eq!(*matched.lock().unwrap(), vec![true]);
}

/// Clearing an observer stops notifications
#[test]
fn cleared_observer_is_silent() {
    let pair = TestPair::new();
    let probe = ObserverProbe::new();
    let id = pair
        .server
        .add("/a/quiet", 0_i64, ItemOptions::new().with_observer(probe.observer()))
        .unwrap();
    pair.server.set(id, 1_i64).unwrap();
    pair.server.flush_observers();
    pair.server.clear_observer(id).unwrap();
    pair.server.set(id, 2_i64).unwrap();
    pair.server.flush_observers();
    assert_eq!(probe.values(), vec![Value::Int(1)]);
}

/// Client observers fire for server-confirmed values, including the
/// client's own writes
#[test]
fn client_observer_fires_on_confirmed_updates() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/knob", 0.0, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/a/knob"]).unwrap();

    let probe = ObserverProbe::new();
    client.set_observer(id, probe.observer()).unwrap();

    pair.server.set(id, 0.5).unwrap();
    assert_mirror_converges!(client, id, 0.5);
    client.set(id, 0.9).unwrap();
    assert_mirror_converges!(client, id, 0.9);

    client.flush_observers();
    assert_eq!(probe.last(), Some(Value::Float(0.9)));
    assert!(probe.values().contains(&Value::Float(0.5)));
}

/// A failing client observer does not break mirroring
#[test]
fn failing_client_observer_keeps_mirror_alive() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/fragile", 0_i64, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/a/fragile"]).unwrap();
    let failing = ObserverProbe::new();
    client
        .set_observer(id, failing.failing_observer("client side"))
        .unwrap();

    pair.server.set(id, 1_i64).unwrap();
    assert_mirror_converges!(client, id, 1_i64);
    pair.server.set(id, 2_i64).unwrap();
    assert_mirror_converges!(client, id, 2_i64);
    assert_eventually!(client.callback_failures() == 2, "both failures counted");

    let probe = ObserverProbe::new();
    client.set_observer(id, probe.observer()).unwrap();
    pair.server.set(id, 3_i64).unwrap();
    let waiter = client.wait_for(id, 3_i64).unwrap();
    assert!(waiter.wait_timeout(Duration::from_secs(30)).is_ok());
    client.flush_observers();
    assert_eq!(probe.values(), vec![Value::Int(3)]);
}

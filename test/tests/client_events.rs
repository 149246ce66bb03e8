use tweak_client::shared::{
    CallbackError, CallbackFailure, ConnectionState, EventObserver, TweakEvent,
};
use tweak_server::shared::ItemOptions;
use tweak_test::{assert_eventually, EventRecorder, TestPair};

const CONNECTED: TweakEvent = TweakEvent::ConnectionChanged { connected: true };
const DISCONNECTED: TweakEvent = TweakEvent::ConnectionChanged { connected: false };

/// The first event a client reports is its link coming up
#[test]
fn connect_reports_connected() {
    let pair = TestPair::new();
    let recorder = EventRecorder::new();
    let client = pair.client_with_events(recorder.observer());
    client.flush_observers();

    assert_eq!(recorder.events(), vec![CONNECTED]);
}

/// Collect reports each newly mirrored item once
#[test]
fn collect_reports_new_items() {
    let pair = TestPair::new();
    let first = pair.server.add("/a/one", 1_i64, ItemOptions::new()).unwrap();
    let second = pair.server.add("/a/two", 2_i64, ItemOptions::new()).unwrap();
    let recorder = EventRecorder::new();
    let client = pair.client_with_events(recorder.observer());

    client.collect(&["/a/one", "/missing", "/a/two"]).unwrap();
    client.collect(&["/a/one"]).unwrap();
    client.flush_observers();

    assert_eq!(
        recorder.events(),
        vec![
            CONNECTED,
            TweakEvent::ItemAdded(first),
            TweakEvent::ItemAdded(second)
        ]
    );
}

/// A server-side remove reaches the client as an ItemRemoved event
#[test]
fn server_remove_reports_item_removed() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/doomed", true, ItemOptions::new()).unwrap();
    let kept = pair.server.add("/a/kept", true, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/a/doomed", "/a/kept"]).unwrap();

    let recorder = EventRecorder::new();
    client.set_event_observer(recorder.observer());
    pair.server.remove(id).unwrap();

    assert_eventually!(
        recorder.contains(TweakEvent::ItemRemoved(id)),
        "client never reported the removal"
    );
    assert!(client.get(id).is_err());
    assert!(!recorder.contains(TweakEvent::ItemRemoved(kept)));
}

/// Severing the link reports a disconnection exactly once
#[test]
fn severed_link_reports_disconnected() {
    let pair = TestPair::new();
    let recorder = EventRecorder::new();
    let client = pair.client_with_events(recorder.observer());

    assert_eq!(pair.hub.sever(&pair.address), 1);
    assert_eventually!(
        client.connection_state() == ConnectionState::Closed,
        "client never noticed the severed link"
    );
    assert_eventually!(
        recorder.contains(DISCONNECTED),
        "client never reported the disconnection"
    );

    client.disconnect();
    client.flush_observers();
    assert_eq!(recorder.events(), vec![CONNECTED, DISCONNECTED]);
}

/// A failing event observer is counted and does not stop later events
#[test]
fn event_observer_failures_are_isolated() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/value", 1_i64, ItemOptions::new()).unwrap();
    let client = pair.client();

    let recorder = EventRecorder::new();
    let observer = recorder.observer();
    client.on_event(move |event| {
        if let TweakEvent::ItemAdded(_) = event {
            return Err(CallbackError::new("not interested"));
        }
        observer.on_event(event)
    });
    client.collect(&["/a/value"]).unwrap();
    pair.server.remove(id).unwrap();

    assert_eventually!(
        recorder.contains(TweakEvent::ItemRemoved(id)),
        "removal was not reported after a failed event"
    );
    assert_eq!(client.callback_failures(), 1);
    assert!(matches!(
        client.context().dispatcher().last_failure(),
        Some(CallbackFailure::EventReturned {
            event: TweakEvent::ItemAdded(failed),
            ..
        }) if failed == id
    ));

    client.clear_event_observer();
    client.disconnect();
    client.flush_observers();
    assert!(!recorder.contains(DISCONNECTED));
}

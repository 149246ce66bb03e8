use std::time::Duration;

use tweak_client::TweakClientError;
use tweak_server::shared::{ItemOptions, StoreError, Value, WaitError};
use tweak_test::{assert_eventually, TestPair};

/// A removed item is gone by id and by uri, on the server and its mirrors
#[test]
fn removed_item_is_not_found_everywhere() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/doomed", 7_i64, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/a/doomed"]).unwrap();

    assert_eq!(pair.server.remove(id), Ok(id));
    assert!(matches!(pair.server.get(id), Err(StoreError::NotFound { .. })));
    assert!(matches!(
        pair.server.get("/a/doomed"),
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        pair.server.set(id, 8_i64),
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(
        pair.server.remove(id),
        Err(StoreError::NotFound { .. })
    ));

    assert_eventually!(
        client.get(id).is_err(),
        "mirror never applied the remove notification"
    );
    assert!(matches!(
        client.set(id, 9_i64),
        Err(TweakClientError::Store(StoreError::NotFound { .. }))
    ));
}

/// Ids are never reused, even when the uri comes back
#[test]
fn readded_uri_gets_a_fresh_id() {
    let pair = TestPair::new();
    let first = pair.server.add("/a/phoenix", 1_i64, ItemOptions::new()).unwrap();
    pair.server.remove(first).unwrap();
    let second = pair.server.add("/a/phoenix", 2_i64, ItemOptions::new()).unwrap();
    assert_ne!(first, second);
    assert!(pair.server.get(first).is_err());
    assert_eq!(pair.server.get(second), Ok(Value::Int(2)));

    let client = pair.client();
    assert_eq!(client.collect(&["/a/phoenix"]).unwrap(), vec![Ok(second)]);
    assert_eq!(client.find("/a/phoenix"), Ok(second));
}

/// Removing an item abandons waiters on the server and the client
#[test]
fn removal_abandons_waiters() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/waited", 0_i64, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/a/waited"]).unwrap();

    let server_waiter = pair.server.wait_for(id, 100_i64).unwrap();
    let client_waiter = client.wait_for(id, 100_i64).unwrap();
    pair.server.remove(id).unwrap();

    assert_eq!(
        server_waiter.wait_timeout(Duration::from_secs(30)),
        Err(WaitError::Abandoned { id })
    );
    assert_eq!(
        client_waiter.wait_timeout(Duration::from_secs(30)),
        Err(WaitError::Abandoned { id })
    );
}

/// A write racing a remove either lands or reports NotFound, never anything else
#[test]
fn set_racing_remove() {
    let pair = TestPair::new();
    let id = pair.server.add("/a/racy", 0_i64, ItemOptions::new()).unwrap();
    let client = pair.client();
    client.collect(&["/a/racy"]).unwrap();

    pair.server.set(id, 1_i64).unwrap();
    pair.server.remove(id).unwrap();
    match client.set(id, 2_i64) {
        Ok(()) => panic!("write to a removed item was accepted"),
        Err(TweakClientError::Store(StoreError::NotFound { .. })) => {}
        Err(other) => panic!("unexpected error {}", other),
    }
    assert_eventually!(client.get(id).is_err(), "mirror entry never dropped");
}

use std::collections::HashSet;

use tweak_server::shared::{
    Buffer, Features, ItemOptions, Metadata, StoreError, Value, ValueType,
};
use tweak_test::{assert_mirror_converges, TestPair};

fn populate(pair: &TestPair) {
    for (uri, value) in [
        ("/audio/gain", Value::Float(0.5)),
        ("/audio/mute", Value::Bool(false)),
        ("/video/fps", Value::Int(60)),
        ("/video/title", Value::from("clip")),
        ("/misc", Value::Int(1)),
    ] {
        pair.server.add(uri, value, ItemOptions::new()).unwrap();
    }
}

/// Server-side list returns each matching item once, ordered by uri
#[test]
fn server_list_matches_exactly_once() {
    let pair = TestPair::new();
    populate(&pair);

    let listed = pair.server.list(|descriptor| descriptor.uri.starts_with("/video/"));
    assert_eq!(listed.uris(), vec!["/video/fps", "/video/title"]);

    let all = pair.server.list(|_| true);
    let unique: HashSet<_> = all.ids().into_iter().collect();
    assert_eq!(all.len(), 5);
    assert_eq!(unique.len(), 5);

    assert!(pair.server.list(|_| false).is_empty());
}

/// Client list applies the pattern remotely and the predicate locally
#[test]
fn client_list_with_pattern_and_predicate() {
    let pair = TestPair::new();
    populate(&pair);
    let client = pair.client();

    let listed = client
        .list("/audio/*;/misc", |descriptor| {
            descriptor.value_type != ValueType::Bool
        })
        .unwrap();
    assert_eq!(listed.uris(), vec!["/audio/gain", "/misc"]);

    // everything the pattern matched is mirrored and subscribed
    let mute = client.find("/audio/mute").unwrap();
    assert_eq!(client.get(mute), Ok(Value::Bool(false)));
    pair.server.set("/audio/mute", true).unwrap();
    assert_mirror_converges!(client, mute, true);

    assert!(client.find("/video/fps").is_err());
}

/// Listing twice returns fresh snapshots without duplicates
#[test]
fn repeated_list_is_stable() {
    let pair = TestPair::new();
    populate(&pair);
    let client = pair.client();

    let first = client.list("*", |_| true).unwrap();
    let second = client.list("*", |_| true).unwrap();
    assert_eq!(first.len(), 5);
    assert_eq!(first.ids(), second.ids());
}

/// Descriptors carry metadata and description through to the client
#[test]
fn descriptors_carry_metadata() {
    let pair = TestPair::new();
    let metadata =
        Metadata::parse(r#"{"control": "slider", "min": 0, "max": 10, "unit": "dB"}"#).unwrap();
    pair.server
        .add(
            "/audio/level",
            3.0,
            ItemOptions::new()
                .with_metadata(metadata)
                .with_description("Output level"),
        )
        .unwrap();
    let client = pair.client();

    let listed = client.list("/audio/level", |_| true).unwrap();
    let descriptor = listed.get(0).unwrap();
    assert_eq!(descriptor.description, "Output level");
    assert_eq!(descriptor.metadata.max(), Some(10.0));
    assert_eq!(
        descriptor.metadata.get("unit").and_then(|unit| unit.as_str()),
        Some("dB")
    );
}

/// Buffer items are invisible to a client that did not negotiate vectors
#[test]
fn buffers_hidden_without_vectors() {
    let pair = TestPair::new();
    pair.server
        .add(
            "/data/samples",
            Buffer::vector(vec![1.0_f32, 2.0, 3.0]),
            ItemOptions::new(),
        )
        .unwrap();
    pair.server.add("/data/count", 3_i64, ItemOptions::new()).unwrap();

    let client = pair.client_with_features(Features::none());
    assert!(!client.features().vectors);

    let listed = client.list("/data/*", |_| true).unwrap();
    assert_eq!(listed.uris(), vec!["/data/count"]);
    assert_eq!(
        client.collect(&["/data/samples"]).unwrap(),
        vec![Err(StoreError::not_found("/data/samples"))]
    );

    let vector_client = pair.client();
    assert!(vector_client.features().vectors);
    assert_eq!(
        vector_client.list("/data/*", |_| true).unwrap().uris(),
        vec!["/data/count", "/data/samples"]
    );
}

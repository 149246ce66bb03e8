use std::collections::BTreeSet;

use proptest::prelude::*;

use tweak_server::shared::{ItemOptions, Value};
use tweak_test::TestPair;

fn uris() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("/[ab]/[a-c]{1,3}", 1..12)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prefix_list_mirrors_each_match_once(uris in uris()) {
        let pair = TestPair::new();
        for (index, uri) in uris.iter().enumerate() {
            pair.server.add(uri, Value::Int(index as i64), ItemOptions::new()).unwrap();
        }
        let client = pair.client();

        let listed = client.list("/a/*", |_| true).unwrap();
        let expected: Vec<&str> = uris
            .iter()
            .filter(|uri| uri.starts_with("/a/"))
            .map(String::as_str)
            .collect();
        prop_assert_eq!(listed.uris(), expected);

        for uri in uris.iter() {
            let server_value = pair.server.get(uri.as_str()).unwrap();
            if uri.starts_with("/a/") {
                prop_assert_eq!(client.get(uri.as_str()).unwrap(), server_value);
            } else {
                prop_assert!(client.get(uri.as_str()).is_err());
            }
        }
    }
}

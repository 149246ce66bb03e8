/// Assert that a condition becomes true within the polling budget
#[macro_export]
macro_rules! assert_eventually {
    ($condition:expr, $($message:tt)+) => {
        assert!($crate::helpers::poll_until(|| $condition), $($message)+);
    };
}

/// Assert that a client's mirror of `$key` converges to `$value`
#[macro_export]
macro_rules! assert_mirror_converges {
    ($client:expr, $key:expr, $value:expr) => {
        let expected: tweak_shared::Value = $value.into();
        assert!(
            $crate::helpers::poll_until(|| $client.get($key).ok().as_ref() == Some(&expected)),
            "mirror of {:?} never reached {}",
            $key,
            expected
        );
    };
}

use std::{thread, time::Duration};

/// Retries allowed when waiting for something to propagate
pub const POLL_ATTEMPTS: usize = 10_000;
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Polls `condition` until it holds or the attempts run out.
/// Returns whether it ever held.
pub fn poll_until(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..POLL_ATTEMPTS {
        if condition() {
            return true;
        }
        thread::sleep(POLL_INTERVAL);
    }
    condition()
}

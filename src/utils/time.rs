// src/utils/time.rs
//! Timestamp helpers

use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock time in nanoseconds since the Unix epoch
///
/// Returns zero if the system clock is set before the epoch.
pub fn current_timestamp_nanos() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamps_are_monotone_enough() {
        let first = current_timestamp_nanos();
        let second = current_timestamp_nanos();
        assert!(first > 0);
        assert!(second >= first);
    }
}

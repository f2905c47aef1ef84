//! The simulated clock.
//!
//! Simulation time is an ordinary UTC timestamp advanced by a fixed
//! interval per tick. It is never read from the wall clock, so runs are
//! reproducible regardless of when or where they execute.

use chrono::{DateTime, TimeZone, Utc};

/// A point in simulated time.
pub type SimTime = DateTime<Utc>;

/// Fixed start time used by tests and as the CLI default.
///
/// Pinning the start time keeps rendered timestamps stable across runs,
/// which golden-output comparisons depend on.
pub fn testing_start_time() -> SimTime {
    // 2022-03-21 11:00:00 UTC
    Utc.with_ymd_and_hms(2022, 3, 21, 11, 0, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_time_is_stable() {
        let t = testing_start_time();
        assert_eq!(t.to_rfc3339(), "2022-03-21T11:00:00+00:00");
    }
}

//! Seeded random load generator.

use crate::{Generator, LoadBatch, LoadEvent};
use allocsim_types::{Key, SimTime};
use chrono::Duration;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Generates load events at a fixed arrival rate with keys drawn
/// uniformly from a bounded span.
///
/// Every stochastic choice comes from a `ChaCha8Rng` seeded at
/// construction, so two generators built with the same parameters emit
/// identical event sequences.
pub struct RandomGenerator {
    /// When the next event is due.
    next_due: SimTime,
    /// Fixed gap between consecutive events, derived from the rate.
    spacing: Duration,
    rng: ChaCha8Rng,
    key_span: i64,
    read_fraction: f64,
    min_payload: u64,
    max_payload: u64,
}

impl RandomGenerator {
    /// Create a generator emitting `rate` events per simulated second,
    /// starting one event-gap after `start`.
    pub fn new(start: SimTime, rate: f64, seed: u64) -> Self {
        let rate = rate.max(f64::MIN_POSITIVE);
        let spacing = Duration::nanoseconds((NANOS_PER_SEC / rate) as i64);
        Self {
            next_due: start + spacing,
            spacing,
            rng: ChaCha8Rng::seed_from_u64(seed),
            key_span: 10_000,
            read_fraction: 0.75,
            min_payload: 1,
            max_payload: 512,
        }
    }

    /// Set the key span. Keys are drawn uniformly from `[0, span)`.
    pub fn with_key_span(mut self, span: i64) -> Self {
        self.key_span = span.max(1);
        self
    }

    /// Set the fraction of events that are reads (0.0 to 1.0).
    pub fn with_read_fraction(mut self, fraction: f64) -> Self {
        self.read_fraction = fraction.clamp(0.0, 1.0);
        self
    }

    /// Set the inclusive payload size bounds in bytes.
    pub fn with_payload_range(mut self, min: u64, max: u64) -> Self {
        self.min_payload = min;
        self.max_payload = max.max(min);
        self
    }

    fn next_event(&mut self) -> LoadEvent {
        let key = Key(self.rng.gen_range(0..self.key_span));
        let size = self.rng.gen_range(self.min_payload..=self.max_payload);
        if self.rng.gen::<f64>() < self.read_fraction {
            LoadEvent {
                key,
                reads: 1,
                read_size: size,
                ..Default::default()
            }
        } else {
            LoadEvent {
                key,
                writes: 1,
                write_size: size,
                ..Default::default()
            }
        }
    }
}

impl Generator for RandomGenerator {
    fn tick(&mut self, now: SimTime) -> LoadBatch {
        let mut batch = LoadBatch::new();
        while self.next_due <= now {
            batch.push(self.next_event());
            self.next_due = self.next_due + self.spacing;
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use allocsim_types::testing_start_time;

    #[test]
    fn test_rate_controls_event_count() {
        let start = testing_start_time();
        let mut gen = RandomGenerator::new(start, 10.0, 42);

        let batch = gen.tick(start + Duration::seconds(10));
        assert_eq!(batch.len(), 100, "10 events/sec over 10s");
    }

    #[test]
    fn test_windows_are_disjoint() {
        let start = testing_start_time();
        let mut gen = RandomGenerator::new(start, 5.0, 42);

        let first = gen.tick(start + Duration::seconds(2));
        let second = gen.tick(start + Duration::seconds(2));
        let third = gen.tick(start + Duration::seconds(4));

        assert_eq!(first.len(), 10);
        assert!(second.is_empty(), "window already drained");
        assert_eq!(third.len(), 10);
    }

    #[test]
    fn test_event_due_exactly_at_tick_is_included() {
        let start = testing_start_time();
        let mut gen = RandomGenerator::new(start, 1.0, 3);

        // One event per second, the first due exactly at start + 1s:
        // the window upper bound is inclusive.
        assert_eq!(gen.tick(start + Duration::seconds(1)).len(), 1);
        assert!(gen.tick(start + Duration::seconds(1)).is_empty());
    }

    #[test]
    fn test_no_events_due_at_start() {
        let start = testing_start_time();
        let mut gen = RandomGenerator::new(start, 100.0, 7);
        assert!(gen.tick(start).is_empty());
    }

    #[test]
    fn test_same_seed_same_events() {
        let start = testing_start_time();
        let until = start + Duration::seconds(30);

        let a = RandomGenerator::new(start, 50.0, 1234).tick(until);
        let b = RandomGenerator::new(start, 50.0, 1234).tick(until);
        assert_eq!(a, b);

        let c = RandomGenerator::new(start, 50.0, 4321).tick(until);
        assert_ne!(a, c, "different seed should shuffle the sequence");
    }

    #[test]
    fn test_read_fraction_extremes() {
        let start = testing_start_time();
        let until = start + Duration::seconds(5);

        let reads = RandomGenerator::new(start, 20.0, 9)
            .with_read_fraction(1.0)
            .tick(until);
        assert!(reads.iter().all(|e| e.writes == 0 && e.reads == 1));

        let writes = RandomGenerator::new(start, 20.0, 9)
            .with_read_fraction(0.0)
            .tick(until);
        assert!(writes.iter().all(|e| e.reads == 0 && e.writes == 1));
    }

    #[test]
    fn test_keys_stay_in_span() {
        let start = testing_start_time();
        let batch = RandomGenerator::new(start, 100.0, 11)
            .with_key_span(16)
            .tick(start + Duration::seconds(10));
        assert!(batch.iter().all(|e| (0..16).contains(&e.key.0)));
    }
}

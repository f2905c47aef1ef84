//! Synthetic workload generation.
//!
//! Generators produce time-ordered [`LoadEvent`]s against the simulated
//! key space, independent of cluster topology. The simulator pulls every
//! event due within the current tick window from each generator and
//! applies the resulting [`LoadBatch`] to cluster state in one step.
//!
//! A fresh generator instance is used per simulation run; generators are
//! deterministic given their seed and call sequence.

mod event;
mod random;

pub use event::{LoadBatch, LoadEvent};
pub use random::RandomGenerator;

use allocsim_types::SimTime;

/// A source of synthetic load events.
pub trait Generator {
    /// Return every load event due at or before `now`, in arrival order.
    ///
    /// Successive calls cover disjoint half-open windows `(prev, now]`:
    /// an event due exactly at `now` belongs to this call, and each
    /// event is returned by exactly one call. Implementations keep an
    /// internal cursor and must be deterministic given the same
    /// construction parameters and the same sequence of `tick` times.
    fn tick(&mut self, now: SimTime) -> LoadBatch;
}

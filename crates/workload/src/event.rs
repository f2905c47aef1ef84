//! Load events and batches.

use allocsim_types::Key;

/// One read/write occurrence against a single key.
///
/// Counts and byte sizes are carried separately so a single event can
/// describe both the read and write side of an operation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadEvent {
    /// Target key, used to resolve the owning range.
    pub key: Key,
    /// Number of writes.
    pub writes: u64,
    /// Bytes written.
    pub write_size: u64,
    /// Number of reads.
    pub reads: u64,
    /// Bytes read.
    pub read_size: u64,
}

/// An ordered sequence of load events accumulated within one tick window.
///
/// Applied to cluster state atomically: either every event in the batch
/// has been accrued or none has.
pub type LoadBatch = Vec<LoadEvent>;

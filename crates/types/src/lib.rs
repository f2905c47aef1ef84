//! Core types shared across the allocation simulator.
//!
//! Identifier newtypes for stores, ranges and keys, plus the simulated
//! clock. Everything here is plain data: no I/O, no randomness.

mod identifiers;
mod time;

pub use identifiers::{Key, RangeId, StoreId};
pub use time::{testing_start_time, SimTime};

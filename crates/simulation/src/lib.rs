//! Deterministic simulation driver.
//!
//! The [`Simulator`] owns the tick loop: per tick it applies generated
//! load, advances descriptor propagation, applies due replica changes,
//! and samples cluster state into the [`MetricsTracker`]. Execution is
//! synchronous and single-threaded; given identical inputs, two runs
//! emit byte-identical CSV.
//!
//! ```text
//! Simulator ── per tick ──► Generator::tick ─► ClusterState::apply_load
//!                           FixedDelayExchange::put + tick
//!                           ReplicaChanger::tick        (on cadence)
//!                           MetricsTracker::tick ─► sinks (CSV row)
//! ```

mod metrics;
mod sim;
mod sink;

pub use metrics::{MetricsError, MetricsTracker, CSV_HEADER};
pub use sim::{CancelHandle, RunOutcome, SimError, Simulator};
pub use sink::SharedBuffer;

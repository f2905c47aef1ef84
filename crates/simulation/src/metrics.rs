//! Per-tick metrics snapshots.

use allocsim_state::{ClusterState, LoadCounters};
use allocsim_types::SimTime;
use std::io::Write;
use thiserror::Error;
use tracing::trace;

/// Fixed CSV column header, written once per sink.
///
/// NB: the header names a store range-count column (`s_ranges`) that
/// data rows do not emit. Existing golden files and their consumers
/// depend on this exact 13-field row shape, so it is preserved.
pub const CSV_HEADER: &str = "tick,c_ranges,c_write,c_write_b,c_read,c_read_b,s_ranges,s_write,s_write_b,s_read,s_read_b,c_lease_moves,c_replica_moves,c_replica_b_moves";

/// Errors from writing metrics rows to sinks.
#[derive(Debug, Error)]
pub enum MetricsError {
    /// A sink write failed.
    #[error("sink write failed: {0}")]
    Sink(#[from] std::io::Error),
}

/// Samples cluster state once per tick and broadcasts a fixed-schema
/// CSV row to every configured sink.
///
/// A tracker with zero sinks succeeds silently. All columns are
/// cumulative since the start of the run; the `s_*` columns are the sum
/// of derived per-store counters across the whole cluster, which
/// coincides with the `c_*` figures only when one range is replicated
/// once.
pub struct MetricsTracker {
    sinks: Vec<Box<dyn Write>>,
    header_written: bool,
}

impl MetricsTracker {
    /// Create a tracker broadcasting to the given sinks.
    pub fn new(sinks: Vec<Box<dyn Write>>) -> Self {
        Self { sinks, header_written: false }
    }

    /// Create a tracker that records nothing.
    pub fn disabled() -> Self {
        Self::new(Vec::new())
    }

    /// Snapshot `state` at simulated time `tick` and write one row per
    /// sink.
    ///
    /// Writes are best-effort: every sink is attempted and the first
    /// error encountered is returned.
    pub fn tick(&mut self, tick: SimTime, state: &ClusterState) -> Result<(), MetricsError> {
        let mut first_error: Option<std::io::Error> = None;

        if !self.header_written {
            self.header_written = true;
            for sink in &mut self.sinks {
                if let Err(e) = writeln!(sink, "{CSV_HEADER}") {
                    first_error.get_or_insert(e);
                }
            }
        }

        let row = render_row(tick, state);
        trace!(%row, "metrics tick");
        for sink in &mut self.sinks {
            if let Err(e) = writeln!(sink, "{row}") {
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(MetricsError::Sink(e)),
            None => Ok(()),
        }
    }
}

/// Render the simulated timestamp the way rows expect it:
/// `YYYY-MM-DD HH:MM:SS +0000 UTC`.
fn render_tick(tick: SimTime) -> String {
    format!("{} +0000 UTC", tick.format("%Y-%m-%d %H:%M:%S"))
}

fn render_row(tick: SimTime, state: &ClusterState) -> String {
    let cluster = state.cluster_usage();

    let mut stores = LoadCounters::default();
    for store in state.store_ids() {
        let usage = state.store_usage(store);
        stores.writes += usage.load.writes;
        stores.write_bytes += usage.load.write_bytes;
        stores.reads += usage.load.reads;
        stores.read_bytes += usage.load.read_bytes;
    }

    format!(
        "{},{},{},{},{},{},{},{},{},{},{},{},{}",
        render_tick(tick),
        cluster.ranges,
        cluster.load.writes,
        cluster.load.write_bytes,
        cluster.load.reads,
        cluster.load.read_bytes,
        stores.writes,
        stores.write_bytes,
        stores.reads,
        stores.read_bytes,
        state.lease_transfers(),
        state.replica_moves(),
        state.replica_bytes_moved(),
    )
}

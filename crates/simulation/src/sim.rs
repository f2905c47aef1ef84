//! The tick loop.

use crate::MetricsTracker;
use allocsim_state::{ClusterState, FixedDelayExchange, ReplicaChanger};
use allocsim_types::SimTime;
use allocsim_workload::Generator;
use chrono::Duration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors constructing a simulation run.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SimError {
    /// The tick interval must move the clock forward.
    #[error("tick interval must be positive, got {0}s")]
    NonPositiveInterval(i64),

    /// The change-application interval must move the cadence forward.
    #[error("change interval must be positive, got {0}s")]
    NonPositiveChangeInterval(i64),
}

/// How a simulation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The simulated clock reached the end time.
    Completed,
    /// The caller cancelled the run at a tick boundary.
    Cancelled,
}

/// Cooperative cancellation signal for a running simulation.
///
/// Cloneable and sharable with other threads; the simulator checks it
/// once per tick boundary, so cancellation never tears a tick in half.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request that the run stop at the next tick boundary.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Drives one simulation run from a start time to an end time.
///
/// Per tick, in fixed order: pull due load events from every generator
/// and apply them, advance the exchange, apply queued replica changes if
/// the change cadence is due, then snapshot metrics. The loop is
/// single-threaded on purpose: byte-identical CSV across repeated runs
/// is a required property, and concurrent mutation of cluster state
/// would forfeit it.
pub struct Simulator {
    current: SimTime,
    end: SimTime,
    interval: Duration,
    generators: Vec<Box<dyn Generator>>,
    state: ClusterState,
    exchange: FixedDelayExchange,
    changer: ReplicaChanger,
    change_interval: Duration,
    next_change_at: SimTime,
    metrics: MetricsTracker,
    cancel: CancelHandle,
    ticks: u64,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("current", &self.current)
            .field("end", &self.end)
            .field("interval", &self.interval)
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

impl Simulator {
    /// Create a simulator over `[start, end)` advancing by `interval`
    /// per tick, applying queued replica changes every
    /// `change_interval`.
    ///
    /// Both intervals must be positive; a non-positive tick interval
    /// would leave the clock stuck short of `end` and the loop would
    /// never terminate.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        start: SimTime,
        end: SimTime,
        interval: Duration,
        generators: Vec<Box<dyn Generator>>,
        state: ClusterState,
        exchange: FixedDelayExchange,
        changer: ReplicaChanger,
        change_interval: Duration,
        metrics: MetricsTracker,
    ) -> Result<Self, SimError> {
        if interval <= Duration::zero() {
            return Err(SimError::NonPositiveInterval(interval.num_seconds()));
        }
        if change_interval <= Duration::zero() {
            return Err(SimError::NonPositiveChangeInterval(
                change_interval.num_seconds(),
            ));
        }
        Ok(Self {
            current: start,
            end,
            interval,
            generators,
            state,
            exchange,
            changer,
            change_interval,
            next_change_at: start + change_interval,
            metrics,
            cancel: CancelHandle::default(),
            ticks: 0,
        })
    }

    /// Handle for cancelling this run from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// The cluster state, for inspection after (or between) runs.
    pub fn state(&self) -> &ClusterState {
        &self.state
    }

    /// The exchange, exposing the delayed cluster-wide view.
    pub fn exchange(&self) -> &FixedDelayExchange {
        &self.exchange
    }

    /// Queue a replica change for the next change cadence.
    pub fn queue_change(&mut self, change: allocsim_state::ReplicaChange) {
        self.changer.push(change);
    }

    /// Run the tick loop to completion or cancellation.
    pub fn run(&mut self) -> RunOutcome {
        info!(
            start = %self.current,
            end = %self.end,
            interval_secs = self.interval.num_seconds(),
            "starting simulation run"
        );
        while self.current < self.end {
            if self.cancel.is_cancelled() {
                info!(ticks = self.ticks, "simulation cancelled");
                return RunOutcome::Cancelled;
            }
            self.step();
        }
        info!(ticks = self.ticks, "simulation complete");
        RunOutcome::Completed
    }

    /// One full tick: load, exchange, changes, metrics.
    fn step(&mut self) {
        self.current = self.current + self.interval;
        self.ticks += 1;

        for generator in &mut self.generators {
            let batch = generator.tick(self.current);
            if !batch.is_empty() {
                self.state.apply_load(&batch);
            }
        }

        self.exchange.put(self.current, self.state.store_descriptors());
        self.exchange.tick(self.current);

        if self.current >= self.next_change_at {
            let applied = self.changer.tick(&mut self.state);
            if applied > 0 {
                debug!(applied, tick = %self.current, "applied replica changes");
            }
            self.next_change_at = self.next_change_at + self.change_interval;
        }

        // A sink failure is not fatal to the run; the loop proceeds.
        if let Err(error) = self.metrics.tick(self.current, &self.state) {
            warn!(%error, tick = %self.current, "metrics write failed");
        }
    }
}

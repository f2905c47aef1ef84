//! Delayed propagation of store descriptors.
//!
//! Real allocators act on stale global views: a store's state reaches
//! the rest of the cluster only after gossip latency. The exchange
//! reproduces that staleness with two composable fixed delays. It
//! governs visibility only; nothing here triggers an action.

use crate::cluster::LoadCounters;
use allocsim_types::{SimTime, StoreId};
use chrono::Duration;
use std::collections::BTreeMap;
use tracing::trace;

/// A store's gossiped view of itself: aggregate counters, capacity and
/// replica count at the moment the descriptor was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreDescriptor {
    /// Store this descriptor describes.
    pub store: StoreId,
    /// Replicas hosted when the descriptor was produced.
    pub replicas: u64,
    /// Byte capacity of the store.
    pub capacity: u64,
    /// Derived load counters at production time.
    pub load: LoadCounters,
    /// Bytes held at production time.
    pub bytes: u64,
}

/// Propagates store descriptors with a fixed local-to-gossip delay plus
/// a fixed gossip-to-remote delay.
///
/// An update produced at `t` becomes visible in the cluster view at
/// `t + local_delay + gossip_delay`. Updates for one store are delivered
/// in production order; a later descriptor overwrites an earlier one
/// once both are due.
#[derive(Debug)]
pub struct FixedDelayExchange {
    local_delay: Duration,
    gossip_delay: Duration,
    /// Pending updates keyed by due time and a monotone sequence number,
    /// so same-instant updates keep their production order.
    pending: BTreeMap<(SimTime, u64), StoreDescriptor>,
    sequence: u64,
    view: BTreeMap<StoreId, StoreDescriptor>,
    now: SimTime,
}

impl FixedDelayExchange {
    /// Create an exchange starting its clock at `start`.
    pub fn new(start: SimTime, local_delay: Duration, gossip_delay: Duration) -> Self {
        Self {
            local_delay,
            gossip_delay,
            pending: BTreeMap::new(),
            sequence: 0,
            view: BTreeMap::new(),
            now: start,
        }
    }

    /// Enqueue descriptor updates produced at `produced`.
    pub fn put(
        &mut self,
        produced: SimTime,
        descriptors: impl IntoIterator<Item = StoreDescriptor>,
    ) {
        let due = produced + self.local_delay + self.gossip_delay;
        for descriptor in descriptors {
            self.pending.insert((due, self.sequence), descriptor);
            self.sequence += 1;
        }
    }

    /// Advance the exchange clock, delivering every pending update whose
    /// combined delay has elapsed into the cluster view.
    pub fn tick(&mut self, now: SimTime) {
        self.now = now;
        while let Some((&(due, _), _)) = self.pending.first_key_value() {
            if due > now {
                break;
            }
            if let Some(((_, _), descriptor)) = self.pending.pop_first() {
                trace!(store = %descriptor.store, "descriptor visible");
                self.view.insert(descriptor.store, descriptor);
            }
        }
    }

    /// The delayed cluster-wide view, keyed by store.
    pub fn view(&self) -> &BTreeMap<StoreId, StoreDescriptor> {
        &self.view
    }

    /// The delayed view of one store, if any update has become visible.
    pub fn store_view(&self, store: StoreId) -> Option<&StoreDescriptor> {
        self.view.get(&store)
    }

    /// Updates enqueued but not yet visible.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Current exchange clock.
    pub fn now(&self) -> SimTime {
        self.now
    }
}

//! Cluster state: stores, ranges, replicas and lease assignments.

use crate::change::ReplicaChange;
use crate::config::ClusterSpec;
use crate::exchange::StoreDescriptor;
use crate::StateError;
use allocsim_types::{Key, RangeId, StoreId};
use allocsim_workload::{LoadBatch, LoadEvent};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Role of a replica within its range.
///
/// Roles do not affect load accrual in this model; they are carried so
/// placements describe what a real allocator would see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReplicaRole {
    /// Full voting replica.
    #[default]
    Voter,
    /// Non-voting replica.
    NonVoter,
}

/// Read/write counters, in operations and bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadCounters {
    /// Write operations.
    pub writes: u64,
    /// Bytes written.
    pub write_bytes: u64,
    /// Read operations.
    pub reads: u64,
    /// Bytes read.
    pub read_bytes: u64,
}

impl LoadCounters {
    fn add(&mut self, other: &LoadCounters) {
        self.writes += other.writes;
        self.write_bytes += other.write_bytes;
        self.reads += other.reads;
        self.read_bytes += other.read_bytes;
    }
}

/// One copy of a range resident on one store.
///
/// A replica carries its own counters and size so that attribution
/// follows the replica when it moves between stores.
#[derive(Debug, Clone)]
struct Replica {
    role: ReplicaRole,
    load: LoadCounters,
    size: u64,
}

#[derive(Debug)]
struct Range {
    start_key: Key,
    replicas: BTreeMap<StoreId, Replica>,
    leaseholder: StoreId,
    /// Range-level counters. The write side is amplified by the
    /// replication factor at accrual time; reads are served only at the
    /// lease holder and are not amplified.
    usage: LoadCounters,
    /// Logical size of the range in bytes.
    size: u64,
}

#[derive(Debug, Clone, Copy)]
struct Store {
    capacity: u64,
}

/// Cluster-wide usage, summed over ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClusterUsage {
    /// Number of ranges.
    pub ranges: u64,
    /// Range-level counters summed across all ranges.
    pub load: LoadCounters,
}

/// Usage attributed to a single store, derived from the replicas it
/// currently hosts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreUsage {
    /// Number of replicas hosted.
    pub replicas: u64,
    /// Counters summed over hosted replicas.
    pub load: LoadCounters,
    /// Bytes held by hosted replicas.
    pub bytes: u64,
}

/// The authoritative in-memory model of the simulated cluster.
///
/// The range placement maps are the source of truth for the
/// store-replica relation; `store_replicas` is an index over the same
/// relation, maintained by the same mutation paths. Store-level counters
/// are never stored: they are recomputed from current replica membership
/// on every read, so replica moves shift attribution correctly.
#[derive(Debug)]
pub struct ClusterState {
    stores: BTreeMap<StoreId, Store>,
    store_replicas: BTreeMap<StoreId, BTreeSet<RangeId>>,
    ranges: BTreeMap<RangeId, Range>,
    /// Start key of each range, for key-to-range resolution.
    span_index: BTreeMap<Key, RangeId>,
    lease_transfers: u64,
    replica_moves: u64,
    replica_bytes_moved: u64,
}

impl ClusterState {
    /// Build a cluster from a spec. The same spec always yields an
    /// identical initial state.
    pub fn load_spec(spec: &ClusterSpec) -> Result<Self, StateError> {
        if spec.stores.is_empty() {
            return Err(StateError::InvalidSpec("no stores".to_string()));
        }
        if spec.ranges.is_empty() {
            return Err(StateError::InvalidSpec("no ranges".to_string()));
        }

        let mut state = ClusterState {
            stores: BTreeMap::new(),
            store_replicas: BTreeMap::new(),
            ranges: BTreeMap::new(),
            span_index: BTreeMap::new(),
            lease_transfers: 0,
            replica_moves: 0,
            replica_bytes_moved: 0,
        };

        for store in &spec.stores {
            if state
                .stores
                .insert(store.id, Store { capacity: store.capacity })
                .is_some()
            {
                return Err(StateError::InvalidSpec(format!(
                    "duplicate store {}",
                    store.id
                )));
            }
            state.store_replicas.insert(store.id, BTreeSet::new());
        }

        for range in &spec.ranges {
            let mut replicas = BTreeMap::new();
            for &(store, role) in &range.replicas {
                if !state.stores.contains_key(&store) {
                    return Err(StateError::UnknownStore(store));
                }
                if replicas
                    .insert(store, Replica { role, load: LoadCounters::default(), size: 0 })
                    .is_some()
                {
                    return Err(StateError::InvalidSpec(format!(
                        "{} placed twice on {}",
                        range.id, store
                    )));
                }
            }
            if !replicas.contains_key(&range.leaseholder) {
                return Err(StateError::InvalidSpec(format!(
                    "lease holder {} holds no replica of {}",
                    range.leaseholder, range.id
                )));
            }
            if state.span_index.insert(range.start_key, range.id).is_some() {
                return Err(StateError::InvalidSpec(format!(
                    "two ranges start at {}",
                    range.start_key
                )));
            }
            if state
                .ranges
                .insert(
                    range.id,
                    Range {
                        start_key: range.start_key,
                        replicas,
                        leaseholder: range.leaseholder,
                        usage: LoadCounters::default(),
                        size: 0,
                    },
                )
                .is_some()
            {
                return Err(StateError::InvalidSpec(format!("duplicate {}", range.id)));
            }
            for &(store, _) in &range.replicas {
                if let Some(index) = state.store_replicas.get_mut(&store) {
                    index.insert(range.id);
                }
            }
            // The initial lease placement counts as a lease move, the
            // same as any later reassignment.
            state.lease_transfers += 1;
        }

        if state.span_index.keys().next() != Some(&Key::MIN) {
            return Err(StateError::InvalidSpec(
                "key space not covered from Key::MIN".to_string(),
            ));
        }

        debug!(
            stores = state.stores.len(),
            ranges = state.ranges.len(),
            "loaded cluster spec"
        );
        Ok(state)
    }

    /// Resolve a key to the range that owns it.
    pub fn range_for_key(&self, key: Key) -> Option<RangeId> {
        self.span_index.range(..=key).next_back().map(|(_, &id)| id)
    }

    /// Apply a batch of load events.
    ///
    /// Each event accrues onto the owning range and onto its lease-holder
    /// replica. Writes are amplified by the replication factor at range
    /// level; reads are served only at the lease holder.
    pub fn apply_load(&mut self, batch: &LoadBatch) {
        for event in batch {
            self.apply_event(event);
        }
    }

    fn apply_event(&mut self, event: &LoadEvent) {
        let Some(range_id) = self.range_for_key(event.key) else {
            warn!(key = %event.key, "no range owns key, dropping event");
            return;
        };
        let Some(range) = self.ranges.get_mut(&range_id) else {
            return;
        };

        let replication = range.replicas.len() as u64;
        range.usage.writes += event.writes * replication;
        range.usage.write_bytes += event.write_size * replication;
        range.usage.reads += event.reads;
        range.usage.read_bytes += event.read_size;
        range.size += event.write_size;

        if let Some(replica) = range.replicas.get_mut(&range.leaseholder) {
            replica.load.writes += event.writes;
            replica.load.write_bytes += event.write_size;
            replica.load.reads += event.reads;
            replica.load.read_bytes += event.read_size;
            replica.size += event.write_size;
        }
    }

    /// Reassign a range's lease to `store`.
    ///
    /// Fails if `store` does not currently hold a replica of the range.
    pub fn transfer_lease(&mut self, range_id: RangeId, store: StoreId) -> Result<(), StateError> {
        let range = self
            .ranges
            .get_mut(&range_id)
            .ok_or(StateError::UnknownRange(range_id))?;
        if !range.replicas.contains_key(&store) {
            return Err(StateError::InvalidLeaseTarget { range: range_id, store });
        }
        range.leaseholder = store;
        self.lease_transfers += 1;
        Ok(())
    }

    /// Move one replica of a range between stores.
    ///
    /// The added replica inherits the removed replica's counters and
    /// size, so bytes attributed to the range are conserved. If the
    /// removed store held the lease, the incoming replica inherits it.
    pub(crate) fn apply_change(&mut self, change: &ReplicaChange) -> Result<(), StateError> {
        if !self.stores.contains_key(&change.add) {
            return Err(StateError::UnknownStore(change.add));
        }
        let range = self
            .ranges
            .get_mut(&change.range)
            .ok_or(StateError::UnknownRange(change.range))?;
        if !range.replicas.contains_key(&change.remove) {
            return Err(StateError::ReplicaNotFound {
                range: change.range,
                store: change.remove,
            });
        }
        if range.replicas.contains_key(&change.add) {
            return Err(StateError::DuplicateReplica {
                range: change.range,
                store: change.add,
            });
        }

        let Some(replica) = range.replicas.remove(&change.remove) else {
            // Presence was checked above.
            return Err(StateError::ReplicaNotFound {
                range: change.range,
                store: change.remove,
            });
        };
        let moved_bytes = replica.size;
        range.replicas.insert(change.add, replica);

        let lease_follows = range.leaseholder == change.remove;
        if lease_follows {
            range.leaseholder = change.add;
        }

        if let Some(index) = self.store_replicas.get_mut(&change.remove) {
            index.remove(&change.range);
        }
        if let Some(index) = self.store_replicas.get_mut(&change.add) {
            index.insert(change.range);
        }

        self.replica_moves += 1;
        self.replica_bytes_moved += moved_bytes;
        if lease_follows {
            self.lease_transfers += 1;
        }

        debug!(
            range = %change.range,
            from = %change.remove,
            to = %change.add,
            bytes = moved_bytes,
            lease_follows,
            "applied replica change"
        );
        Ok(())
    }

    /// All range identifiers, in order.
    pub fn range_ids(&self) -> Vec<RangeId> {
        self.ranges.keys().copied().collect()
    }

    /// All store identifiers, in order.
    pub fn store_ids(&self) -> Vec<StoreId> {
        self.stores.keys().copied().collect()
    }

    /// Current lease holder of a range.
    pub fn leaseholder(&self, range_id: RangeId) -> Option<StoreId> {
        self.ranges.get(&range_id).map(|r| r.leaseholder)
    }

    /// Current replica placement of a range, as store-to-role pairs.
    pub fn replica_placements(&self, range_id: RangeId) -> Option<BTreeMap<StoreId, ReplicaRole>> {
        self.ranges
            .get(&range_id)
            .map(|r| r.replicas.iter().map(|(&s, rep)| (s, rep.role)).collect())
    }

    /// Ranges with a replica on the given store.
    pub fn replicas_on(&self, store: StoreId) -> Option<&BTreeSet<RangeId>> {
        self.store_replicas.get(&store)
    }

    /// Logical size of a range in bytes.
    pub fn range_size(&self, range_id: RangeId) -> Option<u64> {
        self.ranges.get(&range_id).map(|r| r.size)
    }

    /// Start key of a range's span.
    pub fn range_start_key(&self, range_id: RangeId) -> Option<Key> {
        self.ranges.get(&range_id).map(|r| r.start_key)
    }

    /// Bytes held by one replica of a range.
    pub fn replica_size(&self, range_id: RangeId, store: StoreId) -> Option<u64> {
        self.ranges
            .get(&range_id)
            .and_then(|r| r.replicas.get(&store))
            .map(|rep| rep.size)
    }

    /// Range-level usage summed across the cluster.
    pub fn cluster_usage(&self) -> ClusterUsage {
        let mut usage = ClusterUsage {
            ranges: self.ranges.len() as u64,
            ..Default::default()
        };
        for range in self.ranges.values() {
            usage.load.add(&range.usage);
        }
        usage
    }

    /// Usage attributed to one store, derived from current replica
    /// membership at call time.
    pub fn store_usage(&self, store: StoreId) -> StoreUsage {
        let mut usage = StoreUsage::default();
        let Some(hosted) = self.store_replicas.get(&store) else {
            return usage;
        };
        for range_id in hosted {
            if let Some(replica) = self.ranges.get(range_id).and_then(|r| r.replicas.get(&store)) {
                usage.replicas += 1;
                usage.load.add(&replica.load);
                usage.bytes += replica.size;
            }
        }
        usage
    }

    /// Descriptors for every store, in store order. These are what the
    /// exchange propagates to the rest of the cluster.
    pub fn store_descriptors(&self) -> Vec<StoreDescriptor> {
        self.stores
            .iter()
            .map(|(&id, store)| {
                let usage = self.store_usage(id);
                StoreDescriptor {
                    store: id,
                    replicas: usage.replicas,
                    capacity: store.capacity,
                    load: usage.load,
                    bytes: usage.bytes,
                }
            })
            .collect()
    }

    /// Cumulative lease reassignments since the run started, including
    /// the initial placement of each range's lease.
    pub fn lease_transfers(&self) -> u64 {
        self.lease_transfers
    }

    /// Cumulative replica moves since the run started.
    pub fn replica_moves(&self) -> u64 {
        self.replica_moves
    }

    /// Cumulative bytes carried by replica moves since the run started.
    pub fn replica_bytes_moved(&self) -> u64 {
        self.replica_bytes_moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{complex_spec, single_range_spec};
    use allocsim_workload::LoadEvent;

    fn complex_state() -> ClusterState {
        ClusterState::load_spec(&complex_spec()).unwrap()
    }

    #[test]
    fn test_same_spec_same_state() {
        let a = complex_state();
        let b = complex_state();
        assert_eq!(a.store_ids(), b.store_ids());
        assert_eq!(a.range_ids(), b.range_ids());
        assert_eq!(
            a.replica_placements(RangeId(1)),
            b.replica_placements(RangeId(1))
        );
        assert_eq!(a.leaseholder(RangeId(1)), b.leaseholder(RangeId(1)));
    }

    #[test]
    fn test_initial_lease_counts_as_move() {
        assert_eq!(complex_state().lease_transfers(), 1);
        let single = ClusterState::load_spec(&single_range_spec()).unwrap();
        assert_eq!(single.lease_transfers(), 1);
    }

    #[test]
    fn test_store_and_range_views_agree() {
        let state = complex_state();
        for store in state.store_ids() {
            for range_id in state.replicas_on(store).unwrap() {
                let placements = state.replica_placements(*range_id).unwrap();
                assert!(placements.contains_key(&store));
            }
        }
        for range_id in state.range_ids() {
            for store in state.replica_placements(range_id).unwrap().keys() {
                assert!(state.replicas_on(*store).unwrap().contains(&range_id));
            }
        }
    }

    #[test]
    fn test_apply_load_amplifies_writes_not_reads() {
        let mut state = complex_state();
        state.apply_load(&vec![LoadEvent {
            key: Key(5),
            writes: 1,
            write_size: 7,
            reads: 2,
            read_size: 9,
        }]);

        // Three replicas: writes replicate, reads do not.
        let usage = state.cluster_usage();
        assert_eq!(usage.load.writes, 3);
        assert_eq!(usage.load.write_bytes, 21);
        assert_eq!(usage.load.reads, 2);
        assert_eq!(usage.load.read_bytes, 9);
        assert_eq!(state.range_size(RangeId(1)), Some(7));
    }

    #[test]
    fn test_store_attribution_follows_lease_holder() {
        let mut state = complex_state();
        state.apply_load(&vec![LoadEvent {
            key: Key(5),
            writes: 1,
            write_size: 7,
            reads: 2,
            read_size: 9,
        }]);

        // Load accrues on the lease-holder replica (store 1).
        let holder = state.store_usage(StoreId(1));
        assert_eq!(holder.load.writes, 1);
        assert_eq!(holder.load.write_bytes, 7);
        assert_eq!(holder.load.reads, 2);
        assert_eq!(holder.load.read_bytes, 9);
        assert_eq!(holder.bytes, 7);

        // Other replica stores carry no load yet.
        let idle = state.store_usage(StoreId(3));
        assert_eq!(idle.load, LoadCounters::default());
        assert_eq!(idle.replicas, 1);
    }

    #[test]
    fn test_transfer_lease_rejects_non_replica() {
        let mut state = complex_state();
        // Store 2 hosts no replica of range 1.
        assert_eq!(
            state.transfer_lease(RangeId(1), StoreId(2)),
            Err(StateError::InvalidLeaseTarget {
                range: RangeId(1),
                store: StoreId(2),
            })
        );
        assert_eq!(state.leaseholder(RangeId(1)), Some(StoreId(1)));
        assert_eq!(state.lease_transfers(), 1);
    }

    #[test]
    fn test_transfer_lease_to_replica_holder() {
        let mut state = complex_state();
        state.transfer_lease(RangeId(1), StoreId(3)).unwrap();
        assert_eq!(state.leaseholder(RangeId(1)), Some(StoreId(3)));
        assert_eq!(state.lease_transfers(), 2);
    }

    #[test]
    fn test_key_resolution() {
        let state = complex_state();
        assert_eq!(state.range_for_key(Key::MIN), Some(RangeId(1)));
        assert_eq!(state.range_for_key(Key(0)), Some(RangeId(1)));
        assert_eq!(state.range_for_key(Key(i64::MAX)), Some(RangeId(1)));
        assert_eq!(state.range_start_key(RangeId(1)), Some(Key::MIN));
    }
}

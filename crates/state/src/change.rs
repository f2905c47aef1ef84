//! Externally-issued replica placement changes.

use crate::cluster::ClusterState;
use crate::StateError;
use allocsim_types::{RangeId, StoreId};
use std::collections::VecDeque;
use tracing::warn;

/// A request to move one replica of a range between stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplicaChange {
    /// Range whose replica moves.
    pub range: RangeId,
    /// Store gaining a replica.
    pub add: StoreId,
    /// Store losing its replica.
    pub remove: StoreId,
}

impl ReplicaChange {
    /// Apply this change to cluster state.
    ///
    /// Fails with [`StateError::ReplicaNotFound`] if `remove` holds no
    /// replica of the range, or [`StateError::DuplicateReplica`] if
    /// `add` already holds one. On success the moved replica keeps its
    /// size and counters. As a policy choice of this model, not an
    /// inherent requirement, the incoming replica inherits the lease
    /// when the removed store was the lease holder.
    pub fn apply(&self, state: &mut ClusterState) -> Result<(), StateError> {
        state.apply_change(self)
    }
}

/// Queues replica changes and applies them in arrival order.
///
/// The simulator drains the queue on its change-application cadence,
/// which may be coarser than the tick interval. There is no priority or
/// conflict arbitration: first in, first applied.
#[derive(Debug, Default)]
pub struct ReplicaChanger {
    pending: VecDeque<ReplicaChange>,
}

impl ReplicaChanger {
    /// Create a changer with an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a change for the next application cadence.
    pub fn push(&mut self, change: ReplicaChange) {
        self.pending.push_back(change);
    }

    /// Number of queued changes.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Apply every queued change in arrival order.
    ///
    /// A change that fails validation is skipped and logged; the rest of
    /// the queue still applies. Skipping is deterministic, so runs remain
    /// reproducible. Returns the number of changes applied.
    pub fn tick(&mut self, state: &mut ClusterState) -> usize {
        let mut applied = 0;
        while let Some(change) = self.pending.pop_front() {
            match change.apply(state) {
                Ok(()) => applied += 1,
                Err(error) => {
                    warn!(
                        range = %change.range,
                        add = %change.add,
                        remove = %change.remove,
                        %error,
                        "skipping invalid replica change"
                    );
                }
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::complex_spec;
    use allocsim_types::Key;
    use allocsim_workload::LoadEvent;

    fn loaded_state() -> ClusterState {
        let mut state = ClusterState::load_spec(&complex_spec()).unwrap();
        state.apply_load(&vec![LoadEvent {
            key: Key(5),
            writes: 1,
            write_size: 7,
            reads: 2,
            read_size: 9,
        }]);
        state
    }

    #[test]
    fn test_move_conserves_bytes_and_counters() {
        let mut state = loaded_state();
        let before: Vec<_> = state
            .replica_placements(RangeId(1))
            .unwrap()
            .keys()
            .copied()
            .collect();
        assert_eq!(before, vec![StoreId(1), StoreId(3), StoreId(5)]);

        ReplicaChange {
            range: RangeId(1),
            add: StoreId(2),
            remove: StoreId(1),
        }
        .apply(&mut state)
        .unwrap();

        let after: Vec<_> = state
            .replica_placements(RangeId(1))
            .unwrap()
            .keys()
            .copied()
            .collect();
        assert_eq!(after, vec![StoreId(2), StoreId(3), StoreId(5)]);

        // Bytes and counters moved with the replica.
        assert_eq!(state.replica_size(RangeId(1), StoreId(2)), Some(7));
        assert_eq!(state.replica_size(RangeId(1), StoreId(1)), None);
        assert_eq!(state.range_size(RangeId(1)), Some(7));
        let usage = state.store_usage(StoreId(2));
        assert_eq!(usage.load.reads, 2);
        assert_eq!(usage.load.read_bytes, 9);

        assert_eq!(state.replica_moves(), 1);
        assert_eq!(state.replica_bytes_moved(), 7);
    }

    #[test]
    fn test_lease_follows_removed_holder() {
        let mut state = loaded_state();
        assert_eq!(state.leaseholder(RangeId(1)), Some(StoreId(1)));

        ReplicaChange {
            range: RangeId(1),
            add: StoreId(2),
            remove: StoreId(1),
        }
        .apply(&mut state)
        .unwrap();

        assert_eq!(state.leaseholder(RangeId(1)), Some(StoreId(2)));
        assert_eq!(state.lease_transfers(), 2, "inherited lease counts as a move");
    }

    #[test]
    fn test_lease_stays_when_other_replica_moves() {
        let mut state = loaded_state();

        ReplicaChange {
            range: RangeId(1),
            add: StoreId(4),
            remove: StoreId(5),
        }
        .apply(&mut state)
        .unwrap();

        assert_eq!(state.leaseholder(RangeId(1)), Some(StoreId(1)));
        assert_eq!(state.lease_transfers(), 1);
    }

    #[test]
    fn test_remove_without_replica_fails() {
        let mut state = loaded_state();
        let err = ReplicaChange {
            range: RangeId(1),
            add: StoreId(4),
            remove: StoreId(2),
        }
        .apply(&mut state)
        .unwrap_err();
        assert_eq!(
            err,
            StateError::ReplicaNotFound { range: RangeId(1), store: StoreId(2) }
        );
    }

    #[test]
    fn test_add_duplicate_fails() {
        let mut state = loaded_state();
        let err = ReplicaChange {
            range: RangeId(1),
            add: StoreId(3),
            remove: StoreId(1),
        }
        .apply(&mut state)
        .unwrap_err();
        assert_eq!(
            err,
            StateError::DuplicateReplica { range: RangeId(1), store: StoreId(3) }
        );
    }

    #[test]
    fn test_changer_fifo_and_skip() {
        let mut state = loaded_state();
        let mut changer = ReplicaChanger::new();

        changer.push(ReplicaChange {
            range: RangeId(1),
            add: StoreId(2),
            remove: StoreId(1),
        });
        // Invalid once the first change has applied: store 1 is empty.
        changer.push(ReplicaChange {
            range: RangeId(1),
            add: StoreId(4),
            remove: StoreId(1),
        });
        changer.push(ReplicaChange {
            range: RangeId(1),
            add: StoreId(6),
            remove: StoreId(5),
        });
        assert_eq!(changer.pending(), 3);

        let applied = changer.tick(&mut state);
        assert_eq!(applied, 2, "invalid change skipped, queue continues");
        assert_eq!(changer.pending(), 0);

        let placements: Vec<_> = state
            .replica_placements(RangeId(1))
            .unwrap()
            .keys()
            .copied()
            .collect();
        assert_eq!(placements, vec![StoreId(2), StoreId(3), StoreId(6)]);
    }
}

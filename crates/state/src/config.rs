//! Cluster specs and the named preset catalog.

use crate::cluster::{ClusterState, ReplicaRole};
use crate::StateError;
use allocsim_types::{Key, RangeId, StoreId};
use std::collections::BTreeMap;

/// Default per-store capacity for presets, in bytes (256 GiB).
const DEFAULT_CAPACITY: u64 = 256 << 30;

/// One store in a cluster spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSpec {
    /// Store identifier.
    pub id: StoreId,
    /// Byte capacity reported in the store's descriptor.
    pub capacity: u64,
}

/// One range in a cluster spec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeSpec {
    /// Range identifier.
    pub id: RangeId,
    /// Start of the range's span. The lowest range must start at
    /// [`Key::MIN`] so every key resolves.
    pub start_key: Key,
    /// Replica placements.
    pub replicas: Vec<(StoreId, ReplicaRole)>,
    /// Initial lease holder; must appear in `replicas`.
    pub leaseholder: StoreId,
}

/// A deterministic initial topology: stores, ranges, replica placement
/// and initial lease holders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    /// Stores in the cluster.
    pub stores: Vec<StoreSpec>,
    /// Ranges partitioning the key space.
    pub ranges: Vec<RangeSpec>,
}

/// Seven stores, one full-span range with three voter replicas on the
/// odd stores 1, 3 and 5, lease held by store 1. Store 2 is deliberately
/// empty so placement changes targeting it are valid.
pub fn complex_spec() -> ClusterSpec {
    ClusterSpec {
        stores: (1..=7)
            .map(|id| StoreSpec { id: StoreId(id), capacity: DEFAULT_CAPACITY })
            .collect(),
        ranges: vec![RangeSpec {
            id: RangeId(1),
            start_key: Key::MIN,
            replicas: vec![
                (StoreId(1), ReplicaRole::Voter),
                (StoreId(3), ReplicaRole::Voter),
                (StoreId(5), ReplicaRole::Voter),
            ],
            leaseholder: StoreId(1),
        }],
    }
}

/// Three stores, one full-span range with a single replica on store 1.
pub fn single_range_spec() -> ClusterSpec {
    ClusterSpec {
        stores: (1..=3)
            .map(|id| StoreSpec { id: StoreId(id), capacity: DEFAULT_CAPACITY })
            .collect(),
        ranges: vec![RangeSpec {
            id: RangeId(1),
            start_key: Key::MIN,
            replicas: vec![(StoreId(1), ReplicaRole::Voter)],
            leaseholder: StoreId(1),
        }],
    }
}

/// Explicit name-to-spec lookup table.
///
/// Held and passed by callers rather than registered globally, so
/// multiple independent catalogs (and topologies) can coexist in one
/// process. The default catalog carries the closed set of built-in
/// presets.
pub struct PresetCatalog {
    entries: BTreeMap<&'static str, fn() -> ClusterSpec>,
}

impl PresetCatalog {
    /// Create an empty catalog.
    pub fn empty() -> Self {
        Self { entries: BTreeMap::new() }
    }

    /// Register a preset under a name, replacing any previous entry.
    pub fn register(&mut self, name: &'static str, spec: fn() -> ClusterSpec) {
        self.entries.insert(name, spec);
    }

    /// Resolve a preset name to its spec.
    pub fn spec(&self, name: &str) -> Result<ClusterSpec, StateError> {
        self.entries
            .get(name)
            .map(|f| f())
            .ok_or_else(|| StateError::UnknownPreset(name.to_string()))
    }

    /// Resolve a preset name and build its cluster state.
    pub fn load(&self, name: &str) -> Result<ClusterState, StateError> {
        ClusterState::load_spec(&self.spec(name)?)
    }

    /// Registered preset names, in order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }
}

impl Default for PresetCatalog {
    fn default() -> Self {
        let mut catalog = Self::empty();
        catalog.register("complex", complex_spec);
        catalog.register("single-range", single_range_spec);
        catalog
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_presets() {
        let catalog = PresetCatalog::default();
        assert_eq!(catalog.names(), vec!["complex", "single-range"]);

        let state = catalog.load("complex").unwrap();
        assert_eq!(state.store_ids().len(), 7);
        assert_eq!(state.range_ids(), vec![RangeId(1)]);
        assert_eq!(state.leaseholder(RangeId(1)), Some(StoreId(1)));
        assert_eq!(
            state.replica_placements(RangeId(1)).unwrap().len(),
            3,
            "complex preset replicates three ways"
        );
        // Store 2 must be free of replicas for rebalance scenarios.
        assert!(state.replicas_on(StoreId(2)).unwrap().is_empty());
    }

    #[test]
    fn test_single_range_preset() {
        let state = PresetCatalog::default().load("single-range").unwrap();
        assert_eq!(state.store_ids().len(), 3);
        assert_eq!(state.replica_placements(RangeId(1)).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_preset() {
        let err = PresetCatalog::default().load("nope").unwrap_err();
        assert_eq!(err, StateError::UnknownPreset("nope".to_string()));
    }

    #[test]
    fn test_rejects_leaseholder_without_replica() {
        let mut spec = single_range_spec();
        spec.ranges[0].leaseholder = StoreId(2);
        assert!(matches!(
            ClusterState::load_spec(&spec),
            Err(StateError::InvalidSpec(_))
        ));
    }

    #[test]
    fn test_rejects_uncovered_key_space() {
        let mut spec = single_range_spec();
        spec.ranges[0].start_key = Key(0);
        assert!(matches!(
            ClusterState::load_spec(&spec),
            Err(StateError::InvalidSpec(_))
        ));
    }
}

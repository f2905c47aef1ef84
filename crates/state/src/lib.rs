//! Authoritative in-memory model of a simulated storage cluster.
//!
//! [`ClusterState`] owns the stores, ranges, replicas and lease
//! assignments for one simulation run. It is mutated by load
//! application, lease transfers and replica placement changes, and read
//! by the metrics tracker and the exchange. A run's state is never
//! shared across runs or persisted.
//!
//! Placement changes arrive as [`ReplicaChange`] requests queued on a
//! [`ReplicaChanger`]; delayed cluster-wide visibility of store
//! descriptors is modelled by [`FixedDelayExchange`].

mod change;
mod cluster;
mod config;
mod error;
mod exchange;

pub use change::{ReplicaChange, ReplicaChanger};
pub use cluster::{ClusterState, ClusterUsage, LoadCounters, ReplicaRole, StoreUsage};
pub use config::{complex_spec, single_range_spec, ClusterSpec, PresetCatalog, RangeSpec, StoreSpec};
pub use error::StateError;
pub use exchange::{FixedDelayExchange, StoreDescriptor};

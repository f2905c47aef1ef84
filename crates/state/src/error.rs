//! Error types for cluster state mutation.

use allocsim_types::{RangeId, StoreId};
use thiserror::Error;

/// Errors raised by cluster state mutation and preset resolution.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// Lease transfer target holds no replica of the range.
    #[error("invalid lease transfer target: {store} holds no replica of {range}")]
    InvalidLeaseTarget {
        /// Range whose lease was being transferred.
        range: RangeId,
        /// Proposed lease holder.
        store: StoreId,
    },

    /// Replica change names a source store without a replica.
    #[error("replica not found: {store} holds no replica of {range}")]
    ReplicaNotFound {
        /// Range being moved.
        range: RangeId,
        /// Store the replica was expected on.
        store: StoreId,
    },

    /// Replica change would place a second replica on one store.
    #[error("duplicate replica: {store} already holds a replica of {range}")]
    DuplicateReplica {
        /// Range being moved.
        range: RangeId,
        /// Store that already hosts a replica.
        store: StoreId,
    },

    /// Range identifier not present in the cluster.
    #[error("unknown range: {0}")]
    UnknownRange(RangeId),

    /// Store identifier not present in the cluster.
    #[error("unknown store: {0}")]
    UnknownStore(StoreId),

    /// Preset name not registered in the catalog.
    #[error("unknown preset: {0:?}")]
    UnknownPreset(String),

    /// Cluster spec violates a structural invariant.
    #[error("invalid cluster spec: {0}")]
    InvalidSpec(String),
}

//! Error types for forest operations.

use thiserror::Error;

use crate::model::{Label, NodeId, Ordinal};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, ForestError>;

/// Invariant violations raised by [`crate::Forest`] operations.
///
/// None of these are recoverable: they indicate caller or algorithm error and
/// the operation that raised them leaves the forest untouched.
#[derive(Debug, Error)]
pub enum ForestError {
    /// A node with this identifier already exists.
    #[error("duplicate node added: {0}")]
    DuplicateNode(NodeId),
    /// Two nodes in one timestamp carry the same label.
    #[error("duplicate label {label} in timestamp {ordinal} (held by {existing})")]
    DuplicateLabel {
        /// Timestamp ordinal.
        ordinal: Ordinal,
        /// Offending label.
        label: Label,
        /// Node already holding the label.
        existing: NodeId,
    },
    /// No node with this identifier exists.
    #[error("node {0} not found")]
    UnknownNode(NodeId),
    /// A parent link would not strictly increase the ordinal from parent to child.
    #[error(
        "bad parent: {parent} (ordinal {parent_ordinal}) cannot parent {child} (ordinal {child_ordinal})"
    )]
    OrdinalOrder {
        /// Proposed parent.
        parent: NodeId,
        /// Ordinal of the proposed parent.
        parent_ordinal: Ordinal,
        /// Child being linked.
        child: NodeId,
        /// Ordinal of the child.
        child_ordinal: Ordinal,
    },
    /// Derived track/lineage state disagrees with the computed ancestors.
    #[error("inconsistent derived state: {0}")]
    Inconsistent(String),
    /// A pass ran before the pass it depends on.
    #[error("{0} must be computed first")]
    NotComputed(&'static str),
    /// A snapshot document does not describe a valid forest.
    #[error("malformed snapshot: {0}")]
    Snapshot(String),
    /// JSON encoding or decoding failed.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

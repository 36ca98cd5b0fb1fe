//! Per-ordinal node groupings.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::error::{ForestError, Result};
use crate::model::{Label, Node, NodeId, Ordinal};

/// All nodes sharing one time ordinal.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeStamp {
    ordinal: Ordinal,
    node_ids: BTreeSet<NodeId>,
    label_to_node: BTreeMap<Label, NodeId>,
}

/// Compact description of a timestamp: its ordinal and sorted node ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimestampSummary {
    /// Timestamp ordinal.
    pub ordinal: Ordinal,
    /// Identifiers of every node in the timestamp, sorted.
    pub node_id: Vec<NodeId>,
}

impl TimeStamp {
    pub(crate) fn new(ordinal: Ordinal) -> Self {
        Self {
            ordinal,
            node_ids: BTreeSet::new(),
            label_to_node: BTreeMap::new(),
        }
    }

    /// The timestamp's ordinal.
    pub fn ordinal(&self) -> Ordinal {
        self.ordinal
    }

    /// Node identifiers in sorted order.
    pub fn node_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.node_ids.iter()
    }

    /// Number of nodes in the timestamp.
    pub fn len(&self) -> usize {
        self.node_ids.len()
    }

    /// `true` if no node has been placed in the timestamp.
    pub fn is_empty(&self) -> bool {
        self.node_ids.is_empty()
    }

    /// Looks up the node carrying `label`.
    pub fn node_for_label(&self, label: Label) -> Option<&NodeId> {
        self.label_to_node.get(&label)
    }

    /// Labels present in the timestamp, ascending.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.label_to_node.keys().copied()
    }

    /// Checks that `node` can join this timestamp without breaking label uniqueness.
    pub(crate) fn check_node(&self, node: &Node) -> Result<()> {
        if node.ordinal != self.ordinal {
            return Err(ForestError::Inconsistent(format!(
                "node {} (ordinal {}) not in timestamp {}",
                node.id, node.ordinal, self.ordinal
            )));
        }
        if let Some(label) = node.label {
            if let Some(existing) = self.label_to_node.get(&label) {
                return Err(ForestError::DuplicateLabel {
                    ordinal: self.ordinal,
                    label,
                    existing: existing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Records `node`; callers run [`Self::check_node`] first.
    pub(crate) fn insert(&mut self, node: &Node) {
        if let Some(label) = node.label {
            self.label_to_node.insert(label, node.id.clone());
        }
        self.node_ids.insert(node.id.clone());
    }

    /// Smallest ordinal among the direct parents of this timestamp's nodes,
    /// or the timestamp's own ordinal when none has a parent.
    pub fn farthest_parent_ordinal(&self, nodes: &BTreeMap<NodeId, Node>) -> Ordinal {
        self.node_ids
            .iter()
            .filter_map(|id| nodes.get(id)?.parent.as_ref())
            .filter_map(|parent| nodes.get(parent).map(|p| p.ordinal))
            .fold(self.ordinal, Ordinal::min)
    }

    /// Summary record for listing timestamps.
    pub fn summary(&self) -> TimestampSummary {
        TimestampSummary {
            ordinal: self.ordinal,
            node_id: self.node_ids.iter().cloned().collect(),
        }
    }
}

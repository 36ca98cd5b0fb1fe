//! JSON snapshots of a laid-out forest.
//!
//! A snapshot carries, per node, identity, ordinal, label, color, offset,
//! parent, and the isolated flag, plus the overall layout dimensions.
//! [`Forest::from_snapshot`] is the left inverse of [`Forest::json_ob`] with
//! `exclude_isolated = false`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ForestError, Result};
use crate::forest::Forest;
use crate::model::{Label, Node, NodeId, Ordinal, Rgb};

/// Serialized form of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node identifier.
    pub identity: NodeId,
    /// Timestamp ordinal.
    pub timestamp_ordinal: Ordinal,
    /// Mask label.
    pub label: Option<Label>,
    /// Assigned color.
    pub color: Option<Rgb>,
    /// Layout offset.
    pub offset: Option<f64>,
    /// Parent identifier.
    pub parent_id: Option<NodeId>,
    /// `true` iff the node has neither parent nor children.
    #[serde(default)]
    pub isolated: bool,
}

impl NodeRecord {
    /// Captures `node` as a record.
    pub fn from_node(node: &Node) -> Self {
        Self {
            identity: node.id.clone(),
            timestamp_ordinal: node.ordinal,
            label: node.label,
            color: node.color,
            offset: node.offset,
            parent_id: node.parent.clone(),
            isolated: node.is_isolated(),
        }
    }
}

/// Serialized form of a whole forest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestSnapshot {
    /// Max offset + 1.
    pub width: i64,
    /// Max ordinal + 1.
    pub height: i64,
    /// Node records keyed by identifier.
    pub id_to_node: BTreeMap<NodeId, NodeRecord>,
}

impl Forest {
    /// Snapshot of the forest.
    ///
    /// With `exclude_isolated`, isolated nodes are left out of `id_to_node`
    /// but still count toward `width` and `height`.
    pub fn json_ob(&self, exclude_isolated: bool) -> ForestSnapshot {
        let (width, height) = self.dimensions();
        let id_to_node = self
            .nodes
            .values()
            .filter(|node| !(exclude_isolated && node.is_isolated()))
            .map(|node| (node.id.clone(), NodeRecord::from_node(node)))
            .collect();
        ForestSnapshot {
            width,
            height,
            id_to_node,
        }
    }

    /// Snapshot encoded as a JSON string.
    pub fn to_json(&self, exclude_isolated: bool) -> Result<String> {
        Ok(serde_json::to_string(&self.json_ob(exclude_isolated))?)
    }

    /// Decodes a JSON snapshot; see [`Self::from_snapshot`].
    pub fn from_json(text: &str) -> Result<Forest> {
        let snapshot: ForestSnapshot = serde_json::from_str(text)?;
        Self::from_snapshot(snapshot)
    }

    /// Rebuilds a forest from a snapshot, restoring node structure, offsets,
    /// and colors.
    ///
    /// Track and lineage partitions are not part of a snapshot; run
    /// [`Self::find_tracks_and_lineages`] before relying on them.
    ///
    /// # Errors
    /// [`ForestError::Snapshot`] when a key disagrees with its record's
    /// identity or a parent is missing, plus any error from
    /// [`Self::add_node`] or [`Self::link`].
    pub fn from_snapshot(snapshot: ForestSnapshot) -> Result<Forest> {
        let mut forest = Forest::new();
        for (key, record) in &snapshot.id_to_node {
            if key != &record.identity {
                return Err(ForestError::Snapshot(format!(
                    "key {key} holds record for {}",
                    record.identity
                )));
            }
            forest.add_node(record.identity.clone(), record.timestamp_ordinal, record.label)?;
        }
        for record in snapshot.id_to_node.values() {
            let Some(parent) = &record.parent_id else {
                continue;
            };
            if !forest.nodes.contains_key(parent) {
                return Err(ForestError::Snapshot(format!(
                    "parent {parent} of {} is not in the snapshot",
                    record.identity
                )));
            }
            forest.link(parent, &record.identity)?;
        }
        for record in snapshot.id_to_node.values() {
            if let Some(node) = forest.nodes.get_mut(&record.identity) {
                node.offset = record.offset;
                node.color = record.color;
            }
        }
        debug!(
            nodes = forest.nodes.len(),
            edges = forest.edge_count(),
            "codec.snapshot.loaded"
        );
        Ok(forest)
    }
}

//! Windowed views of one timestamp with its parent context.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Forest;
use crate::codec::NodeRecord;
use crate::model::{Node, NodeId, Ordinal};

/// A node of a region view with window-local coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionNode {
    /// The node as it appears in a forest snapshot.
    #[serde(flatten)]
    pub node: NodeRecord,
    /// Rank of the node's offset among the distinct offsets in the window.
    pub x: usize,
    /// Window row; the most recent included timestamp is row 0.
    pub y: usize,
    /// `true` for nodes of the requested timestamp, `false` for ancestor context.
    pub is_child: bool,
}

/// The bounded window of timestamps needed to render one timestamp with its
/// direct ancestor context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionView {
    /// Every node of every included timestamp.
    pub id_to_node: BTreeMap<NodeId, RegionNode>,
    /// Number of distinct offsets in the window.
    pub width: usize,
    /// Number of included timestamps.
    pub height: usize,
    /// Included ordinals, ascending.
    pub ordinals: Vec<Ordinal>,
}

impl RegionView {
    /// The "no data" answer for an ordinal without a timestamp.
    pub fn empty() -> Self {
        Self {
            id_to_node: BTreeMap::new(),
            width: 1,
            height: 1,
            ordinals: Vec::new(),
        }
    }

    /// `true` if the view holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.id_to_node.is_empty()
    }
}

impl Forest {
    /// Builds the render window for the timestamp at `ordinal`.
    ///
    /// The window holds the target timestamp, the immediately preceding
    /// existing timestamp, and every existing timestamp between the target and
    /// the oldest direct parent of a target node. Ancestors beyond one hop are
    /// not followed. Unknown ordinals yield [`RegionView::empty`].
    ///
    /// Coordinates are only meaningful after the recompute pipeline has run.
    pub fn timestamp_region_json(&self, ordinal: Ordinal) -> RegionView {
        let Some(target) = self.timestamps.get(&ordinal) else {
            debug!(ordinal, "forest.region.no_timestamp");
            return RegionView::empty();
        };

        let mut ordinals: BTreeSet<Ordinal> = BTreeSet::new();
        ordinals.insert(ordinal);
        if let Some((pred, _)) = self.timestamps.range(..ordinal).next_back() {
            ordinals.insert(*pred);
        }
        let floor = target.farthest_parent_ordinal(&self.nodes);
        ordinals.extend(self.timestamps.range(floor..=ordinal).map(|(ord, _)| *ord));

        let members: Vec<&Node> = ordinals
            .iter()
            .filter_map(|ord| self.timestamps.get(ord))
            .flat_map(|ts| ts.node_ids())
            .filter_map(|id| self.nodes.get(id))
            .collect();

        let mut offsets: Vec<Option<f64>> = members.iter().map(|n| n.offset).collect();
        offsets.sort_by(cmp_offset);
        offsets.dedup_by(|a, b| cmp_offset(a, b) == Ordering::Equal);

        let rows: Vec<Ordinal> = ordinals.into_iter().collect();
        let height = rows.len();
        let id_to_node = members
            .into_iter()
            .map(|node| {
                let x = offsets
                    .binary_search_by(|other| cmp_offset(other, &node.offset))
                    .unwrap_or_default();
                let row = rows.binary_search(&node.ordinal).unwrap_or_default();
                let region_node = RegionNode {
                    node: NodeRecord::from_node(node),
                    x,
                    y: height - row - 1,
                    is_child: node.ordinal == ordinal,
                };
                (node.id.clone(), region_node)
            })
            .collect();

        debug!(
            ordinal,
            floor,
            window = height,
            columns = offsets.len(),
            "forest.region.built"
        );
        RegionView {
            id_to_node,
            width: offsets.len(),
            height,
            ordinals: rows,
        }
    }
}

/// Total order over optional offsets; unassigned offsets sort first.
fn cmp_offset(a: &Option<f64>, b: &Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

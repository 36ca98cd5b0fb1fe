//! Dendrogram offset assignment.

use std::collections::BTreeMap;

use tracing::debug;

use super::Forest;
use crate::error::{ForestError, Result};
use crate::model::{Node, NodeId};

/// Column cursor shared by one top-level layout call.
///
/// Only branch points advance it; leaves read it without advancing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor(i64);

impl Forest {
    /// Assigns every node a horizontal offset for dendrogram rendering.
    ///
    /// Lineages are laid out one root at a time, separated by a one-column gap:
    /// non-isolated lineages first in root-identifier order, then isolated
    /// (single-node) lineages in the same order. Within a lineage:
    ///
    /// - a leaf takes the current cursor value without advancing it;
    /// - a single-child node recurses and then sits on its child's column;
    /// - a branch point recurses into its first child (by identifier), advances
    ///   the cursor by one, recurses into the remaining children, and centers
    ///   itself between its first and last child.
    ///
    /// Two leaves under unrelated single-child chains can land on the same
    /// column when no branch point advances the cursor between them.
    ///
    /// Returns the cursor value after the last lineage.
    ///
    /// # Errors
    /// [`ForestError::NotComputed`] if [`Self::find_tracks_and_lineages`] has
    /// not run since the last structural edit.
    pub fn assign_offsets(&mut self, start_at: i64) -> Result<i64> {
        let groups = self
            .groups
            .as_ref()
            .ok_or(ForestError::NotComputed("lineages"))?;

        let (isolated, connected): (Vec<_>, Vec<_>) = groups
            .lineages
            .values()
            .partition(|lineage| lineage.is_isolated());

        let mut offsets: BTreeMap<NodeId, f64> = BTreeMap::new();
        let mut cursor = Cursor(start_at);
        for lineage in connected.iter().chain(isolated.iter()) {
            let end = layout_subtree(&self.nodes, &lineage.root, &mut cursor, &mut offsets)?;
            cursor = Cursor(end + 1);
        }

        if offsets.len() != self.nodes.len() {
            return Err(ForestError::Inconsistent(format!(
                "layout reached {} of {} nodes",
                offsets.len(),
                self.nodes.len()
            )));
        }
        for (id, offset) in offsets {
            if let Some(node) = self.nodes.get_mut(&id) {
                node.offset = Some(offset);
            }
        }
        debug!(
            lineages = connected.len(),
            isolated = isolated.len(),
            cursor = cursor.0,
            "forest.layout.assigned"
        );
        Ok(cursor.0)
    }
}

/// Pending work for the layout descent.
enum Step<'a> {
    /// Place a node, scheduling its children first.
    Visit(&'a NodeId),
    /// Put a single-child node on its child's column.
    Collapse { node: &'a NodeId, child: &'a NodeId },
    /// Reserve a fresh column after a branch point's first child.
    Advance,
    /// Center a branch point between its first and last child.
    Center {
        node: &'a NodeId,
        first: &'a NodeId,
        last: &'a NodeId,
    },
}

/// Lays out the subtree under `root`, returning the cursor value when done.
///
/// Depth-first with an explicit stack, so track length is bounded by memory
/// rather than by the thread stack.
fn layout_subtree<'a>(
    nodes: &'a BTreeMap<NodeId, Node>,
    root: &'a NodeId,
    cursor: &mut Cursor,
    offsets: &mut BTreeMap<NodeId, f64>,
) -> Result<i64> {
    let mut stack = vec![Step::Visit(root)];
    while let Some(step) = stack.pop() {
        match step {
            Step::Visit(id) => {
                let node = nodes
                    .get(id)
                    .ok_or_else(|| ForestError::UnknownNode(id.clone()))?;
                let mut children = node.children.iter();
                match (children.next(), children.next_back()) {
                    (None, _) => {
                        offsets.insert(id.clone(), cursor.0 as f64);
                    }
                    (Some(only), None) => {
                        stack.push(Step::Collapse {
                            node: id,
                            child: only,
                        });
                        stack.push(Step::Visit(only));
                    }
                    (Some(first), Some(last)) => {
                        stack.push(Step::Center {
                            node: id,
                            first,
                            last,
                        });
                        stack.push(Step::Visit(last));
                        stack.extend(children.rev().map(Step::Visit));
                        stack.push(Step::Advance);
                        stack.push(Step::Visit(first));
                    }
                }
            }
            Step::Collapse { node, child } => {
                let offset = placed(offsets, child)?;
                offsets.insert(node.clone(), offset);
            }
            Step::Advance => cursor.0 += 1,
            Step::Center { node, first, last } => {
                let offset = 0.5 * (placed(offsets, first)? + placed(offsets, last)?);
                offsets.insert(node.clone(), offset);
            }
        }
    }
    Ok(cursor.0)
}

fn placed(offsets: &BTreeMap<NodeId, f64>, id: &NodeId) -> Result<f64> {
    offsets
        .get(id)
        .copied()
        .ok_or_else(|| ForestError::Inconsistent(format!("{id} was not laid out")))
}

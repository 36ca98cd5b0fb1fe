//! Track and lineage discovery.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::{Forest, Groups};
use crate::error::{ForestError, Result};
use crate::model::{Node, NodeId};

/// A maximal non-branching chain of nodes: one cell followed across time
/// without division.
///
/// Tracks are immutable snapshots rebuilt wholesale by
/// [`Forest::find_tracks_and_lineages`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    /// Topmost node of the chain (forest root or child of a branch point).
    pub root: NodeId,
    /// Dense position in the forest track order (sorted root identifiers).
    pub index: usize,
    /// Every node of the track.
    pub members: BTreeSet<NodeId>,
}

/// A connected component of nodes descended from one ancestor; the union of
/// one or more tracks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lineage {
    /// Common ancestor of every member.
    pub root: NodeId,
    /// Dense position among lineages sorted by root identifier.
    pub index: usize,
    /// Every node of the lineage.
    pub members: BTreeSet<NodeId>,
}

impl Lineage {
    /// A lineage of fewer than two nodes, i.e. a single isolated node.
    pub fn is_isolated(&self) -> bool {
        self.members.len() < 2
    }
}

impl Forest {
    /// Partitions every node into tracks and lineages and fixes the track order.
    ///
    /// All derived fields are reset first, since topology may have changed
    /// since the last pass. Ancestors are memoized per node for the duration
    /// of the pass.
    ///
    /// # Errors
    /// [`ForestError::Inconsistent`] if a node's computed ancestor disagrees
    /// with the group it was filed under. The forest is left reset.
    pub fn find_tracks_and_lineages(&mut self) -> Result<()> {
        self.reset();

        let ids: Vec<NodeId> = self.nodes.keys().cloned().collect();
        for id in &ids {
            resolve_track_ancestor(&mut self.nodes, id)?;
        }
        for id in &ids {
            resolve_lineage_ancestor(&mut self.nodes, id)?;
        }

        let mut track_members: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        let mut lineage_members: BTreeMap<NodeId, BTreeSet<NodeId>> = BTreeMap::new();
        for node in self.nodes.values() {
            let (track_root, lineage_root) = ancestors_of(node)?;
            track_members
                .entry(track_root.clone())
                .or_default()
                .insert(node.id.clone());
            lineage_members
                .entry(lineage_root.clone())
                .or_default()
                .insert(node.id.clone());
        }

        let tracks: BTreeMap<NodeId, Track> = track_members
            .into_iter()
            .enumerate()
            .map(|(index, (root, members))| {
                let track = Track {
                    root: root.clone(),
                    index,
                    members,
                };
                (root, track)
            })
            .collect();
        let lineages: BTreeMap<NodeId, Lineage> = lineage_members
            .into_iter()
            .enumerate()
            .map(|(index, (root, members))| {
                let lineage = Lineage {
                    root: root.clone(),
                    index,
                    members,
                };
                (root, lineage)
            })
            .collect();

        self.check_groups(&tracks, &lineages)?;

        for track in tracks.values() {
            for member in &track.members {
                if let Some(node) = self.nodes.get_mut(member) {
                    node.track_index = Some(track.index);
                }
            }
        }
        let track_order: Vec<NodeId> = tracks.keys().cloned().collect();
        debug!(
            nodes = self.nodes.len(),
            tracks = tracks.len(),
            lineages = lineages.len(),
            "forest.groups.rebuilt"
        );
        self.groups = Some(Groups {
            tracks,
            lineages,
            track_order,
        });
        Ok(())
    }

    fn check_groups(
        &self,
        tracks: &BTreeMap<NodeId, Track>,
        lineages: &BTreeMap<NodeId, Lineage>,
    ) -> Result<()> {
        let mut seen_in_tracks = 0usize;
        for track in tracks.values() {
            for member in &track.members {
                let node = self.lookup(member)?;
                if node.track_ancestor.as_ref() != Some(&track.root) {
                    return Err(ForestError::Inconsistent(format!(
                        "wrong track: {member} filed under {}",
                        track.root
                    )));
                }
                seen_in_tracks += 1;
            }
        }
        let mut seen_in_lineages = 0usize;
        for lineage in lineages.values() {
            for member in &lineage.members {
                let node = self.lookup(member)?;
                if node.lineage_ancestor.as_ref() != Some(&lineage.root) {
                    return Err(ForestError::Inconsistent(format!(
                        "wrong lineage: {member} filed under {}",
                        lineage.root
                    )));
                }
                seen_in_lineages += 1;
            }
        }
        if seen_in_tracks != self.nodes.len() || seen_in_lineages != self.nodes.len() {
            return Err(ForestError::Inconsistent(format!(
                "partition covers {seen_in_tracks} track members and {seen_in_lineages} lineage members for {} nodes",
                self.nodes.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn lookup(&self, id: &NodeId) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| ForestError::UnknownNode(id.clone()))
    }
}

fn ancestors_of(node: &Node) -> Result<(&NodeId, &NodeId)> {
    match (&node.track_ancestor, &node.lineage_ancestor) {
        (Some(track), Some(lineage)) => Ok((track, lineage)),
        _ => Err(ForestError::Inconsistent(format!(
            "ancestors of {} were not resolved",
            node.id
        ))),
    }
}

fn get<'a>(nodes: &'a BTreeMap<NodeId, Node>, id: &NodeId) -> Result<&'a Node> {
    nodes
        .get(id)
        .ok_or_else(|| ForestError::UnknownNode(id.clone()))
}

/// A node is its own track ancestor when it has no parent or its parent
/// branches; otherwise it inherits the parent's track ancestor.
///
/// Walks upward until a memoized or self-rooted node is found, then fills
/// the memo for the whole walked chain.
fn resolve_track_ancestor(nodes: &mut BTreeMap<NodeId, Node>, start: &NodeId) -> Result<NodeId> {
    let mut chain = Vec::new();
    let mut current = start.clone();
    let root = loop {
        let node = get(nodes, &current)?;
        if let Some(cached) = &node.track_ancestor {
            break cached.clone();
        }
        chain.push(current.clone());
        match &node.parent {
            None => break current,
            Some(parent_id) => {
                let parent = get(nodes, parent_id)?;
                if parent.children.len() > 1 {
                    break current;
                }
                current = parent_id.clone();
            }
        }
    };
    for id in chain {
        if let Some(node) = nodes.get_mut(&id) {
            node.track_ancestor = Some(root.clone());
        }
    }
    Ok(root)
}

/// A parentless node is its own lineage ancestor; otherwise the lineage
/// ancestor is that of the parent's track ancestor.
///
/// Requires track ancestors to be resolved for every node.
fn resolve_lineage_ancestor(nodes: &mut BTreeMap<NodeId, Node>, start: &NodeId) -> Result<NodeId> {
    let mut chain = Vec::new();
    let mut current = start.clone();
    let root = loop {
        let node = get(nodes, &current)?;
        if let Some(cached) = &node.lineage_ancestor {
            break cached.clone();
        }
        chain.push(current.clone());
        match &node.parent {
            None => break current,
            Some(parent_id) => {
                let parent = get(nodes, parent_id)?;
                current = parent.track_ancestor.clone().ok_or_else(|| {
                    ForestError::Inconsistent(format!(
                        "track ancestor of {parent_id} not resolved"
                    ))
                })?;
            }
        }
    };
    for id in chain {
        if let Some(node) = nodes.get_mut(&id) {
            node.lineage_ancestor = Some(root.clone());
        }
    }
    Ok(root)
}

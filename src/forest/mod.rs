//! The lineage forest: node arena, timestamps, and derived structure.
//!
//! [`Forest`] owns every [`Node`] and [`TimeStamp`]. Derived state (tracks,
//! lineages, offsets, colors) is produced by the recompute pipeline:
//!
//! 1. [`Forest::find_tracks_and_lineages`]
//! 2. [`Forest::assign_offsets`]
//! 3. [`Forest::assign_colors`]
//!
//! Structural edits ([`Forest::reparent`], [`Forest::disconnect`]) drop all
//! derived state; the pipeline must run again before region queries or
//! snapshots are trusted.

pub mod colors;
pub mod edit;
pub mod groups;
pub mod layout;
pub mod region;
pub mod timestamp;


use std::collections::BTreeMap;

use tracing::debug;

use crate::config::LayoutOptions;
use crate::error::{ForestError, Result};
use crate::model::{Label, Node, NodeId, Ordinal};
use crate::volume::VolumeSources;

pub use colors::{CyclicPalette, Palette, MAX_COLOR_TABLE_LEN};
pub use edit::EditOutcome;
pub use groups::{Lineage, Track};
pub use region::{RegionNode, RegionView};
pub use timestamp::{TimeStamp, TimestampSummary};

/// Track and lineage partitions produced by one discovery pass.
#[derive(Debug, Clone, Default)]
pub(crate) struct Groups {
    pub(crate) tracks: BTreeMap<NodeId, Track>,
    pub(crate) lineages: BTreeMap<NodeId, Lineage>,
    pub(crate) track_order: Vec<NodeId>,
}

/// A time-indexed forest of cell ancestry relationships.
///
/// Nodes live in an arena keyed by [`NodeId`]; parent/child relationships are
/// identifiers resolved through it. The forest is single-threaded: callers
/// serialize edits and recomputations, and any borrowed node is invalid after
/// the next structural edit.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    pub(crate) nodes: BTreeMap<NodeId, Node>,
    pub(crate) timestamps: BTreeMap<Ordinal, TimeStamp>,
    pub(crate) groups: Option<Groups>,
    pub(crate) volumes: VolumeSources,
}

impl Forest {
    /// Creates an empty forest with no volume loaders configured.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, creating its timestamp on first use.
    ///
    /// # Errors
    /// [`ForestError::DuplicateNode`] if `id` is taken, [`ForestError::DuplicateLabel`]
    /// if another node in the same timestamp carries `label`. Nothing is
    /// inserted on error.
    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        ordinal: Ordinal,
        label: Option<Label>,
    ) -> Result<&Node> {
        let id = id.into();
        if self.nodes.contains_key(&id) {
            return Err(ForestError::DuplicateNode(id));
        }
        let node = Node::new(id.clone(), ordinal, label);
        if let Some(ts) = self.timestamps.get(&ordinal) {
            ts.check_node(&node)?;
        }
        self.get_or_add_timestamp(ordinal).insert(&node);
        self.groups = None;
        Ok(self.nodes.entry(id).or_insert(node))
    }

    fn get_or_add_timestamp(&mut self, ordinal: Ordinal) -> &mut TimeStamp {
        self.timestamps
            .entry(ordinal)
            .or_insert_with(|| TimeStamp::new(ordinal))
    }

    /// Looks up a node by identifier.
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Looks up a node by timestamp and label.
    pub fn node_by_label(&self, ordinal: Ordinal, label: Label) -> Option<&Node> {
        let id = self.timestamps.get(&ordinal)?.node_for_label(label)?;
        self.nodes.get(id)
    }

    /// All nodes, sorted by identifier.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` if the forest holds no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of parent/child links.
    pub fn edge_count(&self) -> usize {
        self.nodes.values().filter(|n| n.parent.is_some()).count()
    }

    /// Looks up a timestamp by ordinal.
    pub fn timestamp(&self, ordinal: Ordinal) -> Option<&TimeStamp> {
        self.timestamps.get(&ordinal)
    }

    /// All timestamps in ascending ordinal order.
    pub fn timestamps(&self) -> impl Iterator<Item = &TimeStamp> {
        self.timestamps.values()
    }

    /// Existing ordinals, ascending.
    pub fn ordinals(&self) -> impl Iterator<Item = Ordinal> + '_ {
        self.timestamps.keys().copied()
    }

    /// Current tracks keyed by root identifier, if discovery has run since the last edit.
    pub fn tracks(&self) -> Option<&BTreeMap<NodeId, Track>> {
        self.groups.as_ref().map(|g| &g.tracks)
    }

    /// Current lineages keyed by root identifier, if discovery has run since the last edit.
    pub fn lineages(&self) -> Option<&BTreeMap<NodeId, Lineage>> {
        self.groups.as_ref().map(|g| &g.lineages)
    }

    /// Tracks in their dense index order.
    pub fn track_order(&self) -> Option<impl Iterator<Item = &Track>> {
        let groups = self.groups.as_ref()?;
        Some(
            groups
                .track_order
                .iter()
                .filter_map(|root| groups.tracks.get(root)),
        )
    }

    /// Clears every derived field forest-wide and drops the track/lineage partitions.
    pub fn reset(&mut self) {
        for node in self.nodes.values_mut() {
            node.reset();
        }
        self.groups = None;
    }

    /// Copies nodes, labels, parent links, and loaders into a new forest with no
    /// derived state.
    pub fn clean_clone(&self) -> Forest {
        let mut clone = Forest {
            nodes: self.nodes.clone(),
            timestamps: self.timestamps.clone(),
            groups: None,
            volumes: self.volumes.clone(),
        };
        clone.reset();
        clone
    }

    /// Overall `(width, height)`: max assigned offset + 1 and max ordinal + 1.
    ///
    /// Isolated nodes count toward both. An empty forest, or one without
    /// offsets, reports a width of 1; an empty forest reports a height of 1.
    pub fn dimensions(&self) -> (i64, i64) {
        let height = self
            .timestamps
            .keys()
            .next_back()
            .map_or(1, |max| i64::from(*max) + 1);
        let width = self
            .nodes
            .values()
            .filter_map(|n| n.offset)
            .max_by(f64::total_cmp)
            .map_or(1, |max| max.ceil() as i64 + 1);
        (width, height)
    }

    /// Runs the full recompute pipeline: discovery, offsets, then colors.
    pub fn recompute(&mut self, options: &LayoutOptions, palette: &dyn Palette) -> Result<()> {
        self.find_tracks_and_lineages()?;
        self.assign_offsets(options.start_at)?;
        self.assign_colors(palette, options.color_by)?;
        let (width, height) = self.dimensions();
        debug!(
            nodes = self.nodes.len(),
            width,
            height,
            "forest.recompute.completed"
        );
        Ok(())
    }
}

//! Node colors and per-timestamp label color tables.

use std::collections::BTreeSet;

use tracing::debug;

use super::Forest;
use crate::config::ColorBy;
use crate::error::{ForestError, Result};
use crate::model::{Label, NodeId, Ordinal, Rgb};

/// Largest label-indexed table [`Forest::color_mapping`] will build (2^24 labels).
pub const MAX_COLOR_TABLE_LEN: usize = 1 << 24;

/// Source of display colors; palette generation lives outside this crate.
pub trait Palette {
    /// Color for a collection index. Index 0 is reserved for the background.
    fn color_for_index(&self, index: usize) -> Rgb;
}

impl<F> Palette for F
where
    F: Fn(usize) -> Rgb,
{
    fn color_for_index(&self, index: usize) -> Rgb {
        self(index)
    }
}

/// A fixed table of distinct colors repeated cyclically.
#[derive(Debug, Clone)]
pub struct CyclicPalette {
    colors: Vec<Rgb>,
}

impl Default for CyclicPalette {
    fn default() -> Self {
        Self::new(vec![
            Rgb(230, 25, 75),
            Rgb(60, 180, 75),
            Rgb(255, 225, 25),
            Rgb(0, 130, 200),
            Rgb(245, 130, 48),
            Rgb(145, 30, 180),
            Rgb(70, 240, 240),
            Rgb(240, 50, 230),
            Rgb(210, 245, 60),
            Rgb(250, 190, 212),
            Rgb(0, 128, 128),
            Rgb(170, 110, 40),
        ])
    }
}

impl CyclicPalette {
    /// Builds a palette from `colors`; an empty table falls back to grey.
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self { colors }
    }
}

impl Palette for CyclicPalette {
    fn color_for_index(&self, index: usize) -> Rgb {
        if index == 0 {
            return Rgb::BLACK;
        }
        if self.colors.is_empty() {
            return Rgb::GREY;
        }
        self.colors[(index - 1) % self.colors.len()]
    }
}

impl Forest {
    /// Colors every node by its track or lineage.
    ///
    /// Collections sorted by root identifier get `palette.color_for_index(i + 1)`
    /// for their position `i`, so colors are stable across recomputes of an
    /// unchanged forest.
    ///
    /// # Errors
    /// [`ForestError::NotComputed`] before [`Self::find_tracks_and_lineages`].
    pub fn assign_colors(&mut self, palette: &dyn Palette, color_by: ColorBy) -> Result<()> {
        let groups = self
            .groups
            .as_ref()
            .ok_or(ForestError::NotComputed("tracks and lineages"))?;
        let collections: Vec<&BTreeSet<NodeId>> = match color_by {
            ColorBy::Tracks => groups.tracks.values().map(|t| &t.members).collect(),
            ColorBy::Lineages => groups.lineages.values().map(|l| &l.members).collect(),
        };
        for (index, members) in collections.iter().enumerate() {
            let color = palette.color_for_index(index + 1);
            for member in members.iter() {
                if let Some(node) = self.nodes.get_mut(member) {
                    node.color = Some(color);
                }
            }
        }
        debug!(collections = collections.len(), ?color_by, "forest.colors.assigned");
        Ok(())
    }

    /// Label-indexed color table for the timestamp at `ordinal`.
    ///
    /// The table has `max(max_label, largest node label) + 1` entries: label 0
    /// is black, labels without a node are grey, and labels with a node carry
    /// its color (grey if it has none yet). Returns `None` for an unknown
    /// ordinal, or when the table would exceed [`MAX_COLOR_TABLE_LEN`] entries.
    pub fn color_mapping(&self, ordinal: Ordinal, max_label: Option<Label>) -> Option<Vec<Rgb>> {
        let ts = self.timestamps.get(&ordinal)?;
        let largest = ts.labels().last().unwrap_or(0);
        let requested = max_label.map_or(largest, |max| max.max(largest));
        let size = (requested as usize).saturating_add(1);
        if size > MAX_COLOR_TABLE_LEN {
            debug!(ordinal, size, "forest.colors.table_too_large");
            return None;
        }
        let mut table = vec![Rgb::GREY; size];
        table[0] = Rgb::BLACK;
        for label in ts.labels() {
            let color = ts
                .node_for_label(label)
                .and_then(|id| self.nodes.get(id))
                .and_then(|node| node.color)
                .unwrap_or(Rgb::GREY);
            table[label as usize] = color;
        }
        Some(table)
    }
}

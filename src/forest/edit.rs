//! Structural edits: linking, reparenting, disconnecting.

use tracing::{debug, info};

use super::Forest;
use crate::error::{ForestError, Result};
use crate::model::NodeId;

/// Result of a structural edit that may have nothing to change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The edit was applied and all derived state was dropped.
    Applied,
    /// The forest already had the requested shape; nothing changed.
    NothingToDo,
}

impl Forest {
    /// Makes `parent` the parent of `child`, detaching `child` from any
    /// previous parent. The track/lineage partition is dropped but per-node
    /// derived fields are left alone; callers that edit a laid-out forest use
    /// [`Self::reparent`].
    ///
    /// # Errors
    /// [`ForestError::UnknownNode`] for a missing endpoint and
    /// [`ForestError::OrdinalOrder`] unless `parent` is strictly earlier than
    /// `child`. Nothing is mutated on error.
    pub fn link(&mut self, parent: &NodeId, child: &NodeId) -> Result<()> {
        let parent_ordinal = self.lookup(parent)?.ordinal;
        let child_node = self.lookup(child)?;
        if parent_ordinal >= child_node.ordinal {
            return Err(ForestError::OrdinalOrder {
                parent: parent.clone(),
                parent_ordinal,
                child: child.clone(),
                child_ordinal: child_node.ordinal,
            });
        }
        self.detach(child);
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent.clone());
        }
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.insert(child.clone());
        }
        self.groups = None;
        Ok(())
    }

    /// Moves `child` under `new_parent` and drops all derived state.
    ///
    /// # Errors
    /// As [`Self::link`]; a rejected reparent leaves the forest, derived state
    /// included, exactly as it was.
    pub fn reparent(&mut self, child: &NodeId, new_parent: &NodeId) -> Result<EditOutcome> {
        if self.lookup(child)?.parent.as_ref() == Some(new_parent) {
            self.lookup(new_parent)?;
            return Ok(EditOutcome::NothingToDo);
        }
        self.link(new_parent, child)?;
        self.reset();
        info!(child = %child, parent = %new_parent, "forest.edit.reparent");
        Ok(EditOutcome::Applied)
    }

    /// Removes the parent link of `child` and drops all derived state.
    ///
    /// Returns [`EditOutcome::NothingToDo`] without touching anything when
    /// `child` has no parent.
    pub fn disconnect(&mut self, child: &NodeId) -> Result<EditOutcome> {
        if self.lookup(child)?.parent.is_none() {
            debug!(child = %child, "forest.edit.disconnect.no_parent");
            return Ok(EditOutcome::NothingToDo);
        }
        self.detach(child);
        self.reset();
        info!(child = %child, "forest.edit.disconnect");
        Ok(EditOutcome::Applied)
    }

    fn detach(&mut self, child: &NodeId) {
        let Some(old_parent) = self.nodes.get_mut(child).and_then(|n| n.parent.take()) else {
            return;
        };
        if let Some(node) = self.nodes.get_mut(&old_parent) {
            node.children.remove(child);
        }
    }
}

//! Core value types: identifiers, colors, and nodes.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Time-point index identifying a [`crate::forest::TimeStamp`].
pub type Ordinal = u32;

/// Mask value of a cell inside the label volume of its timestamp.
pub type Label = u32;

/// Forest-unique, opaque node identifier.
///
/// Identifiers are compared as strings; every "sorted by identifier" order in
/// the crate is the lexicographic order of the underlying text.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    /// Returns the identifier text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        NodeId(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        NodeId(value)
    }
}

/// An 8-bit RGB color, serialized as `"#rrggbb"`.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    /// Label 0 (background) in color mappings.
    pub const BLACK: Rgb = Rgb(0, 0, 0);
    /// Labels without an assigned node in color mappings.
    pub const GREY: Rgb = Rgb(128, 128, 128);

    /// Formats the color as an HTML hex string.
    pub fn to_html(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_html())
    }
}

/// Error returned when a string is not a `#rrggbb` color.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid html color '{0}'")]
pub struct ParseRgbError(pub String);

impl FromStr for Rgb {
    type Err = ParseRgbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
            .ok_or_else(|| ParseRgbError(s.to_string()))?;
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| ParseRgbError(s.to_string()))
        };
        Ok(Rgb(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl Serialize for Rgb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_html())
    }
}

impl<'de> Deserialize<'de> for Rgb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// A single cell observation at one time point.
///
/// Parent and child links are identifiers resolved through the owning
/// [`crate::Forest`]; a node never holds a reference to another node.
///
/// # Invariants
/// - `ordinal(parent) < ordinal(self)` whenever a parent is set
/// - `self` is in `children` of its parent, and every child names `self` as parent
/// - derived fields are `None` until the recompute pipeline fills them and are
///   cleared by [`crate::Forest::reset`]
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Forest-unique identifier.
    pub id: NodeId,
    /// Time ordinal of the timestamp holding this node.
    pub ordinal: Ordinal,
    /// Mask label, unique within the timestamp.
    pub label: Option<Label>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: BTreeSet<NodeId>,
    pub(crate) track_ancestor: Option<NodeId>,
    pub(crate) lineage_ancestor: Option<NodeId>,
    pub(crate) track_index: Option<usize>,
    pub(crate) offset: Option<f64>,
    pub(crate) color: Option<Rgb>,
}

impl Node {
    pub(crate) fn new(id: NodeId, ordinal: Ordinal, label: Option<Label>) -> Self {
        Self {
            id,
            ordinal,
            label,
            parent: None,
            children: BTreeSet::new(),
            track_ancestor: None,
            lineage_ancestor: None,
            track_index: None,
            offset: None,
            color: None,
        }
    }

    /// Clears every derived field.
    pub(crate) fn reset(&mut self) {
        self.track_ancestor = None;
        self.lineage_ancestor = None;
        self.track_index = None;
        self.offset = None;
        self.color = None;
    }

    /// Identifier of the parent node, if any.
    pub fn parent_id(&self) -> Option<&NodeId> {
        self.parent.as_ref()
    }

    /// Child identifiers in sorted order.
    pub fn children_ids(&self) -> impl Iterator<Item = &NodeId> {
        self.children.iter()
    }

    /// Number of children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    /// `true` iff the node has neither a parent nor children.
    pub fn is_isolated(&self) -> bool {
        self.parent.is_none() && self.children.is_empty()
    }

    /// Root of the node's track, once tracks have been computed.
    pub fn track_ancestor(&self) -> Option<&NodeId> {
        self.track_ancestor.as_ref()
    }

    /// Root of the node's lineage, once lineages have been computed.
    pub fn lineage_ancestor(&self) -> Option<&NodeId> {
        self.lineage_ancestor.as_ref()
    }

    /// Dense index of the node's track in the forest track order.
    pub fn track_index(&self) -> Option<usize> {
        self.track_index
    }

    /// Horizontal layout coordinate, once offsets have been assigned.
    pub fn offset(&self) -> Option<f64> {
        self.offset
    }

    /// Assigned display color.
    pub fn color(&self) -> Option<Rgb> {
        self.color
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_html_round_trip() {
        let color = Rgb(255, 8, 171);
        assert_eq!(color.to_html(), "#ff08ab");
        assert_eq!("#ff08ab".parse::<Rgb>().unwrap(), color);
    }

    #[test]
    fn rgb_rejects_malformed_text() {
        assert!("ff08ab".parse::<Rgb>().is_err());
        assert!("#ff08a".parse::<Rgb>().is_err());
        assert!("#gg0000".parse::<Rgb>().is_err());
        assert!("#+f+f+f".parse::<Rgb>().is_err());
        assert!("#-10000".parse::<Rgb>().is_err());
    }

    #[test]
    fn fresh_node_is_isolated() {
        let node = Node::new(NodeId::from("0_1"), 0, Some(1));
        assert!(node.is_isolated());
        assert_eq!(node.offset(), None);
    }
}

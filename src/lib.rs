//! Lineage forests for cell-tracking data.
//!
//! A [`Forest`] holds detected cells ([`Node`]s) grouped by time point
//! ([`TimeStamp`]s) and linked to their ancestors. The recompute pipeline
//! partitions nodes into [`Track`]s and [`Lineage`]s, assigns each node a
//! dendrogram column, and colors it; snapshots and region views expose the
//! result to a rendering layer.
//!
//! ```
//! use lineage_forest::{CyclicPalette, Forest, LayoutOptions};
//!
//! let mut forest = Forest::new();
//! forest.add_node("0_1", 0, Some(1))?;
//! forest.add_node("1_1", 1, Some(1))?;
//! forest.add_node("1_2", 1, Some(2))?;
//! forest.link(&"0_1".into(), &"1_1".into())?;
//! forest.link(&"0_1".into(), &"1_2".into())?;
//! forest.recompute(&LayoutOptions::default(), &CyclicPalette::default())?;
//! assert_eq!(forest.node(&"0_1".into()).and_then(|n| n.offset()), Some(0.5));
//! # Ok::<(), lineage_forest::ForestError>(())
//! ```

#![warn(missing_docs)]

pub mod codec;
pub mod config;
pub mod error;
pub mod forest;
pub mod ingest;
pub mod model;
pub mod volume;

pub use codec::{ForestSnapshot, NodeRecord};
pub use config::{ColorBy, ConfigError, LayoutOptions};
pub use error::{ForestError, Result};
pub use forest::{
    CyclicPalette, EditOutcome, Forest, Lineage, Palette, RegionNode, RegionView, TimeStamp,
    TimestampSummary, Track,
};
pub use ingest::{forest_from_graph_json, IngestError, LabelAssignment};
pub use model::{Label, Node, NodeId, Ordinal, Rgb};
pub use volume::{LabelCheck, LoadOutcome, Volume, VolumeLoader};

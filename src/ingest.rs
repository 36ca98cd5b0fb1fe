//! Ingestion of tracking-pipeline graph dumps.
//!
//! The input is a JSON object holding one graph entry, the first key starting
//! with `"G"`. The entry has `Nodes` (objects with a `Name` of the form
//! `"<ordinal>_<label>"`) and `Edges` (objects with an `EndNodes` pair
//! `[parent_name, child_name]`). Every distinct name becomes one node; every
//! edge becomes a parent link, later edges for the same child winning.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ForestError;
use crate::forest::Forest;
use crate::model::{Label, NodeId, Ordinal};

/// Identity → label overrides applied during ingestion.
pub type LabelAssignment = BTreeMap<String, Label>;

/// Error type for graph ingestion and label-assignment loading.
#[derive(Error, Debug)]
pub enum IngestError {
    /// No key of the top-level object starts with `"G"`.
    #[error("could not find a graph entry among keys {0:?}")]
    MissingGraph(Vec<String>),
    /// A required field is absent or has the wrong JSON type.
    #[error("missing or malformed field '{field}' in {record}")]
    MissingField {
        /// Field name.
        field: &'static str,
        /// Description of the record holding it.
        record: String,
    },
    /// A node name is not exactly `"<ordinal>_<label>"`.
    #[error("malformed node name '{name}' in {record}")]
    MalformedName {
        /// Offending name.
        name: String,
        /// Description of the record holding it.
        record: String,
    },
    /// An edge's `EndNodes` is not a pair of names.
    #[error("malformed EndNodes in edge {index}")]
    MalformedEdge {
        /// Position of the edge in `Edges`.
        index: usize,
    },
    /// Two label-assignment rows give the same label to different cells of one timestamp.
    #[error("conflicting label assignment at line {line}: label {label} in timestamp {timestamp} already assigned by line {previous}")]
    ConflictingAssignment {
        /// CSV line of the conflicting row.
        line: u64,
        /// Line of the earlier row.
        previous: u64,
        /// Timestamp part of the identity.
        timestamp: String,
        /// Conflicting label.
        label: Label,
    },
    /// File could not be read.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// CSV could not be parsed.
    #[error(transparent)]
    Csv(#[from] csv::Error),
    /// JSON could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// The graph violates a forest invariant.
    #[error(transparent)]
    Forest(#[from] ForestError),
}

/// Reads a graph dump from `path`; see [`forest_from_graph_json`].
pub fn forest_from_graph_file(
    path: &Path,
    assignment: Option<&LabelAssignment>,
) -> Result<Forest, IngestError> {
    let mut text = String::new();
    File::open(path)?.read_to_string(&mut text)?;
    let value: Value = serde_json::from_str(&text)?;
    forest_from_graph_json(&value, assignment)
}

/// Builds a forest from a parsed graph dump.
///
/// Labels come from node names unless `assignment` overrides them by identity.
///
/// # Errors
/// Every malformed record is fatal and named in the error. Parent links that
/// do not increase the ordinal surface as [`ForestError::OrdinalOrder`].
pub fn forest_from_graph_json(
    json_graph: &Value,
    assignment: Option<&LabelAssignment>,
) -> Result<Forest, IngestError> {
    let top = json_graph.as_object().ok_or(IngestError::MissingField {
        field: "G*",
        record: "top-level value".into(),
    })?;
    let (graph_name, graph) = find_graph(top)?;
    let nodes = array_field(graph, "Nodes", graph_name)?;
    let edges = array_field(graph, "Edges", graph_name)?;

    let mut all_names: BTreeSet<String> = BTreeSet::new();
    for (index, node) in nodes.iter().enumerate() {
        let name = node
            .get("Name")
            .and_then(Value::as_str)
            .ok_or_else(|| IngestError::MissingField {
                field: "Name",
                record: format!("node {index}"),
            })?;
        all_names.insert(name.to_string());
    }

    let mut parent_of: BTreeMap<String, String> = BTreeMap::new();
    for (index, edge) in edges.iter().enumerate() {
        let ends = edge
            .get("EndNodes")
            .ok_or(IngestError::MissingField {
                field: "EndNodes",
                record: format!("edge {index}"),
            })?
            .as_array()
            .ok_or(IngestError::MalformedEdge { index })?;
        let [parent, child] = ends.as_slice() else {
            return Err(IngestError::MalformedEdge { index });
        };
        let (Some(parent), Some(child)) = (parent.as_str(), child.as_str()) else {
            return Err(IngestError::MalformedEdge { index });
        };
        all_names.insert(parent.to_string());
        all_names.insert(child.to_string());
        parent_of.insert(child.to_string(), parent.to_string());
    }

    let mut forest = Forest::new();
    for name in &all_names {
        let (ordinal, parsed_label) = parse_name(name)?;
        let label = assignment
            .and_then(|map| map.get(name).copied())
            .unwrap_or(parsed_label);
        forest.add_node(name.as_str(), ordinal, Some(label))?;
    }
    for (child, parent) in &parent_of {
        forest.link(&NodeId::from(parent.as_str()), &NodeId::from(child.as_str()))?;
    }

    info!(
        graph = graph_name,
        nodes = forest.len(),
        edges = parent_of.len(),
        timestamps = forest.timestamps().count(),
        "ingest.graph.completed"
    );
    Ok(forest)
}

fn find_graph(top: &Map<String, Value>) -> Result<(&str, &Value), IngestError> {
    top.iter()
        .find(|(name, _)| name.starts_with('G'))
        .map(|(name, graph)| (name.as_str(), graph))
        .ok_or_else(|| IngestError::MissingGraph(top.keys().cloned().collect()))
}

fn array_field<'a>(
    graph: &'a Value,
    field: &'static str,
    graph_name: &str,
) -> Result<&'a Vec<Value>, IngestError> {
    graph
        .get(field)
        .and_then(Value::as_array)
        .ok_or_else(|| IngestError::MissingField {
            field,
            record: format!("graph '{graph_name}'"),
        })
}

/// Splits `"<ordinal>_<label>"` into its two integers.
pub fn parse_name(name: &str) -> Result<(Ordinal, Label), IngestError> {
    let malformed = || IngestError::MalformedName {
        name: name.to_string(),
        record: "node names".into(),
    };
    let mut parts = name.split('_');
    let (Some(ordinal), Some(label), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(malformed());
    };
    let ordinal = ordinal.parse::<Ordinal>().map_err(|_| malformed())?;
    let label = label.parse::<Label>().map_err(|_| malformed())?;
    Ok((ordinal, label))
}

/// Reads an identity → label assignment CSV with columns `stack,identity,label`.
///
/// The header row is skipped, rows with an empty label are ignored, and labels
/// are parsed as floats and truncated.
///
/// # Errors
/// [`IngestError::ConflictingAssignment`] when two different rows assign the
/// same label within one timestamp.
pub fn load_label_assignment<R: Read>(reader: R) -> Result<LabelAssignment, IngestError> {
    let mut csv = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_reader(reader);
    let mut assignment = LabelAssignment::new();
    let mut seen: BTreeMap<(String, Label), (u64, StringRecord)> = BTreeMap::new();

    for row in csv.records() {
        let row = row?;
        let line = row.position().map_or(0, |p| p.line());
        let record = || format!("assignment line {line}");
        let identity = row.get(1).ok_or_else(|| IngestError::MissingField {
            field: "identity",
            record: record(),
        })?;
        let label_text = row.get(2).unwrap_or("").trim();
        if label_text.is_empty() {
            continue;
        }
        let label = label_text
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite() && *value >= 0.0)
            .ok_or_else(|| IngestError::MissingField {
                field: "label",
                record: record(),
            })? as Label;
        let timestamp = identity
            .split_once('_')
            .map(|(ts, _)| ts.to_string())
            .ok_or_else(|| IngestError::MalformedName {
                name: identity.to_string(),
                record: record(),
            })?;

        match seen.get(&(timestamp.clone(), label)) {
            Some((previous, earlier)) if earlier != &row => {
                return Err(IngestError::ConflictingAssignment {
                    line,
                    previous: *previous,
                    timestamp,
                    label,
                });
            }
            Some(_) => {}
            None => {
                seen.insert((timestamp, label), (line, row.clone()));
            }
        }
        assignment.insert(identity.to_string(), label);
    }
    debug!(entries = assignment.len(), "ingest.assignment.loaded");
    Ok(assignment)
}

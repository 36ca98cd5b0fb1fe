#![allow(missing_docs)]

use std::fs;

use lineage_forest::{
    forest_from_graph_json,
    ingest::{forest_from_graph_file, load_label_assignment},
    ForestError, IngestError, NodeId,
};
use serde_json::json;
use tempfile::TempDir;

fn id(s: &str) -> NodeId {
    NodeId::from(s)
}

fn division_graph() -> serde_json::Value {
    json!({
        "G_tracking": {
            "Nodes": [
                {"Name": "0_1"},
                {"Name": "1_1"},
                {"Name": "1_2"},
                {"Name": "2_5"}
            ],
            "Edges": [
                {"EndNodes": ["0_1", "1_1"]},
                {"EndNodes": ["0_1", "1_2"]}
            ]
        }
    })
}

#[test]
fn builds_nodes_and_links_from_graph() {
    let forest = forest_from_graph_json(&division_graph(), None).expect("ingest");
    assert_eq!(forest.len(), 4);
    assert_eq!(forest.edge_count(), 2);
    assert_eq!(forest.ordinals().collect::<Vec<_>>(), vec![0, 1, 2]);

    let node = forest.node_by_label(1, 2).expect("label 2 at ordinal 1");
    assert_eq!(node.id, id("1_2"));
    assert_eq!(node.parent_id(), Some(&id("0_1")));
    assert!(forest.node(&id("2_5")).expect("2_5").is_isolated());
}

#[test]
fn edge_endpoints_missing_from_nodes_are_created() {
    let graph = json!({
        "G": {
            "Nodes": [{"Name": "0_1"}],
            "Edges": [{"EndNodes": ["0_1", "3_7"]}]
        }
    });
    let forest = forest_from_graph_json(&graph, None).expect("ingest");
    let child = forest.node(&id("3_7")).expect("created from edge");
    assert_eq!((child.ordinal, child.label), (3, Some(7)));
}

#[test]
fn later_edge_for_same_child_wins() {
    let graph = json!({
        "G": {
            "Nodes": [{"Name": "0_1"}, {"Name": "0_2"}, {"Name": "1_1"}],
            "Edges": [
                {"EndNodes": ["0_1", "1_1"]},
                {"EndNodes": ["0_2", "1_1"]}
            ]
        }
    });
    let forest = forest_from_graph_json(&graph, None).expect("ingest");
    assert_eq!(
        forest.node(&id("1_1")).and_then(|n| n.parent_id()),
        Some(&id("0_2"))
    );
    assert_eq!(forest.node(&id("0_1")).map(|n| n.child_count()), Some(0));
}

#[test]
fn first_graph_key_in_document_order_is_used() {
    let text = r#"{
        "metadata": {"version": 3},
        "Gsecond": {"Nodes": [{"Name": "0_9"}], "Edges": []},
        "Gfirst": {"Nodes": [{"Name": "0_1"}], "Edges": []}
    }"#;
    let value: serde_json::Value = serde_json::from_str(text).expect("parse");
    let forest = forest_from_graph_json(&value, None).expect("ingest");
    assert!(forest.node(&id("0_9")).is_some());
    assert!(forest.node(&id("0_1")).is_none());
}

#[test]
fn missing_graph_entry_is_fatal() {
    let err = forest_from_graph_json(&json!({"nodes": []}), None).unwrap_err();
    match err {
        IngestError::MissingGraph(keys) => assert_eq!(keys, vec!["nodes".to_string()]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn malformed_names_are_fatal() {
    let graph = json!({"G": {"Nodes": [{"Name": "0_1_2"}], "Edges": []}});
    let err = forest_from_graph_json(&graph, None).unwrap_err();
    assert!(matches!(err, IngestError::MalformedName { ref name, .. } if name == "0_1_2"));
}

#[test]
fn malformed_edges_name_their_index() {
    let graph = json!({
        "G": {
            "Nodes": [{"Name": "0_1"}, {"Name": "1_1"}],
            "Edges": [{"EndNodes": ["0_1", "1_1"]}, {"EndNodes": ["0_1"]}]
        }
    });
    let err = forest_from_graph_json(&graph, None).unwrap_err();
    assert!(matches!(err, IngestError::MalformedEdge { index: 1 }));
}

#[test]
fn missing_fields_are_reported() {
    let graph = json!({"G": {"Nodes": [{"Label": 1}], "Edges": []}});
    let err = forest_from_graph_json(&graph, None).unwrap_err();
    assert!(matches!(err, IngestError::MissingField { field: "Name", .. }));

    let graph = json!({"G": {"Nodes": []}});
    let err = forest_from_graph_json(&graph, None).unwrap_err();
    assert!(matches!(err, IngestError::MissingField { field: "Edges", .. }));
}

#[test]
fn edges_against_time_are_rejected() {
    let graph = json!({
        "G": {
            "Nodes": [{"Name": "2_1"}, {"Name": "1_1"}],
            "Edges": [{"EndNodes": ["2_1", "1_1"]}]
        }
    });
    let err = forest_from_graph_json(&graph, None).unwrap_err();
    assert!(matches!(
        err,
        IngestError::Forest(ForestError::OrdinalOrder { .. })
    ));
}

#[test]
fn label_assignment_overrides_parsed_labels() {
    let csv = "stack,identity,label\nA,1_1,40.0\nA,1_2,\n";
    let assignment = load_label_assignment(csv.as_bytes()).expect("assignment");
    let forest = forest_from_graph_json(&division_graph(), Some(&assignment)).expect("ingest");
    assert_eq!(forest.node(&id("1_1")).and_then(|n| n.label), Some(40));
    assert_eq!(forest.node(&id("1_2")).and_then(|n| n.label), Some(2));
    assert_eq!(forest.node_by_label(1, 40).map(|n| n.id.clone()), Some(id("1_1")));
}

#[test]
fn graph_file_is_read_from_disk() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("graph.json");
    fs::write(&path, division_graph().to_string()).expect("write graph");
    let forest = forest_from_graph_file(&path, None).expect("ingest");
    assert_eq!(forest.len(), 4);

    let err = forest_from_graph_file(&dir.path().join("absent.json"), None).unwrap_err();
    assert!(matches!(err, IngestError::Io(_)));
}

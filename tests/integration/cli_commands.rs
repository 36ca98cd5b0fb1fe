#![allow(missing_docs)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use serde_json::Value;
use tempfile::TempDir;

const GRAPH: &str = r#"{
    "G_tracks": {
        "Nodes": [
            {"Name": "0_1"}, {"Name": "1_1"}, {"Name": "1_2"},
            {"Name": "2_1"}, {"Name": "2_3"}
        ],
        "Edges": [
            {"EndNodes": ["0_1", "1_1"]},
            {"EndNodes": ["0_1", "1_2"]},
            {"EndNodes": ["1_1", "2_1"]}
        ]
    }
}"#;

struct Workspace {
    dir: TempDir,
    config: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let config = dir.path().join("config.toml");
        fs::write(dir.path().join("graph.json"), GRAPH).expect("write graph");
        Self { dir, config }
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    fn ingest_snapshot(&self) -> PathBuf {
        let snapshot = self.path("snapshot.json");
        cargo_bin_cmd!("lineage")
            .arg("--config")
            .arg(&self.config)
            .arg("ingest")
            .arg(self.path("graph.json"))
            .arg("-o")
            .arg(&snapshot)
            .assert()
            .success();
        snapshot
    }
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).expect("read output");
    serde_json::from_str(&text).expect("json output")
}

fn stdout_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).expect("json stdout")
}

#[test]
fn ingest_writes_snapshot_to_stdout() {
    let ws = Workspace::new();
    let output = cargo_bin_cmd!("lineage")
        .arg("--config")
        .arg(&ws.config)
        .arg("ingest")
        .arg(ws.path("graph.json"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let snapshot = stdout_json(&output);
    assert_eq!(snapshot["height"], 3);
    assert_eq!(snapshot["width"], 3);
    assert_eq!(snapshot["id_to_node"]["0_1"]["offset"], 0.5);
    assert_eq!(snapshot["id_to_node"]["2_3"]["isolated"], true);
}

#[test]
fn stats_reports_partition_sizes() {
    let ws = Workspace::new();
    let snapshot = ws.ingest_snapshot();
    let output = cargo_bin_cmd!("lineage")
        .args(["--format", "json", "stats"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let report = stdout_json(&output);
    assert_eq!(report["nodes"], 5);
    assert_eq!(report["edges"], 3);
    assert_eq!(report["timestamps"], 3);
    assert_eq!(report["tracks"], 4);
    assert_eq!(report["lineages"], 2);
    assert_eq!(report["isolated"], 1);
}

#[test]
fn region_includes_parent_context() {
    let ws = Workspace::new();
    let snapshot = ws.ingest_snapshot();
    let output = cargo_bin_cmd!("lineage")
        .args(["--format", "json", "region", "--ordinal", "2"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let view = stdout_json(&output);
    assert_eq!(view["ordinals"], serde_json::json!([1, 2]));
    assert_eq!(view["height"], 2);
    assert_eq!(view["id_to_node"]["2_1"]["is_child"], true);
    assert_eq!(view["id_to_node"]["2_1"]["y"], 0);
    assert_eq!(view["id_to_node"]["1_1"]["is_child"], false);
    assert_eq!(view["id_to_node"]["1_1"]["y"], 1);
}

#[test]
fn region_for_missing_ordinal_is_reported() {
    let ws = Workspace::new();
    let snapshot = ws.ingest_snapshot();
    let output = cargo_bin_cmd!("lineage")
        .args(["region", "--ordinal", "9"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    assert!(text.contains("No timestamp 9"), "unexpected output: {text}");
}

#[test]
fn reparent_against_time_fails() {
    let ws = Workspace::new();
    let snapshot = ws.ingest_snapshot();
    let before = fs::read_to_string(&snapshot).expect("read snapshot");
    let output = cargo_bin_cmd!("lineage")
        .args(["reparent", "--child", "1_1", "--parent", "2_3"])
        .arg(&snapshot)
        .arg("-o")
        .arg(&snapshot)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .failure()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8");
    assert!(stderr.contains("error:"), "unexpected stderr: {stderr}");
    assert_eq!(fs::read_to_string(&snapshot).expect("read snapshot"), before);
}

#[test]
fn disconnect_updates_snapshot() {
    let ws = Workspace::new();
    let snapshot = ws.ingest_snapshot();
    let edited = ws.path("edited.json");
    cargo_bin_cmd!("lineage")
        .args(["--format", "json", "disconnect", "--child", "1_2"])
        .arg(&snapshot)
        .arg("-o")
        .arg(&edited)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .success();
    let after = read_json(&edited);
    assert_eq!(after["id_to_node"]["1_2"]["parent_id"], Value::Null);
    assert_eq!(after["id_to_node"]["1_2"]["isolated"], true);
    assert_eq!(after["id_to_node"]["0_1"]["offset"], 0.0);

    let output = cargo_bin_cmd!("lineage")
        .args(["disconnect", "--child", "0_1"])
        .arg(&edited)
        .arg("-o")
        .arg(&edited)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .success()
        .get_output()
        .stderr
        .clone();
    let stderr = String::from_utf8(output).expect("utf8");
    assert!(stderr.contains("nothing to do"), "unexpected stderr: {stderr}");
}

#[test]
fn timestamps_lists_nodes_per_ordinal() {
    let ws = Workspace::new();
    let snapshot = ws.ingest_snapshot();
    let output = cargo_bin_cmd!("lineage")
        .arg("timestamps")
        .arg(&snapshot)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(output).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines, vec!["0: 0_1", "1: 1_1 1_2", "2: 2_1 2_3"]);
}

#[test]
fn flags_override_config_file() {
    let ws = Workspace::new();
    fs::write(&ws.config, "[layout]\nstart_at = 4\ncolor_by = \"lineages\"\n").expect("config");
    let snapshot = ws.ingest_snapshot();
    let from_config = read_json(&snapshot);
    assert_eq!(from_config["id_to_node"]["1_1"]["offset"], 4.0);
    assert_eq!(
        from_config["id_to_node"]["1_1"]["color"],
        from_config["id_to_node"]["1_2"]["color"]
    );

    let output = cargo_bin_cmd!("lineage")
        .args(["layout", "--start-at", "0", "--color-by", "tracks"])
        .arg(&snapshot)
        .arg("--config")
        .arg(&ws.config)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let relaid = stdout_json(&output);
    assert_eq!(relaid["id_to_node"]["1_1"]["offset"], 0.0);
    assert_ne!(
        relaid["id_to_node"]["1_1"]["color"],
        relaid["id_to_node"]["1_2"]["color"]
    );
}

#[test]
fn malformed_graph_exits_with_error() {
    let ws = Workspace::new();
    let bad = ws.path("bad.json");
    fs::write(&bad, r#"{"nodes": []}"#).expect("write");
    cargo_bin_cmd!("lineage")
        .arg("--config")
        .arg(&ws.config)
        .arg("ingest")
        .arg(&bad)
        .assert()
        .failure()
        .code(1);
}

use assert_cmd::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::path::Path;
use std::process::Command;

fn write_json(path: &Path, value: &Value) {
    let text = serde_json::to_string_pretty(value).expect("serialize");
    fs::write(path, text).expect("write fixture");
}

/// A valid document: root state `A` anchored by initial `i`, with nested `B` anchored by `j`.
fn valid_document() -> Value {
    json!({
        "machines": {
            "m": {
                "name": "blinker",
                "platform": "ArduinoUno",
                "nodes": {
                    "A": { "position": [0, 0], "dimensions": [450, 100],
                           "kind": { "type": "state", "name": "A" } },
                    "i": { "position": [-100, -100], "dimensions": [50, 50],
                           "kind": { "type": "initial" } },
                    "B": { "parentId": "A", "position": [100, 100], "dimensions": [450, 100],
                           "kind": { "type": "state", "name": "B" } },
                    "j": { "parentId": "A", "position": [0, 0], "dimensions": [50, 50],
                           "kind": { "type": "initial" } }
                },
                "transitions": {
                    "ti": { "sourceId": "i", "targetId": "A", "color": "#0000FF" },
                    "tj": { "sourceId": "j", "targetId": "B", "color": "#0000FF" }
                }
            }
        }
    })
}

#[test]
fn validate_accepts_a_valid_document() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let doc = tmp.path().join("doc.json");
    write_json(&doc, &valid_document());

    let exe = assert_cmd::cargo_bin!("chartwright");
    let output = Command::new(exe)
        .args(["validate", doc.to_string_lossy().as_ref()])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("ok"));
}

#[test]
fn validate_rejects_an_unanchored_scope() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let doc = tmp.path().join("doc.json");
    let mut value = valid_document();
    value["machines"]["m"]["transitions"]
        .as_object_mut()
        .expect("transitions")
        .remove("tj");
    write_json(&doc, &value);

    let exe = assert_cmd::cargo_bin!("chartwright");
    Command::new(exe)
        .args(["validate", doc.to_string_lossy().as_ref()])
        .assert()
        .code(1);
}

#[test]
fn unknown_flags_are_usage_errors() {
    let exe = assert_cmd::cargo_bin!("chartwright");
    Command::new(exe).args(["stats", "--nope"]).assert().code(2);
    let exe = assert_cmd::cargo_bin!("chartwright");
    Command::new(exe).args(["apply"]).assert().code(2);
}

#[test]
fn stats_counts_entities() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let doc = tmp.path().join("doc.json");
    write_json(&doc, &valid_document());

    let exe = assert_cmd::cargo_bin!("chartwright");
    let output = Command::new(exe)
        .args(["stats", doc.to_string_lossy().as_ref()])
        .output()
        .expect("run");
    assert!(output.status.success());
    let stats: Value = serde_json::from_slice(&output.stdout).expect("stats json");
    assert_eq!(stats[0]["id"], "m");
    assert_eq!(stats[0]["states"], 2);
    assert_eq!(stats[0]["initialStates"], 2);
    assert_eq!(stats[0]["transitions"], 2);
    assert_eq!(stats[0]["maxDepth"], 1);
}

#[test]
fn apply_replays_a_script_onto_an_empty_document() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = tmp.path().join("ops.json");
    let out = tmp.path().join("out.json");
    write_json(
        &script,
        &json!([
            { "op": "createStateMachine", "id": "m", "platform": "ArduinoUno" },
            { "op": "createState", "machineId": "m", "id": "A", "name": "Idle",
              "position": [300, 300] },
            { "op": "createState", "machineId": "m", "id": "B", "parentId": "A", "name": "Busy",
              "position": [350, 350] },
            { "op": "deleteState", "machineId": "m", "id": "A" },
            { "op": "undo" },
            { "op": "redo" }
        ]),
    );

    let exe = assert_cmd::cargo_bin!("chartwright");
    let empty = tmp.path().join("empty.json");
    fs::write(&empty, "").expect("write empty input");
    Command::new(exe)
        .args([
            "apply",
            "--script",
            script.to_string_lossy().as_ref(),
            "--out",
            out.to_string_lossy().as_ref(),
            empty.to_string_lossy().as_ref(),
        ])
        .assert()
        .success();

    let text = fs::read_to_string(&out).expect("read out");
    let doc: Value = serde_json::from_str(&text).expect("doc json");
    let nodes = doc["machines"]["m"]["nodes"].as_object().expect("nodes");
    assert!(!nodes.contains_key("A"));
    assert_eq!(nodes["B"].get("parentId"), None);

    // The result is itself a valid document.
    let exe = assert_cmd::cargo_bin!("chartwright");
    Command::new(exe)
        .args(["validate", out.to_string_lossy().as_ref()])
        .assert()
        .success();
}

#[test]
fn apply_respects_the_config_override() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let script = tmp.path().join("ops.json");
    let config = tmp.path().join("config.json");
    let doc = tmp.path().join("doc.json");
    write_json(&doc, &valid_document());
    write_json(&config, &json!({ "initialStateOffset": 40 }));
    write_json(
        &script,
        &json!([
            { "op": "createState", "machineId": "m", "id": "C", "name": "C",
              "position": [1000, 1000] },
            { "op": "setInitialState", "machineId": "m", "id": "C" }
        ]),
    );

    let exe = assert_cmd::cargo_bin!("chartwright");
    let output = Command::new(exe)
        .args([
            "apply",
            "--config",
            config.to_string_lossy().as_ref(),
            "--script",
            script.to_string_lossy().as_ref(),
            doc.to_string_lossy().as_ref(),
        ])
        .output()
        .expect("run");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let result: Value = serde_json::from_slice(&output.stdout).expect("doc json");
    assert_eq!(result["machines"]["m"]["nodes"]["i"]["position"], json!([960.0, 960.0]));
}

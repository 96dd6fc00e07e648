use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[research]
points = ["A", "B", "C"]

[simulator]
base_ohms = [8000, 26000, 14000]
period_ms = 0
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(out: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(out)
        .lines()
        .filter(|l| l.starts_with('{'))
        .map(|l| serde_json::from_str(l).expect("valid JSON"))
        .collect()
}

/// Validate the JSONL schema for a completed research run.
#[rstest]
fn jsonl_research_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("nakatani").unwrap();
    cmd.arg("--json")
        .arg("--log-level")
        .arg("error")
        .arg("--config")
        .arg(&cfg)
        .arg("research");

    let out = cmd.assert().success().get_output().stdout.clone();
    let lines = json_lines(&out);

    let results: Vec<_> = lines
        .iter()
        .filter(|v| v["event"] == "point_result")
        .collect();
    assert_eq!(results.len(), 3);
    for (v, point) in results.iter().zip(["A", "B", "C"]) {
        assert_eq!(v["point"], point);
        assert!(v["ohms"].as_u64().is_some());
    }

    let completed = lines
        .iter()
        .find(|v| v["event"] == "session_completed")
        .expect("session_completed line");
    assert!(completed["results"]["B"].as_u64().is_some());

    let summary = lines.last().expect("summary line");
    assert_eq!(summary["results"].as_array().map(Vec::len), Some(3));
    assert!(summary["packets"].as_u64().is_some());
    assert_eq!(summary["malformed"].as_u64(), Some(0));
    assert!(summary["duration_ms"].as_u64().is_some());
}

/// Events arrive in order: active point before its result.
#[rstest]
fn jsonl_event_order() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let out = Command::cargo_bin("nakatani")
        .unwrap()
        .args(["--json", "--log-level", "error", "--config"])
        .arg(&cfg)
        .arg("research")
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let kinds: Vec<String> = json_lines(&out)
        .iter()
        .filter_map(|v| v["event"].as_str().map(str::to_string))
        .collect();
    assert_eq!(
        kinds,
        [
            "active_point",
            "measuring",
            "point_result",
            "active_point",
            "measuring",
            "point_result",
            "active_point",
            "measuring",
            "point_result",
            "session_completed",
        ]
    );
}

#[rstest]
fn jsonl_decode_and_error_schema() {
    let out = Command::cargo_bin("nakatani")
        .unwrap()
        .args(["--json", "--log-level", "error", "decode", "235200000000", "2358"])
        .assert()
        .code(1)
        .get_output()
        .clone();

    let lines = json_lines(&out.stdout);
    assert_eq!(lines[0]["event"], "adc_started");
    assert!(lines[1]["error"].as_str().is_some());

    let err = json_lines(&out.stderr);
    let last = err.last().expect("error object on stderr");
    assert_eq!(last["reason"], "Error");
    assert_eq!(last["exit_code"], 1);
}

use nakatani_config::{ResearchObjectKind, load_file, load_toml};
use rstest::rstest;
use std::fs;
use tempfile::tempdir;

const FULL: &str = r#"
[research]
object = "left-foot"
require_pen_lift = true

[stabilizer]
window = 20
ceiling_ohms = 90000
max_spread_ohms = 5000

[transport]
read_timeout_ms = 50
queue_depth = 64

[logging]
level = "debug"
rotation = "daily"

[simulator]
base_ohms = [1000, 50000]
noise_ohms = 100
settle_samples = 4
contact_samples = 25
lift_samples = 2
period_ms = 0
battery_percent = 55
"#;

#[test]
fn accepts_full_document() {
    let cfg = load_toml(FULL).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert_eq!(cfg.research.object, ResearchObjectKind::LeftFoot);
    assert!(cfg.research.require_pen_lift);
    assert_eq!(cfg.transport.queue_depth, 64);
    assert_eq!(cfg.simulator.base_ohms, vec![1000, 50000]);
}

#[rstest]
#[case("[stabilizer]\nwindow = 0\n", "stabilizer.window")]
#[case("[stabilizer]\nceiling_ohms = 0\n", "stabilizer.ceiling_ohms")]
#[case("[stabilizer]\nmax_spread_ohms = 0\n", "stabilizer.max_spread_ohms")]
#[case("[transport]\nread_timeout_ms = 0\n", "transport.read_timeout_ms")]
#[case("[transport]\nqueue_depth = 0\n", "transport.queue_depth")]
#[case("[logging]\nrotation = \"weekly\"\n", "logging.rotation")]
#[case("[research]\npoints = []\n", "at least one point")]
#[case("[research]\npoints = [\"A\", \"A\"]\n", "duplicate name")]
#[case("[research]\npoints = [\" \"]\n", "empty name")]
#[case("[simulator]\ncontact_samples = 19\n", "simulator.contact_samples")]
#[case("[simulator]\nbase_ohms = []\n", "simulator.base_ohms")]
#[case("[simulator]\nbattery_percent = 101\n", "simulator.battery_percent")]
fn rejects_invalid_values(#[case] toml: &str, #[case] needle: &str) {
    let cfg = load_toml(toml).expect("parse TOML");
    let err = cfg.validate().expect_err("should reject");
    assert!(
        format!("{err}").contains(needle),
        "error {err} does not mention {needle}"
    );
}

#[test]
fn load_file_reports_path_on_invalid_config() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.toml");
    fs::write(&path, "[stabilizer]\nwindow = 0\n").unwrap();

    let err = load_file(&path).expect_err("invalid config");
    let chain = format!("{err:#}");
    assert!(chain.contains("invalid configuration"));
    assert!(chain.contains("stabilizer.window"));
}

#[test]
fn load_file_reports_missing_file() {
    let dir = tempdir().unwrap();
    let err = load_file(&dir.path().join("nope.toml")).expect_err("missing file");
    assert!(format!("{err}").contains("read config"));
}

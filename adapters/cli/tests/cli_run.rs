use std::process::{Command, Output};

use serde_json::Value;

fn run_cli(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_visceral-reclaimer"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch the visceral-reclaimer binary")
}

fn summary(output: &Output) -> Value {
    let stdout = String::from_utf8_lossy(&output.stdout);
    let start = stdout
        .lines()
        .position(|line| line == "{")
        .expect("summary printed");
    let json = stdout.lines().skip(start).collect::<Vec<_>>().join("\n");
    serde_json::from_str(&json).expect("summary is valid json")
}

#[test]
fn short_idle_run_reports_untouched_base() {
    let output = run_cli(&["--duration-secs", "5", "--seed", "1", "--summary"]);
    assert!(output.status.success(), "cli exited with {}", output.status);

    let summary = summary(&output);
    assert_eq!(summary["seed"], 1);
    assert_eq!(summary["wave"], 0);
    assert_eq!(summary["game_over"], false);
    assert_eq!(summary["core_hp"], 500.0);
    assert_eq!(summary["buildings"], 1);
    assert_eq!(summary["enemies"], 0);
    assert_eq!(summary["elapsed_secs"], 5.0);
    assert_eq!(summary["survivors"].as_array().map(Vec::len), Some(3));
}

#[test]
fn autopilot_builds_and_raids() {
    let output = run_cli(&[
        "--duration-secs",
        "10",
        "--seed",
        "2",
        "--auto",
        "--summary",
    ]);
    assert!(output.status.success(), "cli exited with {}", output.status);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Built Needle Turret"));

    let summary = summary(&output);
    assert_eq!(summary["buildings"], 4);
    let raiding = summary["survivors"]
        .as_array()
        .expect("survivor list")
        .iter()
        .filter(|survivor| survivor["status"] == "raiding")
        .count();
    assert!(raiding >= 1);
}

#[test]
fn unreadable_config_fails_with_context() {
    let output = run_cli(&["--config", "/definitely/not/here.json"]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to load configuration"));
}

use std::process::Command;

fn temp_path(label: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "cashloop-cli-{label}-{}",
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos()
    ))
}

#[test]
fn cli_writes_json_report() {
    let exe = env!("CARGO_BIN_EXE_cashloop-tester");
    let output_path = temp_path("json");
    let status = Command::new(exe)
        .args([
            "--strategies",
            "cautious",
            "--seeds",
            "7",
            "--rounds",
            "1",
            "--report",
            "json",
            "--output",
        ])
        .arg(&output_path)
        .status()
        .expect("run cli");
    assert!(status.success());
    let content = std::fs::read_to_string(output_path).expect("read output");
    let report: serde_json::Value = serde_json::from_str(&content).expect("json report");
    assert_eq!(report[0]["strategy"], "Cautious");
    assert_eq!(report[0]["seed"], 7);
    assert_eq!(report[0]["passed"], true);
}

#[test]
fn cli_resumes_profiles_from_save_dir() {
    let exe = env!("CARGO_BIN_EXE_cashloop-tester");
    let save_dir = temp_path("saves");
    for _ in 0..2 {
        let output = Command::new(exe)
            .args(["--strategies", "cautious", "--seeds", "3", "--rounds", "1"])
            .arg("--save-dir")
            .arg(&save_dir)
            .output()
            .expect("run cli");
        assert!(output.status.success());
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("Cashloop Automated Tester"));
    }
    assert!(save_dir.join("cautious-3").join("cashloop.profile.json").exists());
}

#[test]
fn cli_rejects_unknown_strategy() {
    let exe = env!("CARGO_BIN_EXE_cashloop-tester");
    let output = Command::new(exe)
        .args(["--strategies", "gambler"])
        .output()
        .expect("run cli");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown strategy"));
}

use std::process::Command;

#[test]
fn cli_compiles_without_warnings() {
    let status = Command::new(env!("CARGO"))
        .current_dir(env!("CARGO_MANIFEST_DIR"))
        .args(["check", "--quiet", "--bin", "bulwark"])
        .status()
        .expect("failed to invoke cargo check for bulwark CLI binary");

    assert!(status.success(), "cargo check --bin bulwark should succeed");
}

#[test]
fn bundled_scenario_runs_to_completion() {
    let scenario = concat!(env!("CARGO_MANIFEST_DIR"), "/../../assets/scenario.toml");
    let output = Command::new(env!("CARGO_BIN_EXE_bulwark"))
        .args([
            "--config",
            scenario,
            "--seconds",
            "30",
            "--auto-supply",
            "--ui-pause",
            "10:12",
        ])
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run bulwark");

    assert!(output.status.success(), "bulwark exited with {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("waves started:"), "unexpected output: {stdout}");
    assert!(stdout.contains("gameplay time:      28.0s"), "unexpected output: {stdout}");
}

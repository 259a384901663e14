use std::path::PathBuf;
use std::process::Command;

use imgreg_e2e::config::{DriverKind, RunnerConfig};
use imgreg_e2e::server::ServerConfig;
use imgreg_e2e::TestRunner;

fn in_path(bin: &str) -> bool {
    Command::new("sh")
        .arg("-lc")
        .arg(format!("command -v {bin} >/dev/null 2>&1"))
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Built-in Scenarios Against The Fixture App
///
/// Spawns `imgreg-fixture`, launches headless Chromium through the
/// Playwright bridge and runs every built-in scenario.
///
/// Marked ignored because it needs node, Playwright browsers and a built
/// fixture binary (`cargo build -p imgreg-fixture`).
#[tokio::test]
#[ignore]
async fn builtin_scenarios_pass_in_a_real_browser() {
    if !in_path("node") {
        eprintln!("Skipping: node not available in PATH");
        return;
    }

    let workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("crates/e2e sits two levels below the workspace root")
        .to_path_buf();
    let fixture = workspace_root.join("target").join("debug").join("imgreg-fixture");

    if !fixture.exists() {
        eprintln!("Skipping: {} not built", fixture.display());
        return;
    }

    let mut config = RunnerConfig {
        server: Some(ServerConfig {
            command: vec![fixture.to_string_lossy().to_string()],
            ..Default::default()
        }),
        driver: DriverKind::Playwright,
        settle_ms: 200,
        output_dir: workspace_root.join("target").join("e2e-results"),
        ..Default::default()
    };
    config.playwright.project_dir = workspace_root.clone();

    let mut runner = TestRunner::with_config(config);
    runner.start_server().await.expect("start fixture app");

    let driver = runner.launch_driver().await.expect("launch browser");
    let results = runner.run_all(driver.as_ref()).await.expect("run scenarios");
    driver.close().await.expect("close browser");

    runner.write_results(&results).expect("write results");
    for result in &results.results {
        assert!(result.success, "{} failed: {:?}", result.name, result.error);
    }
}

//! E2E test harness entry point
//!
//! This file is the test binary that runs the image registration scenarios.
//! Run with: cargo test --package imgreg-e2e --test e2e -- --base-url http://127.0.0.1:5173

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use imgreg_e2e::config::{DriverKind, RunnerConfig};
use imgreg_e2e::playwright::Browser;
use imgreg_e2e::server::ServerConfig;
use imgreg_e2e::{E2eResult, TestRunner};

#[derive(Parser, Debug)]
#[command(name = "imgreg-e2e")]
#[command(about = "E2E test runner for the image registration form")]
struct Args {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to scenario directory (built-in scenarios when omitted)
    #[arg(short, long)]
    scenarios: Option<PathBuf>,

    /// Run only scenarios matching this tag
    #[arg(short, long)]
    tag: Option<String>,

    /// Run only a specific scenario by name (within --tag when both are given)
    #[arg(short, long)]
    name: Option<String>,

    /// URL of an already running app (skips spawning one)
    #[arg(long)]
    base_url: Option<String>,

    /// Command that starts the app; receives PORT and HOST in its environment
    #[arg(long, num_args = 1.., value_delimiter = ' ')]
    server_command: Option<Vec<String>>,

    /// Driver to use (playwright, simulated)
    #[arg(long)]
    driver: Option<DriverKind>,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long)]
    browser: Option<Browser>,

    /// Run in headless mode
    #[arg(long)]
    headless: Option<bool>,

    /// Pause after submitting, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,

    /// How long assertions keep retrying, in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Output directory for results
    #[arg(short, long)]
    output: Option<PathBuf>,

    // `cargo test` forwards libtest filters and flags to custom harnesses.
    #[arg(long = "nocapture", hide = true)]
    _nocapture: bool,

    #[arg(hide = true)]
    _filters: Vec<String>,
}

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // Run async main
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };
    let result = rt.block_on(async_main(args));

    match result {
        Ok(true) => std::process::exit(0),
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(2);
        }
    }
}

fn build_config(args: &Args) -> E2eResult<RunnerConfig> {
    let mut config = match &args.config {
        Some(path) => RunnerConfig::from_file(path)?,
        None => RunnerConfig::default(),
    };
    config.apply_env()?;

    let target_given = args.config.is_some()
        || args.base_url.is_some()
        || args.server_command.is_some()
        || args.driver.is_some()
        || std::env::var_os("IMGREG_BASE_URL").is_some()
        || std::env::var_os("IMGREG_DRIVER").is_some();

    if let Some(command) = &args.server_command {
        config.server = Some(ServerConfig {
            command: command.clone(),
            ..config.server.take().unwrap_or_default()
        });
    }
    if let Some(url) = &args.base_url {
        config.playwright.base_url = url.clone();
        config.server = None;
    }
    if let Some(dir) = &args.scenarios {
        config.scenarios_dir = Some(dir.clone());
    }
    if let Some(driver) = args.driver {
        config.driver = driver;
    }
    if let Some(browser) = args.browser {
        config.playwright.browser = browser;
    }
    if let Some(headless) = args.headless {
        config.playwright.headless = headless;
    }
    if let Some(settle_ms) = args.settle_ms {
        config.settle_ms = settle_ms;
    }
    if let Some(timeout_ms) = args.timeout_ms {
        config.expect.timeout_ms = timeout_ms;
    }
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }

    // A bare `cargo test` has no app to talk to.
    if !target_given {
        tracing::info!("No app configured; running against the simulated page");
        config.driver = DriverKind::Simulated;
    }

    Ok(config)
}

async fn async_main(args: Args) -> E2eResult<bool> {
    let config = build_config(&args)?;
    let mut runner = TestRunner::with_config(config);

    // Start app
    runner.start_server().await?;

    let driver = runner.launch_driver().await?;

    // Run scenarios
    let outcome = runner
        .run_selected(driver.as_ref(), args.tag.as_deref(), args.name.as_deref())
        .await;

    if let Err(e) = driver.close().await {
        tracing::warn!("Closing the browser failed: {}", e);
    }
    let results = outcome?;

    // Write results
    runner.write_results(&results)?;

    Ok(results.success())
}

//! Main test runner that orchestrates the app, the browser and the scenarios

use std::path::PathBuf;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::{DriverKind, RunnerConfig};
use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::expect::{stored_collection, Expect};
use crate::playwright::PlaywrightDriver;
use crate::register_form::{self, elements, Locator};
use crate::scenario::{ColorRef, Field, LintWarning, Scenario, StepAction};
use crate::server::ServerHandle;
use crate::sim::SimulatedPage;
use crate::storage::{PersistedCollection, RegisteredImage};
use crate::suite;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Result of executing one scenario step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub action: String,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of running a single scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    pub warnings: Vec<LintWarning>,
    pub error: Option<String>,
}

impl ScenarioResult {
    pub fn step(&self, name: &str) -> Option<&StepResult> {
        self.steps.iter().find(|s| s.name == name)
    }
}

/// Result of running all scenarios
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteResult {
    pub started_at: DateTime<Utc>,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<ScenarioResult>,
}

impl SuiteResult {
    pub fn success(&self) -> bool {
        self.failed == 0
    }
}

/// State carried between the steps of one scenario
#[derive(Debug, Default)]
struct StepContext {
    remembered: Option<PersistedCollection>,
}

impl StepContext {
    fn remembered(&self) -> E2eResult<&PersistedCollection> {
        self.remembered.as_ref().ok_or_else(|| {
            E2eError::SpecParse("storage was never remembered; add a remember_storage step first".to_string())
        })
    }

    fn grown_by(&self, by: usize) -> E2eResult<usize> {
        self.remembered()?
            .len()
            .checked_add(by)
            .ok_or_else(|| E2eError::SpecParse(format!("expected growth of {} overflows", by)))
    }
}

fn feedback_for(field: Field) -> Locator {
    match field {
        Field::Title => elements::title_feedback(),
        Field::ImageUrl => elements::image_url_feedback(),
    }
}

fn resolve_color(color: &ColorRef) -> E2eResult<String> {
    match color {
        ColorRef::Css(css) => Ok(css.clone()),
        ColorRef::Named { named } => register_form::color(named)
            .map(str::to_string)
            .ok_or_else(|| E2eError::SpecParse(format!("unknown color '{}'", named))),
    }
}

fn select(scenarios: Vec<Scenario>, tag: Option<&str>, name: Option<&str>) -> E2eResult<Vec<Scenario>> {
    let mut selected: Vec<Scenario> = match tag {
        Some(tag) => Scenario::filter_by_tag(&scenarios, tag).into_iter().cloned().collect(),
        None => scenarios,
    };

    if let Some(name) = name {
        selected.retain(|s| s.name == name);
        if selected.is_empty() {
            return Err(E2eError::SpecParse(match tag {
                Some(tag) => format!("Scenario not found: {} (tagged {})", name, tag),
                None => format!("Scenario not found: {}", name),
            }));
        }
    }
    Ok(selected)
}

/// Main E2E test runner
pub struct TestRunner {
    config: RunnerConfig,

    /// Running app handle (if any)
    server: Option<ServerHandle>,
}

impl TestRunner {
    /// Create a new test runner with default configuration
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    /// Create a test runner with custom configuration
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config, server: None }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Start the app under test if one is configured
    pub async fn start_server(&mut self) -> E2eResult<()> {
        if self.server.is_some() {
            return Ok(()); // Already running
        }
        let Some(server_config) = self.config.server.clone() else {
            debug!("No app to spawn; using {}", self.config.playwright.base_url);
            return Ok(());
        };

        let server = ServerHandle::spawn(server_config).await?;

        // Point the browser at the actual app URL
        self.config.playwright.base_url = server.base_url().to_string();

        self.server = Some(server);
        Ok(())
    }

    /// Stop the app
    pub fn stop_server(&mut self) -> E2eResult<()> {
        if let Some(mut server) = self.server.take() {
            server.stop()?;
        }
        Ok(())
    }

    /// Create the configured browser driver
    pub async fn launch_driver(&self) -> E2eResult<Box<dyn BrowserDriver>> {
        match self.config.driver {
            DriverKind::Playwright => {
                let driver = PlaywrightDriver::launch(self.config.playwright.clone()).await?;
                Ok(Box::new(driver))
            }
            DriverKind::Simulated => Ok(Box::new(SimulatedPage::new())),
        }
    }

    /// Scenarios from the configured directory, or the built-in ones
    pub fn load_scenarios(&self) -> E2eResult<Vec<Scenario>> {
        match &self.config.scenarios_dir {
            Some(dir) => Scenario::load_all(dir),
            None => suite::builtin(),
        }
    }

    /// Run all scenarios
    pub async fn run_all(&self, driver: &dyn BrowserDriver) -> E2eResult<SuiteResult> {
        let scenarios = self.load_scenarios()?;
        Ok(self.run_scenarios(driver, &scenarios).await)
    }

    /// Run scenarios matching a tag
    pub async fn run_tagged(&self, driver: &dyn BrowserDriver, tag: &str) -> E2eResult<SuiteResult> {
        self.run_selected(driver, Some(tag), None).await
    }

    /// Run a specific scenario by name
    pub async fn run_named(&self, driver: &dyn BrowserDriver, name: &str) -> E2eResult<SuiteResult> {
        self.run_selected(driver, None, Some(name)).await
    }

    /// Run scenarios narrowed by tag, then by name; both filters apply
    pub async fn run_selected(
        &self,
        driver: &dyn BrowserDriver,
        tag: Option<&str>,
        name: Option<&str>,
    ) -> E2eResult<SuiteResult> {
        let scenarios = select(self.load_scenarios()?, tag, name)?;
        Ok(self.run_scenarios(driver, &scenarios).await)
    }

    /// Run a list of scenarios, one after the other, on one browser
    pub async fn run_scenarios(&self, driver: &dyn BrowserDriver, scenarios: &[Scenario]) -> SuiteResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut results = Vec::new();
        let mut passed = 0;
        let mut failed = 0;

        info!("Running {} scenario(s)...", scenarios.len());

        for scenario in scenarios {
            let result = self.run_scenario(driver, scenario).await;
            if result.success {
                passed += 1;
                info!("✓ {} ({} ms)", result.name, result.duration_ms);
            } else {
                failed += 1;
                error!("✗ {} - {}", result.name, result.error.as_deref().unwrap_or("unknown error"));
            }
            results.push(result);
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!("");
        info!("Scenario Results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        SuiteResult {
            started_at,
            total: scenarios.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run a single scenario; the first failing step skips the rest
    pub async fn run_scenario(&self, driver: &dyn BrowserDriver, scenario: &Scenario) -> ScenarioResult {
        let start = Instant::now();
        debug!("Running scenario: {}", scenario.name);

        let warnings = scenario.lint();
        for warning in &warnings {
            warn!("{}: step '{}' {}", scenario.name, warning.step, warning.message);
        }

        let mut ctx = StepContext::default();
        let mut steps = Vec::with_capacity(scenario.steps.len());
        let mut scenario_error: Option<String> = None;

        for step in &scenario.steps {
            if scenario_error.is_some() {
                steps.push(StepResult {
                    name: step.name.clone(),
                    action: step.action.kind().to_string(),
                    status: StepStatus::Skipped,
                    duration_ms: 0,
                    error: None,
                });
                continue;
            }

            let step_start = Instant::now();
            let outcome = self.execute_step(driver, &mut ctx, &step.action).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;

            match outcome {
                Ok(()) => {
                    debug!("  ✓ {}", step.name);
                    steps.push(StepResult {
                        name: step.name.clone(),
                        action: step.action.kind().to_string(),
                        status: StepStatus::Passed,
                        duration_ms,
                        error: None,
                    });
                }
                Err(e) => {
                    let failure = E2eError::StepFailed {
                        step: step.name.clone(),
                        reason: e.to_string(),
                    };
                    error!("  ✗ {}", failure);
                    steps.push(StepResult {
                        name: step.name.clone(),
                        action: step.action.kind().to_string(),
                        status: StepStatus::Failed,
                        duration_ms,
                        error: Some(e.to_string()),
                    });
                    scenario_error = Some(failure.to_string());
                }
            }
        }

        if scenario.clear_storage_after {
            if let Err(e) = driver.clear_local_storage().await {
                warn!("{}: clearing local storage failed: {}", scenario.name, e);
                if scenario_error.is_none() {
                    scenario_error = Some(format!("after hook: {}", e));
                }
            }
        }

        ScenarioResult {
            name: scenario.name.clone(),
            success: scenario_error.is_none(),
            duration_ms: start.elapsed().as_millis() as u64,
            steps,
            warnings,
            error: scenario_error,
        }
    }

    async fn execute_step(
        &self,
        driver: &dyn BrowserDriver,
        ctx: &mut StepContext,
        action: &StepAction,
    ) -> E2eResult<()> {
        let settle = Duration::from_millis(self.config.settle_ms);
        let expect = Expect::new(driver, self.config.expect);

        match action {
            StepAction::Visit { path } => driver.visit(path).await,
            StepAction::TypeTitle { text } => register_form::type_title(driver, text).await,
            StepAction::TypeImageUrl { text } => register_form::type_image_url(driver, text).await,
            StepAction::ClickSubmit => register_form::click_submit_button(driver, settle).await,
            StepAction::HitEnter => register_form::hit_enter(driver, settle).await,
            StepAction::Reload => driver.reload().await,
            StepAction::ClearStorage => driver.clear_local_storage().await,
            StepAction::RememberStorage => {
                let collection = stored_collection(driver).await?;
                debug!("Remembered {} stored image(s)", collection.len());
                ctx.remembered = Some(collection);
                Ok(())
            }
            StepAction::ExpectFeedback { field, text } => {
                expect.contains_text(feedback_for(*field), text).await
            }
            StepAction::ExpectBorderColor { field, color } => {
                let css = resolve_color(color)?;
                expect
                    .css_equals(feedback_for(*field), "border-right-color", &css)
                    .await
            }
            StepAction::ExpectLastCardSrc { src } => {
                expect
                    .last_attribute_equals(elements::card_images(), "src", src)
                    .await
            }
            StepAction::ExpectLastStored { title, image_url } => {
                expect
                    .last_stored_equals(&RegisteredImage::new(title.as_str(), image_url.as_str()))
                    .await
            }
            StepAction::ExpectStoredGrowth { by } => {
                let expected = ctx.grown_by(*by)?;
                expect.stored_len_equals(expected).await
            }
            StepAction::ExpectStorageUnchanged => expect.storage_equals(ctx.remembered()?).await,
            StepAction::ExpectInputsCleared => {
                expect.has_value(elements::title_input(), "").await?;
                expect.has_value(elements::image_url_input(), "").await
            }
            StepAction::Log { message } => {
                info!("[SCENARIO LOG] {}", message);
                Ok(())
            }
        }
    }

    /// Write suite results to JSON file
    pub fn write_results(&self, results: &SuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}

impl Default for TestRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestRunner {
    fn drop(&mut self) {
        let _ = self.stop_server();
    }
}

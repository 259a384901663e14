//! Runner configuration
//!
//! Defaults suit a local run against the fixture app. A TOML file can
//! override any of them, then `IMGREG_*` environment variables, then the
//! command line.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};
use crate::expect::ExpectConfig;
use crate::playwright::PlaywrightConfig;
use crate::server::ServerConfig;

/// Which [`crate::driver::BrowserDriver`] runs the scenarios
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    #[default]
    Playwright,
    Simulated,
}

impl FromStr for DriverKind {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "playwright" => Ok(DriverKind::Playwright),
            "simulated" | "sim" => Ok(DriverKind::Simulated),
            other => Err(E2eError::InvalidConfig(format!("unknown driver '{}'", other))),
        }
    }
}

/// Configuration for the test runner
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// App to spawn before the run; `None` means it is already running at
    /// `playwright.base_url`
    pub server: Option<ServerConfig>,
    pub playwright: PlaywrightConfig,
    pub expect: ExpectConfig,
    pub driver: DriverKind,
    /// Pause after submit actions before the next step
    pub settle_ms: u64,
    /// Scenario directory; `None` runs the built-in scenarios
    pub scenarios_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            server: None,
            playwright: PlaywrightConfig::default(),
            expect: ExpectConfig::default(),
            driver: DriverKind::default(),
            settle_ms: 1000,
            scenarios_dir: None,
            output_dir: PathBuf::from("test-results"),
        }
    }
}

impl RunnerConfig {
    pub fn from_toml(raw: &str) -> E2eResult<Self> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    /// Apply `IMGREG_*` overrides from the process environment
    pub fn apply_env(&mut self) -> E2eResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> E2eResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("IMGREG_BASE_URL") {
            self.playwright.base_url = url;
            self.server = None;
        }
        if let Some(browser) = lookup("IMGREG_BROWSER") {
            self.playwright.browser = browser.parse()?;
        }
        if let Some(headless) = lookup("IMGREG_HEADLESS") {
            self.playwright.headless = parse_bool("IMGREG_HEADLESS", &headless)?;
        }
        if let Some(driver) = lookup("IMGREG_DRIVER") {
            self.driver = driver.parse()?;
        }
        if let Some(settle) = lookup("IMGREG_SETTLE_MS") {
            self.settle_ms = parse_u64("IMGREG_SETTLE_MS", &settle)?;
        }
        if let Some(timeout) = lookup("IMGREG_TIMEOUT_MS") {
            self.expect.timeout_ms = parse_u64("IMGREG_TIMEOUT_MS", &timeout)?;
        }
        Ok(())
    }
}

fn parse_bool(key: &str, raw: &str) -> E2eResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => Err(E2eError::InvalidConfig(format!("{}: expected a boolean, got '{}'", key, other))),
    }
}

fn parse_u64(key: &str, raw: &str) -> E2eResult<u64> {
    raw.trim()
        .parse()
        .map_err(|_| E2eError::InvalidConfig(format!("{}: expected a number, got '{}'", key, raw)))
}

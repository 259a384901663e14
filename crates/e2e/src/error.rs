//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Server failed to start: {0}")]
    ServerStartup(String),

    #[error("Server health check failed after {0} attempts")]
    ServerHealthCheck(usize),

    #[error("Playwright not found. Install with: npm i playwright && npx playwright install")]
    PlaywrightNotFound,

    #[error("Playwright error: {0}")]
    Playwright(String),

    #[error("Driver error: {0}")]
    Driver(String),

    #[error("Scenario parse error: {0}")]
    SpecParse(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("Unexpected local storage layout: {0}")]
    StorageFormat(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl E2eError {
    /// Whether a retrying assertion should poll again after this error.
    ///
    /// Only assertion misses and elements that have not rendered yet are
    /// transient; everything else means the browser or harness is broken.
    pub fn is_retryable(&self) -> bool {
        matches!(self, E2eError::AssertionFailed(_) | E2eError::ElementNotFound(_))
    }
}

pub type E2eResult<T> = Result<T, E2eError>;

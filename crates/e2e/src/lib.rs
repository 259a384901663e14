//! Image Registration E2E Test Framework
//!
//! This crate provides a Rust-controlled E2E suite for the image
//! registration form that:
//! - Spawns the app under test as a subprocess
//! - Drives a browser through a long-lived Playwright bridge
//! - Parses declarative YAML Given/When/Then scenarios
//! - Asserts on DOM text, computed style and persisted local storage
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner                                                 │
//! │    ├── start_server() -> ServerHandle                       │
//! │    ├── launch_driver() -> Box<dyn BrowserDriver>            │
//! │    └── run_scenario(scenario) -> ScenarioResult             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  register_form (page object)                                │
//! │    ├── elements::{title_input, image_url_feedback, ...}     │
//! │    ├── type_title / type_image_url                          │
//! │    ├── click_submit_button / hit_enter                      │
//! │    └── COLORS                                               │
//! ├─────────────────────────────────────────────────────────────┤
//! │  BrowserDriver                                              │
//! │    ├── PlaywrightDriver (node bridge, JSON lines)           │
//! │    └── SimulatedPage (in-memory form model)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod expect;
pub mod playwright;
pub mod register_form;
pub mod runner;
pub mod scenario;
pub mod server;
pub mod sim;
pub mod storage;
pub mod suite;

pub use config::{DriverKind, RunnerConfig};
pub use driver::BrowserDriver;
pub use error::{E2eError, E2eResult};
pub use runner::TestRunner;
pub use scenario::{Scenario, ScenarioStep, StepAction};
pub use storage::{PersistedCollection, RegisteredImage, StorageSnapshot};

//! Retrying assertions
//!
//! Each assertion re-runs its probe until it passes or the timeout elapses,
//! so a step waits for the specific condition it checks instead of relying
//! on a blind sleep after the preceding action.

use std::future::Future;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::register_form::Locator;
use crate::storage::{PersistedCollection, RegisteredImage};

/// How long assertions keep retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpectConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for ExpectConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 4000,
            poll_interval_ms: 50,
        }
    }
}

/// Read the image collection the current page has persisted.
pub async fn stored_collection(driver: &dyn BrowserDriver) -> E2eResult<PersistedCollection> {
    let origin = driver.origin().await?;
    let snapshot = driver.local_storage().await?;
    snapshot.collection_for(&origin)
}

pub struct Expect<'a> {
    driver: &'a dyn BrowserDriver,
    config: ExpectConfig,
}

impl<'a> Expect<'a> {
    pub fn new(driver: &'a dyn BrowserDriver, config: ExpectConfig) -> Self {
        Self { driver, config }
    }

    async fn retry<F, Fut>(&self, what: &str, mut probe: F) -> E2eResult<()>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = E2eResult<()>>,
    {
        let deadline = Instant::now() + Duration::from_millis(self.config.timeout_ms);
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));

        loop {
            match probe().await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_retryable() => {
                    if Instant::now() >= deadline {
                        let reason = match e {
                            E2eError::AssertionFailed(msg) => msg,
                            other => other.to_string(),
                        };
                        return Err(E2eError::AssertionFailed(format!(
                            "{} (gave up after {} ms): {}",
                            what, self.config.timeout_ms, reason
                        )));
                    }
                    trace!("{} not satisfied yet: {}", what, e);
                    tokio::time::sleep(interval).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    pub async fn contains_text(&self, locator: Locator, expected: &str) -> E2eResult<()> {
        let driver = self.driver;
        let what = format!("{} contains text '{}'", locator.selector(), expected);
        self.retry(&what, move || async move {
            let text = locator.text(driver).await?;
            if text.contains(expected) {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!("text was '{}'", text)))
            }
        })
        .await
    }

    pub async fn has_value(&self, locator: Locator, expected: &str) -> E2eResult<()> {
        let driver = self.driver;
        let what = format!("{} has value '{}'", locator.selector(), expected);
        self.retry(&what, move || async move {
            let value = locator.value(driver).await?;
            if value == expected {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!("value was '{}'", value)))
            }
        })
        .await
    }

    pub async fn css_equals(&self, locator: Locator, property: &str, expected: &str) -> E2eResult<()> {
        let driver = self.driver;
        let what = format!("{} has {} '{}'", locator.selector(), property, expected);
        self.retry(&what, move || async move {
            let actual = locator.css(driver, property).await?;
            if actual == expected {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!("{} was '{}'", property, actual)))
            }
        })
        .await
    }

    /// The last element matching `locator` has attribute `name` equal to `expected`.
    pub async fn last_attribute_equals(&self, locator: Locator, name: &str, expected: &str) -> E2eResult<()> {
        let driver = self.driver;
        let what = format!("last {} has {}='{}'", locator.selector(), name, expected);
        self.retry(&what, move || async move {
            let values = locator.attributes(driver, name).await?;
            match values.last() {
                None => Err(E2eError::ElementNotFound(locator.selector().to_string())),
                Some(Some(value)) if value == expected => Ok(()),
                Some(Some(value)) => Err(E2eError::AssertionFailed(format!(
                    "{} of the last of {} elements was '{}'",
                    name,
                    values.len(),
                    value
                ))),
                Some(None) => Err(E2eError::AssertionFailed(format!(
                    "last element has no {} attribute",
                    name
                ))),
            }
        })
        .await
    }

    pub async fn last_stored_equals(&self, expected: &RegisteredImage) -> E2eResult<()> {
        let driver = self.driver;
        let what = format!("last stored image is {:?}", expected);
        self.retry(&what, move || async move {
            let collection = stored_collection(driver).await?;
            match collection.last() {
                Some(last) if last == expected => Ok(()),
                Some(last) => Err(E2eError::AssertionFailed(format!("last stored image was {:?}", last))),
                None => Err(E2eError::AssertionFailed("no images stored".to_string())),
            }
        })
        .await
    }

    pub async fn stored_len_equals(&self, expected: usize) -> E2eResult<()> {
        let driver = self.driver;
        let what = format!("{} image(s) stored", expected);
        self.retry(&what, move || async move {
            let len = stored_collection(driver).await?.len();
            if len == expected {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!("{} image(s) stored", len)))
            }
        })
        .await
    }

    pub async fn storage_equals(&self, expected: &PersistedCollection) -> E2eResult<()> {
        let driver = self.driver;
        let what = format!("stored collection equals the {} remembered image(s)", expected.len());
        self.retry(&what, move || async move {
            let actual = stored_collection(driver).await?;
            if &actual == expected {
                Ok(())
            } else {
                Err(E2eError::AssertionFailed(format!(
                    "stored collection was {}",
                    actual.to_json()?
                )))
            }
        })
        .await
    }
}

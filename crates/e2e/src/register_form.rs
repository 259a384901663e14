//! Page object for the image registration form
//!
//! Scenarios call these helpers instead of spelling out selectors, so each
//! step reads as a business-level action. Assertions do not go through
//! here; they query the driver directly via [`crate::expect`].

use std::time::Duration;

use tracing::debug;

use crate::driver::BrowserDriver;
use crate::error::E2eResult;

/// Expected CSS colors by semantic state.
pub const COLORS: &[(&str, &str)] = &[("error", ERROR_COLOR)];

pub const ERROR_COLOR: &str = "rgb(220, 53, 69)";

pub const TITLE_REQUIRED_MESSAGE: &str = "Please type a title for the image";
pub const INVALID_URL_MESSAGE: &str = "Please type a valid URL";

/// Look up a color from [`COLORS`] by state name.
pub fn color(name: &str) -> Option<&'static str> {
    COLORS
        .iter()
        .find(|(state, _)| *state == name)
        .map(|(_, css)| *css)
}

/// A CSS selector for one element (or list) of the form.
///
/// Holds nothing but the selector; every query goes back to the browser
/// because the DOM may have changed since the last call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    selector: &'static str,
}

impl Locator {
    pub const fn new(selector: &'static str) -> Self {
        Self { selector }
    }

    pub fn selector(&self) -> &'static str {
        self.selector
    }

    pub async fn text(&self, driver: &dyn BrowserDriver) -> E2eResult<String> {
        driver.text_content(self.selector).await
    }

    pub async fn value(&self, driver: &dyn BrowserDriver) -> E2eResult<String> {
        driver.input_value(self.selector).await
    }

    pub async fn css(&self, driver: &dyn BrowserDriver, property: &str) -> E2eResult<String> {
        driver.computed_style(self.selector, property).await
    }

    pub async fn attributes(&self, driver: &dyn BrowserDriver, name: &str) -> E2eResult<Vec<Option<String>>> {
        driver.attribute_all(self.selector, name).await
    }
}

pub mod elements {
    use super::Locator;

    pub fn title_input() -> Locator {
        Locator::new("#title")
    }

    pub fn title_feedback() -> Locator {
        Locator::new("#titleFeedback")
    }

    pub fn image_url_input() -> Locator {
        Locator::new("#imageUrl")
    }

    pub fn image_url_feedback() -> Locator {
        Locator::new("#urlFeedback")
    }

    pub fn submit_button() -> Locator {
        Locator::new("#btnSubmit")
    }

    pub fn card_images() -> Locator {
        Locator::new("#card-list .card-img")
    }
}

/// Type into the title input. An empty string leaves the field untouched.
pub async fn type_title(driver: &dyn BrowserDriver, title: &str) -> E2eResult<()> {
    if title.is_empty() {
        return Ok(());
    }

    driver.type_text(elements::title_input().selector(), title).await
}

/// Type into the image URL input. An empty string leaves the field untouched.
pub async fn type_image_url(driver: &dyn BrowserDriver, image_url: &str) -> E2eResult<()> {
    if image_url.is_empty() {
        return Ok(());
    }

    driver.type_text(elements::image_url_input().selector(), image_url).await
}

pub async fn click_submit_button(driver: &dyn BrowserDriver, settle: Duration) -> E2eResult<()> {
    driver.click(elements::submit_button().selector()).await?;

    settle_for(settle).await;
    Ok(())
}

/// Submit with the keyboard from whichever field has focus.
pub async fn hit_enter(driver: &dyn BrowserDriver, settle: Duration) -> E2eResult<()> {
    driver.press_focused("Enter").await?;

    settle_for(settle).await;
    Ok(())
}

async fn settle_for(settle: Duration) {
    if settle.is_zero() {
        return;
    }
    debug!("Settling for {} ms", settle.as_millis());
    tokio::time::sleep(settle).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_table() {
        assert_eq!(color("error"), Some("rgb(220, 53, 69)"));
        assert_eq!(color("success"), None);
    }

    #[test]
    fn test_locators_match_page_contract() {
        assert_eq!(elements::title_input().selector(), "#title");
        assert_eq!(elements::title_feedback().selector(), "#titleFeedback");
        assert_eq!(elements::image_url_input().selector(), "#imageUrl");
        assert_eq!(elements::image_url_feedback().selector(), "#urlFeedback");
        assert_eq!(elements::submit_button().selector(), "#btnSubmit");
        assert_eq!(elements::card_images().selector(), "#card-list .card-img");
    }
}

//! In-memory model of the image registration page
//!
//! [`SimulatedPage`] answers driver calls the way the real page behaves:
//! client-side validation, a rendered card list, one local storage entry
//! per origin, and a reload that rebuilds the list from storage. It lets the
//! page object, the assertions and the runner be exercised without a
//! browser. [`Faults`] switch individual behaviours off so failure paths can
//! be tested too.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;

use crate::driver::BrowserDriver;
use crate::error::{E2eError, E2eResult};
use crate::register_form::{ERROR_COLOR, INVALID_URL_MESSAGE, TITLE_REQUIRED_MESSAGE};
use crate::storage::{PersistedCollection, RegisteredImage, StorageSnapshot, IMAGES_KEY};

const DEFAULT_ORIGIN: &str = "http://127.0.0.1:5173";
const NEUTRAL_BORDER: &str = "rgb(222, 226, 230)";

/// Behaviours the simulated page can be told to get wrong.
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Leave the inputs filled after a successful submission.
    pub keep_inputs_after_submit: bool,
    /// Drop local storage whenever the page is reloaded.
    pub forget_storage_on_reload: bool,
    /// Render the new card but never write it to local storage.
    pub skip_persistence: bool,
    /// Fail every attempt to clear local storage.
    pub refuse_storage_clear: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Title,
    ImageUrl,
    Submit,
}

#[derive(Debug, Default)]
struct PageState {
    loaded: bool,
    title: String,
    image_url: String,
    title_invalid: bool,
    url_invalid: bool,
    focus: Option<Focus>,
    cards: Vec<RegisteredImage>,
    storage: BTreeMap<String, String>,
}

impl PageState {
    fn require_loaded(&self, selector: &str) -> E2eResult<()> {
        if self.loaded {
            Ok(())
        } else {
            Err(E2eError::ElementNotFound(format!("{} (no page loaded)", selector)))
        }
    }

    fn load(&mut self) {
        self.loaded = true;
        self.title.clear();
        self.image_url.clear();
        self.title_invalid = false;
        self.url_invalid = false;
        self.focus = None;
        self.cards = self
            .storage
            .get(IMAGES_KEY)
            .and_then(|raw| PersistedCollection::from_json(raw).ok())
            .map(|collection| collection.images().to_vec())
            .unwrap_or_default();
    }

    fn submit(&mut self, faults: &Faults) -> E2eResult<()> {
        self.title_invalid = self.title.trim().is_empty();
        self.url_invalid = !is_valid_url(&self.image_url);

        if self.title_invalid || self.url_invalid {
            debug!(
                "Simulated submit rejected (title invalid: {}, url invalid: {})",
                self.title_invalid, self.url_invalid
            );
            return Ok(());
        }

        let image = RegisteredImage::new(self.title.trim(), self.image_url.trim());
        self.cards.push(image);

        if !faults.skip_persistence {
            let json = PersistedCollection::new(self.cards.clone()).to_json()?;
            self.storage.insert(IMAGES_KEY.to_string(), json);
        }

        if !faults.keep_inputs_after_submit {
            self.title.clear();
            self.image_url.clear();
        }
        Ok(())
    }
}

fn is_valid_url(raw: &str) -> bool {
    match url::Url::parse(raw.trim()) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some(),
        Err(_) => false,
    }
}

pub struct SimulatedPage {
    origin: String,
    faults: Faults,
    state: Mutex<PageState>,
}

impl SimulatedPage {
    pub fn new() -> Self {
        Self::with_faults(Faults::default())
    }

    pub fn with_faults(faults: Faults) -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            faults,
            state: Mutex::new(PageState::default()),
        }
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }
}

impl Default for SimulatedPage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserDriver for SimulatedPage {
    async fn visit(&self, path: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        if path == "/" || path.is_empty() {
            state.load();
        } else {
            // Anything but the root is a 404 page without the form.
            state.loaded = false;
            state.focus = None;
        }
        Ok(())
    }

    async fn reload(&self) -> E2eResult<()> {
        let mut state = self.state.lock();
        if self.faults.forget_storage_on_reload {
            state.storage.clear();
        }
        if state.loaded {
            state.load();
        }
        Ok(())
    }

    async fn origin(&self) -> E2eResult<String> {
        Ok(self.origin.clone())
    }

    async fn type_text(&self, selector: &str, text: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.require_loaded(selector)?;
        match selector {
            "#title" => {
                state.title.push_str(text);
                state.focus = Some(Focus::Title);
            }
            "#imageUrl" => {
                state.image_url.push_str(text);
                state.focus = Some(Focus::ImageUrl);
            }
            other => return Err(E2eError::ElementNotFound(other.to_string())),
        }
        Ok(())
    }

    async fn click(&self, selector: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.require_loaded(selector)?;
        match selector {
            "#btnSubmit" => {
                state.focus = Some(Focus::Submit);
                state.submit(&self.faults)
            }
            "#title" => {
                state.focus = Some(Focus::Title);
                Ok(())
            }
            "#imageUrl" => {
                state.focus = Some(Focus::ImageUrl);
                Ok(())
            }
            other => Err(E2eError::ElementNotFound(other.to_string())),
        }
    }

    async fn press_focused(&self, key: &str) -> E2eResult<()> {
        let mut state = self.state.lock();
        if key == "Enter" && state.loaded && state.focus.is_some() {
            return state.submit(&self.faults);
        }
        Ok(())
    }

    async fn text_content(&self, selector: &str) -> E2eResult<String> {
        let state = self.state.lock();
        state.require_loaded(selector)?;
        let text = match selector {
            "#titleFeedback" if state.title_invalid => TITLE_REQUIRED_MESSAGE,
            "#urlFeedback" if state.url_invalid => INVALID_URL_MESSAGE,
            "#titleFeedback" | "#urlFeedback" | "#title" | "#imageUrl" => "",
            "#btnSubmit" => "Submit",
            other => return Err(E2eError::ElementNotFound(other.to_string())),
        };
        Ok(text.to_string())
    }

    async fn input_value(&self, selector: &str) -> E2eResult<String> {
        let state = self.state.lock();
        state.require_loaded(selector)?;
        match selector {
            "#title" => Ok(state.title.clone()),
            "#imageUrl" => Ok(state.image_url.clone()),
            other => Err(E2eError::ElementNotFound(other.to_string())),
        }
    }

    async fn computed_style(&self, selector: &str, property: &str) -> E2eResult<String> {
        let state = self.state.lock();
        state.require_loaded(selector)?;
        let invalid = match selector {
            "#title" | "#titleFeedback" => state.title_invalid,
            "#imageUrl" | "#urlFeedback" => state.url_invalid,
            other => return Err(E2eError::ElementNotFound(other.to_string())),
        };
        match property {
            "border-right-color" if invalid => Ok(ERROR_COLOR.to_string()),
            "border-right-color" => Ok(NEUTRAL_BORDER.to_string()),
            other => Err(E2eError::Driver(format!(
                "simulated page does not model '{}'",
                other
            ))),
        }
    }

    async fn attribute_all(&self, selector: &str, name: &str) -> E2eResult<Vec<Option<String>>> {
        let state = self.state.lock();
        if !state.loaded || selector != "#card-list .card-img" {
            return Ok(Vec::new());
        }
        let values = state
            .cards
            .iter()
            .map(|card| match name {
                "src" => Some(card.image_url.clone()),
                "alt" => Some(card.title.clone()),
                _ => None,
            })
            .collect();
        Ok(values)
    }

    async fn local_storage(&self) -> E2eResult<StorageSnapshot> {
        let state = self.state.lock();
        let mut snapshot = StorageSnapshot::new();
        for (key, value) in &state.storage {
            snapshot.insert(&self.origin, key, value.clone());
        }
        Ok(snapshot)
    }

    async fn clear_local_storage(&self) -> E2eResult<()> {
        if self.faults.refuse_storage_clear {
            return Err(E2eError::Driver("local storage could not be cleared".to_string()));
        }
        self.state.lock().storage.clear();
        Ok(())
    }

    async fn close(&self) -> E2eResult<()> {
        let mut state = self.state.lock();
        state.loaded = false;
        state.focus = None;
        Ok(())
    }
}

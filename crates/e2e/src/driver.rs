//! Browser driver seam
//!
//! Everything the scenarios need from a browser goes through
//! [`BrowserDriver`]. The Playwright bridge talks to a real browser; the
//! simulated page answers from an in-memory model of the form.

use async_trait::async_trait;

use crate::error::E2eResult;
use crate::storage::StorageSnapshot;

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Navigate to `path`, resolved against the driver's base URL.
    async fn visit(&self, path: &str) -> E2eResult<()>;

    /// Reload the current page.
    async fn reload(&self) -> E2eResult<()>;

    /// Origin of the current page, e.g. `http://127.0.0.1:5173`.
    async fn origin(&self) -> E2eResult<String>;

    /// Type `text` key by key into the first element matching `selector`.
    /// The element keeps focus afterwards.
    async fn type_text(&self, selector: &str, text: &str) -> E2eResult<()>;

    async fn click(&self, selector: &str) -> E2eResult<()>;

    /// Press a named key (`Enter`, `Tab`, ...) on whatever has focus.
    async fn press_focused(&self, key: &str) -> E2eResult<()>;

    async fn text_content(&self, selector: &str) -> E2eResult<String>;

    async fn input_value(&self, selector: &str) -> E2eResult<String>;

    async fn computed_style(&self, selector: &str, property: &str) -> E2eResult<String>;

    /// Attribute `name` of every element matching `selector`, in document order.
    async fn attribute_all(&self, selector: &str, name: &str) -> E2eResult<Vec<Option<String>>>;

    async fn local_storage(&self) -> E2eResult<StorageSnapshot>;

    async fn clear_local_storage(&self) -> E2eResult<()>;

    async fn close(&self) -> E2eResult<()>;
}

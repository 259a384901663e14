//! Persisted image records and the local storage snapshot they live in

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{E2eError, E2eResult};

/// Key the registration page stores its collection under.
pub const IMAGES_KEY: &str = "images";

/// A registered image as the page persists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredImage {
    pub title: String,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

impl RegisteredImage {
    pub fn new(title: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            image_url: image_url.into(),
        }
    }
}

/// Ordered list of registered images, serialized as one JSON array string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersistedCollection(Vec<RegisteredImage>);

impl PersistedCollection {
    pub fn new(images: Vec<RegisteredImage>) -> Self {
        Self(images)
    }

    pub fn from_json(raw: &str) -> E2eResult<Self> {
        serde_json::from_str(raw).map_err(|e| {
            E2eError::StorageFormat(format!("value is not a JSON array of images: {}", e))
        })
    }

    pub fn to_json(&self) -> E2eResult<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    pub fn push(&mut self, image: RegisteredImage) {
        self.0.push(image);
    }

    pub fn last(&self) -> Option<&RegisteredImage> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn images(&self) -> &[RegisteredImage] {
        &self.0
    }
}

/// All local storage visible to the browser, keyed by origin then by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageSnapshot(BTreeMap<String, BTreeMap<String, String>>);

impl StorageSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, origin: &str, key: &str, value: impl Into<String>) {
        self.0
            .entry(origin.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn entries(&self, origin: &str) -> Option<&BTreeMap<String, String>> {
        self.0.get(origin)
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(|entries| entries.is_empty())
    }

    /// Resolve the image collection stored for `origin`.
    ///
    /// The page keeps a single entry per origin. No entry at all means
    /// nothing has been registered yet.
    pub fn collection_for(&self, origin: &str) -> E2eResult<PersistedCollection> {
        let entries = match self.0.get(origin) {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Ok(PersistedCollection::default()),
        };

        if entries.len() == 1 {
            if let Some(raw) = entries.values().next() {
                return PersistedCollection::from_json(raw);
            }
        }

        match entries.get(IMAGES_KEY) {
            Some(raw) => PersistedCollection::from_json(raw),
            None => Err(E2eError::StorageFormat(format!(
                "{} has {} entries and none is named '{}'",
                origin,
                entries.len(),
                IMAGES_KEY
            ))),
        }
    }
}

impl From<BTreeMap<String, BTreeMap<String, String>>> for StorageSnapshot {
    fn from(map: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self(map)
    }
}

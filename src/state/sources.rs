use serde::{Deserialize, Serialize};
use std::path::Path;

use super::{load_json, save_json};
use crate::error::Result;

fn default_translate() -> bool {
    true
}

/// A watched playlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Playlist URL handed to the scanner
    #[serde(rename = "playlistURL")]
    pub locator: String,
    /// Fetch and mux a translated audio track for new items
    #[serde(default = "default_translate")]
    pub translate: bool,
}

impl Source {
    pub fn new<S: Into<String>>(locator: S, translate: bool) -> Self {
        Self {
            locator: locator.into(),
            translate,
        }
    }

    pub fn has_locator(&self) -> bool {
        !self.locator.trim().is_empty()
    }
}

pub async fn load_sources<P: AsRef<Path>>(path: P) -> Result<Vec<Source>> {
    load_json(path.as_ref()).await
}

pub async fn save_sources<P: AsRef<Path>>(path: P, sources: &[Source]) -> Result<()> {
    save_json(path.as_ref(), sources).await
}

use async_trait::async_trait;
use serde::Serialize;

use crate::error::Result;

/// One video discovered in a playlist
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    /// Stable id, the ledger key
    pub id: String,
    pub title: String,
    /// URL handed to the downloader and translator
    pub locator: String,
}

impl Item {
    pub fn new<S1, S2, S3>(id: S1, title: S2, locator: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self {
            id: id.into(),
            title: title.into(),
            locator: locator.into(),
        }
    }
}

/// Lists the current items of a playlist
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Return every item in the playlist's own order. A failure means the
    /// source should be skipped for this cycle.
    async fn scan(&self, locator: &str) -> Result<Vec<Item>>;
}

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{load_json, save_json};
use crate::error::Result;

/// Append-only record of processed item ids.
///
/// Ids keep their insertion order on disk; the hash set only serves
/// membership tests. Nothing ever removes an id.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    ids: Vec<String>,
    index: HashSet<String>,
}

impl Ledger {
    /// Empty ledger that will be written to `path`
    pub fn empty<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            ids: Vec::new(),
            index: HashSet::new(),
        }
    }

    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let ids: Vec<String> = load_json(path).await?;
        debug!("Loaded {} processed ids from {}", ids.len(), path.display());

        let index = ids.iter().cloned().collect();
        Ok(Self {
            path: path.to_path_buf(),
            ids,
            index,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    /// Append `id`; returns false when it was already present
    pub fn insert(&mut self, id: &str) -> bool {
        if !self.index.insert(id.to_string()) {
            return false;
        }
        self.ids.push(id.to_string());
        true
    }

    /// Rewrite the whole ledger file
    pub async fn save(&self) -> Result<()> {
        save_json(&self.path, &self.ids).await
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }
}

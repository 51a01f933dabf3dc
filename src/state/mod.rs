//! Durable state kept in the private state directory: the source list and
//! the ledger of processed item ids. Both are JSON files rewritten whole.

pub mod ledger;
pub mod sources;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::fs;

pub use ledger::Ledger;
pub use sources::{Source, load_sources, save_sources};

use crate::config::StateConfig;
use crate::error::{Result, DubwatchError};

/// Resolved locations of the state files
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub dir: PathBuf,
    pub sources: PathBuf,
    pub ledger: PathBuf,
    pub downloader_config: PathBuf,
}

impl From<&StateConfig> for StatePaths {
    fn from(config: &StateConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            sources: config.sources_path(),
            ledger: config.ledger_path(),
            downloader_config: config.downloader_config_path(),
        }
    }
}

impl StatePaths {
    /// State files the daemon cannot start without
    pub fn required_files(&self) -> [&Path; 2] {
        [self.sources.as_path(), self.ledger.as_path()]
    }
}

pub(crate) async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read(path).await.map_err(|e| DubwatchError::State {
        path: path.to_path_buf(),
        message: format!("cannot read: {}", e),
    })?;

    serde_json::from_slice(&data).map_err(|e| DubwatchError::State {
        path: path.to_path_buf(),
        message: format!("malformed JSON: {}", e),
    })
}

/// Write tab-indented JSON through a temporary file so a crash mid-write
/// never leaves a truncated file behind.
pub(crate) async fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut data = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
    let mut serializer = serde_json::Serializer::with_formatter(&mut data, formatter);
    value.serialize(&mut serializer)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).await?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, &data).await?;
    fs::rename(&temp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_json_uses_tab_indentation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ids.json");

        save_json(&path, &vec!["a".to_string(), "b".to_string()]).await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n\t\"a\",\n\t\"b\"\n]");
        assert!(!dir.path().join("ids.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_json_reports_path_on_corruption() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("downloaded.json");
        std::fs::write(&path, "[\"a\",").unwrap();

        let err = load_json::<Vec<String>>(&path).await.unwrap_err();
        match err {
            DubwatchError::State { path: p, message } => {
                assert_eq!(p, path);
                assert!(message.starts_with("malformed JSON"));
            }
            other => panic!("expected State error, got {:?}", other),
        }
    }
}

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::Downloader;
use crate::error::{Result, DubwatchError};
use crate::process::{ProcessRunner, ToolCommand};
use crate::scanner::{Item, Scanner};

/// `--flat-playlist --dump-single-json` output, reduced to what we read
#[derive(Debug, Deserialize)]
struct FlatPlaylist {
    id: Option<String>,
    title: Option<String>,
    webpage_url: Option<String>,
    entries: Option<Vec<Option<FlatEntry>>>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    #[serde(rename = "_type")]
    entry_type: Option<String>,
    ie_key: Option<String>,
    id: Option<String>,
    title: Option<String>,
    url: Option<String>,
    webpage_url: Option<String>,
}

impl FlatEntry {
    /// Channel tabs and sub-playlists listed inside a playlist
    fn is_nested_playlist(&self) -> bool {
        matches!(self.entry_type.as_deref(), Some("playlist" | "multi_video"))
            || matches!(self.ie_key.as_deref(), Some("YoutubeTab" | "YoutubePlaylist"))
    }

    fn into_item(self) -> Option<Item> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let locator = self
            .url
            .or(self.webpage_url)
            .unwrap_or_else(|| format!("https://www.youtube.com/watch?v={}", id));
        let title = self.title.unwrap_or_default();
        Some(Item { id, title, locator })
    }
}

/// Turn yt-dlp's flat playlist JSON into items, keeping playlist order.
/// A single-video URL yields one item.
pub fn parse_flat_playlist(json: &str) -> Result<Vec<Item>> {
    let playlist: FlatPlaylist = serde_json::from_str(json)
        .map_err(|e| DubwatchError::Scan(format!("unexpected yt-dlp output: {}", e)))?;

    let Some(entries) = playlist.entries else {
        let entry = FlatEntry {
            entry_type: None,
            ie_key: None,
            id: playlist.id,
            title: playlist.title,
            url: None,
            webpage_url: playlist.webpage_url,
        };
        return Ok(entry.into_item().into_iter().collect());
    };

    let mut items = Vec::with_capacity(entries.len());
    for (position, entry) in entries.into_iter().enumerate() {
        if let Some(nested) = entry.as_ref().filter(|entry| entry.is_nested_playlist()) {
            warn!(
                "Skipping nested playlist entry {} ({})",
                position + 1,
                nested.title.as_deref().unwrap_or_default()
            );
            continue;
        }
        match entry.and_then(FlatEntry::into_item) {
            Some(item) => items.push(item),
            None => warn!("Skipping playlist entry {} without an id", position + 1),
        }
    }
    Ok(items)
}

/// yt-dlp wrapper. The options file is always passed with
/// `--config-location` and never read here.
pub struct YtDlp {
    binary_path: String,
    config_location: PathBuf,
    runner: Arc<dyn ProcessRunner>,
}

impl YtDlp {
    pub fn new<S: Into<String>, P: Into<PathBuf>>(
        binary_path: S,
        config_location: P,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            binary_path: binary_path.into(),
            config_location: config_location.into(),
            runner,
        }
    }

    fn command(&self, description: &str) -> ToolCommand {
        ToolCommand::new(&self.binary_path, description)
            .arg("--config-location")
            .path_arg(&self.config_location)
    }
}

#[async_trait]
impl Scanner for YtDlp {
    async fn scan(&self, locator: &str) -> Result<Vec<Item>> {
        info!("Scanning playlist {}", locator);

        let command = self
            .command("Playlist scan")
            .arg("--flat-playlist")
            .arg("--dump-single-json")
            .arg(locator);

        let output = self
            .runner
            .capture(&command)
            .await
            .map_err(|e| DubwatchError::Scan(format!("{}: {}", locator, e)))?;

        let items = parse_flat_playlist(&output)?;
        debug!("Playlist {} lists {} items", locator, items.len());
        Ok(items)
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn download(&self, locator: &str) -> Result<()> {
        info!("Downloading {}", locator);
        let command = self.command("Video download").arg(locator);
        self.runner.run(&command).await
    }

    async fn resolve_filename(&self, locator: &str) -> Result<PathBuf> {
        let command = self.command("Filename lookup").arg("--get-filename").arg(locator);
        let output = self.runner.capture(&command).await?;

        output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .last()
            .map(PathBuf::from)
            .ok_or_else(|| DubwatchError::ProcessFailed {
                description: "Filename lookup (empty output)".to_string(),
                code: Some(0),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::MockProcessRunner;

    const PLAYLIST_JSON: &str = r#"{
        "_type": "playlist",
        "id": "PL123",
        "title": "Uploads",
        "entries": [
            {
                "_type": "url",
                "id": "v1",
                "title": "First",
                "url": "https://www.youtube.com/watch?v=v1"
            },
            null,
            {"_type": "url", "title": "No id"},
            {"_type": "url", "id": "v2", "title": "Second"}
        ]
    }"#;

    #[test]
    fn test_parse_flat_playlist_keeps_order_and_drops_idless_entries() {
        let items = parse_flat_playlist(PLAYLIST_JSON).unwrap();
        assert_eq!(
            items,
            vec![
                Item::new("v1", "First", "https://www.youtube.com/watch?v=v1"),
                Item::new("v2", "Second", "https://www.youtube.com/watch?v=v2"),
            ]
        );
    }

    #[test]
    fn test_parse_single_video() {
        let json = r#"{
            "id": "abc",
            "title": "Solo",
            "webpage_url": "https://www.youtube.com/watch?v=abc"
        }"#;
        let items = parse_flat_playlist(json).unwrap();
        assert_eq!(items, vec![Item::new("abc", "Solo", "https://www.youtube.com/watch?v=abc")]);
    }

    #[test]
    fn test_parse_skips_channel_tabs() {
        let json = r#"{
            "_type": "playlist",
            "id": "UCabc",
            "title": "Chan",
            "entries": [
                {
                    "_type": "url",
                    "ie_key": "YoutubeTab",
                    "id": "UCabc",
                    "title": "Chan - Videos",
                    "url": "https://www.youtube.com/channel/UCabc/videos"
                },
                {"_type": "playlist", "id": "UCabc", "title": "Chan - Shorts"},
                {"_type": "url", "ie_key": "Youtube", "id": "v9", "title": "Loose video"}
            ]
        }"#;
        let items = parse_flat_playlist(json).unwrap();
        assert_eq!(
            items,
            vec![Item::new("v9", "Loose video", "https://www.youtube.com/watch?v=v9")]
        );
    }

    #[test]
    fn test_parse_garbage_is_scan_error() {
        assert!(matches!(
            parse_flat_playlist("ERROR: not json"),
            Err(DubwatchError::Scan(_))
        ));
    }

    #[tokio::test]
    async fn test_scan_passes_options_file_through() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("yt-dlp.conf");
        std::fs::write(&conf, "-f bestvideo+bestaudio\n").unwrap();
        let conf_arg = conf.to_string_lossy().to_string();

        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .withf(move |cmd: &ToolCommand| {
                cmd.program == "yt-dlp"
                    && cmd.args
                        == [
                            "--config-location",
                            conf_arg.as_str(),
                            "--flat-playlist",
                            "--dump-single-json",
                            "P1",
                        ]
            })
            .times(1)
            .returning(|_| Ok(PLAYLIST_JSON.to_string()));

        let ytdlp = YtDlp::new("yt-dlp", &conf, Arc::new(runner));
        let items = ytdlp.scan("P1").await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_failure_maps_to_scan_error() {
        let mut runner = MockProcessRunner::new();
        runner.expect_capture().returning(|cmd: &ToolCommand| {
            Err(DubwatchError::ProcessFailed {
                description: cmd.description.clone(),
                code: Some(1),
            })
        });

        let ytdlp = YtDlp::new("yt-dlp", "/nonexistent/yt-dlp.conf", Arc::new(runner));
        assert!(matches!(ytdlp.scan("P1").await, Err(DubwatchError::Scan(_))));
    }

    #[tokio::test]
    async fn test_missing_options_file_is_still_passed() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_run()
            .withf(|cmd: &ToolCommand| {
                cmd.args == ["--config-location", "/nonexistent/yt-dlp.conf", "u1"]
            })
            .times(1)
            .returning(|_| Ok(()));

        let ytdlp = YtDlp::new("yt-dlp", "/nonexistent/yt-dlp.conf", Arc::new(runner));
        ytdlp.download("u1").await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_filename_takes_last_line() {
        let mut runner = MockProcessRunner::new();
        runner
            .expect_capture()
            .withf(|cmd: &ToolCommand| {
                cmd.args
                    == ["--config-location", "/nonexistent/yt-dlp.conf", "--get-filename", "u1"]
            })
            .returning(|_| Ok("WARNING: something\n/videos/T1 [v1].mp4\n\n".to_string()));

        let ytdlp = YtDlp::new("yt-dlp", "/nonexistent/yt-dlp.conf", Arc::new(runner));
        let path = ytdlp.resolve_filename("u1").await.unwrap();
        assert_eq!(path, PathBuf::from("/videos/T1 [v1].mp4"));
    }

    #[tokio::test]
    async fn test_resolve_filename_rejects_empty_output() {
        let mut runner = MockProcessRunner::new();
        runner.expect_capture().returning(|_| Ok("\n".to_string()));

        let ytdlp = YtDlp::new("yt-dlp", "/nonexistent/yt-dlp.conf", Arc::new(runner));
        assert!(ytdlp.resolve_filename("u1").await.is_err());
    }
}

// External tool wrappers
//
// Each collaborator of the item pipeline is a trait so the pipeline and the
// scheduler can run against fakes:
// - YtDlp: playlist scanning, download and filename lookup
// - VotCli: translated audio track download
// - Ffmpeg: muxing the translated track under the original audio

pub mod ffmpeg;
pub mod vot;
pub mod ytdlp;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use ffmpeg::FfmpegMuxer;
pub use vot::VotCliTranslator;
pub use ytdlp::YtDlp;

use crate::config::Config;
use crate::error::Result;
use crate::process::{Dependency, ProcessRunner};
use crate::scanner::Scanner;
use crate::state::StatePaths;

/// Fetches an item's media to disk
#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, locator: &str) -> Result<()>;

    /// Path of the file `download` produces for `locator`
    async fn resolve_filename(&self, locator: &str) -> Result<PathBuf>;
}

/// Produces a translated audio track for an item
#[async_trait]
pub trait Translator: Send + Sync {
    /// Write the track to `output_dir/file_name`
    async fn translate(&self, locator: &str, output_dir: &Path, file_name: &str) -> Result<()>;
}

/// Combines a video with a translated audio track
#[async_trait]
pub trait Muxer: Send + Sync {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()>;
}

/// Concrete tool set built from the configuration
pub struct Toolchain {
    pub scanner: Arc<dyn Scanner>,
    pub downloader: Arc<dyn Downloader>,
    pub translator: Arc<dyn Translator>,
    pub muxer: Arc<dyn Muxer>,
}

impl Toolchain {
    pub fn from_config(config: &Config, runner: Arc<dyn ProcessRunner>) -> Self {
        let paths = StatePaths::from(&config.state);
        let ytdlp = Arc::new(YtDlp::new(
            &config.downloader.binary_path,
            paths.downloader_config,
            runner.clone(),
        ));

        Self {
            scanner: ytdlp.clone(),
            downloader: ytdlp,
            translator: Arc::new(VotCliTranslator::new(
                &config.translator.binary_path,
                runner.clone(),
            )),
            muxer: Arc::new(FfmpegMuxer::new(config.media.clone(), runner)),
        }
    }
}

/// Binaries checked before the daemon starts
pub fn required_tools(config: &Config) -> Vec<Dependency> {
    vec![
        Dependency::new("downloader", &config.downloader.binary_path),
        Dependency::new("media tool", &config.media.binary_path),
        Dependency::new("translator", &config.translator.binary_path),
    ]
}

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::PipelineError;
use crate::scanner::Item;
use crate::tools::{Downloader, Muxer, Toolchain, Translator};

/// What a successful pipeline run left on disk
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// Translation disabled; the downloaded file is the result
    Downloaded,
    /// Translated and muxed; intermediates removed
    Translated { output: PathBuf },
}

/// Processes one new item. Implemented by [`ItemPipeline`]; the scheduler
/// only depends on this seam.
#[async_trait]
pub trait ItemProcessor: Send + Sync {
    async fn process(
        &self,
        item: &Item,
        translate: bool,
    ) -> Result<PipelineOutcome, PipelineError>;
}

/// Files derived from the downloaded video path
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedPaths {
    pub dir: PathBuf,
    pub audio_file_name: String,
    pub audio: PathBuf,
    pub output: PathBuf,
}

impl DerivedPaths {
    pub fn new(video: &Path, audio_suffix: &str, output_suffix: &str) -> Self {
        let dir = match video.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let base = video
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let audio_file_name = format!("{}{}", base, audio_suffix);
        let audio = dir.join(&audio_file_name);

        let mut output = video.as_os_str().to_os_string();
        output.push(output_suffix);

        Self {
            dir,
            audio_file_name,
            audio,
            output: PathBuf::from(output),
        }
    }
}

/// download -> translate -> verify -> mux -> cleanup
pub struct ItemPipeline {
    downloader: Arc<dyn Downloader>,
    translator: Arc<dyn Translator>,
    muxer: Arc<dyn Muxer>,
    audio_suffix: String,
    output_suffix: String,
}

impl ItemPipeline {
    pub fn new(
        downloader: Arc<dyn Downloader>,
        translator: Arc<dyn Translator>,
        muxer: Arc<dyn Muxer>,
        audio_suffix: impl Into<String>,
        output_suffix: impl Into<String>,
    ) -> Self {
        Self {
            downloader,
            translator,
            muxer,
            audio_suffix: audio_suffix.into(),
            output_suffix: output_suffix.into(),
        }
    }

    pub fn from_toolchain(tools: &Toolchain, config: &Config) -> Self {
        Self::new(
            tools.downloader.clone(),
            tools.translator.clone(),
            tools.muxer.clone(),
            &config.translator.audio_suffix,
            &config.media.output_suffix,
        )
    }

    async fn cleanup(&self, files: &[&Path]) {
        info!("Cleaning up temporary files: {:?}", files);
        for file in files {
            if let Err(e) = fs::remove_file(file).await {
                warn!("Failed to remove {}: {}", file.display(), e);
            }
        }
    }
}

#[async_trait]
impl ItemProcessor for ItemPipeline {
    async fn process(
        &self,
        item: &Item,
        translate: bool,
    ) -> Result<PipelineOutcome, PipelineError> {
        self.downloader
            .download(&item.locator)
            .await
            .map_err(PipelineError::Download)?;

        if !translate {
            return Ok(PipelineOutcome::Downloaded);
        }

        let video = self
            .downloader
            .resolve_filename(&item.locator)
            .await
            .map_err(PipelineError::ResolveFilename)?;
        let paths = DerivedPaths::new(&video, &self.audio_suffix, &self.output_suffix);

        info!("Downloading translation for {}", video.display());
        self.translator
            .translate(&item.locator, &paths.dir, &paths.audio_file_name)
            .await
            .map_err(PipelineError::Translate)?;

        if !matches!(fs::try_exists(&paths.audio).await, Ok(true)) {
            return Err(PipelineError::AudioMissing(paths.audio));
        }

        self.muxer
            .mux(&video, &paths.audio, &paths.output)
            .await
            .map_err(PipelineError::Mux)?;

        self.cleanup(&[paths.audio.as_path(), video.as_path()]).await;

        Ok(PipelineOutcome::Translated { output: paths.output })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fakes for the pipeline collaborators. They create the files
    //! the real tools would, inside a temporary directory.

    use super::*;
    use crate::error::{DubwatchError, Result};
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct Calls {
        pub log: Mutex<Vec<String>>,
    }

    impl Calls {
        pub fn record(&self, entry: String) {
            self.log.lock().unwrap().push(entry);
        }

        pub fn entries(&self) -> Vec<String> {
            self.log.lock().unwrap().clone()
        }

        pub fn count(&self, prefix: &str) -> usize {
            self.entries().iter().filter(|e| e.starts_with(prefix)).count()
        }
    }

    fn tool_failure(description: &str) -> DubwatchError {
        DubwatchError::ProcessFailed {
            description: description.to_string(),
            code: Some(1),
        }
    }

    pub struct FakeDownloader {
        pub dir: PathBuf,
        pub calls: Arc<Calls>,
        pub failing: HashSet<String>,
    }

    impl FakeDownloader {
        pub fn video_path(&self, locator: &str) -> PathBuf {
            self.dir.join(format!("{}.mp4", locator))
        }
    }

    #[async_trait]
    impl Downloader for FakeDownloader {
        async fn download(&self, locator: &str) -> Result<()> {
            self.calls.record(format!("download {}", locator));
            if self.failing.contains(locator) {
                return Err(tool_failure("Video download"));
            }
            std::fs::write(self.video_path(locator), b"video")?;
            Ok(())
        }

        async fn resolve_filename(&self, locator: &str) -> Result<PathBuf> {
            self.calls.record(format!("resolve {}", locator));
            Ok(self.video_path(locator))
        }
    }

    #[derive(Clone, Copy, PartialEq)]
    pub enum TranslatorBehavior {
        WritesAudio,
        Fails,
        SucceedsWithoutOutput,
    }

    pub struct FakeTranslator {
        pub calls: Arc<Calls>,
        pub behavior: TranslatorBehavior,
    }

    #[async_trait]
    impl Translator for FakeTranslator {
        async fn translate(&self, locator: &str, output_dir: &Path, file_name: &str) -> Result<()> {
            self.calls.record(format!("translate {}", locator));
            match self.behavior {
                TranslatorBehavior::WritesAudio => {
                    std::fs::write(output_dir.join(file_name), b"audio")?;
                    Ok(())
                }
                TranslatorBehavior::Fails => Err(tool_failure("Translation download")),
                TranslatorBehavior::SucceedsWithoutOutput => Ok(()),
            }
        }
    }

    pub struct FakeMuxer {
        pub calls: Arc<Calls>,
        pub fails: bool,
    }

    #[async_trait]
    impl Muxer for FakeMuxer {
        async fn mux(&self, video: &Path, _audio: &Path, output: &Path) -> Result<()> {
            self.calls.record(format!("mux {}", video.display()));
            if self.fails {
                return Err(tool_failure("Audio muxing"));
            }
            std::fs::write(output, b"muxed")?;
            Ok(())
        }
    }

    /// Pipeline over fakes writing into `dir`
    pub fn fake_pipeline(
        dir: &Path,
        calls: Arc<Calls>,
        behavior: TranslatorBehavior,
        muxer_fails: bool,
    ) -> ItemPipeline {
        ItemPipeline::new(
            Arc::new(FakeDownloader {
                dir: dir.to_path_buf(),
                calls: calls.clone(),
                failing: HashSet::new(),
            }),
            Arc::new(FakeTranslator {
                calls: calls.clone(),
                behavior,
            }),
            Arc::new(FakeMuxer {
                calls,
                fails: muxer_fails,
            }),
            ".mp3",
            ".[VOT-CLI-LIVE].mp4",
        )
    }
}

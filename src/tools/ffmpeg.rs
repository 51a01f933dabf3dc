use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::Muxer;
use crate::config::MediaConfig;
use crate::error::Result;
use crate::process::{ProcessRunner, ToolCommand};

/// FFmpeg-based muxer. The video stream is copied as-is; the original
/// soundtrack is turned down and mixed under the translated one.
pub struct FfmpegMuxer {
    config: MediaConfig,
    runner: Arc<dyn ProcessRunner>,
}

impl FfmpegMuxer {
    pub fn new(config: MediaConfig, runner: Arc<dyn ProcessRunner>) -> Self {
        Self { config, runner }
    }

    fn filter_graph(&self) -> String {
        format!(
            "[0:a:0]volume={}[a1];[1:a:0]volume={}[a2];[a1][a2]amix=inputs=2[aout]",
            format_volume(self.config.original_volume),
            format_volume(self.config.translated_volume),
        )
    }

    pub fn mux_command(&self, video: &Path, audio: &Path, output: &Path) -> ToolCommand {
        ToolCommand::new(&self.config.binary_path, "Audio muxing")
            .arg("-v")
            .arg("error")
            .arg("-stats")
            .input(video)
            .input(audio)
            .filter_complex(self.filter_graph())
            .map("0:v")
            .map("[aout]")
            .copy_video()
            .audio_codec(&self.config.audio_codec)
            .path_arg(output)
            .overwrite()
    }
}

/// Render a volume factor with at least one decimal place (`1` -> `1.0`)
fn format_volume(volume: f64) -> String {
    let text = volume.to_string();
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

#[async_trait]
impl Muxer for FfmpegMuxer {
    async fn mux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        info!(
            "Muxing audio with ffmpeg: {} + {} -> {}",
            video.display(),
            audio.display(),
            output.display()
        );

        let command = self.mux_command(video, audio, output);
        self.runner.run(&command).await?;

        info!("Muxing completed");
        Ok(())
    }
}

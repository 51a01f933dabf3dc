use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use super::Translator;
use crate::error::Result;
use crate::process::{ProcessRunner, ToolCommand};

/// vot-cli-live wrapper: downloads the translated voice-over of a video
pub struct VotCliTranslator {
    binary_path: String,
    runner: Arc<dyn ProcessRunner>,
}

impl VotCliTranslator {
    pub fn new<S: Into<String>>(binary_path: S, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            binary_path: binary_path.into(),
            runner,
        }
    }

    pub fn translate_command(
        &self,
        locator: &str,
        output_dir: &Path,
        file_name: &str,
    ) -> ToolCommand {
        ToolCommand::new(&self.binary_path, "Translation download")
            .option("--output", output_dir.display())
            .option("--output-file", file_name)
            .arg(locator)
    }
}

#[async_trait]
impl Translator for VotCliTranslator {
    async fn translate(&self, locator: &str, output_dir: &Path, file_name: &str) -> Result<()> {
        info!(
            "Downloading translation for {} into {}",
            locator,
            output_dir.join(file_name).display()
        );
        let command = self.translate_command(locator, output_dir, file_name);
        self.runner.run(&command).await
    }
}

use std::io::{BufRead, Write};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{Result, DubwatchError};
use crate::scanner::Scanner;
use crate::state::{Ledger, Source, StatePaths, save_sources};

/// First-run bootstrap of the private state directory
pub struct SetupManager {
    templates_dir: PathBuf,
    paths: StatePaths,
}

impl SetupManager {
    pub fn new<P: Into<PathBuf>>(templates_dir: P, paths: StatePaths) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            paths,
        }
    }

    /// Copy every template missing from the state directory, keeping file
    /// permissions. Returns true when anything was created.
    pub async fn ensure_state_files(&self) -> Result<bool> {
        if !self.templates_dir.is_dir() {
            if self.paths.required_files().iter().all(|path| path.exists()) {
                return Ok(false);
            }
            return Err(DubwatchError::Setup(format!(
                "templates directory {} not found and state files are missing",
                self.templates_dir.display()
            )));
        }

        fs::create_dir_all(&self.paths.dir).await?;

        let mut created = false;
        for entry in WalkDir::new(&self.templates_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry
                .map_err(|e| DubwatchError::Setup(format!("cannot read templates: {}", e)))?;
            if !entry.file_type().is_file() {
                continue;
            }

            let target = self.paths.dir.join(entry.file_name());
            if fs::try_exists(&target).await? {
                continue;
            }

            // fs::copy carries the permission bits over
            fs::copy(entry.path(), &target).await?;
            info!("Created {} from template", target.display());
            created = true;
        }

        Ok(created)
    }

    /// Ask for playlists on `input`/`output` and write the source list and
    /// ledger. Returns whether the operator wants the service started now.
    pub async fn interactive<R: BufRead, W: Write>(
        &self,
        input: R,
        output: W,
        scanner: &dyn Scanner,
    ) -> Result<bool> {
        let mut prompt = Prompter { input, output };

        // Only an absent ledger starts empty; a malformed one is never overwritten
        let mut ledger = if fs::try_exists(&self.paths.ledger).await? {
            Ledger::load(&self.paths.ledger).await?
        } else {
            Ledger::empty(&self.paths.ledger)
        };
        let mut sources = Vec::new();

        prompt.say("")?;
        prompt.say("--- Interactive Setup ---")?;

        loop {
            let Some(url) = prompt.line("Enter YouTube playlist URL: ")? else {
                break;
            };
            if url.is_empty() {
                prompt.say("URL cannot be empty, skipping...")?;
                continue;
            }

            let translate = prompt.confirm("Enable automatic translation (y/n)? [y]: ", true)?;
            let download_existing =
                prompt.confirm("Download existing videos in this playlist (y/n)? [y]: ", true)?;

            if !download_existing {
                prompt.say("Skipping existing videos (scanning playlist)...")?;
                match scanner.scan(&url).await {
                    Ok(items) => {
                        for item in &items {
                            ledger.insert(&item.id);
                        }
                        prompt.say(&format!(
                            "Marked {} videos as already downloaded.",
                            items.len()
                        ))?;
                    }
                    Err(e) => {
                        warn!("Could not scan {} during setup: {}", url, e);
                        prompt.say(&format!(
                            "Warning: could not scan playlist to skip videos: {}",
                            e
                        ))?;
                    }
                }
            }

            sources.push(Source::new(url, translate));

            if !prompt.confirm("Add another playlist (y/n)? [n]: ", false)? {
                break;
            }
        }

        if sources.is_empty() {
            return Err(DubwatchError::Setup("no playlists configured".to_string()));
        }

        save_sources(&self.paths.sources, &sources).await?;
        ledger.save().await?;
        prompt.say(&format!("Configuration saved with {} playlist(s)", sources.len()))?;

        let start = prompt.confirm("Launch the service now (y/n)? [y]: ", true)?;
        prompt.say("-------------------------")?;
        prompt.say("")?;
        Ok(start)
    }
}

struct Prompter<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    fn say(&mut self, text: &str) -> Result<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    /// Trimmed answer, or None at end of input
    fn line(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{}", question)?;
        self.output.flush()?;

        let mut answer = String::new();
        if self.input.read_line(&mut answer)? == 0 {
            return Ok(None);
        }
        Ok(Some(answer.trim().to_string()))
    }

    /// Yes/no answer; anything unrecognised or end of input keeps the default
    fn confirm(&mut self, question: &str, default: bool) -> Result<bool> {
        let Some(answer) = self.line(question)? else {
            return Ok(default);
        };
        Ok(match answer.to_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        })
    }
}

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::error::{Result, DubwatchError};

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "dubwatch.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub state: StateConfig,
    pub schedule: ScheduleConfig,
    pub downloader: DownloaderConfig,
    pub translator: TranslatorConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Private directory holding the source list, ledger and downloader options
    pub dir: PathBuf,
    /// Directory with template files copied into `dir` on first run
    pub templates_dir: PathBuf,
    /// Source list file name inside `dir`
    pub sources_file: String,
    /// Ledger file name inside `dir`
    pub ledger_file: String,
    /// yt-dlp options file name inside `dir`, passed through untouched
    pub downloader_config_file: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Wait between two scan cycles (seconds)
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DownloaderConfig {
    /// Path to yt-dlp binary
    pub binary_path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TranslatorConfig {
    /// Path to vot-cli-live binary
    pub binary_path: String,
    /// Appended to the downloaded file name to form the translated audio name
    pub audio_suffix: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Volume of the original soundtrack under the translation
    pub original_volume: f64,
    /// Volume of the translated track
    pub translated_volume: f64,
    /// Codec for the mixed audio stream (video is always copied)
    pub audio_codec: String,
    /// Appended to the downloaded file name to form the muxed output name
    pub output_suffix: String,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".private"),
            templates_dir: PathBuf::from("templates"),
            sources_file: "config.json".to_string(),
            ledger_file: "downloaded.json".to_string(),
            downloader_config_file: "yt-dlp.conf".to_string(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

impl Default for DownloaderConfig {
    fn default() -> Self {
        Self {
            binary_path: "yt-dlp".to_string(),
        }
    }
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            binary_path: "vot-cli-live".to_string(),
            audio_suffix: ".mp3".to_string(),
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            original_volume: 0.2,
            translated_volume: 1.0,
            audio_codec: "aac".to_string(),
            output_suffix: ".[VOT-CLI-LIVE].mp4".to_string(),
        }
    }
}

impl StateConfig {
    pub fn sources_path(&self) -> PathBuf {
        self.dir.join(&self.sources_file)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join(&self.ledger_file)
    }

    pub fn downloader_config_path(&self) -> PathBuf {
        self.dir.join(&self.downloader_config_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.dir.join("log")
    }
}

impl ScheduleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DubwatchError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| DubwatchError::Config(format!("Failed to parse config file: {}", e)))
    }

    /// Load the explicit config file, else `dubwatch.toml` from the working
    /// directory, else the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schedule.interval_secs == 0 {
            return Err(DubwatchError::Config(
                "schedule.interval_secs must be greater than zero".to_string(),
            ));
        }

        for (name, binary) in [
            ("downloader.binary_path", &self.downloader.binary_path),
            ("translator.binary_path", &self.translator.binary_path),
            ("media.binary_path", &self.media.binary_path),
        ] {
            if binary.trim().is_empty() {
                return Err(DubwatchError::Config(format!("{} must not be empty", name)));
            }
        }

        for (name, volume) in [
            ("media.original_volume", self.media.original_volume),
            ("media.translated_volume", self.media.translated_volume),
        ] {
            if !volume.is_finite() || volume < 0.0 {
                return Err(DubwatchError::Config(format!(
                    "{} must be a non-negative number, got {}",
                    name, volume
                )));
            }
        }

        if self.translator.audio_suffix.is_empty() || self.media.output_suffix.is_empty() {
            return Err(DubwatchError::Config(
                "translator.audio_suffix and media.output_suffix must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [schedule]
            interval_secs = 300

            [media]
            original_volume = 0.1
            "#,
        )
        .unwrap();

        assert_eq!(config.schedule.interval(), Duration::from_secs(300));
        assert_eq!(config.media.original_volume, 0.1);
        assert_eq!(config.media.audio_codec, "aac");
        assert_eq!(config.downloader.binary_path, "yt-dlp");
        assert_eq!(config.state.ledger_path(), PathBuf::from(".private/downloaded.json"));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.schedule.interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.media.translated_volume = f64::NAN;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.translator.binary_path = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dubwatch.toml");
        std::fs::write(&path, "[state]\ndir = \"/var/lib/dubwatch\"\n").unwrap();

        let loaded = Config::load(Some(path.as_path())).unwrap();
        assert_eq!(loaded.state.dir, PathBuf::from("/var/lib/dubwatch"));
        assert_eq!(loaded.state.sources_path(), PathBuf::from("/var/lib/dubwatch/config.json"));
        assert_eq!(loaded.media.output_suffix, ".[VOT-CLI-LIVE].mp4");
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dubwatch.toml");
        std::fs::write(&path, "[schedule]\ninterval_secs = 0\n").unwrap();

        assert!(matches!(Config::load(Some(path.as_path())), Err(DubwatchError::Config(_))));
    }
}

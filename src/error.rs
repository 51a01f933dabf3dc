use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubwatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("State file error ({}): {message}", .path.display())]
    State { path: PathBuf, message: String },

    #[error("Required dependency not found: {tool} ('{binary}' is not on PATH, please install it)")]
    DependencyMissing { tool: String, binary: String },

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{description} failed ({})", exit_description(.code))]
    ProcessFailed {
        description: String,
        code: Option<i32>,
    },

    #[error("Playlist scan error: {0}")]
    Scan(String),

    #[error("Setup error: {0}")]
    Setup(String),
}

fn exit_description(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "terminated by signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, DubwatchError>;

/// Failure of one step of the per-item pipeline.
///
/// Every variant leaves the item unmarked so the next cycle retries it.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("download failed: {0}")]
    Download(#[source] DubwatchError),

    #[error("could not resolve downloaded filename: {0}")]
    ResolveFilename(#[source] DubwatchError),

    #[error("translation failed: {0}")]
    Translate(#[source] DubwatchError),

    #[error("translated audio file not found: {}", .0.display())]
    AudioMissing(PathBuf),

    #[error("muxing failed: {0}")]
    Mux(#[source] DubwatchError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failed_message() {
        let err = DubwatchError::ProcessFailed {
            description: "Audio muxing".to_string(),
            code: Some(1),
        };
        assert_eq!(err.to_string(), "Audio muxing failed (exit code 1)");

        let err = DubwatchError::ProcessFailed {
            description: "Video download".to_string(),
            code: None,
        };
        assert_eq!(err.to_string(), "Video download failed (terminated by signal)");
    }

    #[test]
    fn test_dependency_message_names_tool() {
        let err = DubwatchError::DependencyMissing {
            tool: "translator".to_string(),
            binary: "vot-cli-live".to_string(),
        };
        assert!(err.to_string().contains("vot-cli-live"));
    }
}

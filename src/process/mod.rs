// External process execution
//
// Every external tool (yt-dlp, vot-cli-live, ffmpeg) goes through a
// ProcessRunner so the tool wrappers can be exercised without the binaries:
// - Commands: argument builder shared by all tools
// - SystemRunner: tokio::process backed runner used by the daemon

pub mod commands;

use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

pub use commands::*;

use crate::error::{Result, DubwatchError};

/// Runs external commands to completion
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run with stdout/stderr forwarded to ours; succeed on exit code 0
    async fn run(&self, command: &ToolCommand) -> Result<()>;

    /// Run with stderr forwarded and stdout collected
    async fn capture(&self, command: &ToolCommand) -> Result<String>;
}

/// Runner spawning real child processes
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }

    fn build(command: &ToolCommand) -> Command {
        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args).stdin(Stdio::null());
        if let Some(dir) = &command.working_dir {
            cmd.current_dir(dir);
        }
        // Own process group, so a terminal Ctrl-C reaches only the daemon
        #[cfg(unix)]
        cmd.process_group(0);
        cmd
    }

    fn spawn_error(command: &ToolCommand, source: std::io::Error) -> DubwatchError {
        DubwatchError::Spawn {
            program: command.program.clone(),
            source,
        }
    }
}

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, command: &ToolCommand) -> Result<()> {
        debug!("Executing {}: {}", command.description, command);

        let status = Self::build(command)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;

        if !status.success() {
            return Err(DubwatchError::ProcessFailed {
                description: command.description.clone(),
                code: status.code(),
            });
        }

        Ok(())
    }

    async fn capture(&self, command: &ToolCommand) -> Result<String> {
        debug!("Executing {} (capturing output): {}", command.description, command);

        let output = Self::build(command)
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .output()
            .await
            .map_err(|e| Self::spawn_error(command, e))?;

        if !output.status.success() {
            return Err(DubwatchError::ProcessFailed {
                description: command.description.clone(),
                code: output.status.code(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// External tool that must be present before the daemon starts
#[derive(Debug, Clone, PartialEq)]
pub struct Dependency {
    pub tool: String,
    pub binary: String,
}

impl Dependency {
    pub fn new<S1: Into<String>, S2: Into<String>>(tool: S1, binary: S2) -> Self {
        Self {
            tool: tool.into(),
            binary: binary.into(),
        }
    }

    /// Locate the binary on PATH (or at the given path)
    pub fn resolve(&self) -> Result<PathBuf> {
        which::which(&self.binary).map_err(|_| DubwatchError::DependencyMissing {
            tool: self.tool.clone(),
            binary: self.binary.clone(),
        })
    }
}

/// Resolve every dependency, failing on the first missing one
pub fn check_dependencies(dependencies: &[Dependency]) -> Result<Vec<(Dependency, PathBuf)>> {
    let mut resolved = Vec::with_capacity(dependencies.len());
    for dependency in dependencies {
        let path = dependency.resolve()?;
        info!("Found {} at {}", dependency.tool, path.display());
        resolved.push((dependency.clone(), path));
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_dependency_is_named() {
        let deps = vec![Dependency::new("translator", "dubwatch-no-such-tool-4f1c")];
        match check_dependencies(&deps) {
            Err(DubwatchError::DependencyMissing { tool, binary }) => {
                assert_eq!(tool, "translator");
                assert_eq!(binary, "dubwatch-no-such-tool-4f1c");
            }
            other => panic!("expected DependencyMissing, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_reports_exit_code() {
        let runner = SystemRunner::new();

        runner
            .run(&ToolCommand::new("sh", "Succeeding shell").args(["-c", "exit 0"]))
            .await
            .unwrap();

        let err = runner
            .run(&ToolCommand::new("sh", "Failing shell").args(["-c", "exit 3"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DubwatchError::ProcessFailed { code: Some(3), .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_runner_captures_stdout_in_working_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "x").unwrap();

        let out = SystemRunner::new()
            .capture(&ToolCommand::new("ls", "Listing").current_dir(dir.path()))
            .await
            .unwrap();
        assert_eq!(out.trim(), "marker.txt");
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_system_runner_child_leads_its_own_process_group() {
        let stat = SystemRunner::new()
            .capture(&ToolCommand::new("sh", "Process group").args(["-c", "cat /proc/$$/stat"]))
            .await
            .unwrap();

        // pid (comm) state ppid pgrp ...
        let fields: Vec<&str> = stat.split_whitespace().collect();
        assert_eq!(fields[0], fields[4]);
    }

    #[tokio::test]
    async fn test_system_runner_spawn_error() {
        let err = SystemRunner::new()
            .run(&ToolCommand::new("dubwatch-no-such-tool-4f1c", "Missing tool"))
            .await
            .unwrap_err();
        assert!(matches!(err, DubwatchError::Spawn { .. }));
    }
}

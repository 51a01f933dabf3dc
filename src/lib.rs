//! Dubwatch - Playlist watcher with automatic voice-over translation
//!
//! Periodically scans playlists with yt-dlp, downloads new videos, fetches a
//! translated audio track with vot-cli-live and mixes it in with ffmpeg.

pub mod cli;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod scanner;
pub mod scheduler;
pub mod setup;
pub mod state;
pub mod tools;

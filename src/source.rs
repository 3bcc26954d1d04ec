use std::path::PathBuf;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use log::{debug, info};
use serde::Deserialize;
use tokio::process::Command;

use crate::config::SourceConfig;

pub const AUDIO_FILE_NAME: &str = "audio.mp3";

/// Where videos come from: metadata lookup and audio download.
#[async_trait]
pub trait VideoSource: Send + Sync {
    /// Playback length in seconds. The URL must already be validated.
    async fn duration_seconds(&self, url: &str) -> Result<u64>;

    /// Downloads the audio track to a fixed path and returns it. Every call
    /// overwrites the previous download, so callers must not overlap.
    async fn fetch_audio(&self, url: &str) -> Result<PathBuf>;
}

#[derive(Debug, Deserialize)]
struct VideoMetadata {
    duration: Option<f64>,
}

/// [`VideoSource`] backed by the `yt-dlp` executable.
pub struct YtDlp {
    config: SourceConfig,
}

impl YtDlp {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn audio_path(&self) -> PathBuf {
        self.config.data_dir.join(AUDIO_FILE_NAME)
    }

    async fn run(&self, args: &[&str]) -> Result<Vec<u8>> {
        debug!("{} {}", self.config.downloader, args.join(" "));

        let output = Command::new(&self.config.downloader)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.config.downloader))?;

        if !output.status.success() {
            return Err(anyhow!(
                "{} exited with {}: {}",
                self.config.downloader,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }

        Ok(output.stdout)
    }
}

pub fn parse_duration(metadata: &[u8]) -> Result<u64> {
    let meta: VideoMetadata =
        serde_json::from_slice(metadata).context("Failed to parse video metadata")?;
    let duration = meta
        .duration
        .ok_or_else(|| anyhow!("video metadata has no duration (live stream?)"))?;
    Ok(duration.round() as u64)
}

#[async_trait]
impl VideoSource for YtDlp {
    async fn duration_seconds(&self, url: &str) -> Result<u64> {
        let stdout = self
            .run(&["--dump-single-json", "--no-playlist", "--skip-download", url])
            .await?;
        parse_duration(&stdout)
    }

    async fn fetch_audio(&self, url: &str) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.config.data_dir)
            .await
            .with_context(|| format!("Failed to create {:?}", self.config.data_dir))?;

        let target = self.audio_path();
        let target_str = target
            .to_str()
            .ok_or_else(|| anyhow!("invalid path {:?}", target))?;

        self.run(&[
            "--no-playlist",
            "--format",
            "bestaudio",
            "--force-overwrites",
            "--quiet",
            "--output",
            target_str,
            url,
        ])
        .await?;

        info!("Downloaded audio of {} to {:?}", url, target);
        Ok(target)
    }
}

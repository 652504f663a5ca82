use std::io;
use std::path::Path;

use async_trait::async_trait;
use tokio::process::Command;

use crate::application::ports::{AudioExtractor, MediaServiceError, VideoRemuxer};

/// Extracts the audio track of a video container by shelling out to
/// ffmpeg. Output is 16 kHz mono 16-bit PCM WAV, the format the speech
/// services downstream expect.
pub struct FfmpegAudioExtractor {
    binary: String,
}

impl FfmpegAudioExtractor {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl AudioExtractor for FfmpegAudioExtractor {
    async fn extract_audio(&self, video: &[u8]) -> Result<Vec<u8>, MediaServiceError> {
        let workdir = scratch_dir()?;
        let input = workdir.path().join("input.mp4");
        let output = workdir.path().join("audio.wav");

        tokio::fs::write(&input, video)
            .await
            .map_err(|e| MediaServiceError::Transient(format!("scratch write: {}", e)))?;

        run_ffmpeg(
            &self.binary,
            &[
                "-y",
                "-i",
                path_str(&input)?,
                "-vn",
                "-acodec",
                "pcm_s16le",
                "-ar",
                "16000",
                "-ac",
                "1",
                path_str(&output)?,
            ],
        )
        .await?;

        tokio::fs::read(&output)
            .await
            .map_err(|e| MediaServiceError::Transient(format!("scratch read: {}", e)))
    }
}

/// Swaps the original audio track for the synthesized one, copying the
/// video stream untouched.
pub struct FfmpegVideoRemuxer {
    binary: String,
}

impl FfmpegVideoRemuxer {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl VideoRemuxer for FfmpegVideoRemuxer {
    async fn remux(&self, video: &[u8], audio: &[u8]) -> Result<Vec<u8>, MediaServiceError> {
        let workdir = scratch_dir()?;
        let video_in = workdir.path().join("video.mp4");
        let audio_in = workdir.path().join("audio.wav");
        let output = workdir.path().join("dubbed.mp4");

        tokio::fs::write(&video_in, video)
            .await
            .map_err(|e| MediaServiceError::Transient(format!("scratch write: {}", e)))?;
        tokio::fs::write(&audio_in, audio)
            .await
            .map_err(|e| MediaServiceError::Transient(format!("scratch write: {}", e)))?;

        run_ffmpeg(
            &self.binary,
            &[
                "-y",
                "-i",
                path_str(&video_in)?,
                "-i",
                path_str(&audio_in)?,
                "-map",
                "0:v:0",
                "-map",
                "1:a:0",
                "-c:v",
                "copy",
                "-shortest",
                path_str(&output)?,
            ],
        )
        .await?;

        tokio::fs::read(&output)
            .await
            .map_err(|e| MediaServiceError::Transient(format!("scratch read: {}", e)))
    }
}

fn scratch_dir() -> Result<tempfile::TempDir, MediaServiceError> {
    tempfile::tempdir().map_err(|e| MediaServiceError::Transient(format!("scratch dir: {}", e)))
}

fn path_str(path: &Path) -> Result<&str, MediaServiceError> {
    path.to_str()
        .ok_or_else(|| MediaServiceError::Permanent("non-UTF-8 scratch path".to_string()))
}

async fn run_ffmpeg(binary: &str, args: &[&str]) -> Result<(), MediaServiceError> {
    tracing::debug!(binary = %binary, ?args, "Running ffmpeg");

    let output = Command::new(binary)
        .args(args)
        .output()
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => {
                MediaServiceError::Permanent(format!("{} binary not found", binary))
            }
            _ => MediaServiceError::Transient(format!("failed to run {}: {}", binary, e)),
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        return Err(MediaServiceError::Permanent(format!(
            "{} exited with {}: {}",
            binary, output.status, tail
        )));
    }

    Ok(())
}

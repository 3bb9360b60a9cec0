//! External media binary glue.
//!
//! Shells out to ffmpeg for the two jobs this tool does not do itself:
//! transcoding audio the transcription endpoint will not accept, and
//! capturing a recording from the default input device. The binary is found
//! through FFMPEG_PATH, falling back to `ffmpeg` on PATH.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("ffmpeg failed: {0}")]
    Ffmpeg(String),

    #[error("Capture produced no audio at {0}")]
    EmptyCapture(String),
}

fn ffmpeg_path() -> String {
    std::env::var("FFMPEG_PATH").unwrap_or_else(|_| "ffmpeg".to_string())
}

/// Transcode an audio file to 16 kHz mono WAV and return the bytes.
pub async fn transcode_to_wav(input: &Path) -> Result<Vec<u8>, MediaError> {
    let temp = tempfile::tempdir()?;
    let out = temp.path().join("converted.wav");

    let output = Command::new(ffmpeg_path())
        .arg("-y")
        .arg("-i")
        .arg(input)
        .args(["-ar", "16000", "-ac", "1"])
        .arg(&out)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::Ffmpeg(stderr.trim().to_string()));
    }

    Ok(tokio::fs::read(&out).await?)
}

/// Arguments selecting the platform's default capture device.
fn capture_args() -> &'static [&'static str] {
    #[cfg(target_os = "macos")]
    {
        &["-f", "avfoundation", "-i", ":0"]
    }
    #[cfg(target_os = "linux")]
    {
        &["-f", "alsa", "-i", "default"]
    }
    #[cfg(not(any(target_os = "macos", target_os = "linux")))]
    {
        &["-f", "dshow", "-i", "audio=default"]
    }
}

/// Record from the default input device into `out_path` until Ctrl-C.
pub async fn record(out_path: &Path) -> Result<(), MediaError> {
    let mut child = Command::new(ffmpeg_path())
        .arg("-y")
        .args(capture_args())
        .arg(out_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()?;

    tokio::signal::ctrl_c().await?;

    // Ask ffmpeg to finalize the container; fall back to kill
    if let Some(mut stdin) = child.stdin.take() {
        let _ = stdin.write_all(b"q").await;
    }
    if tokio::time::timeout(Duration::from_secs(5), child.wait())
        .await
        .is_err()
    {
        child.kill().await?;
    }

    // Exit status after an interactive stop is unreliable; the file decides
    let size = tokio::fs::metadata(out_path).await.map(|m| m.len());
    match size {
        Ok(len) if len > 0 => Ok(()),
        _ => Err(MediaError::EmptyCapture(out_path.display().to_string())),
    }
}

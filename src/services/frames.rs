use std::path::PathBuf;

use image::ImageFormat;
use tokio::process::Command;

/// Sample still frames from an uploaded routine video.
///
/// The input is normalized to mp4 (arbitrary container/codec accepted,
/// truncated to `max_seconds`), then sampled at `fps` frames per second.
/// Returns at most `max_frames` JPEG buffers in temporal order. All
/// intermediate artifacts live in a scoped temporary directory that is
/// removed on every exit path, including failures.
pub async fn extract(
    video: &[u8],
    fps: u32,
    max_frames: usize,
    max_seconds: u32,
) -> Result<Vec<Vec<u8>>, ExtractionError> {
    let tmp = tempfile::Builder::new()
        .prefix("drill_")
        .tempdir()
        .map_err(ExtractionError::Io)?;

    let input_path = tmp.path().join("input_video");
    tokio::fs::write(&input_path, video)
        .await
        .map_err(ExtractionError::Io)?;

    // Pass 1: re-encode whatever we were given into a bounded mp4.
    let mp4_path = tmp.path().join("normalized.mp4");
    let mut normalize = Command::new("ffmpeg");
    normalize
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(&input_path)
        .arg("-t")
        .arg(max_seconds.to_string())
        .arg("-movflags")
        .arg("faststart")
        .arg("-pix_fmt")
        .arg("yuv420p")
        .arg(&mp4_path);
    run_ffmpeg("normalize", &mut normalize).await?;

    // Pass 2: sample JPEG frames from the normalized video.
    let frames_dir = tmp.path().join("frames");
    tokio::fs::create_dir_all(&frames_dir)
        .await
        .map_err(ExtractionError::Io)?;

    let mut sample = Command::new("ffmpeg");
    sample
        .arg("-hide_banner")
        .arg("-loglevel")
        .arg("error")
        .arg("-i")
        .arg(&mp4_path)
        .arg("-vf")
        .arg(format!("fps={fps}"))
        .arg("-q:v")
        .arg("3")
        .arg(frames_dir.join("frame_%05d.jpg"));
    run_ffmpeg("sample", &mut sample).await?;

    // frame_%05d names sort lexicographically in temporal order.
    let mut paths: Vec<PathBuf> = Vec::new();
    let mut entries = tokio::fs::read_dir(&frames_dir)
        .await
        .map_err(ExtractionError::Io)?;
    while let Some(entry) = entries.next_entry().await.map_err(ExtractionError::Io)? {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("jpg") {
            paths.push(path);
        }
    }
    paths.sort();
    paths.truncate(max_frames);

    let mut frames = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(&path).await.map_err(ExtractionError::Io)?;
        if !matches!(image::guess_format(&bytes), Ok(ImageFormat::Jpeg)) {
            return Err(ExtractionError::BadFrame(
                path.file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("<unnamed>")
                    .to_string(),
            ));
        }
        frames.push(bytes);
    }

    if frames.is_empty() {
        return Err(ExtractionError::NoFrames);
    }

    Ok(frames)
}

async fn run_ffmpeg(stage: &'static str, cmd: &mut Command) -> Result<(), ExtractionError> {
    let output = cmd.output().await.map_err(ExtractionError::Spawn)?;
    if !output.status.success() {
        return Err(ExtractionError::Ffmpeg {
            stage,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("failed to spawn ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("ffmpeg {stage} step failed: {stderr}")]
    Ffmpeg {
        stage: &'static str,
        stderr: String,
    },

    #[error("frame extraction produced no frames")]
    NoFrames,

    #[error("sampled frame {0} is not a valid JPEG")]
    BadFrame(String),

    #[error("temporary storage error: {0}")]
    Io(#[source] std::io::Error),
}

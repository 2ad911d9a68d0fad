//! Clip to GIF encoding.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::config::GifSettings;
use crate::models::Clip;

/// Errors from GIF encoding.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("Source video not found: {0}")]
    NotFound(PathBuf),

    #[error("{0} binary not found on PATH")]
    ToolMissing(String),

    #[error("{tool} failed with exit code {exit_code}: {message}")]
    CommandFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    #[error("No frames extracted for clip {start:.2}s-{end:.2}s")]
    NoFrames { start: f64, end: f64 },

    #[error("Expected GIF was not created: {0}")]
    MissingOutput(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encoder panicked: {0}")]
    Panicked(String),
}

/// One GIF to produce.
#[derive(Debug, Clone)]
pub struct GifRequest {
    pub source: PathBuf,
    pub clip: Clip,
    pub output: PathBuf,
    pub fps: u32,
    pub width: Option<u32>,
    pub quality: u8,
}

impl GifRequest {
    pub fn new(source: impl Into<PathBuf>, clip: Clip, output: impl Into<PathBuf>, gif: &GifSettings) -> Self {
        Self {
            source: source.into(),
            clip,
            output: output.into(),
            fps: gif.fps.max(1),
            width: gif.width,
            quality: gif.quality.clamp(1, 100),
        }
    }
}

/// Turns a clip of a video into a GIF file. Single attempt, no retries.
pub trait GifEncoder: Send + Sync {
    fn encode(&self, request: &GifRequest) -> Result<PathBuf, EncodeError>;
}

/// Extracts PNG frames with ffmpeg into a temp dir and assembles them with
/// `gifski`.
#[derive(Debug, Clone)]
pub struct GifskiEncoder {
    ffmpeg: PathBuf,
    gifski: PathBuf,
}

impl GifskiEncoder {
    pub fn new() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            gifski: PathBuf::from("gifski"),
        }
    }

    pub fn with_binaries(ffmpeg: impl Into<PathBuf>, gifski: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            gifski: gifski.into(),
        }
    }

    fn extract_args(request: &GifRequest, pattern: &Path) -> Vec<String> {
        vec![
            "-v".to_string(),
            "error".to_string(),
            "-nostdin".to_string(),
            "-y".to_string(),
            "-ss".to_string(),
            format!("{:.3}", request.clip.start),
            "-to".to_string(),
            format!("{:.3}", request.clip.end),
            "-i".to_string(),
            request.source.to_string_lossy().to_string(),
            "-vf".to_string(),
            format!("fps={}", request.fps),
            "-pix_fmt".to_string(),
            "rgb24".to_string(),
            "-start_number".to_string(),
            "0".to_string(),
            pattern.to_string_lossy().to_string(),
        ]
    }

    fn gifski_args(request: &GifRequest, frames: &[PathBuf]) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            request.output.to_string_lossy().to_string(),
            "--fps".to_string(),
            request.fps.to_string(),
            "--quality".to_string(),
            request.quality.to_string(),
        ];
        if let Some(width) = request.width {
            args.push("--width".to_string());
            args.push(width.to_string());
        }
        args.extend(frames.iter().map(|f| f.to_string_lossy().to_string()));
        args
    }

    fn run(tool: &Path, args: &[String]) -> Result<(), EncodeError> {
        let name = tool.display().to_string();
        tracing::debug!("[GifEncoder] $ {} {}", name, args.join(" "));
        let output = Command::new(tool).args(args).output().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                EncodeError::ToolMissing(name.clone())
            } else {
                EncodeError::Io(e)
            }
        })?;
        if !output.status.success() {
            return Err(EncodeError::CommandFailed {
                tool: name,
                exit_code: output.status.code().unwrap_or(-1),
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

impl Default for GifskiEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl GifEncoder for GifskiEncoder {
    fn encode(&self, request: &GifRequest) -> Result<PathBuf, EncodeError> {
        if !request.source.exists() {
            return Err(EncodeError::NotFound(request.source.clone()));
        }
        if let Some(parent) = request.output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let frames_dir = tempfile::Builder::new().prefix("vidoc-gif-").tempdir()?;
        let pattern = frames_dir.path().join("frame%04d.png");
        Self::run(&self.ffmpeg, &Self::extract_args(request, &pattern))?;

        let mut frames: Vec<PathBuf> = std::fs::read_dir(frames_dir.path())?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().is_some_and(|e| e == "png"))
            .collect();
        frames.sort();
        if frames.is_empty() {
            return Err(EncodeError::NoFrames {
                start: request.clip.start,
                end: request.clip.end,
            });
        }

        Self::run(&self.gifski, &Self::gifski_args(request, &frames))?;
        if !request.output.exists() {
            return Err(EncodeError::MissingOutput(request.output.clone()));
        }
        tracing::debug!(
            "[GifEncoder] {} frames -> {}",
            frames.len(),
            request.output.display()
        );
        Ok(request.output.clone())
    }
}

/// Relative name of the GIF for a timeline item (1-based): `gifs/clip_001.gif`.
pub fn gif_relative_path(item_index: usize) -> PathBuf {
    PathBuf::from("gifs").join(format!("clip_{:03}.gif", item_index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(width: Option<u32>) -> GifRequest {
        let settings = GifSettings {
            fps: 12,
            width,
            quality: 150,
        };
        GifRequest::new(
            "/videos/in.mp4",
            Clip::from_start(4.0, 3.0, true),
            "/out/gifs/clip_001.gif",
            &settings,
        )
    }

    #[test]
    fn request_clamps_quality() {
        assert_eq!(request(None).quality, 100);
    }

    #[test]
    fn ffmpeg_args_cover_clip() {
        let args = GifskiEncoder::extract_args(&request(None), Path::new("/tmp/f/frame%04d.png"));
        let joined = args.join(" ");
        assert!(joined.contains("-ss 4.000 -to 7.000 -i /videos/in.mp4"));
        assert!(joined.contains("-vf fps=12"));
        assert_eq!(args.last().map(String::as_str), Some("/tmp/f/frame%04d.png"));
    }

    #[test]
    fn gifski_args_include_width_only_when_set() {
        let frames = vec![PathBuf::from("a.png"), PathBuf::from("b.png")];
        let without = GifskiEncoder::gifski_args(&request(None), &frames);
        assert!(!without.contains(&"--width".to_string()));

        let with = GifskiEncoder::gifski_args(&request(Some(320)), &frames);
        let pos = with.iter().position(|a| a == "--width").unwrap();
        assert_eq!(with[pos + 1], "320");
        assert_eq!(&with[with.len() - 2..], &["a.png", "b.png"]);
    }

    #[test]
    fn missing_source_fails_before_running_tools() {
        let encoder = GifskiEncoder::with_binaries("/nonexistent/ffmpeg", "/nonexistent/gifski");
        assert!(matches!(
            encoder.encode(&request(None)),
            Err(EncodeError::NotFound(_))
        ));
    }

    #[test]
    fn relative_names_are_one_based() {
        assert_eq!(gif_relative_path(0), PathBuf::from("gifs/clip_001.gif"));
        assert_eq!(gif_relative_path(11), PathBuf::from("gifs/clip_012.gif"));
    }
}

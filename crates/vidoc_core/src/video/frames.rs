//! Streaming grayscale frame decoding through ffmpeg.
//!
//! ffmpeg scales every frame to a fixed analysis size and writes raw 8-bit
//! luma to a pipe. [`FrameStream`] reads one frame at a time so a whole video
//! is never held in memory.

use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use image::GrayImage;
use thiserror::Error;

/// Errors from frame decoding.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to start ffmpeg: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to read frame data: {0}")]
    Read(#[source] std::io::Error),

    #[error("Invalid analysis size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Parameters for one decode run.
#[derive(Debug, Clone)]
pub struct FrameRequest {
    pub source: PathBuf,
    pub width: u32,
    pub height: u32,
    /// Resample to this rate; the native rate is kept when unset.
    pub fps: Option<f64>,
    /// Seek position in seconds.
    pub start: Option<f64>,
    /// Decode at most this many seconds.
    pub duration: Option<f64>,
}

impl FrameRequest {
    pub fn new(source: impl Into<PathBuf>, width: u32, height: u32) -> Self {
        Self {
            source: source.into(),
            width,
            height,
            fps: None,
            start: None,
            duration: None,
        }
    }

    pub fn fps(mut self, fps: f64) -> Self {
        self.fps = Some(fps);
        self
    }

    /// Restrict decoding to `[start, end)`.
    pub fn window(mut self, start: f64, end: f64) -> Self {
        self.start = Some(start.max(0.0));
        self.duration = Some((end - start.max(0.0)).max(0.0));
        self
    }

    /// ffmpeg arguments for this request.
    pub fn ffmpeg_args(&self) -> Vec<String> {
        let mut args: Vec<String> = vec!["-v".into(), "error".into(), "-nostdin".into()];
        if let Some(start) = self.start {
            args.push("-ss".into());
            args.push(format!("{:.3}", start));
        }
        args.push("-i".into());
        args.push(self.source.to_string_lossy().to_string());
        if let Some(duration) = self.duration {
            args.push("-t".into());
            args.push(format!("{:.3}", duration));
        }

        let mut filters = Vec::new();
        if let Some(fps) = self.fps {
            filters.push(format!("fps={}", fps));
        }
        filters.push(format!("scale={}:{}", self.width, self.height));
        filters.push("format=gray".to_string());

        args.extend([
            "-an".to_string(),
            "-vf".to_string(),
            filters.join(","),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            "gray".to_string(),
            "pipe:1".to_string(),
        ]);
        args
    }
}

/// Iterator over decoded frames.
///
/// A trailing partial frame ends the stream. The ffmpeg child is killed if
/// the stream is dropped early.
pub struct FrameStream {
    child: Option<Child>,
    reader: BufReader<ChildStdout>,
    width: u32,
    height: u32,
    finished: bool,
}

impl FrameStream {
    /// Spawn ffmpeg for the request.
    pub fn open(request: &FrameRequest) -> Result<Self, DecodeError> {
        if !request.source.exists() {
            return Err(DecodeError::NotFound(request.source.clone()));
        }
        if request.width == 0 || request.height == 0 {
            return Err(DecodeError::InvalidSize {
                width: request.width,
                height: request.height,
            });
        }

        let args = request.ffmpeg_args();
        tracing::debug!("[Frames] $ ffmpeg {}", args.join(" "));

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(DecodeError::Spawn)?;

        let stdout = child.stdout.take().ok_or_else(|| {
            DecodeError::Spawn(std::io::Error::new(
                ErrorKind::BrokenPipe,
                "ffmpeg stdout not captured",
            ))
        })?;

        Ok(Self {
            child: Some(child),
            reader: BufReader::new(stdout),
            width: request.width,
            height: request.height,
            finished: false,
        })
    }

    fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize
    }

    fn finish(&mut self) {
        self.finished = true;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Iterator for FrameStream {
    type Item = Result<GrayImage, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        let mut buf = vec![0u8; self.frame_len()];
        match self.reader.read_exact(&mut buf) {
            Ok(()) => GrayImage::from_raw(self.width, self.height, buf).map(Ok),
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                self.finish();
                None
            }
            Err(e) => {
                self.finish();
                Some(Err(DecodeError::Read(e)))
            }
        }
    }
}

impl Drop for FrameStream {
    fn drop(&mut self) {
        self.finish();
    }
}

/// Whether an executable answers `-version`.
pub fn tool_available(tool: &str) -> bool {
    Command::new(tool)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Decode a single frame at `time` seconds at the given size.
pub fn frame_at(source: &Path, time: f64, width: u32, height: u32) -> Result<Option<GrayImage>, DecodeError> {
    let mut request = FrameRequest::new(source, width, height);
    request.start = Some(time.max(0.0));
    let mut stream = FrameStream::open(&request)?;
    stream.next().transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_cover_window_rate_and_size() {
        let args = FrameRequest::new("/v/in.mp4", 160, 90)
            .fps(2.0)
            .window(4.0, 9.5)
            .ffmpeg_args();
        let joined = args.join(" ");
        assert!(joined.contains("-ss 4.000 -i /v/in.mp4 -t 5.500"));
        assert!(joined.contains("-vf fps=2,scale=160:90,format=gray"));
        assert!(joined.ends_with("-f rawvideo -pix_fmt gray pipe:1"));
    }

    #[test]
    fn window_clamps_negative_start() {
        let request = FrameRequest::new("x.mp4", 8, 8).window(-1.0, 2.0);
        assert_eq!(request.start, Some(0.0));
        assert_eq!(request.duration, Some(2.0));
    }

    #[test]
    fn open_missing_source_fails() {
        let request = FrameRequest::new("/nope/missing.mp4", 8, 8);
        assert!(matches!(
            FrameStream::open(&request),
            Err(DecodeError::NotFound(_))
        ));
    }
}

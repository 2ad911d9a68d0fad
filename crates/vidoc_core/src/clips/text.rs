//! On-screen text presence.

use std::path::PathBuf;
use std::process::Command;

use image::GrayImage;
use thiserror::Error;

/// Errors from text detection.
#[derive(Error, Debug)]
pub enum TextDetectionError {
    #[error("Text detector is not available")]
    Unavailable,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode frame: {0}")]
    Image(#[from] image::ImageError),

    #[error("{tool} failed with exit code {exit_code}")]
    CommandFailed { tool: String, exit_code: i32 },
}

/// Decides whether a frame shows readable text.
pub trait TextDetector: Send + Sync {
    fn is_available(&self) -> bool;

    fn detect(&self, frame: &GrayImage) -> Result<bool, TextDetectionError>;
}

/// Detector used when OCR is disabled; always unavailable.
#[derive(Debug, Clone, Default)]
pub struct NoTextDetector;

impl TextDetector for NoTextDetector {
    fn is_available(&self) -> bool {
        false
    }

    fn detect(&self, _frame: &GrayImage) -> Result<bool, TextDetectionError> {
        Err(TextDetectionError::Unavailable)
    }
}

/// Text with more than this many non-space characters counts as present.
const MIN_TEXT_CHARS: usize = 2;

/// Runs the `tesseract` binary on a temporary PNG.
#[derive(Debug, Clone)]
pub struct TesseractDetector {
    binary: PathBuf,
    available: bool,
}

impl TesseractDetector {
    /// Probe for `tesseract` on `PATH`.
    pub fn new() -> Self {
        Self::with_binary("tesseract")
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        let binary = binary.into();
        let available = Command::new(&binary)
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false);
        if !available {
            tracing::debug!("[TextDetector] {} not found", binary.display());
        }
        Self { binary, available }
    }
}

impl Default for TesseractDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl TextDetector for TesseractDetector {
    fn is_available(&self) -> bool {
        self.available
    }

    fn detect(&self, frame: &GrayImage) -> Result<bool, TextDetectionError> {
        if !self.available {
            return Err(TextDetectionError::Unavailable);
        }

        let file = tempfile::Builder::new()
            .prefix("vidoc-ocr-")
            .suffix(".png")
            .tempfile()?;
        frame.save_with_format(file.path(), image::ImageFormat::Png)?;

        let output = Command::new(&self.binary)
            .arg(file.path())
            .arg("stdout")
            .output()?;
        if !output.status.success() {
            return Err(TextDetectionError::CommandFailed {
                tool: self.binary.display().to_string(),
                exit_code: output.status.code().unwrap_or(-1),
            });
        }

        Ok(has_text(&String::from_utf8_lossy(&output.stdout)))
    }
}

/// Whether OCR output holds more than a couple of characters.
pub fn has_text(ocr_output: &str) -> bool {
    ocr_output.chars().filter(|c| !c.is_whitespace()).count() > MIN_TEXT_CHARS
}

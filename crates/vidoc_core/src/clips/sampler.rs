//! Low-rate frame sampling over a short window.

use std::path::{Path, PathBuf};

use image::GrayImage;
use thiserror::Error;

use super::window::sample_times;
use crate::video::{DecodeError, FrameRequest, FrameStream};

/// Errors from frame sampling.
#[derive(Error, Debug)]
pub enum SamplingError {
    #[error("Source video not found: {0}")]
    NotFound(PathBuf),

    #[error("Frame decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("No frames sampled between {start:.3}s and {end:.3}s")]
    NoFrames { start: f64, end: f64 },
}

/// A decoded frame and its timestamp in seconds.
#[derive(Debug, Clone)]
pub struct SampledFrame {
    pub time: f64,
    pub frame: GrayImage,
}

/// Samples luma frames at `rate` Hz across `[start, end]`.
pub trait FrameSampler: Send + Sync {
    fn sample(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        rate: f64,
    ) -> Result<Vec<SampledFrame>, SamplingError>;
}

/// Samples through an ffmpeg `fps` filter.
#[derive(Debug, Clone)]
pub struct FfmpegSampler {
    width: u32,
    height: u32,
}

impl Default for FfmpegSampler {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
        }
    }
}

impl FfmpegSampler {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl FrameSampler for FfmpegSampler {
    fn sample(
        &self,
        source: &Path,
        start: f64,
        end: f64,
        rate: f64,
    ) -> Result<Vec<SampledFrame>, SamplingError> {
        if !source.exists() {
            return Err(SamplingError::NotFound(source.to_path_buf()));
        }

        let times = sample_times(start, end, rate);
        // Extend the decode slightly so a sample landing exactly on `end`
        // is produced.
        let request = FrameRequest::new(source, self.width, self.height)
            .fps(rate)
            .window(start, end + 0.5 / rate.max(f64::EPSILON));

        let stream = FrameStream::open(&request)?;
        let mut samples = Vec::with_capacity(times.len());
        for (time, frame) in times.into_iter().zip(stream) {
            samples.push(SampledFrame {
                time,
                frame: frame?,
            });
        }

        if samples.is_empty() {
            return Err(SamplingError::NoFrames { start, end });
        }
        Ok(samples)
    }
}

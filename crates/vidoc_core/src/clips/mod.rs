//! Illustrative clip selection.
//!
//! Every timeline item gets exactly one clip of the configured length. The
//! deterministic placement in [`window`] is refined by scoring sampled frames
//! for motion and, optionally, on-screen text.

pub mod sampler;
pub mod selector;
pub mod text;
pub mod window;

pub use sampler::{FfmpegSampler, FrameSampler, SampledFrame, SamplingError};
pub use selector::{ClipSelector, RefineError, Selection};
pub use text::{NoTextDetector, TesseractDetector, TextDetectionError, TextDetector};
pub use window::{fallback_clip, target_length};

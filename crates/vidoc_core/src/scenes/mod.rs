//! Scene-boundary segmentation.
//!
//! - [`detector`]: splits decoded frames into contiguous scenes.
//! - [`assembler`]: turns cut times into sub-clip files.
//! - [`trimmer`]: lossless single-range extraction.
//! - [`batch`]: segments every video in a directory.
//! - [`keyframes`]: one sharp still per scene.

pub mod assembler;
pub mod batch;
pub mod detector;
pub mod keyframes;
pub mod trimmer;

pub use assembler::{auto_segment, plan_segments, Segment, SegmentAssembler, SegmentPlan};
pub use batch::{discover_videos, segment_directory, summarize, BatchSummary, FileOutcome};
pub use detector::{SceneDetector, SceneList};
pub use keyframes::KeyframeExtractor;
pub use trimmer::{check_range, trim, Cutter, FfmpegCutter, SegmentError};

//! ffmpeg/ffprobe access and frame measurements shared by the scene, clip
//! and validation stages.

pub mod frames;
pub mod metrics;
pub mod probe;

pub use frames::{frame_at, tool_available, DecodeError, FrameRequest, FrameStream};
pub use metrics::{laplacian_variance, mean_abs_diff, LumaHistogram};
pub use probe::{parse_probe_json, probe, probe_duration, MediaInfo, ProbeError};

//! One sharp still per scene.

use std::path::{Path, PathBuf};
use std::process::Command;

use super::detector::SceneList;
use crate::video::{self, laplacian_variance, DecodeError};

/// Frames whose Laplacian variance is below this are treated as blurry.
pub const DEFAULT_BLUR_THRESHOLD: f64 = 120.0;

/// Picks the middle frame of each scene unless it is blurry.
#[derive(Debug, Clone)]
pub struct KeyframeExtractor {
    blur_threshold: f64,
}

impl Default for KeyframeExtractor {
    fn default() -> Self {
        Self::new(DEFAULT_BLUR_THRESHOLD)
    }
}

impl KeyframeExtractor {
    pub fn new(blur_threshold: f64) -> Self {
        Self { blur_threshold }
    }

    /// Write `scene_NNN.jpg` into `out_dir` for every scene with a sharp
    /// middle frame. Returns the written paths.
    pub fn extract(
        &self,
        source: &Path,
        scenes: &SceneList,
        out_dir: &Path,
    ) -> Result<Vec<PathBuf>, DecodeError> {
        if !source.exists() {
            return Err(DecodeError::NotFound(source.to_path_buf()));
        }
        std::fs::create_dir_all(out_dir).map_err(DecodeError::Read)?;

        let info = video::probe(source).ok();
        let (width, height) = info
            .as_ref()
            .and_then(|i| Some((i.width?, i.height?)))
            .unwrap_or((640, 360));

        let mut written = Vec::new();
        for (idx, scene) in scenes.scenes.iter().enumerate() {
            let time = scene.middle_frame() as f64 / scenes.fps;
            let Some(frame) = video::frame_at(source, time, width, height)? else {
                tracing::debug!("[Keyframes] No frame at {:.3}s", time);
                continue;
            };

            let sharpness = laplacian_variance(&frame);
            if sharpness < self.blur_threshold {
                tracing::debug!(
                    "[Keyframes] Scene {} too blurry ({:.1} < {:.1})",
                    idx + 1,
                    sharpness,
                    self.blur_threshold
                );
                continue;
            }

            let dest = out_dir.join(format!("scene_{:03}.jpg", idx + 1));
            if write_still(source, time, &dest) {
                written.push(dest);
            } else {
                tracing::warn!("[Keyframes] Failed to write {}", dest.display());
            }
        }

        tracing::info!(
            "[Keyframes] Saved {}/{} keyframe(s) to {}",
            written.len(),
            scenes.scenes.len(),
            out_dir.display()
        );
        Ok(written)
    }
}

/// Save the full-colour frame at `time` as JPEG.
fn write_still(source: &Path, time: f64, dest: &Path) -> bool {
    Command::new("ffmpeg")
        .args(["-v", "error", "-nostdin", "-y", "-ss"])
        .arg(format!("{:.3}", time))
        .arg("-i")
        .arg(source)
        .args(["-frames:v", "1", "-q:v", "2"])
        .arg(dest)
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

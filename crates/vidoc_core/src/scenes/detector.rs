//! Histogram-based scene segmentation.

use std::path::Path;

use image::GrayImage;

use crate::config::SceneSettings;
use crate::models::Scene;
use crate::video::{self, FrameRequest, FrameStream, LumaHistogram};

/// Frame rate assumed when the source does not report one.
pub const FALLBACK_FPS: f64 = 25.0;

/// Scenes of one video together with the rate used to time them.
#[derive(Debug, Clone, PartialEq)]
pub struct SceneList {
    pub scenes: Vec<Scene>,
    pub fps: f64,
}

impl SceneList {
    /// Start times of every scene after the first, in seconds.
    pub fn cut_times(&self) -> Vec<f64> {
        self.scenes
            .iter()
            .skip(1)
            .map(|s| s.start_time(self.fps))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

/// Splits a frame sequence where consecutive luma histograms diverge.
#[derive(Debug, Clone)]
pub struct SceneDetector {
    threshold: f64,
    analysis_width: u32,
    analysis_height: u32,
}

impl SceneDetector {
    /// Create a detector. A threshold outside `(0, 1]` is clamped into range.
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: clamp_threshold(threshold),
            analysis_width: 160,
            analysis_height: 90,
        }
    }

    pub fn from_settings(settings: &SceneSettings) -> Self {
        Self::new(settings.threshold)
            .with_analysis_size(settings.analysis_width, settings.analysis_height)
    }

    pub fn with_analysis_size(mut self, width: u32, height: u32) -> Self {
        self.analysis_width = width.max(1);
        self.analysis_height = height.max(1);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Partition a frame sequence into contiguous scenes.
    ///
    /// A new scene opens at frame `i` when the distance between the
    /// histograms of frames `i - 1` and `i` exceeds the threshold. An empty
    /// sequence yields the single scene `{0, 0}`.
    pub fn segment_frames<I>(&self, frames: I) -> Vec<Scene>
    where
        I: IntoIterator<Item = GrayImage>,
    {
        let mut scenes = Vec::new();
        let mut previous: Option<LumaHistogram> = None;
        let mut scene_start = 0u64;
        let mut index = 0u64;

        for frame in frames {
            let histogram = LumaHistogram::of(&frame);
            if let Some(prev) = &previous {
                let distance = prev.bhattacharyya(&histogram);
                if distance > self.threshold {
                    tracing::trace!(
                        "[SceneDetector] cut at frame {} (d={:.3})",
                        index,
                        distance
                    );
                    scenes.push(Scene::new(scene_start, index - 1));
                    scene_start = index;
                }
            }
            previous = Some(histogram);
            index += 1;
        }

        let last_frame = index.saturating_sub(1);
        scenes.push(Scene::new(scene_start, last_frame));
        scenes
    }

    /// Decode a video and segment it.
    ///
    /// A missing or unreadable source gives an empty list; this never fails.
    pub fn detect(&self, path: &Path) -> SceneList {
        let empty = |fps| SceneList {
            scenes: Vec::new(),
            fps,
        };

        if !path.exists() {
            tracing::debug!("[SceneDetector] Input not found: {}", path.display());
            return empty(FALLBACK_FPS);
        }

        let info = match video::probe(path) {
            Ok(info) if info.has_video => info,
            Ok(_) => {
                tracing::warn!("[SceneDetector] No video stream in {}", path.display());
                return empty(FALLBACK_FPS);
            }
            Err(e) => {
                tracing::warn!("[SceneDetector] Cannot read {}: {}", path.display(), e);
                return empty(FALLBACK_FPS);
            }
        };
        let fps = info.fps.unwrap_or(FALLBACK_FPS);

        let request = FrameRequest::new(path, self.analysis_width, self.analysis_height);
        let stream = match FrameStream::open(&request) {
            Ok(stream) => stream,
            Err(e) => {
                tracing::warn!("[SceneDetector] Cannot decode {}: {}", path.display(), e);
                return empty(fps);
            }
        };

        let frames = stream.map_while(|frame| match frame {
            Ok(frame) => Some(frame),
            Err(e) => {
                tracing::warn!("[SceneDetector] Decoding stopped early: {}", e);
                None
            }
        });

        let scenes = self.segment_frames(frames);
        tracing::info!(
            "[SceneDetector] {} scene(s) in {} (threshold {:.2})",
            scenes.len(),
            path.display(),
            self.threshold
        );
        SceneList { scenes, fps }
    }
}

impl Default for SceneDetector {
    fn default() -> Self {
        Self::from_settings(&SceneSettings::default())
    }
}

fn clamp_threshold(threshold: f64) -> f64 {
    if threshold.is_finite() && threshold > 0.0 && threshold <= 1.0 {
        return threshold;
    }
    let clamped = if threshold.is_nan() || threshold <= 0.0 {
        f64::EPSILON
    } else {
        1.0
    };
    tracing::warn!(
        "[SceneDetector] Threshold {} outside (0, 1], using {}",
        threshold,
        clamped
    );
    clamped
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn flat(value: u8) -> GrayImage {
        GrayImage::from_pixel(8, 8, Luma([value]))
    }

    fn frames(values: &[u8]) -> Vec<GrayImage> {
        values.iter().map(|v| flat(*v)).collect()
    }

    #[test]
    fn constant_video_is_one_scene() {
        let scenes = SceneDetector::new(0.3).segment_frames(frames(&[50; 12]));
        assert_eq!(scenes, vec![Scene::new(0, 11)]);
    }

    #[test]
    fn cuts_open_scene_at_changed_frame() {
        let scenes =
            SceneDetector::new(0.3).segment_frames(frames(&[10, 10, 10, 200, 200, 90, 90, 90]));
        assert_eq!(
            scenes,
            vec![Scene::new(0, 2), Scene::new(3, 4), Scene::new(5, 7)]
        );
    }

    #[test]
    fn scenes_are_contiguous_and_cover_all_frames() {
        let values: Vec<u8> = (0..40).map(|i| if (i / 7) % 2 == 0 { 20 } else { 220 }).collect();
        let scenes = SceneDetector::new(0.5).segment_frames(frames(&values));
        assert_eq!(scenes.first().map(|s| s.start_frame), Some(0));
        assert_eq!(scenes.last().map(|s| s.end_frame), Some(39));
        for pair in scenes.windows(2) {
            assert_eq!(pair[0].end_frame + 1, pair[1].start_frame);
        }
    }

    #[test]
    fn no_frames_gives_single_empty_scene() {
        let scenes = SceneDetector::new(0.3).segment_frames(Vec::new());
        assert_eq!(scenes, vec![Scene::new(0, 0)]);
    }

    #[test]
    fn threshold_is_clamped() {
        assert_eq!(SceneDetector::new(3.0).threshold(), 1.0);
        assert!(SceneDetector::new(-0.2).threshold() > 0.0);
        assert_eq!(SceneDetector::new(0.35).threshold(), 0.35);
    }

    #[test]
    fn threshold_of_one_never_cuts() {
        let scenes = SceneDetector::new(1.0).segment_frames(frames(&[0, 255, 0, 255]));
        assert_eq!(scenes.len(), 1);
    }

    #[test]
    fn missing_file_gives_empty_list() {
        let list = SceneDetector::new(0.3).detect(Path::new("/no/such/video.mp4"));
        assert!(list.is_empty());
    }

    #[test]
    fn cut_times_skip_first_scene() {
        let list = SceneList {
            scenes: vec![Scene::new(0, 5), Scene::new(6, 12), Scene::new(13, 19)],
            fps: 2.0,
        };
        assert_eq!(list.cut_times(), vec![3.0, 6.5]);
    }
}

//! Content-biased clip selection for timeline items.

use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

use super::sampler::{FfmpegSampler, FrameSampler, SamplingError};
use super::text::{NoTextDetector, TesseractDetector, TextDetectionError, TextDetector};
use super::window::{
    analysis_window, best_window, centered_clip, fallback_clip, target_length, window_len, Sample,
};
use crate::config::ClipSettings;
use crate::jobs::panic_message;
use crate::models::{Clip, TimelineItem};
use crate::video::mean_abs_diff;

/// Why refinement fell back to the deterministic clip.
#[derive(Error, Debug)]
pub enum RefineError {
    #[error("Frame sampling failed: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Text detection failed: {0}")]
    TextDetection(#[from] TextDetectionError),

    #[error("No samples to score")]
    NoSamples,

    #[error("Refinement panicked: {0}")]
    Panicked(String),
}

/// The clip chosen for one item.
#[derive(Debug)]
pub struct Selection {
    pub clip: Clip,
    /// Set when refinement failed and `clip` is the fallback.
    pub degraded: Option<RefineError>,
}

/// Picks one fixed-length clip per timeline item.
pub struct ClipSelector {
    sampler: Arc<dyn FrameSampler>,
    text_detector: Arc<dyn TextDetector>,
    target: f64,
    sample_rate: f64,
    ocr_weight: f64,
    warned_text_unavailable: AtomicBool,
}

impl ClipSelector {
    /// Selector with ffmpeg sampling and tesseract only when `ocr_enabled`.
    pub fn from_settings(settings: &ClipSettings) -> Self {
        let text_detector: Arc<dyn TextDetector> = if settings.ocr_enabled {
            Arc::new(TesseractDetector::new())
        } else {
            Arc::new(NoTextDetector)
        };
        Self::new(settings, Arc::new(FfmpegSampler::default()), text_detector)
    }

    pub fn new(
        settings: &ClipSettings,
        sampler: Arc<dyn FrameSampler>,
        text_detector: Arc<dyn TextDetector>,
    ) -> Self {
        Self {
            sampler,
            text_detector,
            target: target_length(settings.target, settings.min_len, settings.max_len),
            sample_rate: if settings.sample_rate > 0.0 {
                settings.sample_rate
            } else {
                2.0
            },
            ocr_weight: settings.ocr_weight.max(0.0),
            warned_text_unavailable: AtomicBool::new(false),
        }
    }

    /// Clip length every selection produces.
    pub fn target(&self) -> f64 {
        self.target
    }

    /// Choose a clip for `item`. Never fails: refinement errors and panics
    /// fall back to the deterministic clip and are reported in
    /// [`Selection::degraded`].
    pub fn select(&self, source: &Path, item: &TimelineItem) -> Selection {
        let fallback = fallback_clip(item.start, item.end, self.target);
        let refined = panic::catch_unwind(AssertUnwindSafe(|| self.refine(source, &fallback)))
            .unwrap_or_else(|payload| Err(RefineError::Panicked(panic_message(&*payload))));
        match refined {
            Ok(clip) => Selection {
                clip,
                degraded: None,
            },
            Err(e) => {
                tracing::debug!(
                    "[ClipSelector] Refinement failed for [{:.2}, {:.2}], using fallback: {}",
                    item.start,
                    item.end,
                    e
                );
                Selection {
                    clip: fallback,
                    degraded: Some(e),
                }
            }
        }
    }

    fn refine(&self, source: &Path, fallback: &Clip) -> Result<Clip, RefineError> {
        let (start, end) = analysis_window(fallback);
        let frames = self.sampler.sample(source, start, end, self.sample_rate)?;

        let use_text = self.ocr_weight > 0.0 && self.text_available();
        let mut samples = Vec::with_capacity(frames.len());
        for (idx, sampled) in frames.iter().enumerate() {
            let motion = if idx == 0 {
                0.0
            } else {
                mean_abs_diff(&frames[idx - 1].frame, &sampled.frame)
            };
            let has_text = use_text && self.text_detector.detect(&sampled.frame)?;
            samples.push(Sample {
                time: sampled.time,
                motion,
                has_text,
            });
        }

        let window = window_len(self.target, self.sample_rate);
        let weight = if use_text { self.ocr_weight } else { 0.0 };
        let (first, last) = best_window(&samples, window, weight).ok_or(RefineError::NoSamples)?;
        Ok(centered_clip(samples[first].time, samples[last].time, self.target))
    }

    /// Availability check that logs the missing detector once.
    fn text_available(&self) -> bool {
        if self.text_detector.is_available() {
            return true;
        }
        if !self.warned_text_unavailable.swap(true, Ordering::Relaxed) {
            tracing::info!("[ClipSelector] Text detector unavailable; scoring on motion only");
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clips::sampler::SampledFrame;
    use crate::models::media::TIME_EPSILON;
    use crate::models::SegmentLabel;
    use image::{GrayImage, Luma};
    use std::sync::atomic::AtomicUsize;

    /// Serves frames whose luma follows `levels`, one per sample slot.
    struct ScriptedSampler {
        levels: Vec<u8>,
    }

    impl FrameSampler for ScriptedSampler {
        fn sample(
            &self,
            _source: &Path,
            start: f64,
            end: f64,
            rate: f64,
        ) -> Result<Vec<SampledFrame>, SamplingError> {
            let frames: Vec<SampledFrame> = crate::clips::window::sample_times(start, end, rate)
                .into_iter()
                .zip(&self.levels)
                .map(|(time, level)| SampledFrame {
                    time,
                    frame: GrayImage::from_pixel(4, 4, Luma([*level])),
                })
                .collect();
            if frames.is_empty() {
                return Err(SamplingError::NoFrames { start, end });
            }
            Ok(frames)
        }
    }

    struct FailingSampler;

    impl FrameSampler for FailingSampler {
        fn sample(&self, source: &Path, _: f64, _: f64, _: f64) -> Result<Vec<SampledFrame>, SamplingError> {
            Err(SamplingError::NotFound(source.to_path_buf()))
        }
    }

    /// Reports text on bright frames and counts calls.
    struct BrightTextDetector {
        available: bool,
        calls: AtomicUsize,
    }

    impl TextDetector for BrightTextDetector {
        fn is_available(&self) -> bool {
            self.available
        }

        fn detect(&self, frame: &GrayImage) -> Result<bool, TextDetectionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(frame.get_pixel(0, 0).0[0] > 200)
        }
    }

    fn item(start: f64, end: f64) -> TimelineItem {
        TimelineItem {
            start,
            end,
            text: "Click save".into(),
            label: SegmentLabel::Action,
            confidence: 0.9,
        }
    }

    fn settings(ocr_weight: f64) -> ClipSettings {
        ClipSettings {
            target: 1.0,
            min_len: 0.5,
            max_len: 4.0,
            sample_rate: 2.0,
            ocr_weight,
            ocr_enabled: true,
        }
    }

    #[test]
    fn sampling_failure_falls_back() {
        let selector = ClipSelector::new(
            &ClipSettings::default(),
            Arc::new(FailingSampler),
            Arc::new(NoTextDetector),
        );
        let selection = selector.select(Path::new("x.mp4"), &item(10.0, 11.0));
        assert!(selection.degraded.is_some());
        assert!(!selection.clip.refined);
        assert!((selection.clip.start - 9.0).abs() < TIME_EPSILON);
        assert!((selection.clip.length() - 3.0).abs() < TIME_EPSILON);
    }

    #[test]
    fn refinement_centers_on_motion() {
        // Item [4, 5] with target 1 -> fallback [4, 5], window [3, 6],
        // samples at 3.0, 3.5, ... 6.0. The jump lands between 5.0 and 5.5.
        let sampler = ScriptedSampler {
            levels: vec![10, 10, 10, 10, 10, 200, 200],
        };
        let selector = ClipSelector::new(
            &settings(0.0),
            Arc::new(sampler),
            Arc::new(NoTextDetector),
        );
        let selection = selector.select(Path::new("x.mp4"), &item(4.0, 5.0));
        assert!(selection.degraded.is_none());
        let clip = selection.clip;
        assert!(clip.refined);
        // Window of 2 samples at indices 4..=5 -> times 5.0 and 5.5.
        assert!((clip.start - 4.75).abs() < TIME_EPSILON);
        assert!((clip.length() - 1.0).abs() < TIME_EPSILON);
    }

    #[test]
    fn zero_ocr_weight_never_calls_detector() {
        let detector = Arc::new(BrightTextDetector {
            available: true,
            calls: AtomicUsize::new(0),
        });
        let selector = ClipSelector::new(
            &settings(0.0),
            Arc::new(ScriptedSampler {
                levels: vec![10; 7],
            }),
            detector.clone(),
        );
        selector.select(Path::new("x.mp4"), &item(4.0, 5.0));
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn unavailable_detector_is_skipped() {
        let detector = Arc::new(BrightTextDetector {
            available: false,
            calls: AtomicUsize::new(0),
        });
        let selector = ClipSelector::new(
            &settings(3.0),
            Arc::new(ScriptedSampler {
                levels: vec![10; 7],
            }),
            detector.clone(),
        );
        let first = selector.select(Path::new("x.mp4"), &item(4.0, 5.0));
        let second = selector.select(Path::new("x.mp4"), &item(4.0, 5.0));
        assert!(first.degraded.is_none() && second.degraded.is_none());
        assert_eq!(detector.calls.load(Ordering::SeqCst), 0);
        // Flat motion: earliest window wins.
        assert!((first.clip.start - 2.75).abs() < TIME_EPSILON);
    }

    /// Answers from `hits` in call order, one per sampled frame.
    struct ScriptedTextDetector {
        hits: Vec<bool>,
        calls: AtomicUsize,
    }

    impl TextDetector for ScriptedTextDetector {
        fn is_available(&self) -> bool {
            true
        }

        fn detect(&self, _frame: &GrayImage) -> Result<bool, TextDetectionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hits.get(call).copied().unwrap_or(false))
        }
    }

    struct PanickingSampler;

    impl FrameSampler for PanickingSampler {
        fn sample(&self, _: &Path, _: f64, _: f64, _: f64) -> Result<Vec<SampledFrame>, SamplingError> {
            panic!("frame buffer overrun");
        }
    }

    #[test]
    fn text_signal_moves_clip_later_than_motion_only() {
        // Flat motion; text on the last two of seven samples.
        let select_with = |ocr_weight: f64| {
            let detector = Arc::new(ScriptedTextDetector {
                hits: vec![false, false, false, false, false, true, true],
                calls: AtomicUsize::new(0),
            });
            let selector = ClipSelector::new(
                &settings(ocr_weight),
                Arc::new(ScriptedSampler {
                    levels: vec![10; 7],
                }),
                detector,
            );
            selector.select(Path::new("x.mp4"), &item(4.0, 5.0)).clip
        };

        let baseline = select_with(0.0);
        let weighted = select_with(3.0);
        let mid = |clip: &Clip| (clip.start + clip.end) / 2.0;
        assert!(mid(&weighted) > mid(&baseline));
        assert!((baseline.start - 2.75).abs() < TIME_EPSILON);
        assert!((weighted.start - 5.25).abs() < TIME_EPSILON);
    }

    #[test]
    fn panicking_sampler_falls_back() {
        let selector = ClipSelector::new(
            &settings(0.0),
            Arc::new(PanickingSampler),
            Arc::new(NoTextDetector),
        );
        let selection = selector.select(Path::new("x.mp4"), &item(4.0, 5.0));
        assert!(matches!(
            selection.degraded,
            Some(RefineError::Panicked(ref msg)) if msg.contains("overrun")
        ));
        assert!(!selection.clip.refined);
        assert!((selection.clip.start - 4.0).abs() < TIME_EPSILON);
    }

    #[test]
    fn numeric_contract_holds_for_odd_items() {
        let selector = ClipSelector::new(
            &ClipSettings::default(),
            Arc::new(FailingSampler),
            Arc::new(NoTextDetector),
        );
        for (s, e) in [(0.0, 0.0), (0.0, 600.0), (3.0, 1.0), (0.1, 0.2)] {
            let clip = selector.select(Path::new("x.mp4"), &item(s, e)).clip;
            assert!(clip.start >= 0.0);
            assert!(clip.end > clip.start);
            assert!((clip.length() - selector.target()).abs() < TIME_EPSILON);
        }
    }
}

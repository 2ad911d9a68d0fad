//! Pure clip arithmetic: fallback placement and sliding-window scoring.

use crate::models::Clip;

/// Clip length actually used: the request clamped into `[min_len, max_len]`.
pub fn target_length(requested: f64, min_len: f64, max_len: f64) -> f64 {
    let (lo, hi) = if min_len <= max_len {
        (min_len, max_len)
    } else {
        (max_len, min_len)
    };
    requested.max(lo).min(hi)
}

/// Deterministic clip for an item spanning `[start, end]`.
///
/// Long items keep their start; short ones are padded evenly on both sides.
/// The start is clamped at 0 and the end is always `start + target`.
pub fn fallback_clip(start: f64, end: f64, target: f64) -> Clip {
    let start = if start.is_finite() { start } else { 0.0 };
    let end = if end.is_finite() { end } else { start };
    let length = (end - start).max(0.0);

    if length >= target {
        return Clip::from_start(start, target, false);
    }
    let pad = (target - length) / 2.0;
    Clip::from_start(start - pad, target, false)
}

/// Padded analysis window around a fallback clip: one second each side,
/// start clamped at 0.
pub fn analysis_window(clip: &Clip) -> (f64, f64) {
    ((clip.start - 1.0).max(0.0), clip.end + 1.0)
}

/// Sample timestamps `start + k / rate` up to and including `end`.
pub fn sample_times(start: f64, end: f64, rate: f64) -> Vec<f64> {
    if !(rate > 0.0) || end < start {
        return Vec::new();
    }
    let mut times = Vec::new();
    let mut k = 0u32;
    loop {
        let t = start + f64::from(k) / rate;
        if t > end + 1e-9 {
            break;
        }
        times.push(t);
        k += 1;
    }
    times
}

/// One sampled frame reduced to its scoring signals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time: f64,
    /// Mean absolute luma difference to the previous sample.
    pub motion: f64,
    pub has_text: bool,
}

/// Number of samples covering `target` seconds at `rate`.
pub fn window_len(target: f64, rate: f64) -> usize {
    ((target * rate).ceil() as usize).max(1)
}

/// Pick the highest-scoring window; returns the inclusive index range.
///
/// Score is `Σ motion + ocr_weight * count(text)`. A strict comparison in a
/// left-to-right scan gives ties to the earliest window. With fewer samples
/// than the window, the window starts at 0 and is truncated.
pub fn best_window(samples: &[Sample], window: usize, ocr_weight: f64) -> Option<(usize, usize)> {
    if samples.is_empty() {
        return None;
    }
    let window = window.max(1);
    if samples.len() <= window {
        return Some((0, samples.len() - 1));
    }

    let score = |slice: &[Sample]| -> f64 {
        let motion: f64 = slice.iter().map(|s| s.motion).sum();
        let text = slice.iter().filter(|s| s.has_text).count() as f64;
        motion + ocr_weight * text
    };

    let mut best_idx = 0;
    let mut best_score = score(&samples[..window]);
    for i in 1..=samples.len() - window {
        let current = score(&samples[i..i + window]);
        if current > best_score {
            best_score = current;
            best_idx = i;
        }
    }
    Some((best_idx, best_idx + window - 1))
}

/// Center a `target`-long clip on the chosen samples.
pub fn centered_clip(first: f64, last: f64, target: f64) -> Clip {
    let mid = (first + last) / 2.0;
    Clip::from_start(mid - target / 2.0, target, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::media::TIME_EPSILON;

    fn samples(motion: &[f64], text: &[bool]) -> Vec<Sample> {
        motion
            .iter()
            .zip(text)
            .enumerate()
            .map(|(i, (m, t))| Sample {
                time: i as f64 * 0.5,
                motion: *m,
                has_text: *t,
            })
            .collect()
    }

    #[test]
    fn target_is_clamped() {
        assert_eq!(target_length(3.0, 2.0, 4.0), 3.0);
        assert_eq!(target_length(10.0, 2.0, 4.0), 4.0);
        assert_eq!(target_length(0.5, 2.0, 4.0), 2.0);
    }

    #[test]
    fn long_item_keeps_its_start() {
        let clip = fallback_clip(10.0, 20.0, 3.0);
        assert_eq!((clip.start, clip.end), (10.0, 13.0));
        assert!(!clip.refined);
    }

    #[test]
    fn short_item_is_padded_evenly() {
        let clip = fallback_clip(10.0, 11.0, 3.0);
        assert!((clip.start - 9.0).abs() < TIME_EPSILON);
        assert!((clip.end - 12.0).abs() < TIME_EPSILON);
    }

    #[test]
    fn padding_near_zero_reexpands_end() {
        let clip = fallback_clip(0.2, 0.2, 3.0);
        assert_eq!(clip.start, 0.0);
        assert!((clip.length() - 3.0).abs() < TIME_EPSILON);
    }

    #[test]
    fn degenerate_items_still_give_target_length() {
        for (s, e) in [(5.0, 2.0), (-4.0, -1.0), (f64::NAN, 3.0), (0.0, 1e9)] {
            let clip = fallback_clip(s, e, 2.5);
            assert!(clip.start >= 0.0);
            assert!((clip.length() - 2.5).abs() < TIME_EPSILON, "{s} {e}");
        }
    }

    #[test]
    fn sample_times_include_end() {
        assert_eq!(sample_times(1.0, 3.0, 2.0), vec![1.0, 1.5, 2.0, 2.5, 3.0]);
        assert!(sample_times(0.0, 1.0, 0.0).is_empty());
    }

    #[test]
    fn window_len_rounds_up() {
        assert_eq!(window_len(3.0, 2.0), 6);
        assert_eq!(window_len(2.2, 2.0), 5);
        assert_eq!(window_len(0.0, 2.0), 1);
    }

    #[test]
    fn highest_motion_window_wins() {
        let s = samples(&[0.0, 1.0, 1.0, 9.0, 9.0, 1.0], &[false; 6]);
        assert_eq!(best_window(&s, 2, 0.0), Some((3, 4)));
    }

    #[test]
    fn ties_go_to_earliest_window() {
        let s = samples(&[0.0, 5.0, 5.0, 5.0, 5.0], &[false; 5]);
        // Windows [1,2], [2,3], [3,4] all score 10.
        assert_eq!(best_window(&s, 2, 0.0), Some((1, 2)));
    }

    #[test]
    fn text_presence_outweighs_motion() {
        let s = samples(
            &[0.0, 4.0, 4.0, 0.5, 0.5, 0.5],
            &[false, false, false, true, true, false],
        );
        assert_eq!(best_window(&s, 2, 0.0), Some((1, 2)));
        assert_eq!(best_window(&s, 2, 5.0), Some((3, 4)));
    }

    #[test]
    fn short_sample_run_truncates_window() {
        let s = samples(&[0.0, 2.0, 1.0], &[false; 3]);
        assert_eq!(best_window(&s, 6, 0.0), Some((0, 2)));
        assert_eq!(best_window(&[], 6, 0.0), None);
    }

    #[test]
    fn centered_clip_is_clamped_at_zero() {
        let clip = centered_clip(0.0, 0.5, 3.0);
        assert_eq!(clip.start, 0.0);
        assert!((clip.end - 3.0).abs() < TIME_EPSILON);
        assert!(clip.refined);
    }
}

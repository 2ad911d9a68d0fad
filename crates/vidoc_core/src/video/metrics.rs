//! Per-frame measurements on 8-bit luma images.

use image::GrayImage;

/// Number of luma bins.
pub const BINS: usize = 256;

/// A luma histogram normalized to sum to 1.
#[derive(Debug, Clone, PartialEq)]
pub struct LumaHistogram([f64; BINS]);

impl LumaHistogram {
    /// Build the normalized histogram of a frame. An empty frame gives all
    /// zeros.
    pub fn of(frame: &GrayImage) -> Self {
        let mut counts = [0u64; BINS];
        for pixel in frame.as_raw() {
            counts[*pixel as usize] += 1;
        }

        let total = frame.as_raw().len() as f64;
        let mut bins = [0.0; BINS];
        if total > 0.0 {
            for (bin, count) in bins.iter_mut().zip(counts.iter()) {
                *bin = *count as f64 / total;
            }
        }
        Self(bins)
    }

    pub fn bins(&self) -> &[f64; BINS] {
        &self.0
    }

    /// Bhattacharyya distance to another histogram.
    ///
    /// `sqrt(max(0, 1 - Σ sqrt(p_i q_i)))`: 0 for identical histograms, 1 for
    /// disjoint ones.
    pub fn bhattacharyya(&self, other: &LumaHistogram) -> f64 {
        let coefficient: f64 = self
            .0
            .iter()
            .zip(other.0.iter())
            .map(|(p, q)| (p * q).sqrt())
            .sum();
        (1.0 - coefficient).max(0.0).sqrt().min(1.0)
    }
}

/// Mean absolute per-pixel difference between two frames, in luma units.
///
/// Frames of different size compare over their overlapping pixels.
pub fn mean_abs_diff(a: &GrayImage, b: &GrayImage) -> f64 {
    let (a, b) = (a.as_raw(), b.as_raw());
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let sum: u64 = a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(x, y)| u64::from(x.abs_diff(*y)))
        .sum();
    sum as f64 / n as f64
}

/// Variance of the 4-neighbour Laplacian; low values mean a blurry frame.
pub fn laplacian_variance(frame: &GrayImage) -> f64 {
    let (w, h) = frame.dimensions();
    if w < 3 || h < 3 {
        return 0.0;
    }

    let px = |x: u32, y: u32| f64::from(frame.get_pixel(x, y).0[0]);
    let mut values = Vec::with_capacity(((w - 2) * (h - 2)) as usize);
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let lap = px(x - 1, y) + px(x + 1, y) + px(x, y - 1) + px(x, y + 1) - 4.0 * px(x, y);
            values.push(lap);
        }
    }

    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n
}

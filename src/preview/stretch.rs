//! Per-tile percentile contrast stretch.
//!
//! Each band of each tile is stretched on its own statistics, so adjacent
//! tiles of one dataset can come out with different brightness.

/// Low/high percentiles mapped to 0 and 255.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContrastStretch {
    pub low: f64,
    pub high: f64,
}

impl Default for ContrastStretch {
    fn default() -> Self {
        Self {
            low: 2.0,
            high: 98.0,
        }
    }
}

impl ContrastStretch {
    pub fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    /// Stretch one band to 8 bits.
    ///
    /// Pixels where `mask == 0` or the value is not finite are excluded from
    /// the statistics and written as 0. A band with no valid pixels, or with
    /// a zero or negative percentile range, comes out all zero.
    pub fn stretch_band(&self, values: &[f32], mask: &[u8]) -> Vec<u8> {
        let mut out = vec![0u8; values.len()];

        let mut valid: Vec<f64> = values
            .iter()
            .zip(mask)
            .filter(|&(v, &m)| m != 0 && v.is_finite())
            .map(|(&v, _)| v as f64)
            .collect();
        if valid.is_empty() {
            return out;
        }
        valid.sort_by(f64::total_cmp);

        let lo = percentile(&valid, self.low);
        let hi = percentile(&valid, self.high);
        if !lo.is_finite() || !hi.is_finite() || hi <= lo {
            return out;
        }

        let range = hi - lo;
        for ((o, &v), &m) in out.iter_mut().zip(values).zip(mask) {
            if m != 0 && v.is_finite() {
                let scaled = ((v as f64 - lo) / range * 255.0).clamp(0.0, 255.0);
                *o = scaled as u8;
            }
        }
        out
    }
}

/// Percentile `q` (0..=100) of sorted values by linear interpolation
/// between closest ranks.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => f64::NAN,
        1 => sorted[0],
        n => {
            let pos = (q / 100.0).clamp(0.0, 1.0) * (n - 1) as f64;
            let below = pos.floor() as usize;
            let above = pos.ceil() as usize;
            let frac = pos - below as f64;
            sorted[below] + (sorted[above] - sorted[below]) * frac
        }
    }
}

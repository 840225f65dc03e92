//! Adaptive robust z-score for the best correlation response.

use crate::ring::RingBuffer;
use tractor_common::Real;

/// Floor applied to the MAD before dividing.
pub(crate) const MAD_FLOOR: Real = 1e-9;
/// Converts a median absolute deviation to a normal-equivalent standard
/// deviation.
pub(crate) const MAD_TO_SIGMA: Real = 1.4826;

/// Fewest recent values required before the statistics start folding.
const MIN_WINDOW: usize = 5;
/// EWMA smoothing factor; small, so the statistic adapts slowly and resists
/// transient outliers.
const SMOOTHING: Real = 0.01;

/// Median/MAD statistics over a bounded recent-history window, folded into
/// exponentially-weighted running estimates.
///
/// The caller admits values only while the signal is active, so the
/// statistics describe the correlation noise floor under load.
#[derive(Debug, Clone)]
pub(crate) struct RobustNormalizer {
    recent: RingBuffer,
    scratch: Vec<Real>,
    median_ewma: Real,
    mad_ewma: Real,
}

impl RobustNormalizer {
    /// `window` is the recent-history capacity in samples, clamped below at
    /// the minimum the statistics need.
    pub(crate) fn new(window: usize) -> Self {
        let window = window.max(MIN_WINDOW);
        Self {
            recent: RingBuffer::new(window),
            scratch: Vec::with_capacity(window),
            median_ewma: 0.0,
            mad_ewma: 1.0,
        }
    }

    /// Admits one active-period correlation value into the statistics.
    pub(crate) fn observe(&mut self, correlation: Real) {
        self.recent.push(correlation);
        if self.recent.len() < MIN_WINDOW {
            return;
        }

        self.scratch.clear();
        self.scratch.extend(self.recent.iter());
        let median = median_in_place(&mut self.scratch);
        for value in self.scratch.iter_mut() {
            *value = (*value - median).abs();
        }
        let mad = median_in_place(&mut self.scratch) + MAD_FLOOR;

        self.median_ewma = (1.0 - SMOOTHING) * self.median_ewma + SMOOTHING * median;
        self.mad_ewma = (1.0 - SMOOTHING) * self.mad_ewma + SMOOTHING * mad;
    }

    pub(crate) fn z_score(&self, correlation: Real) -> Real {
        (correlation - self.median_ewma) / (MAD_TO_SIGMA * Real::max(self.mad_ewma, MAD_FLOOR))
    }
}

/// Median of `values`, reordering them in place. Zero for an empty slice.
pub(crate) fn median_in_place(values: &mut [Real]) -> Real {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable_by(Real::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        values[mid]
    } else {
        0.5 * (values[mid - 1] + values[mid])
    }
}

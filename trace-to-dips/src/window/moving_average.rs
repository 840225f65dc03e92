use super::Window;
use crate::ring::RingBuffer;
use tractor_common::{Pressure, Real, SampleRateHz, Time};

/// Boxcar moving average over the most recent `width` samples.
///
/// The running sum is maintained incrementally, subtracting the evicted entry
/// as the new one is added. Until the buffer fills, the mean is taken over
/// the partial window, as in the streaming source.
#[derive(Debug, Clone)]
pub struct MovingAverage {
    buffer: RingBuffer,
    sum: Real,
    sample_interval: Real,
}

impl MovingAverage {
    /// `width` is clamped below at one sample.
    pub fn new(width: usize, sample_rate_hz: SampleRateHz) -> Self {
        Self {
            buffer: RingBuffer::new(width.max(1)),
            sum: 0.0,
            sample_interval: 1.0 / sample_rate_hz,
        }
    }

    /// Feeds one value and returns the current mean.
    pub fn update(&mut self, value: Pressure) -> Real {
        match self.buffer.push(value) {
            Some(evicted) => self.sum += value - evicted,
            None => self.sum += value,
        }
        self.mean()
    }

    fn mean(&self) -> Real {
        self.sum / self.buffer.len() as Real
    }
}

impl Window for MovingAverage {
    type OutputType = Real;

    fn push(&mut self, value: Pressure) -> bool {
        self.update(value);
        true
    }

    fn output(&self) -> Option<Real> {
        (!self.buffer.is_empty()).then(|| self.mean())
    }

    /// Shifts to the centre of the (possibly partial) boxcar.
    fn apply_time_shift(&self, time: Time) -> Time {
        time - 0.5 * self.buffer.len().saturating_sub(1) as Real * self.sample_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn partial_window_averages_what_it_has() {
        let mut smoother = MovingAverage::new(4, 1.0);
        assert_approx_eq!(smoother.update(3.0), 3.0, 1e-12);
        assert_approx_eq!(smoother.update(5.0), 4.0, 1e-12);
        assert_approx_eq!(smoother.update(7.0), 5.0, 1e-12);
    }

    #[test]
    fn running_sum_matches_recomputation() {
        let input = [4.0, 3.0, 2.0, 5.0, 6.0, 1.0, 5.0, 7.0, 2.0, 4.0];
        let width = 3;
        let mut smoother = MovingAverage::new(width, 1.0);
        for (i, &value) in input.iter().enumerate() {
            let mean = smoother.update(value);
            let start = (i + 1).saturating_sub(width);
            let window = &input[start..=i];
            let expected = window.iter().sum::<Real>() / window.len() as Real;
            assert_approx_eq!(mean, expected, 1e-12);
        }
    }

    #[test]
    fn time_shift_points_at_the_window_centre() {
        let mut smoother = MovingAverage::new(5, 10.0);
        for value in [1.0, 1.0, 1.0, 1.0, 1.0] {
            smoother.update(value);
        }
        assert_approx_eq!(smoother.apply_time_shift(1.0), 1.0 - 0.2, 1e-12);
    }
}

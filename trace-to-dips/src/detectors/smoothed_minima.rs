use super::{Detector, Refractory};
use crate::parameters::{ParameterError, SmoothedMinimaParameters, validate_sample_rate};
use crate::ring::RingBuffer;
use crate::window::MovingAverage;
use tractor_common::{
    Detection, Pressure, Real, SampleIndex, SampleRateHz, Time, duration_to_samples,
};

/// Streaming moving-average plus local-minimum prominence detector.
///
/// Candidates are judged at the centre of a short smoothed-value history, so
/// an accepted event's time is the current time shifted back by the
/// history-centre lag. This back-shift is an approximation of the true
/// minimum time, not a precise alignment.
pub struct SmoothedMinimaDetector {
    tractor_on_threshold: Pressure,
    prominence_threshold: Real,
    halfwin: usize,
    sample_interval: Real,
    smoother: MovingAverage,
    history: RingBuffer,
    refractory: Refractory,
    next_index: SampleIndex,
}

impl SmoothedMinimaDetector {
    pub fn new(
        parameters: &SmoothedMinimaParameters,
        sample_rate_hz: SampleRateHz,
    ) -> Result<Self, ParameterError> {
        validate_sample_rate(sample_rate_hz)?;
        let width = duration_to_samples(parameters.smooth_window_s, sample_rate_hz, 1);
        let halfwin = duration_to_samples(parameters.local_max_halfwin_s, sample_rate_hz, 1);
        Ok(Self {
            tractor_on_threshold: parameters.tractor_on_threshold,
            prominence_threshold: parameters.prominence_threshold,
            halfwin,
            sample_interval: 1.0 / sample_rate_hz,
            smoother: MovingAverage::new(width, sample_rate_hz),
            history: RingBuffer::new(2 * halfwin + 5),
            refractory: Refractory::new(duration_to_samples(
                parameters.min_separation_s,
                sample_rate_hz,
                0,
            )),
            next_index: 0,
        })
    }
}

impl Detector for SmoothedMinimaDetector {
    fn signal(&mut self, time: Time, value: Pressure) -> Option<Detection> {
        let index = self.next_index;
        self.next_index += 1;

        let smoothed = self.smoother.update(value);
        self.history.push(smoothed);

        let len = self.history.len();
        if len < 3 || value <= self.tractor_on_threshold {
            return None;
        }

        // Judge the sample at the history centre.
        let centre = len / 2;
        let centre_value = self.history.get(centre)?;
        let previous = self.history.get(centre - 1)?;
        let next = self.history.get(centre + 1)?;
        if !(centre_value < previous && centre_value <= next) {
            return None;
        }

        let left = centre.saturating_sub(self.halfwin);
        let right = usize::min(len, centre + self.halfwin + 1);
        let local_max = (left..right)
            .filter_map(|i| self.history.get(i))
            .fold(Real::MIN, Real::max);
        let prominence = local_max - centre_value;
        if prominence < self.prominence_threshold {
            return None;
        }

        let lag = len - 1 - centre;
        let candidate_index = index - lag;
        if !self.refractory.ready(candidate_index) {
            return None;
        }
        self.refractory.accept(candidate_index);

        let candidate_time = time - lag as Real * self.sample_interval;
        tracing::debug!(candidate_index, candidate_time, prominence, "accepted smoothed-minima dip");
        Some(Detection::smoothed_minima(
            candidate_index,
            candidate_time,
            centre_value,
        ))
    }
}

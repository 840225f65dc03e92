use super::{Detector, Refractory};
use crate::correlation::CorrelationEngine;
use crate::normalizer::RobustNormalizer;
use crate::parameters::{MatchedBankParameters, ParameterError, validate_sample_rate};
use crate::template::TemplateBank;
use crate::window::KalmanBaseline;
use tractor_common::{
    Detection, Pressure, Real, SampleIndex, SampleRateHz, Time, duration_to_samples,
};

/// Seconds of recent best-correlation history backing the robust z-score.
const ROBUST_WINDOW_S: Real = 5.0;

/// Streaming Kalman-baseline plus matched-filter-bank detector.
///
/// Each sample flows through the baseline estimator, the correlation engine
/// and the robust normalizer; a detection is emitted when the z-score of the
/// best bank response drops below the threshold while the tractor is active
/// and the refractory window has elapsed.
pub struct KalmanMatchedDetector {
    tractor_on_threshold: Pressure,
    z_threshold: Real,
    baseline: KalmanBaseline,
    engine: CorrelationEngine,
    normalizer: RobustNormalizer,
    refractory: Refractory,
    next_index: SampleIndex,
}

impl KalmanMatchedDetector {
    pub fn new(
        parameters: &MatchedBankParameters,
        sample_rate_hz: SampleRateHz,
    ) -> Result<Self, ParameterError> {
        validate_sample_rate(sample_rate_hz)?;
        let bank = TemplateBank::new(
            parameters.template_shape,
            parameters.min_template_width_s,
            parameters.max_template_width_s,
            parameters.n_templates,
            sample_rate_hz,
        );
        Ok(Self {
            tractor_on_threshold: parameters.tractor_on_threshold,
            z_threshold: parameters.z_threshold,
            baseline: KalmanBaseline::new(parameters.kalman_q, parameters.kalman_r),
            engine: CorrelationEngine::new(bank),
            normalizer: RobustNormalizer::new(duration_to_samples(
                ROBUST_WINDOW_S,
                sample_rate_hz,
                5,
            )),
            refractory: Refractory::new(duration_to_samples(
                parameters.min_separation_s,
                sample_rate_hz,
                0,
            )),
            next_index: 0,
        })
    }
}

impl Detector for KalmanMatchedDetector {
    fn signal(&mut self, time: Time, value: Pressure) -> Option<Detection> {
        let index = self.next_index;
        self.next_index += 1;

        let residual = self.baseline.update(value);
        let response = self.engine.push(residual)?;

        let active = value > self.tractor_on_threshold;
        if active && response.correlation.is_finite() {
            self.normalizer.observe(response.correlation);
        }

        let z_score = self.normalizer.z_score(response.correlation);
        if active && z_score.is_finite() && z_score < self.z_threshold && self.refractory.ready(index)
        {
            self.refractory.accept(index);
            tracing::debug!(index, time, z_score, "accepted kalman-matched dip");
            return Some(Detection::kalman_matched(
                index,
                time,
                value,
                response.template_index,
                response.correlation,
                z_score,
            ));
        }
        None
    }
}

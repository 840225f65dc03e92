//! Tuning parameters for the two detection engines.
//!
//! All durations are given in seconds and converted to sample counts at
//! detector construction using the stream's sample rate. Window and kernel
//! lengths below the minimum viable size are clamped upward rather than
//! rejected; only a nonsensical sample rate is refused.

use crate::template::TemplateShape;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tractor_common::{Pressure, Real, SampleRateHz};

#[derive(Debug, Error)]
pub enum ParameterError {
    #[error("sample rate must be finite and positive, got {0}")]
    InvalidSampleRate(SampleRateHz),
}

pub(crate) fn validate_sample_rate(sample_rate_hz: SampleRateHz) -> Result<(), ParameterError> {
    if sample_rate_hz.is_finite() && sample_rate_hz > 0.0 {
        Ok(())
    } else {
        Err(ParameterError::InvalidSampleRate(sample_rate_hz))
    }
}

/// Encapsulates the parameters specific to the smoothed-minima detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SmoothedMinimaParameters {
    /// Detection is only considered while the trace exceeds this value.
    pub tractor_on_threshold: Pressure,
    /// Width of the boxcar smoothing window.
    pub smooth_window_s: Real,
    /// Minimum depth of a candidate minimum below the local maximum around it.
    pub prominence_threshold: Pressure,
    /// Half-width of the window searched for that local maximum.
    pub local_max_halfwin_s: Real,
    /// Minimum spacing between accepted detections.
    pub min_separation_s: Real,
}

impl Default for SmoothedMinimaParameters {
    fn default() -> Self {
        Self {
            tractor_on_threshold: 1500.0,
            smooth_window_s: 0.7,
            prominence_threshold: 25.0,
            local_max_halfwin_s: 2.5,
            min_separation_s: 3.0,
        }
    }
}

/// Encapsulates the parameters specific to the Kalman/matched-filter-bank
/// detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct MatchedBankParameters {
    /// Detection is only considered while the trace exceeds this value.
    pub tractor_on_threshold: Pressure,
    /// Process variance of the random-walk baseline. Larger values let the
    /// baseline track faster, leaving less residual signal for detection.
    pub kalman_q: Real,
    /// Measurement variance of the baseline. Larger values trust new
    /// measurements less, giving a smoother baseline.
    pub kalman_r: Real,
    /// Pulse shape of the matched-filter kernels.
    pub template_shape: TemplateShape,
    /// Narrowest kernel width in the bank.
    pub min_template_width_s: Real,
    /// Widest kernel width in the bank.
    pub max_template_width_s: Real,
    /// Number of kernels, linearly spaced across the width range.
    pub n_templates: usize,
    /// A detection fires when the robust z-score drops below this value.
    pub z_threshold: Real,
    /// Minimum spacing between accepted detections.
    pub min_separation_s: Real,
}

impl Default for MatchedBankParameters {
    fn default() -> Self {
        Self {
            tractor_on_threshold: 1500.0,
            kalman_q: 1.0,
            kalman_r: 10_000.0,
            template_shape: TemplateShape::Gaussian,
            min_template_width_s: 0.5,
            max_template_width_s: 1.5,
            n_templates: 5,
            z_threshold: -3.0,
            min_separation_s: 2.0,
        }
    }
}

//! Matched-filter kernels for the dip shape.

use serde::{Deserialize, Serialize};
use tractor_common::{Real, SampleRateHz, duration_to_samples};

/// Floor applied to the L2 norm before dividing, so a degenerate kernel
/// degrades toward zero rather than dividing by zero.
pub(crate) const NORM_FLOOR: Real = 1e-9;

/// Shortest kernel that can still represent a dip.
const MIN_TEMPLATE_LEN: usize = 3;

/// The pulse shape used for matched-filter kernels.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TemplateShape {
    /// Bell curve with a standard deviation of `max(1, L/6)` samples.
    #[default]
    Gaussian,
    /// Raised-cosine pulse.
    Hann,
}

/// A zero-mean, unit-norm, negative-going matched-filter kernel.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    taps: Vec<Real>,
    width_s: Real,
}

impl Template {
    /// Builds a kernel of `length` samples, clamped below at the minimum
    /// viable length of three.
    pub(crate) fn build(shape: TemplateShape, length: usize, width_s: Real) -> Self {
        let length = length.max(MIN_TEMPLATE_LEN);
        let mut taps: Vec<Real> = match shape {
            TemplateShape::Gaussian => {
                let sigma = Real::max(1.0, length as Real / 6.0);
                let centre = (length as Real - 1.0) / 2.0;
                (0..length)
                    .map(|i| -Real::exp(-0.5 * ((i as Real - centre) / sigma).powi(2)))
                    .collect()
            }
            TemplateShape::Hann => {
                let denominator = (length - 1) as Real;
                (0..length)
                    .map(|i| {
                        -0.5 * (1.0
                            - Real::cos(2.0 * std::f64::consts::PI * i as Real / denominator))
                    })
                    .collect()
            }
        };

        let mean = taps.iter().sum::<Real>() / length as Real;
        for tap in taps.iter_mut() {
            *tap -= mean;
        }
        let norm = Real::max(taps.iter().map(|tap| tap * tap).sum::<Real>().sqrt(), NORM_FLOOR);
        for tap in taps.iter_mut() {
            *tap /= norm;
        }

        Self { taps, width_s }
    }

    pub fn len(&self) -> usize {
        self.taps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.taps.is_empty()
    }

    /// Nominal width of the dip this kernel matches.
    pub fn width_s(&self) -> Real {
        self.width_s
    }

    pub fn taps(&self) -> &[Real] {
        &self.taps
    }

    /// Squared L2 norm; unity up to the epsilon floor.
    pub(crate) fn energy(&self) -> Real {
        self.taps.iter().map(|tap| tap * tap).sum()
    }
}

/// The fixed set of kernels a correlation engine matches against.
///
/// Kernels are immutable once built and owned exclusively by the engine that
/// holds the bank.
#[derive(Debug, Clone)]
pub struct TemplateBank {
    templates: Vec<Template>,
    max_len: usize,
}

impl TemplateBank {
    /// Builds `n_templates` kernels with widths linearly spaced between
    /// `min_width_s` and `max_width_s`. A zero count is clamped to one.
    pub fn new(
        shape: TemplateShape,
        min_width_s: Real,
        max_width_s: Real,
        n_templates: usize,
        sample_rate_hz: SampleRateHz,
    ) -> Self {
        let n_templates = n_templates.max(1);
        let templates: Vec<Template> = linspace(min_width_s, max_width_s, n_templates)
            .map(|width_s| {
                let length = duration_to_samples(width_s, sample_rate_hz, MIN_TEMPLATE_LEN);
                Template::build(shape, length, width_s)
            })
            .collect();
        let max_len = templates.iter().map(Template::len).max().unwrap_or(MIN_TEMPLATE_LEN);
        tracing::debug!(n_templates = templates.len(), max_len, "built template bank");
        Self { templates, max_len }
    }

    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Length of the longest kernel; sizes the shared residual buffer.
    pub fn max_len(&self) -> usize {
        self.max_len
    }
}

fn linspace(start: Real, stop: Real, n: usize) -> impl Iterator<Item = Real> {
    let step = if n > 1 {
        (stop - start) / (n - 1) as Real
    } else {
        0.0
    };
    (0..n).map(move |i| start + step * i as Real)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn kernels_are_zero_mean_and_unit_norm() {
        for shape in [TemplateShape::Gaussian, TemplateShape::Hann] {
            let bank = TemplateBank::new(shape, 0.5, 1.5, 5, 30.0);
            assert_eq!(bank.templates().len(), 5);
            for template in bank.templates() {
                let mean =
                    template.taps().iter().sum::<Real>() / template.len() as Real;
                assert!(mean.abs() < 1e-9);
                assert!((template.energy().sqrt() - 1.0).abs() < 1e-6);
            }
        }
    }

    #[test]
    fn kernels_are_negative_going() {
        let bank = TemplateBank::new(TemplateShape::Gaussian, 0.5, 1.5, 3, 30.0);
        for template in bank.templates() {
            let centre = template.len() / 2;
            assert!(template.taps()[centre] < 0.0);
        }
    }

    #[test]
    fn widths_are_linearly_spaced() {
        let bank = TemplateBank::new(TemplateShape::Gaussian, 0.5, 1.5, 5, 30.0);
        let widths: Vec<_> = bank.templates().iter().map(Template::width_s).collect();
        for (expected, actual) in [0.5, 0.75, 1.0, 1.25, 1.5].iter().zip(&widths) {
            assert_approx_eq!(expected, actual, 1e-12);
        }
        let lengths: Vec<_> = bank.templates().iter().map(Template::len).collect();
        assert_eq!(lengths, vec![15, 23, 30, 38, 45]);
        assert_eq!(bank.max_len(), 45);
    }

    #[test]
    fn short_kernels_clamp_to_three_samples() {
        let bank = TemplateBank::new(TemplateShape::Gaussian, 0.01, 0.02, 2, 30.0);
        for template in bank.templates() {
            assert_eq!(template.len(), 3);
        }
    }

    #[test]
    fn zero_count_clamps_to_one_kernel() {
        let bank = TemplateBank::new(TemplateShape::Gaussian, 0.5, 1.5, 0, 30.0);
        assert_eq!(bank.templates().len(), 1);
        assert_approx_eq!(bank.templates()[0].width_s(), 0.5, 1e-12);
    }
}

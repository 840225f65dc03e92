//! Streaming matched-filter responses against a template bank.

use crate::ring::RingBuffer;
use crate::template::{Template, TemplateBank};
use tractor_common::Real;

/// Floor applied to the energy product before the square root, so an idle
/// window yields a zero response rather than a division by zero.
pub(crate) const ENERGY_FLOOR: Real = 1e-12;

/// The strongest (most negative) matched-filter response at one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BankResponse {
    pub(crate) correlation: Real,
    pub(crate) template_index: usize,
}

/// Correlates the residual stream against every kernel in a bank.
///
/// The residual ring buffer is sized by the longest kernel and owned
/// exclusively by this engine; per-sample cost is O(bank size × kernel
/// length).
#[derive(Debug, Clone)]
pub(crate) struct CorrelationEngine {
    bank: TemplateBank,
    residuals: RingBuffer,
    samples_seen: usize,
}

impl CorrelationEngine {
    pub(crate) fn new(bank: TemplateBank) -> Self {
        let capacity = bank.max_len();
        Self {
            bank,
            residuals: RingBuffer::new(capacity),
            samples_seen: 0,
        }
    }

    /// Pushes one residual and returns the best response across the bank, or
    /// `None` until at least the shortest kernel's window has been seen.
    ///
    /// On equal responses the lowest template index wins.
    pub(crate) fn push(&mut self, residual: Real) -> Option<BankResponse> {
        self.residuals.push(residual);
        self.samples_seen += 1;

        let mut best: Option<BankResponse> = None;
        for (template_index, template) in self.bank.templates().iter().enumerate() {
            if self.samples_seen < template.len() {
                continue;
            }
            let correlation = self.correlate(template);
            if best.is_none_or(|current| correlation < current.correlation) {
                best = Some(BankResponse {
                    correlation,
                    template_index,
                });
            }
        }
        best
    }

    // Trailing-window dot with the reversed kernel: the newest residual meets
    // the kernel's first tap, matching same-mode convolution alignment.
    fn correlate(&self, template: &Template) -> Real {
        let mut dot = 0.0;
        let mut window_energy = 0.0;
        for (age, tap) in template.taps().iter().enumerate() {
            let value = self.residuals.from_newest(age).unwrap_or(0.0);
            dot += value * tap;
            window_energy += value * value;
        }
        dot / Real::sqrt(Real::max(window_energy * template.energy(), ENERGY_FLOOR))
    }
}

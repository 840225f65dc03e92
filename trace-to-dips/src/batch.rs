//! Whole-series forms of both detection engines.
//!
//! These functions are pure: no state survives a call, so they are safe to
//! run from multiple threads on independent inputs. They differ from the
//! streaming forms where the source methods differ: smoothing and
//! correlation are centre-aligned rather than trailing, the robust statistics
//! are computed once over the whole active region, and the peak picking
//! collapses contiguous candidate runs before applying the separation rule
//! with a replace-if-deeper tie-break.

use crate::correlation::ENERGY_FLOOR;
use crate::normalizer::{MAD_FLOOR, MAD_TO_SIGMA, median_in_place};
use crate::parameters::{
    MatchedBankParameters, ParameterError, SmoothedMinimaParameters, validate_sample_rate,
};
use crate::template::{Template, TemplateBank};
use crate::window::KalmanBaseline;
use tractor_common::{Detection, Real, Sample, SampleRateHz, duration_to_samples};

/// Runs the smoothed-minima method over a whole series.
///
/// A candidate is an active, strict local minimum of the boxcar-smoothed
/// series whose prominence over `±local_max_halfwin_s` reaches the
/// threshold. Candidates closer than the minimum separation resolve in
/// favour of the deeper dip.
pub fn smoothed_minima_detections(
    samples: &[Sample],
    parameters: &SmoothedMinimaParameters,
    sample_rate_hz: SampleRateHz,
) -> Result<Vec<Detection>, ParameterError> {
    validate_sample_rate(sample_rate_hz)?;
    let n = samples.len();
    if n < 3 {
        return Ok(Vec::new());
    }

    let width = duration_to_samples(parameters.smooth_window_s, sample_rate_hz, 1);
    let halfwin = duration_to_samples(parameters.local_max_halfwin_s, sample_rate_hz, 1);
    let min_separation = duration_to_samples(parameters.min_separation_s, sample_rate_hz, 0);

    let smoothed = boxcar_smooth(samples, width);

    let prominence_at = |i: usize| -> Real {
        let left = i.saturating_sub(halfwin);
        let right = usize::min(n, i + halfwin + 1);
        let local_max = smoothed[left..right]
            .iter()
            .copied()
            .fold(Real::MIN, Real::max);
        local_max - smoothed[i]
    };

    let mut accepted: Vec<usize> = Vec::new();
    for i in 1..n - 1 {
        if samples[i].value <= parameters.tractor_on_threshold {
            continue;
        }
        if !(smoothed[i] < smoothed[i - 1] && smoothed[i] <= smoothed[i + 1]) {
            continue;
        }
        let depth = prominence_at(i);
        if depth < parameters.prominence_threshold {
            continue;
        }
        match accepted.last().copied() {
            Some(previous) if i - previous < min_separation => {
                // Inside the separation window the deeper dip wins.
                if depth > prominence_at(previous) {
                    let last = accepted.len() - 1;
                    accepted[last] = i;
                }
            }
            _ => accepted.push(i),
        }
    }

    Ok(accepted
        .into_iter()
        .map(|i| Detection::smoothed_minima(i, samples[i].time, smoothed[i]))
        .collect())
}

/// Runs the Kalman/matched-filter-bank method over a whole series.
pub fn kalman_matched_detections(
    samples: &[Sample],
    parameters: &MatchedBankParameters,
    sample_rate_hz: SampleRateHz,
) -> Result<Vec<Detection>, ParameterError> {
    validate_sample_rate(sample_rate_hz)?;
    let n = samples.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let min_separation = duration_to_samples(parameters.min_separation_s, sample_rate_hz, 0);
    let bank = TemplateBank::new(
        parameters.template_shape,
        parameters.min_template_width_s,
        parameters.max_template_width_s,
        parameters.n_templates,
        sample_rate_hz,
    );

    let mut baseline = KalmanBaseline::new(parameters.kalman_q, parameters.kalman_r);
    let residual: Vec<Real> = samples
        .iter()
        .map(|sample| baseline.update(sample.value))
        .collect();

    // Best response across the bank at every sample; on ties the lowest
    // template index wins.
    let mut best_correlation = vec![Real::INFINITY; n];
    let mut best_template = vec![0usize; n];
    for (template_index, template) in bank.templates().iter().enumerate() {
        for (i, correlation) in matched_response(&residual, template).into_iter().enumerate() {
            if correlation < best_correlation[i] {
                best_correlation[i] = correlation;
                best_template[i] = template_index;
            }
        }
    }

    let active: Vec<bool> = samples
        .iter()
        .map(|sample| sample.value > parameters.tractor_on_threshold)
        .collect();

    // Robust statistics over the active region, falling back to the whole
    // series when the tractor never switches on.
    let mut scratch: Vec<Real> = best_correlation
        .iter()
        .zip(active.iter())
        .filter(|(correlation, is_active)| **is_active && correlation.is_finite())
        .map(|(correlation, _)| *correlation)
        .collect();
    if scratch.is_empty() {
        scratch = best_correlation
            .iter()
            .copied()
            .filter(|correlation| correlation.is_finite())
            .collect();
    }
    let median = median_in_place(&mut scratch);
    for value in scratch.iter_mut() {
        *value = (*value - median).abs();
    }
    let mad = median_in_place(&mut scratch) + MAD_FLOOR;

    let z_scores: Vec<Real> = best_correlation
        .iter()
        .map(|correlation| (correlation - median) / (MAD_TO_SIGMA * mad))
        .collect();

    let candidates: Vec<usize> = (0..n)
        .filter(|&i| active[i] && z_scores[i].is_finite() && z_scores[i] < parameters.z_threshold)
        .collect();

    // Collapse each contiguous qualifying run to its deepest z before
    // enforcing the separation rule.
    let mut accepted: Vec<usize> = Vec::new();
    let mut cursor = 0;
    while cursor < candidates.len() {
        let mut end = cursor;
        let mut best_index = candidates[cursor];
        while end + 1 < candidates.len() && candidates[end + 1] - candidates[end] <= 1 {
            end += 1;
            if z_scores[candidates[end]] < z_scores[best_index] {
                best_index = candidates[end];
            }
        }
        match accepted.last().copied() {
            Some(previous) if best_index - previous < min_separation => {
                if z_scores[best_index] < z_scores[previous] {
                    let last = accepted.len() - 1;
                    accepted[last] = best_index;
                }
            }
            _ => accepted.push(best_index),
        }
        cursor = end + 1;
    }

    Ok(accepted
        .into_iter()
        .map(|i| {
            Detection::kalman_matched(
                i,
                samples[i].time,
                samples[i].value,
                best_template[i],
                best_correlation[i],
                z_scores[i],
            )
        })
        .collect())
}

// Edge-replicated boxcar aligned the way same-mode convolution over an
// edge-padded series lands: the window for sample `i` spans
// `[i - width/2, i + width - 1 - width/2]`.
fn boxcar_smooth(samples: &[Sample], width: usize) -> Vec<Real> {
    let n = samples.len();
    let pad = (width / 2) as isize;
    let value_at = |index: isize| -> Real {
        let clamped = index.clamp(0, n as isize - 1) as usize;
        samples[clamped].value
    };
    (0..n as isize)
        .map(|i| {
            (0..width as isize)
                .map(|offset| value_at(i - pad + offset))
                .sum::<Real>()
                / width as Real
        })
        .collect()
}

// Normalized matched-filter response with same-mode alignment: the window
// for sample `i` spans `[i - (L-1-c), i + c]` with `c = (L-1)/2`. Samples
// whose window does not fit entirely inside the series get no response,
// mirroring the streaming warm-up; truncated edge windows would otherwise
// correlate with whatever shape the cut happens to leave.
fn matched_response(residual: &[Real], template: &Template) -> Vec<Real> {
    let n = residual.len();
    let length = template.len();
    let centre = (length - 1) / 2;
    let lead = length - 1 - centre;
    let taps = template.taps();
    let template_energy = template.energy();

    (0..n)
        .map(|i| {
            if i < lead || i + centre >= n {
                return Real::NAN;
            }
            let start = i - lead;
            let mut dot = 0.0;
            let mut window_energy = 0.0;
            for (j, tap) in taps.iter().enumerate() {
                let value = residual[start + j];
                dot += value * tap;
                window_energy += value * value;
            }
            dot / Real::sqrt(Real::max(window_energy * template_energy, ENERGY_FLOOR))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tractor_common::DetectionMethod;

    const SAMPLE_RATE: SampleRateHz = 30.0;

    fn flat_series(n: usize, level: Real) -> Vec<Sample> {
        (0..n)
            .map(|i| Sample::new(i as Real / SAMPLE_RATE, level))
            .collect()
    }

    fn inject_hann_dip(samples: &mut [Sample], centre: usize, width: usize, depth: Real) {
        let start = centre - width / 2;
        for (offset, sample) in samples[start..start + width].iter_mut().enumerate() {
            let phase = offset as Real / width as Real;
            sample.value -= depth * 0.5 * (1.0 - Real::cos(2.0 * std::f64::consts::PI * phase));
        }
    }

    fn inject_v_dip(samples: &mut [Sample], centre: usize, half_width: usize, depth: Real) {
        for (i, sample) in samples.iter_mut().enumerate() {
            let distance = centre.abs_diff(i);
            if distance <= half_width {
                sample.value -= depth * (1.0 - distance as Real / half_width as Real);
            }
        }
    }

    fn minima_parameters() -> SmoothedMinimaParameters {
        SmoothedMinimaParameters {
            smooth_window_s: 0.1,
            local_max_halfwin_s: 0.5,
            min_separation_s: 2.0,
            ..SmoothedMinimaParameters::default()
        }
    }

    fn bank_parameters() -> MatchedBankParameters {
        MatchedBankParameters {
            min_template_width_s: 0.4,
            max_template_width_s: 0.4,
            n_templates: 1,
            min_separation_s: 2.0,
            ..MatchedBankParameters::default()
        }
    }

    #[test]
    fn short_or_empty_series_yield_nothing() {
        let samples = flat_series(2, 4000.0);
        assert!(
            smoothed_minima_detections(&samples, &minima_parameters(), SAMPLE_RATE)
                .unwrap()
                .is_empty()
        );
        assert!(
            kalman_matched_detections(&[], &bank_parameters(), SAMPLE_RATE)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn constant_series_yields_nothing() {
        let samples = flat_series(600, 4000.0);
        assert!(
            smoothed_minima_detections(&samples, &minima_parameters(), SAMPLE_RATE)
                .unwrap()
                .is_empty()
        );
        assert!(
            kalman_matched_detections(&samples, &bank_parameters(), SAMPLE_RATE)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn smoothed_minima_finds_a_single_dip() {
        let mut samples = flat_series(600, 4000.0);
        inject_v_dip(&mut samples, 300, 6, 100.0);
        let detections =
            smoothed_minima_detections(&samples, &minima_parameters(), SAMPLE_RATE).unwrap();
        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].method, DetectionMethod::SmoothedMinima);
        assert!(detections[0].sample_index.abs_diff(300) <= 3);
        assert!(detections[0].value < 4000.0);
    }

    #[test]
    fn smoothed_minima_replaces_with_the_deeper_dip() {
        // Two dips 1 s apart with a 2 s separation: the batch rule keeps the
        // deeper second dip, unlike the streaming earliest-wins rule.
        let mut samples = flat_series(700, 4000.0);
        inject_v_dip(&mut samples, 300, 6, 80.0);
        inject_v_dip(&mut samples, 330, 6, 160.0);
        let detections =
            smoothed_minima_detections(&samples, &minima_parameters(), SAMPLE_RATE).unwrap();
        assert_eq!(detections.len(), 1);
        assert!(detections[0].sample_index.abs_diff(330) <= 3);
    }

    #[test]
    fn smoothed_minima_respects_the_activity_gate() {
        let mut samples = flat_series(600, 1000.0);
        inject_v_dip(&mut samples, 300, 6, 100.0);
        let detections =
            smoothed_minima_detections(&samples, &minima_parameters(), SAMPLE_RATE).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn kalman_matched_finds_a_single_dip() {
        let width = 12;
        let centre = 300;
        let mut samples = flat_series(600, 4000.0);
        inject_hann_dip(&mut samples, centre, width, 50.0);
        let detections =
            kalman_matched_detections(&samples, &bank_parameters(), SAMPLE_RATE).unwrap();
        assert_eq!(detections.len(), 1);

        let detection = &detections[0];
        assert_eq!(detection.method, DetectionMethod::KalmanMatched);
        assert!(detection.sample_index.abs_diff(centre) <= width / 2);
        assert_eq!(detection.template_index, Some(0));
        assert!(detection.correlation.unwrap() < 0.0);
        assert!(detection.z_score.unwrap() < -3.0);
    }

    #[test]
    fn kalman_matched_separates_distinct_dips() {
        let width = 12;
        let centres = [200, 320, 440];
        let mut samples = flat_series(600, 4000.0);
        for &centre in &centres {
            inject_hann_dip(&mut samples, centre, width, 50.0);
        }
        let parameters = MatchedBankParameters {
            min_separation_s: 1.0,
            ..bank_parameters()
        };
        let detections = kalman_matched_detections(&samples, &parameters, SAMPLE_RATE).unwrap();
        assert_eq!(detections.len(), 3);
        let min_separation = duration_to_samples(1.0, SAMPLE_RATE, 0);
        for pair in detections.windows(2) {
            assert!(pair[1].sample_index - pair[0].sample_index >= min_separation);
        }
    }

    #[test]
    fn kalman_matched_collapses_contiguous_candidates_to_the_deepest() {
        let width = 12;
        let centre = 300;
        let mut samples = flat_series(600, 4000.0);
        inject_hann_dip(&mut samples, centre, width, 200.0);
        let detections =
            kalman_matched_detections(&samples, &bank_parameters(), SAMPLE_RATE).unwrap();
        // A deep dip qualifies at several neighbouring samples; exactly one
        // survives, at the deepest response of the run.
        assert_eq!(detections.len(), 1);
        let z_at_detection = detections[0].z_score.unwrap();
        assert!(z_at_detection < -3.0);
    }

    #[test]
    fn batch_results_are_reproducible() {
        let mut samples = flat_series(600, 4000.0);
        inject_hann_dip(&mut samples, 300, 12, 50.0);
        let first = kalman_matched_detections(&samples, &bank_parameters(), SAMPLE_RATE).unwrap();
        let second = kalman_matched_detections(&samples, &bank_parameters(), SAMPLE_RATE).unwrap();
        assert_eq!(first, second);
    }
}

//! Monte-Carlo sweep over detector configurations.

use crate::error::SimulationError;
use crate::matching::{TrialResult, match_detections};
use crate::synthetic::SyntheticConfig;
use itertools::iproduct;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use trace_to_dips::iterators::EventFilter;
use trace_to_dips::{KalmanMatchedDetector, MatchedBankParameters};
use tractor_common::{Real, Time};

/// The sweep grid and trial count.
///
/// Each `(template_length, threshold)` pair runs the Kalman/matched-filter
/// bank detector with a single kernel of that length and a z-threshold of
/// minus the given (positive) threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SweepConfig {
    /// Kernel lengths to try, in samples.
    pub template_lengths: Vec<usize>,
    /// Detection thresholds to try, as positive z-score magnitudes.
    pub thresholds: Vec<Real>,
    /// Independent simulations per configuration.
    pub trials: usize,
    /// Base seed; every configuration derives its own seed stream from it.
    pub seed_base: u64,
    /// Maximum distance between a detection and the dip start it may claim.
    pub match_tolerance_s: Real,
    /// Weight of false positives per minute in the ranking score.
    pub score_false_positive_weight: Real,
    pub synthetic: SyntheticConfig,
    /// Base detector settings; kernel width, count and threshold are
    /// overridden per grid cell.
    pub detector: MatchedBankParameters,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            template_lengths: vec![4, 5, 6, 7, 8],
            thresholds: vec![1.6, 2.0, 2.4, 2.8],
            trials: 200,
            seed_base: 12345,
            match_tolerance_s: 0.5,
            score_false_positive_weight: 0.02,
            synthetic: SyntheticConfig::default(),
            detector: MatchedBankParameters::default(),
        }
    }
}

/// Aggregated counts and rates for one `(template_length, threshold)` pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigScore {
    pub template_length: usize,
    pub threshold: Real,
    pub trials: usize,
    pub failed_trials: usize,
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub n_true_events: usize,
    pub n_detections: usize,
    pub simulated_minutes: Real,
}

impl ConfigScore {
    /// Recall over all true events seen across trials.
    pub fn true_positive_rate(&self) -> Real {
        if self.n_true_events > 0 {
            self.true_positives as Real / self.n_true_events as Real
        } else {
            0.0
        }
    }

    /// Unmatched detections per minute of simulated time.
    pub fn false_positives_per_minute(&self) -> Real {
        if self.simulated_minutes > 0.0 {
            self.false_positives as Real / self.simulated_minutes
        } else {
            0.0
        }
    }

    /// Recall penalized by the false-positive rate.
    pub fn score(&self, false_positive_weight: Real) -> Real {
        self.true_positive_rate() - false_positive_weight * self.false_positives_per_minute()
    }

    fn fold(&mut self, trial: &TrialResult) {
        self.true_positives += trial.true_positives;
        self.false_positives += trial.false_positives;
        self.false_negatives += trial.false_negatives;
        self.n_true_events += trial.n_true_events;
        self.n_detections += trial.n_detections;
    }
}

impl Display for ConfigScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "L={}, thr={}: TPR={:.3}, FPR/min={:.3}, TP={}, FP={}, FN={}",
            self.template_length,
            self.threshold,
            self.true_positive_rate(),
            self.false_positives_per_minute(),
            self.true_positives,
            self.false_positives,
            self.false_negatives,
        )
    }
}

/// Runs every configuration in the grid and returns one score per cell, in
/// grid order.
pub fn run_sweep(config: &SweepConfig) -> Vec<ConfigScore> {
    let total = config.template_lengths.len() * config.thresholds.len();
    tracing::info!(
        configurations = total,
        trials_per_configuration = config.trials,
        "starting Monte-Carlo sweep"
    );
    iproduct!(&config.template_lengths, &config.thresholds)
        .map(|(&template_length, &threshold)| {
            let score = run_config(config, template_length, threshold);
            tracing::info!(%score, "configuration complete");
            score
        })
        .collect()
}

/// Sorts scores best-first under [`ConfigScore::score`].
pub fn rank_by_score(mut scores: Vec<ConfigScore>, false_positive_weight: Real) -> Vec<ConfigScore> {
    scores.sort_by(|a, b| {
        b.score(false_positive_weight)
            .total_cmp(&a.score(false_positive_weight))
    });
    scores
}

fn run_config(config: &SweepConfig, template_length: usize, threshold: Real) -> ConfigScore {
    // Seeds are drawn sequentially before the trials run in parallel, so the
    // sweep is deterministic regardless of scheduling; aggregation is a
    // commutative sum.
    let config_seed = config
        .seed_base
        .wrapping_add(10 * template_length as u64)
        .wrapping_add((100.0 * threshold) as u64);
    let mut rng = StdRng::seed_from_u64(config_seed);
    let seeds: Vec<u64> = (0..config.trials)
        .map(|_| rng.random_range(1..1_000_000))
        .collect();

    let outcomes: Vec<Result<TrialResult, SimulationError>> = seeds
        .par_iter()
        .map(|&seed| run_trial(config, template_length, threshold, seed))
        .collect();

    let mut score = ConfigScore {
        template_length,
        threshold,
        trials: config.trials,
        failed_trials: 0,
        true_positives: 0,
        false_positives: 0,
        false_negatives: 0,
        n_true_events: 0,
        n_detections: 0,
        simulated_minutes: 0.0,
    };
    for outcome in &outcomes {
        match outcome {
            Ok(trial) => score.fold(trial),
            Err(error) => {
                tracing::warn!(%error, template_length, threshold, "trial failed");
                score.failed_trials += 1;
            }
        }
    }
    score.simulated_minutes =
        (config.trials - score.failed_trials) as Real * config.synthetic.duration_s / 60.0;
    score
}

fn run_trial(
    config: &SweepConfig,
    template_length: usize,
    threshold: Real,
    seed: u64,
) -> Result<TrialResult, SimulationError> {
    let trial = config.synthetic.generate(seed)?;

    let sample_rate_hz = config.synthetic.sample_rate_hz;
    let width_s = template_length as Real / sample_rate_hz;
    let parameters = MatchedBankParameters {
        min_template_width_s: width_s,
        max_template_width_s: width_s,
        n_templates: 1,
        z_threshold: -threshold,
        ..config.detector.clone()
    };
    let detector = KalmanMatchedDetector::new(&parameters, sample_rate_hz)?;

    let detection_times: Vec<Time> = trial
        .samples
        .iter()
        .map(|sample| (sample.time, sample.value))
        .events(detector)
        .map(|detection| detection.time)
        .collect();

    Ok(match_detections(
        &detection_times,
        &trial.dip_starts,
        config.match_tolerance_s,
    ))
}

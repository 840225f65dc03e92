//! Synthetic tractor-pressure streams with known dip times.

use crate::error::SimulationError;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tractor_common::{Pressure, Real, Sample, SampleRateHz, Time};

/// An inclusive numeric interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Interval<T> {
    pub min: T,
    pub max: T,
}

/// Shape of one simulated trial.
///
/// Dip start times are drawn by accumulating inter-dip gaps uniformly from
/// the jitter interval until the duration is exhausted; each dip subtracts a
/// raised-cosine envelope of the given depth and duration from a flat mean
/// level with Gaussian noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SyntheticConfig {
    pub duration_s: Real,
    pub sample_rate_hz: SampleRateHz,
    pub mean_level: Pressure,
    pub noise_sigma: Real,
    pub dip_depth: Real,
    pub dip_duration_s: Real,
    pub period_jitter_s: Interval<Real>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            duration_s: 120.0,
            sample_rate_hz: 30.0,
            mean_level: 4000.0,
            noise_sigma: 200.0,
            dip_depth: 20.0,
            dip_duration_s: 0.125,
            period_jitter_s: Interval { min: 3.0, max: 6.0 },
        }
    }
}

/// One simulated series plus its ground-truth dip start times.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticTrial {
    pub samples: Vec<Sample>,
    pub dip_starts: Vec<Time>,
}

impl SyntheticConfig {
    /// Generates one trial. Identical seeds yield identical trials.
    pub fn generate(&self, seed: u64) -> Result<SyntheticTrial, SimulationError> {
        let jitter = self.period_jitter_s;
        if !(jitter.min > 0.0 && jitter.max >= jitter.min) {
            return Err(SimulationError::Jitter {
                min: jitter.min,
                max: jitter.max,
            });
        }
        let noise = Normal::new(0.0, self.noise_sigma)?;
        let mut rng = StdRng::seed_from_u64(seed);

        let mut dip_starts = Vec::new();
        let mut next = sample_gap(&mut rng, jitter);
        while next < self.duration_s {
            dip_starts.push(next);
            next += sample_gap(&mut rng, jitter);
        }

        let n_total = (self.duration_s * self.sample_rate_hz).round() as usize;
        let sample_interval = 1.0 / self.sample_rate_hz;
        let mut samples = Vec::with_capacity(n_total);
        for i in 0..n_total {
            let time = i as Real * sample_interval;
            let mut value = self.mean_level + noise.sample(&mut rng);
            if let Some(start) = self.active_dip_at(&dip_starts, time) {
                let phase = ((time - start) / Real::max(self.dip_duration_s, 1e-9))
                    .clamp(0.0, 0.999_999);
                let envelope = 0.5 * (1.0 - Real::cos(2.0 * std::f64::consts::PI * phase));
                value -= self.dip_depth * envelope;
            }
            samples.push(Sample::new(time, value));
        }

        Ok(SyntheticTrial {
            samples,
            dip_starts,
        })
    }

    /// The most recent dip start whose window still covers `time`, if any.
    fn active_dip_at(&self, dip_starts: &[Time], time: Time) -> Option<Time> {
        let next = dip_starts.partition_point(|&start| start <= time);
        next.checked_sub(1)
            .map(|previous| dip_starts[previous])
            .filter(|&start| time < start + self.dip_duration_s)
    }
}

fn sample_gap(rng: &mut StdRng, jitter: Interval<Real>) -> Real {
    if jitter.max > jitter.min {
        rng.random_range(jitter.min..jitter.max)
    } else {
        jitter.min
    }
}

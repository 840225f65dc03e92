use super::Window;
use tractor_common::{Pressure, Real, Time};

/// Random-walk Kalman filter tracking slow drift of the signal baseline.
///
/// Larger `q` lets the baseline track faster, leaving less residual signal
/// for detection; larger `r` makes it trust new measurements less, giving a
/// smoother baseline. Numerically stable for any `q, r > 0`.
#[derive(Debug, Clone)]
pub struct KalmanBaseline {
    process_variance: Real,
    measurement_variance: Real,
    state: Option<State>,
}

#[derive(Debug, Clone, Copy)]
struct State {
    estimate: Real,
    variance: Real,
    residual: Real,
}

impl KalmanBaseline {
    pub fn new(process_variance: Real, measurement_variance: Real) -> Self {
        Self {
            process_variance,
            measurement_variance,
            state: None,
        }
    }

    /// Folds in one measurement and returns the residual `x - b`.
    ///
    /// The state is initialised to `(x, 1.0)` on the first call, so the first
    /// residual is always zero.
    pub fn update(&mut self, value: Pressure) -> Real {
        match self.state.as_mut() {
            None => {
                self.state = Some(State {
                    estimate: value,
                    variance: 1.0,
                    residual: 0.0,
                });
                0.0
            }
            Some(state) => {
                let predicted = state.variance + self.process_variance;
                let gain = predicted / (predicted + self.measurement_variance);
                state.estimate += gain * (value - state.estimate);
                state.variance = (1.0 - gain) * predicted;
                state.residual = value - state.estimate;
                state.residual
            }
        }
    }

    pub fn estimate(&self) -> Option<Real> {
        self.state.map(|state| state.estimate)
    }
}

impl Window for KalmanBaseline {
    type OutputType = Real;

    fn push(&mut self, value: Pressure) -> bool {
        self.update(value);
        true
    }

    fn output(&self) -> Option<Real> {
        self.state.map(|state| state.residual)
    }

    fn apply_time_shift(&self, time: Time) -> Time {
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::WindowFilter;

    #[test]
    fn constant_signal_converges_monotonically() {
        let mut baseline = KalmanBaseline::new(0.5, 100.0);
        baseline.update(5.0);
        let mut previous = (baseline.estimate().unwrap() - 2.0).abs();
        for _ in 0..200 {
            baseline.update(2.0);
            let error = (baseline.estimate().unwrap() - 2.0).abs();
            assert!(error <= previous);
            previous = error;
        }
        assert!(previous < 1e-3);
    }

    #[test]
    fn larger_process_variance_tracks_faster() {
        let mut nimble = KalmanBaseline::new(10.0, 100.0);
        let mut sluggish = KalmanBaseline::new(0.1, 100.0);
        nimble.update(0.0);
        sluggish.update(0.0);
        for _ in 0..50 {
            nimble.update(100.0);
            sluggish.update(100.0);
        }
        let nimble_error = (nimble.estimate().unwrap() - 100.0).abs();
        let sluggish_error = (sluggish.estimate().unwrap() - 100.0).abs();
        assert!(nimble_error < sluggish_error);
    }

    #[test]
    fn first_residual_is_zero() {
        let input: Vec<Real> = vec![7.0, 7.5, 8.0];
        let output: Vec<_> = input
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i as Real, v))
            .window(KalmanBaseline::new(1.0, 10.0))
            .collect();

        assert_eq!(output.len(), 3);
        assert_eq!(output[0], (0.0, 0.0));
        assert!(output[1].1 > 0.0);
    }

    #[test]
    fn residual_of_constant_signal_decays() {
        let mut baseline = KalmanBaseline::new(1.0, 100.0);
        baseline.update(10.0);
        let early = baseline.update(3.0).abs();
        let mut late = early;
        for _ in 0..100 {
            late = baseline.update(3.0).abs();
        }
        assert!(late < early);
        assert!(late < 1e-2);
    }
}

use thiserror::Error;
use trace_to_dips::ParameterError;
use tractor_common::Real;

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("invalid noise distribution: {0}")]
    Noise(#[from] rand_distr::NormalError),

    #[error("period jitter must satisfy 0 < min <= max, got {min}..{max}")]
    Jitter { min: Real, max: Real },

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

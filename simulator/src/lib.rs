//! Monte-Carlo evaluation of the dip-detection engines.
//!
//! Simulates synthetic tractor-pressure streams with known dip times, runs a
//! detector configuration over many independent trials, and aggregates
//! true/false-positive statistics per `(template length, threshold)` pair.

pub mod error;
pub mod matching;
pub mod sweep;
pub mod synthetic;

pub use error::SimulationError;
pub use matching::{TrialResult, match_detections};
pub use sweep::{ConfigScore, SweepConfig, rank_by_score, run_sweep};
pub use synthetic::{Interval, SyntheticConfig, SyntheticTrial};

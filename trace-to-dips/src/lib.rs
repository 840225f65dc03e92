//! This crate provides tools for converting a quasi-periodic pressure stream
//! into dip events which represent individual tractor strokes, and for
//! deriving the stroke period and speed from the timing of accepted events.
//!
//! Two independent engines are provided, each in a causal streaming form and
//! a whole-series batch form: a smoothed-minima/prominence detector, and a
//! Kalman-baseline plus matched-filter-bank detector. Typical streaming usage
//! looks like:
//! ```
//! use tractor_common::Sample;
//! use trace_to_dips::detectors::SmoothedMinimaDetector;
//! use trace_to_dips::iterators::EventFilter;
//! use trace_to_dips::parameters::SmoothedMinimaParameters;
//!
//! let samples = vec![Sample::new(0.0, 4000.0), Sample::new(1.0 / 30.0, 3990.0)];
//! let detector =
//!     SmoothedMinimaDetector::new(&SmoothedMinimaParameters::default(), 30.0).unwrap();
//! let detections: Vec<_> = samples
//!     .into_iter()
//!     .map(|sample| (sample.time, sample.value))
//!     .events(detector)
//!     .collect();
//! assert!(detections.is_empty());
//! ```

pub mod batch;
pub mod detectors;
pub mod iterators;
pub mod parameters;
pub mod periods;
pub mod template;
pub mod window;

pub(crate) mod correlation;
pub(crate) mod normalizer;
pub(crate) mod ring;

pub use detectors::{Detector, KalmanMatchedDetector, SmoothedMinimaDetector};
pub use parameters::{MatchedBankParameters, ParameterError, SmoothedMinimaParameters};
pub use template::{TemplateBank, TemplateShape};

pub use tractor_common::Real;

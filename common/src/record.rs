//! Output records shared by the detection core and the evaluation harness.

use crate::{Pressure, Real, SampleIndex, Time};
use serde::Serialize;
use strum::Display;

/// Identifies which detection engine produced a [`Detection`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DetectionMethod {
    SmoothedMinima,
    KalmanMatched,
}

/// One accepted dip event.
///
/// `template_index`, `correlation` and `z_score` are populated by the
/// Kalman/matched-filter-bank method only; the smoothed-minima method reports
/// the smoothed trace value in `value` and leaves them `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Detection {
    pub sample_index: SampleIndex,
    pub time: Time,
    pub value: Pressure,
    pub method: DetectionMethod,
    pub template_index: Option<usize>,
    pub correlation: Option<Real>,
    pub z_score: Option<Real>,
}

impl Detection {
    pub fn smoothed_minima(sample_index: SampleIndex, time: Time, value: Pressure) -> Self {
        Self {
            sample_index,
            time,
            value,
            method: DetectionMethod::SmoothedMinima,
            template_index: None,
            correlation: None,
            z_score: None,
        }
    }

    pub fn kalman_matched(
        sample_index: SampleIndex,
        time: Time,
        value: Pressure,
        template_index: usize,
        correlation: Real,
        z_score: Real,
    ) -> Self {
        Self {
            sample_index,
            time,
            value,
            method: DetectionMethod::KalmanMatched,
            template_index: Some(template_index),
            correlation: Some(correlation),
            z_score: Some(z_score),
        }
    }
}

/// The stroke interval between two consecutive detections.
///
/// `speed` is the exact reciprocal of `period`, never an independent estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeriodRecord {
    pub mid_time: Time,
    pub period: Real,
    pub speed: Real,
}

impl PeriodRecord {
    /// Builds the record for the pair of consecutive detection times
    /// `(earlier, later)`.
    pub fn from_pair(earlier: Time, later: Time) -> Self {
        let period = later - earlier;
        Self {
            mid_time: 0.5 * (earlier + later),
            period,
            speed: 1.0 / period,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_names_match_the_wire_format() {
        assert_eq!(DetectionMethod::SmoothedMinima.to_string(), "smoothed_minima");
        assert_eq!(DetectionMethod::KalmanMatched.to_string(), "kalman_matched");
    }

    #[test]
    fn detection_serializes_with_record_columns() {
        let detection = Detection::kalman_matched(42, 1.4, 3950.0, 2, -0.81, -3.4);
        let json = serde_json::to_string(&detection).unwrap();
        assert!(json.contains("\"sample_index\":42"));
        assert!(json.contains("\"method\":\"kalman_matched\""));
        assert!(json.contains("\"template_index\":2"));

        let detection = Detection::smoothed_minima(7, 0.2, 3975.5);
        let json = serde_json::to_string(&detection).unwrap();
        assert!(json.contains("\"method\":\"smoothed_minima\""));
        assert!(json.contains("\"correlation\":null"));
    }

    #[test]
    fn speed_is_the_exact_reciprocal() {
        let record = PeriodRecord::from_pair(10.0, 13.2);
        assert_eq!(record.speed, 1.0 / record.period);
        assert_eq!(record.mid_time, 11.6);
    }
}

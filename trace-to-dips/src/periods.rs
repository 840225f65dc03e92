//! Derives stroke periods and speeds from an ordered detection sequence.

use itertools::Itertools;
use tractor_common::{Detection, PeriodRecord};

/// Produces one record per consecutive pair of detections.
///
/// Fewer than two detections yield an empty sequence, not an error.
pub fn compute_periods(detections: &[Detection]) -> Vec<PeriodRecord> {
    detections
        .iter()
        .map(|detection| detection.time)
        .tuple_windows()
        .map(|(earlier, later)| PeriodRecord::from_pair(earlier, later))
        .collect()
}

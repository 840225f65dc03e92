//! Matches detections against ground-truth dip times.

use serde::Serialize;
use tractor_common::{Real, Time};

/// Confusion counts for one simulated trial.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TrialResult {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub n_true_events: usize,
    pub n_detections: usize,
}

/// Greedy first-available matching.
///
/// Detections are taken in order and each claims the earliest unmatched true
/// event within `tolerance_s`; every true event is matched at most once.
/// Unmatched detections count as false positives, unmatched true events as
/// false negatives.
pub fn match_detections(
    detection_times: &[Time],
    true_starts: &[Time],
    tolerance_s: Real,
) -> TrialResult {
    let mut matched = vec![false; true_starts.len()];
    let mut true_positives = 0;

    for &detection in detection_times {
        let claim = true_starts
            .iter()
            .enumerate()
            .position(|(i, &start)| !matched[i] && (start - detection).abs() <= tolerance_s);
        if let Some(i) = claim {
            matched[i] = true;
            true_positives += 1;
        }
    }

    TrialResult {
        true_positives,
        false_positives: detection_times.len() - true_positives,
        false_negatives: true_starts.len() - true_positives,
        n_true_events: true_starts.len(),
        n_detections: detection_times.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_count_nothing() {
        let result = match_detections(&[], &[], 0.5);
        assert_eq!(result, TrialResult::default());
    }

    #[test]
    fn each_true_event_is_claimed_at_most_once() {
        // Two detections near one true event: the second becomes a false
        // positive.
        let result = match_detections(&[10.0, 10.3], &[10.1], 0.5);
        assert_eq!(result.true_positives, 1);
        assert_eq!(result.false_positives, 1);
        assert_eq!(result.false_negatives, 0);
    }

    #[test]
    fn detections_outside_tolerance_are_false_positives() {
        let result = match_detections(&[5.0, 20.0], &[10.0, 19.8], 0.5);
        assert_eq!(result.true_positives, 1);
        assert_eq!(result.false_positives, 1);
        assert_eq!(result.false_negatives, 1);
        assert_eq!(result.n_true_events, 2);
        assert_eq!(result.n_detections, 2);
    }

    #[test]
    fn claims_go_to_the_earliest_unmatched_event() {
        // One detection equidistant between two true events claims the first;
        // the follow-up detection then claims the second.
        let result = match_detections(&[10.0, 10.1], &[9.8, 10.2], 0.5);
        assert_eq!(result.true_positives, 2);
        assert_eq!(result.false_positives, 0);
    }
}

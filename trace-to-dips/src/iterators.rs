//! Iterator adapters connecting sample streams to detectors.

use crate::detectors::Detector;
use tractor_common::{Detection, Pressure, Time};

/// Lazily converts a `(time, value)` sample stream into detections.
pub struct EventIter<I, D>
where
    I: Iterator<Item = (Time, Pressure)>,
    D: Detector,
{
    source: I,
    detector: D,
}

impl<I, D> Iterator for EventIter<I, D>
where
    I: Iterator<Item = (Time, Pressure)>,
    D: Detector,
{
    type Item = Detection;

    fn next(&mut self) -> Option<Detection> {
        loop {
            let (time, value) = self.source.next()?;
            if let Some(event) = self.detector.signal(time, value) {
                return Some(event);
            }
        }
    }
}

pub trait EventFilter<I, D>
where
    I: Iterator<Item = (Time, Pressure)>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D>;
}

impl<I, D> EventFilter<I, D> for I
where
    I: Iterator<Item = (Time, Pressure)>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D> {
        EventIter {
            source: self,
            detector,
        }
    }
}

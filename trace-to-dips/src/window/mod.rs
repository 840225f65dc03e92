pub(crate) mod kalman_baseline;
pub(crate) mod moving_average;

pub use kalman_baseline::KalmanBaseline;
pub use moving_average::MovingAverage;

use tractor_common::{Pressure, Time};

/// A causal per-sample transform stage.
pub trait Window: Clone {
    type OutputType;

    /// Feeds one value; returns true once the stage has output for it.
    fn push(&mut self, value: Pressure) -> bool;
    fn output(&self) -> Option<Self::OutputType>;
    /// Maps the current sample time to the time the output refers to.
    fn apply_time_shift(&self, time: Time) -> Time;
}

#[derive(Clone)]
pub struct WindowIter<I, W>
where
    I: Iterator<Item = (Time, Pressure)>,
    W: Window,
{
    window_function: W,
    source: I,
}

impl<I, W> WindowIter<I, W>
where
    I: Iterator<Item = (Time, Pressure)>,
    W: Window,
{
    pub fn new(source: I, window_function: W) -> Self {
        WindowIter {
            source,
            window_function,
        }
    }
}

impl<I, W> Iterator for WindowIter<I, W>
where
    I: Iterator<Item = (Time, Pressure)>,
    W: Window,
{
    type Item = (Time, W::OutputType);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (time, value) = self.source.next()?;
            if self.window_function.push(value) {
                return Some((
                    self.window_function.apply_time_shift(time),
                    self.window_function.output()?,
                ));
            }
        }
    }
}

pub trait WindowFilter<I, W>
where
    I: Iterator<Item = (Time, Pressure)>,
    W: Window,
{
    fn window(self, window: W) -> WindowIter<I, W>;
}

impl<I, W> WindowFilter<I, W> for I
where
    I: Iterator<Item = (Time, Pressure)>,
    W: Window,
{
    fn window(self, window: W) -> WindowIter<I, W> {
        WindowIter::<I, W>::new(self, window)
    }
}

//! Sample-until-stable helpers shared by the counter synchronizer and the charger detector.
//!
//! All of the bounded loops count iterations, never wall time: the per-iteration pause may be
//! jittered by the delay provider and the debounce thresholds are calibrated in polls.

use imx_aon_api::Delay;

/// What to do between two samples.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Pause {
    Ms(u32),
    /// Randomized sleep in `[min, max]` microseconds.
    RangeUs(u32, u32),
}

impl Pause {
    pub fn apply(self, delay: &mut dyn Delay) {
        match self {
            Pause::Ms(ms) => delay.delay_ms(ms),
            Pause::RangeUs(min, max) => delay.delay_range_us(min, max),
        }
    }
}

/// Result of looking at one sample.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Step<T> {
    Done(T),
    Continue(Pause),
}

/// Outcome of a bounded poll.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Polled<T> {
    /// `step` finished on poll number `at` (0-based).
    Done { at: u32, value: T },
    /// `budget` polls went by without `step` finishing.
    Exhausted,
}

impl<T> Polled<T> {
    pub fn is_done(&self) -> bool { matches!(self, Polled::Done { .. }) }
}

/// Call `step` at most `budget` times. No pause follows the poll that finishes.
pub fn poll_bounded<T, E>(
    delay: &mut dyn Delay,
    budget: u32,
    mut step: impl FnMut(u32) -> Result<Step<T>, E>,
) -> Result<Polled<T>, E> {
    for i in 0..budget {
        match step(i)? {
            Step::Done(value) => return Ok(Polled::Done { at: i, value }),
            Step::Continue(pause) => pause.apply(delay),
        }
    }
    Ok(Polled::Exhausted)
}

/// Busy-poll variant of [`poll_bounded`] for status bits that follow a write within a few
/// bus cycles.
pub fn busy_poll<E>(budget: u32, mut done: impl FnMut() -> Result<bool, E>) -> Result<Polled<()>, E> {
    for i in 0..budget {
        if done()? {
            return Ok(Polled::Done { at: i, value: () });
        }
        core::hint::spin_loop();
    }
    Ok(Polled::Exhausted)
}

/// Read until two back-to-back samples agree and return the agreed value.
///
/// Unbounded: only used on registers fed by a free-running clock, where disagreement can
/// only last until the next edge of that clock.
pub fn read_until_steady<E>(mut read: impl FnMut() -> Result<u32, E>) -> Result<u32, E> {
    loop {
        let first = read()?;
        let second = read()?;
        if first == second {
            return Ok(first);
        }
    }
}

/// Consecutive-hit counter. A miss resets the run.
#[derive(Debug, Copy, Clone)]
pub struct RunCounter {
    run: u32,
    required: u32,
}

impl RunCounter {
    /// Confirms once `required` hits have been seen in a row.
    pub fn new(required: u32) -> Self { RunCounter { run: 0, required } }

    /// Record one sample; returns true once the run is long enough.
    pub fn observe(&mut self, hit: bool) -> bool {
        if hit {
            self.run += 1;
        } else {
            self.run = 0;
        }
        self.confirmed()
    }

    pub fn confirmed(&self) -> bool { self.run >= self.required }

    pub fn run(&self) -> u32 { self.run }
}

/// Counts how many samples in a row repeated the one before. The first sample never counts
/// as a repeat.
#[derive(Debug, Copy, Clone)]
pub struct StableTracker<S> {
    prev: Option<S>,
    stables: u32,
    threshold: u32,
}

impl<S: PartialEq + Copy> StableTracker<S> {
    pub fn new(threshold: u32) -> Self { StableTracker { prev: None, stables: 0, threshold } }

    pub fn observe(&mut self, sample: S) -> bool {
        if self.prev == Some(sample) {
            self.stables += 1;
        } else {
            self.stables = 0;
        }
        self.prev = Some(sample);
        self.is_stable()
    }

    pub fn is_stable(&self) -> bool { self.stables >= self.threshold }
}

#[cfg(test)]
mod tests {
    use imx_aon_emu::{DelayCall, RecordingDelay};

    use super::*;

    #[test]
    fn bounded_poll_stops_on_done() {
        let mut delay = RecordingDelay::new();
        let r: Result<_, ()> =
            poll_bounded(&mut delay, 10, |i| Ok(if i == 3 { Step::Done(i * 2) } else { Step::Continue(Pause::Ms(1)) }));
        assert_eq!(r, Ok(Polled::Done { at: 3, value: 6 }));
        assert_eq!(delay.count(DelayCall::Ms(1)), 3);
    }

    #[test]
    fn bounded_poll_exhausts_budget() {
        let mut delay = RecordingDelay::new();
        let mut calls = 0;
        let r: Result<Polled<()>, ()> = poll_bounded(&mut delay, 7, |_| {
            calls += 1;
            Ok(Step::Continue(Pause::RangeUs(1000, 2000)))
        });
        assert_eq!(r, Ok(Polled::Exhausted));
        assert_eq!(calls, 7);
        assert_eq!(delay.calls.len(), 7);
    }

    #[test]
    fn bounded_poll_propagates_errors() {
        let mut delay = RecordingDelay::new();
        let r: Result<Polled<()>, &str> =
            poll_bounded(&mut delay, 5, |i| if i == 2 { Err("bus") } else { Ok(Step::Continue(Pause::Ms(1))) });
        assert_eq!(r, Err("bus"));
    }

    #[test]
    fn busy_poll_counts_attempts() {
        let mut attempts = 0;
        let r: Result<_, ()> = busy_poll(4, || {
            attempts += 1;
            Ok(false)
        });
        assert_eq!(r, Ok(Polled::Exhausted));
        assert_eq!(attempts, 4);
        let r: Result<_, ()> = busy_poll(4, || Ok(true));
        assert_eq!(r, Ok(Polled::Done { at: 0, value: () }));
    }

    #[test]
    fn steady_read_waits_for_agreement() {
        let mut samples = [1u32, 2, 3, 3].into_iter();
        let v: Result<u32, ()> = read_until_steady(|| Ok(samples.next().unwrap_or(9)));
        assert_eq!(v, Ok(3));
    }

    #[test]
    fn run_counter_resets_on_miss() {
        let mut run = RunCounter::new(3);
        assert!(!run.observe(true));
        assert!(!run.observe(true));
        assert!(!run.observe(false));
        assert!(!run.observe(true));
        assert!(!run.observe(true));
        assert!(run.observe(true));
    }

    #[test]
    fn stable_tracker_ignores_first_sample() {
        let mut t = StableTracker::new(2);
        assert!(!t.observe(1u8));
        assert!(!t.observe(1));
        assert!(t.observe(1));
        assert!(!t.observe(2));
        assert!(!t.is_stable());
    }
}

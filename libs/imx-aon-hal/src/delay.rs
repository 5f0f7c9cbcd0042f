use std::thread;
use std::time::Duration;

use imx_aon_api::Delay;
use rand::Rng;

/// Delay provider for hosted builds: sleeps the calling thread. Ranged delays pick a random
/// point in the range so that concurrent pollers don't line up.
#[derive(Debug, Default)]
pub struct StdDelay {}

impl StdDelay {
    pub fn new() -> Self { StdDelay {} }
}

impl Delay for StdDelay {
    fn delay_us(&mut self, us: u32) { thread::sleep(Duration::from_micros(us as u64)) }

    fn delay_ms(&mut self, ms: u32) { thread::sleep(Duration::from_millis(ms as u64)) }

    fn delay_range_us(&mut self, min_us: u32, max_us: u32) {
        let us = if max_us > min_us { rand::thread_rng().gen_range(min_us..=max_us) } else { min_us };
        self.delay_us(us)
    }
}

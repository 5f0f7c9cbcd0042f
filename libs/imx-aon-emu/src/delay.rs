use imx_aon_api::Delay;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DelayCall {
    Us(u32),
    Ms(u32),
    RangeUs(u32, u32),
}

/// Delay that returns immediately and remembers what it was asked for.
#[derive(Debug, Default)]
pub struct RecordingDelay {
    pub calls: Vec<DelayCall>,
}

impl RecordingDelay {
    pub fn new() -> Self { RecordingDelay { calls: Vec::new() } }

    pub fn count(&self, call: DelayCall) -> usize { self.calls.iter().filter(|c| **c == call).count() }
}

impl Delay for RecordingDelay {
    fn delay_us(&mut self, us: u32) { self.calls.push(DelayCall::Us(us)) }

    fn delay_ms(&mut self, ms: u32) { self.calls.push(DelayCall::Ms(ms)) }

    fn delay_range_us(&mut self, min_us: u32, max_us: u32) { self.calls.push(DelayCall::RangeUs(min_us, max_us)) }
}

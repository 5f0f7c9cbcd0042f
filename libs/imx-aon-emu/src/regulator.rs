use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use imx_aon_api::{RegulatorError, VbusRegulator};

#[derive(Default)]
struct State {
    enabled: AtomicBool,
    enables: AtomicU32,
    disables: AtomicU32,
}

/// Regulator that only tracks its state. Clones share the same state, so a test can hand
/// one copy to the device and keep another to look at.
#[derive(Clone, Default)]
pub struct FakeRegulator {
    state: Arc<State>,
    fail_enable: bool,
}

impl FakeRegulator {
    pub fn new() -> Self { Self::default() }

    pub fn failing() -> Self { FakeRegulator { state: Arc::new(State::default()), fail_enable: true } }

    pub fn enables(&self) -> u32 { self.state.enables.load(Ordering::SeqCst) }

    pub fn disables(&self) -> u32 { self.state.disables.load(Ordering::SeqCst) }
}

impl VbusRegulator for FakeRegulator {
    fn enable(&mut self) -> Result<(), RegulatorError> {
        if self.fail_enable {
            return Err(RegulatorError::Failed);
        }
        self.state.enabled.store(true, Ordering::SeqCst);
        self.state.enables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), RegulatorError> {
        self.state.enabled.store(false, Ordering::SeqCst);
        self.state.disables.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_enabled(&self) -> bool { self.state.enabled.load(Ordering::SeqCst) }
}

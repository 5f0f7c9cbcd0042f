use std::collections::HashMap;
use std::sync::Mutex;

use imx_aon_api::*;

const COUNTER_MASK: u64 = (1 << 47) - 1;

struct Model {
    counter: u64,
    /// Bus accesses per counter tick: the counter clock is much slower than the bus.
    accesses_per_tick: u32,
    since_tick: u32,
    lpcr: u32,
    lpsr: u32,
    lptar: u32,
    lppgdr: u32,
    /// SRTC_ENV ignores writes, as if the oscillator were dead.
    enable_stuck: bool,
    reads: HashMap<usize, usize>,
}

impl Model {
    fn running(&self) -> bool { self.lpcr & Lpcr::SRTC_ENV.bits() != 0 }

    fn advance(&mut self, ticks: u64) {
        if !self.running() {
            return;
        }
        let before = (self.counter >> SNVS_CNTR_TO_SECS_SHIFT) as u32;
        self.counter = (self.counter + ticks) & COUNTER_MASK;
        let after = (self.counter >> SNVS_CNTR_TO_SECS_SHIFT) as u32;
        if self.lpcr & Lpcr::LPTA_EN.bits() != 0 {
            let crossed = if before <= after {
                before < self.lptar && self.lptar <= after
            } else {
                before < self.lptar || self.lptar <= after
            };
            if crossed {
                log::debug!("emulated SNVS alarm at {}", self.lptar);
                self.lpsr |= Lpsr::LPTA.bits();
            }
        }
    }

    fn access(&mut self) {
        self.since_tick += 1;
        if self.since_tick >= self.accesses_per_tick {
            self.since_tick = 0;
            self.advance(1);
        }
    }
}

/// Behavioural model of the SNVS LP register window: a 47-bit counter clocked far slower
/// than the bus, the enable bits in LPCR, a write-one-to-clear LPSR and the time alarm.
pub struct SnvsModel {
    inner: Mutex<Model>,
}

impl SnvsModel {
    /// A stopped counter at zero that ticks once every `accesses_per_tick` register accesses
    /// once enabled.
    pub fn new(accesses_per_tick: u32) -> Self {
        SnvsModel {
            inner: Mutex::new(Model {
                counter: 0,
                accesses_per_tick: accesses_per_tick.max(1),
                since_tick: 0,
                lpcr: 0,
                lpsr: 0,
                lptar: 0,
                lppgdr: 0,
                enable_stuck: false,
                reads: HashMap::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Model> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn counter(&self) -> u64 { self.lock().counter }

    pub fn seconds(&self) -> u32 { (self.lock().counter >> SNVS_CNTR_TO_SECS_SHIFT) as u32 }

    pub fn set_counter(&self, counter: u64) { self.lock().counter = counter & COUNTER_MASK; }

    /// Let wall time pass without any bus traffic.
    pub fn fast_forward(&self, seconds: u32) { self.lock().advance((seconds as u64) << SNVS_CNTR_TO_SECS_SHIFT); }

    pub fn lpcr(&self) -> Lpcr { Lpcr::from_bits_truncate(self.lock().lpcr) }

    pub fn lpsr(&self) -> u32 { self.lock().lpsr }

    /// Raise status bits directly, as the hardware would.
    pub fn raise_status(&self, bits: u32) { self.lock().lpsr |= bits; }

    pub fn lptar(&self) -> u32 { self.lock().lptar }

    pub fn lppgdr(&self) -> u32 { self.lock().lppgdr }

    pub fn set_enable_stuck(&self, stuck: bool) { self.lock().enable_stuck = stuck; }

    pub fn reads_of(&self, offset: usize) -> usize { self.lock().reads.get(&offset).copied().unwrap_or(0) }
}

impl RegisterAccess for SnvsModel {
    fn read32(&self, offset: usize) -> Result<u32, TransportError> {
        let mut m = self.lock();
        m.access();
        *m.reads.entry(offset).or_insert(0) += 1;
        match offset {
            SNVS_LPCR => Ok(m.lpcr),
            SNVS_LPSR => Ok(m.lpsr),
            SNVS_LPSRTCMR => Ok((m.counter >> 32) as u32),
            SNVS_LPSRTCLR => Ok(m.counter as u32),
            SNVS_LPTAR => Ok(m.lptar),
            SNVS_LPPGDR => Ok(m.lppgdr),
            _ => Err(TransportError::OutOfRange(offset)),
        }
    }

    fn write32(&self, offset: usize, value: u32) -> Result<(), TransportError> {
        let mut m = self.lock();
        m.access();
        match offset {
            SNVS_LPCR => {
                let keep = if m.enable_stuck { Lpcr::SRTC_ENV.bits() } else { 0 };
                m.lpcr = (m.lpcr & keep) | (value & !keep);
            }
            SNVS_LPSR => m.lpsr &= !value,
            SNVS_LPSRTCMR => m.counter = (m.counter & 0xffff_ffff) | (((value & 0x7fff) as u64) << 32),
            SNVS_LPSRTCLR => m.counter = (m.counter & !0xffff_ffff) | value as u64,
            SNVS_LPTAR => m.lptar = value,
            SNVS_LPPGDR => m.lppgdr = value,
            _ => return Err(TransportError::OutOfRange(offset)),
        }
        Ok(())
    }
}

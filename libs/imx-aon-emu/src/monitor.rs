use std::sync::Mutex;

use imx_aon_api::*;
use num_traits::FromPrimitive;

/// Unknown SMC, as returned by the trusted OS.
pub const SM_ERR_UNDEFINED_SMC: i32 = -1;

/// Stand-in for a trusted OS that owns the SNVS block. Register operations are forwarded to
/// `regs`, which is addressed relative to the LP window like the MMIO backend.
pub struct FakeMonitor<R: RegisterAccess> {
    regs: R,
    probe_result: i32,
    calls: Mutex<Vec<(u32, u32, u32, u32)>>,
}

impl<R: RegisterAccess> FakeMonitor<R> {
    pub fn new(regs: R) -> Self { FakeMonitor { regs, probe_result: 0, calls: Mutex::new(Vec::new()) } }

    /// A monitor that answers the probe call with `code`.
    pub fn with_probe_result(regs: R, code: i32) -> Self {
        FakeMonitor { regs, probe_result: code, calls: Mutex::new(Vec::new()) }
    }

    pub fn calls(&self) -> Vec<(u32, u32, u32, u32)> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).clone()
    }
}

impl<R: RegisterAccess> SecureMonitor for FakeMonitor<R> {
    fn fast_call32(&self, smcnr: u32, a0: u32, a1: u32, a2: u32) -> Result<i32, TransportError> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner()).push((smcnr, a0, a1, a2));
        if smcnr & (1 << 31) == 0 || (smcnr >> 24) & 0x3f != SMC_ENTITY_SNVS_RTC {
            return Ok(SM_ERR_UNDEFINED_SMC);
        }
        match SnvsSmcFunction::from_u32(smcnr & 0xffff) {
            Some(SnvsSmcFunction::Probe) => Ok(self.probe_result),
            Some(SnvsSmcFunction::RegsOp) => {
                let offset = a0
                    .checked_sub(SNVS_LP_WINDOW_OFFSET)
                    .ok_or(TransportError::OutOfRange(a0 as usize))? as usize;
                match a1 {
                    SNVS_OPT_READ => Ok(self.regs.read32(offset)? as i32),
                    SNVS_OPT_WRITE => {
                        self.regs.write32(offset, a2)?;
                        Ok(0)
                    }
                    _ => Ok(SM_ERR_UNDEFINED_SMC),
                }
            }
            // one LPCR bit per call
            Some(SnvsSmcFunction::LpcrOp) if a0.count_ones() != 1 => Ok(SM_ERR_UNDEFINED_SMC),
            Some(SnvsSmcFunction::LpcrOp) => {
                self.regs.update_bits(SNVS_LPCR, a0, if a1 != 0 { a0 } else { 0 })?;
                Ok(0)
            }
            None => Ok(SM_ERR_UNDEFINED_SMC),
        }
    }
}

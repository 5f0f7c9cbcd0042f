use imx_aon_api::*;
use num_traits::ToPrimitive;

/// Direct memory-mapped access to a register block.
pub struct MmioTransport {
    base: *mut u32,
    len: usize,
}

// The pointer designates device memory, not Rust-owned data; all accesses are volatile.
unsafe impl Send for MmioTransport {}
unsafe impl Sync for MmioTransport {}

impl MmioTransport {
    /// # Safety
    ///
    /// `base` must point to `len` bytes of mapped, 32-bit accessible registers that stay
    /// mapped for the lifetime of the transport.
    pub unsafe fn new(base: *mut u32, len: usize) -> Self { MmioTransport { base, len } }

    fn check(&self, offset: usize) -> Result<usize, TransportError> {
        if offset % 4 != 0 || offset.checked_add(4).map_or(true, |end| end > self.len) {
            Err(TransportError::OutOfRange(offset))
        } else {
            Ok(offset / 4)
        }
    }
}

impl RegisterAccess for MmioTransport {
    fn read32(&self, offset: usize) -> Result<u32, TransportError> {
        let index = self.check(offset)?;
        Ok(unsafe { self.base.add(index).read_volatile() })
    }

    fn write32(&self, offset: usize, value: u32) -> Result<(), TransportError> {
        let index = self.check(offset)?;
        unsafe { self.base.add(index).write_volatile(value) };
        Ok(())
    }

    fn update_bits(&self, offset: usize, mask: u32, value: u32) -> Result<(), TransportError> {
        let index = self.check(offset)?;
        critical_section::with(|_| {
            let reg = unsafe { self.base.add(index) };
            let current = unsafe { reg.read_volatile() };
            unsafe { reg.write_volatile((current & !mask) | (value & mask)) };
        });
        Ok(())
    }
}

fn snvs_call(function: SnvsSmcFunction) -> u32 {
    smc_fastcall_nr(SMC_ENTITY_SNVS_RTC, function.to_u32().unwrap_or(0))
}

/// Monitor-side address of an LP-window register.
fn lp_window(offset: usize) -> Result<u32, TransportError> {
    u32::try_from(offset)
        .ok()
        .and_then(|o| o.checked_add(SNVS_LP_WINDOW_OFFSET))
        .ok_or(TransportError::OutOfRange(offset))
}

/// SNVS LP registers proxied through the trusted OS. Offsets are LP-window relative, like
/// [`MmioTransport`] mapped at the LP window.
pub struct SnvsSmcTransport<M: SecureMonitor> {
    monitor: M,
}

impl<M: SecureMonitor> SnvsSmcTransport<M> {
    /// Ask the monitor whether it owns the SNVS block.
    pub fn probe(monitor: M) -> Result<Self, TransportError> {
        let nr = snvs_call(SnvsSmcFunction::Probe);
        let ret = monitor.fast_call32(nr, 0, 0, 0)?;
        if ret < 0 {
            log::error!("SNVS secure monitor probe failed: nr={:#x} ret={}", nr, ret);
            return Err(TransportError::SecureMonitor(ret));
        }
        Ok(SnvsSmcTransport { monitor })
    }

    fn lpcr_op(&self, bits: u32, enable: bool) -> Result<(), TransportError> {
        let ret = self.monitor.fast_call32(snvs_call(SnvsSmcFunction::LpcrOp), bits, enable as u32, 0)?;
        if ret < 0 { Err(TransportError::SecureMonitor(ret)) } else { Ok(()) }
    }
}

impl<M: SecureMonitor> RegisterAccess for SnvsSmcTransport<M> {
    fn read32(&self, offset: usize) -> Result<u32, TransportError> {
        // the result word is the register value, sign included
        let ret =
            self.monitor.fast_call32(snvs_call(SnvsSmcFunction::RegsOp), lp_window(offset)?, SNVS_OPT_READ, 0)?;
        Ok(ret as u32)
    }

    fn write32(&self, offset: usize, value: u32) -> Result<(), TransportError> {
        let ret = self.monitor.fast_call32(
            snvs_call(SnvsSmcFunction::RegsOp),
            lp_window(offset)?,
            SNVS_OPT_WRITE,
            value,
        )?;
        if ret < 0 { Err(TransportError::SecureMonitor(ret)) } else { Ok(()) }
    }

    /// LPCR is owned by the monitor and only changes through its dedicated set/clear call,
    /// which takes one bit at a time. Bits go out highest first, so the wakeup interrupt enable
    /// lands before the alarm enable.
    fn update_bits(&self, offset: usize, mask: u32, value: u32) -> Result<(), TransportError> {
        if offset == SNVS_LPCR {
            for bit in (0..32).rev().map(|b| 1u32 << b).filter(|b| mask & b != 0) {
                self.lpcr_op(bit, value & bit != 0)?;
            }
            return Ok(());
        }
        critical_section::with(|_| {
            let current = self.read32(offset)?;
            self.write32(offset, (current & !mask) | (value & mask))
        })
    }
}

/// The SNVS register path, chosen once when the device comes up.
pub enum SnvsTransport<M: SecureMonitor, R: RegisterAccess> {
    Direct(R),
    Monitor(SnvsSmcTransport<M>),
}

impl<M: SecureMonitor, R: RegisterAccess> SnvsTransport<M, R> {
    /// Prefer the secure monitor when one is present and accepts the probe call, otherwise
    /// fall back to `direct`.
    pub fn select(monitor: Option<M>, direct: R) -> Self {
        match monitor {
            Some(monitor) => match SnvsSmcTransport::probe(monitor) {
                Ok(t) => {
                    log::info!("snvs: using secure monitor transport");
                    SnvsTransport::Monitor(t)
                }
                Err(e) => {
                    log::warn!("snvs: secure monitor unusable ({}), using direct access", e);
                    SnvsTransport::Direct(direct)
                }
            },
            None => {
                log::info!("snvs: no secure monitor, using direct access");
                SnvsTransport::Direct(direct)
            }
        }
    }

    pub fn is_monitor(&self) -> bool { matches!(self, SnvsTransport::Monitor(_)) }
}

impl<M: SecureMonitor, R: RegisterAccess> RegisterAccess for SnvsTransport<M, R> {
    fn read32(&self, offset: usize) -> Result<u32, TransportError> {
        match self {
            SnvsTransport::Direct(r) => r.read32(offset),
            SnvsTransport::Monitor(m) => m.read32(offset),
        }
    }

    fn write32(&self, offset: usize, value: u32) -> Result<(), TransportError> {
        match self {
            SnvsTransport::Direct(r) => r.write32(offset, value),
            SnvsTransport::Monitor(m) => m.write32(offset, value),
        }
    }

    fn update_bits(&self, offset: usize, mask: u32, value: u32) -> Result<(), TransportError> {
        match self {
            SnvsTransport::Direct(r) => critical_section::with(|_| r.update_bits(offset, mask, value)),
            SnvsTransport::Monitor(m) => m.update_bits(offset, mask, value),
        }
    }
}

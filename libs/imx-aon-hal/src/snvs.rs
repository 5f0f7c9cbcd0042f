//! SNVS low-power secure real time counter.
//!
//! The counter is 47 bits wide, clocked from the 32 kHz CKIL domain, and split across
//! LPSRTCMR (bits 46..32) and LPSRTCLR (bits 31..0). The lower 15 bits are sub-second
//! ticks, so seconds are `counter >> 15`. Neither half can be latched, so every read is
//! re-synchronized against the running counter and never cached.

use imx_aon_api::*;

use crate::poll::{busy_poll, read_until_steady, Polled};

/// Number of LPCR reads allowed for SRTC_ENV to follow a write.
pub const ENABLE_POLL_BUDGET: u32 = 1000;
/// CKIL edges to wait for in [`Snvs::write_sync`].
const WRITE_SYNC_CYCLES: usize = 3;

pub struct Snvs<T: RegisterAccess> {
    regs: T,
    wakeup: bool,
}

impl<T: RegisterAccess> Snvs<T> {
    /// Wrap a transport without touching the hardware.
    pub fn new(regs: T) -> Self { Snvs { regs, wakeup: false } }

    /// Bring the block up: arm the power glitch detector, clear any stale status and start
    /// the counter.
    pub fn probe(regs: T) -> Result<Self, RtcError> {
        let mut snvs = Snvs::new(regs);
        snvs.regs.write32(SNVS_LPPGDR, SNVS_LPPGDR_INIT)?;
        snvs.regs.write32(SNVS_LPSR, 0xffff_ffff)?;
        if let Err(e) = snvs.enable(true) {
            log::error!("failed to enable rtc: {}", e);
            return Err(e);
        }
        snvs.wakeup = true;
        log::info!("snvs rtc up at {}", snvs.read_seconds()?);
        Ok(snvs)
    }

    pub fn transport(&self) -> &T { &self.regs }

    fn read_counter(&self) -> Result<u64, TransportError> {
        let high = self.regs.read32(SNVS_LPSRTCMR)? as u64;
        let low = self.regs.read32(SNVS_LPSRTCLR)? as u64;
        Ok((high << 32) | low)
    }

    /// Current time in seconds.
    ///
    /// Two counter reads are only accepted when they agree at seconds resolution; the
    /// fractional ticks are expected to move between them.
    pub fn read_seconds(&self) -> Result<u32, RtcError> {
        loop {
            let read1 = self.read_counter()?;
            let read2 = self.read_counter()?;
            if read1 >> SNVS_CNTR_TO_SECS_SHIFT == read2 >> SNVS_CNTR_TO_SECS_SHIFT {
                return Ok((read2 >> SNVS_CNTR_TO_SECS_SHIFT) as u32);
            }
            log::trace!("torn counter read {:#x} / {:#x}", read1, read2);
        }
    }

    /// Wait for three CKIL edges so that a preceding write has crossed into the LP domain.
    ///
    /// No timeout: if CKIL is dead the RTC is unusable anyway.
    pub fn write_sync(&self) -> Result<(), RtcError> {
        for _ in 0..WRITE_SYNC_CYCLES {
            let count1 = read_until_steady(|| self.regs.read32(SNVS_LPSRTCLR))?;
            loop {
                let count3 = read_until_steady(|| self.regs.read32(SNVS_LPSRTCLR))?;
                if count3 != count1 {
                    break;
                }
            }
        }
        Ok(())
    }

    fn update_lpcr(&self, mask: Lpcr, value: Lpcr) -> Result<(), TransportError> {
        critical_section::with(|_| self.regs.update_bits(SNVS_LPCR, mask.bits(), value.bits()))
    }

    /// Start or stop the counter and wait until SRTC_ENV reads back as requested.
    pub fn enable(&self, enable: bool) -> Result<(), RtcError> {
        let value = if enable { Lpcr::SRTC_ENV } else { Lpcr::empty() };
        self.update_lpcr(Lpcr::SRTC_ENV, value)?;
        let polled = busy_poll(ENABLE_POLL_BUDGET, || {
            let lpcr = Lpcr::from_bits_truncate(self.regs.read32(SNVS_LPCR)?);
            Ok::<bool, TransportError>(lpcr.contains(Lpcr::SRTC_ENV) == enable)
        })?;
        match polled {
            Polled::Done { .. } => Ok(()),
            Polled::Exhausted => {
                log::error!("SRTC_ENV stuck at {} after {} polls", !enable, ENABLE_POLL_BUDGET);
                Err(RtcError::HardwareTimeout)
            }
        }
    }

    /// Set the time. The counter is stopped around the write and the sub-second ticks start
    /// again from zero.
    pub fn write_seconds(&self, seconds: u32) -> Result<(), RtcError> {
        self.enable(false)?;
        self.regs.write32(SNVS_LPSRTCLR, seconds << SNVS_CNTR_TO_SECS_SHIFT)?;
        self.regs.write32(SNVS_LPSRTCMR, seconds >> (32 - SNVS_CNTR_TO_SECS_SHIFT))?;
        self.enable(true)
    }

    /// Alarm target in seconds and whether it has fired.
    pub fn read_alarm(&self) -> Result<(u32, bool), RtcError> {
        let target = self.regs.read32(SNVS_LPTAR)?;
        let lpsr = Lpsr::from_bits_truncate(self.regs.read32(SNVS_LPSR)?);
        Ok((target, lpsr.contains(Lpsr::LPTA)))
    }

    pub fn enable_alarm_irq(&self, enable: bool) -> Result<(), RtcError> {
        let bits = Lpcr::LPTA_EN | Lpcr::LPWUI_EN;
        self.update_lpcr(bits, if enable { bits } else { Lpcr::empty() })?;
        self.write_sync()
    }

    /// Program a new alarm. The alarm is disabled while LPTAR changes so a half-written
    /// target can't fire, and any stale status is cleared before re-arming.
    pub fn set_alarm(&self, target: u32, enabled: bool) -> Result<(), RtcError> {
        self.update_lpcr(Lpcr::LPTA_EN, Lpcr::empty())?;
        self.write_sync()?;
        self.regs.write32(SNVS_LPTAR, target)?;
        self.regs.write32(SNVS_LPSR, Lpsr::LPTA.bits())?;
        self.enable_alarm_irq(enabled)
    }

    /// Alarm interrupt handler. Returns the events to report, or `None` if the interrupt
    /// was not ours. The alarm is one-shot: it is disarmed here and has to be set again.
    pub fn handle_irq(&self) -> Result<Option<RtcEvents>, RtcError> {
        let lpsr = self.regs.read32(SNVS_LPSR)?;
        let fired = Lpsr::from_bits_truncate(lpsr).contains(Lpsr::LPTA);
        let disarm = if fired { self.enable_alarm_irq(false) } else { Ok(()) };
        // clear whatever was set, even if disarming failed
        self.regs.write32(SNVS_LPSR, lpsr)?;
        disarm?;
        if fired {
            log::debug!("snvs alarm fired, lpsr={:#x}", lpsr);
            Ok(Some(RtcEvents::ALARM | RtcEvents::IRQ))
        } else {
            Ok(None)
        }
    }

    /// Whether the alarm interrupt should be armed as a system wakeup source on suspend.
    pub fn wakeup_capable(&self) -> bool { self.wakeup }

    pub fn set_wakeup_capable(&mut self, capable: bool) { self.wakeup = capable; }
}

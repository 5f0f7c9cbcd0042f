use core::fmt;

use bitflags::bitflags;
use num_derive::{FromPrimitive, ToPrimitive};

use crate::TransportError;

// LP register offsets, relative to the LP window
pub const SNVS_LPCR: usize = 0x04;
pub const SNVS_LPSR: usize = 0x18;
pub const SNVS_LPSRTCMR: usize = 0x1c;
pub const SNVS_LPSRTCLR: usize = 0x20;
pub const SNVS_LPTAR: usize = 0x24;
pub const SNVS_LPPGDR: usize = 0x30;

bitflags! {
    pub struct Lpcr: u32 {
        /// Secure real time counter enable
        const SRTC_ENV = 1 << 0;
        /// Time alarm enable
        const LPTA_EN  = 1 << 1;
        /// Wakeup interrupt enable
        const LPWUI_EN = 1 << 3;
    }
}

bitflags! {
    pub struct Lpsr: u32 {
        /// Time alarm fired, write 1 to clear
        const LPTA = 1 << 0;
    }
}

/// Power glitch detector arming value.
pub const SNVS_LPPGDR_INIT: u32 = 0x4173_6166;
/// The counter runs at 32768 Hz: the low 15 bits are sub-second ticks.
pub const SNVS_CNTR_TO_SECS_SHIFT: u32 = 15;

/// SMC entity number the trusted OS registers its SNVS RTC proxy under.
pub const SMC_ENTITY_SNVS_RTC: u32 = 53;
/// Offset of the LP register window inside the SNVS block. Proxied accesses are expressed
/// relative to the full block, so the proxy adds it back.
pub const SNVS_LP_WINDOW_OFFSET: u32 = 0x34;
pub const SNVS_OPT_READ: u32 = 0x1;
pub const SNVS_OPT_WRITE: u32 = 0x2;

/// Function numbers under [`SMC_ENTITY_SNVS_RTC`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum SnvsSmcFunction {
    /// Returns a negative value if the monitor does not own the SNVS block.
    Probe = 0,
    /// `(lp offset + window, OPT_READ | OPT_WRITE, value)`
    RegsOp = 1,
    /// `(LPCR bits, enable)`
    LpcrOp = 2,
}

/// Encode a fast call function number: fast call flag in bit 31, 32-bit calling convention,
/// owning entity in bits 29..24, function in bits 15..0.
pub const fn smc_fastcall_nr(entity: u32, function: u32) -> u32 {
    (1 << 31) | ((entity & 0x3f) << 24) | (function & 0xffff)
}

bitflags! {
    /// Events reported to the RTC class layer when the alarm interrupt fires.
    pub struct RtcEvents: u32 {
        /// Alarm fired
        const ALARM = 0x20;
        /// Interrupt flag, always set together with a concrete event
        const IRQ   = 0x80;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcError {
    /// The counter enable bit never reflected the requested state.
    HardwareTimeout,
    Transport(TransportError),
}

impl From<TransportError> for RtcError {
    fn from(e: TransportError) -> Self { RtcError::Transport(e) }
}

impl fmt::Display for RtcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtcError::HardwareTimeout => write!(f, "timed out waiting for the SRTC enable bit"),
            RtcError::Transport(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for RtcError {}

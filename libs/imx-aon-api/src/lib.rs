#![cfg_attr(not(feature = "std"), no_std)]

//! Shared API for the i.MX always-on blocks: the SNVS low-power real time counter and the
//! USB non-core ("usbmisc") charger detection logic.
//!
//! The algorithms live in `imx-aon-hal`; this crate only carries the narrow collaborator
//! interfaces they consume (register transport, secure monitor, delays, regulators) and the
//! result types they produce, so that emulation and hardware backends can share them.

pub mod rtc;
pub use rtc::*;
pub mod usb;
pub use usb::*;

use core::fmt;

/// Failure reported by a register backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The secure monitor call returned a negative status code.
    SecureMonitor(i32),
    /// Offset lies outside of the mapped register window.
    OutOfRange(usize),
    /// The backend could not complete the access.
    Fault,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::SecureMonitor(code) => write!(f, "secure monitor call failed: {}", code),
            TransportError::OutOfRange(offset) => write!(f, "register offset {:#x} out of range", offset),
            TransportError::Fault => write!(f, "register access fault"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for TransportError {}

/// 32-bit register access. Offsets are in bytes, relative to the block the backend was
/// created for.
///
/// Backends use interior mutability so a single transport can be shared between the
/// synchronous paths and an interrupt handler.
pub trait RegisterAccess {
    fn read32(&self, offset: usize) -> Result<u32, TransportError>;
    fn write32(&self, offset: usize, value: u32) -> Result<(), TransportError>;
    /// Replace the bits selected by `mask` with the matching bits of `value`.
    ///
    /// The default is a plain read-modify-write; callers that race an interrupt context are
    /// expected to wrap it in a critical section.
    fn update_bits(&self, offset: usize, mask: u32, value: u32) -> Result<(), TransportError> {
        let current = self.read32(offset)?;
        self.write32(offset, (current & !mask) | (value & mask))
    }
}

impl<T: RegisterAccess + ?Sized> RegisterAccess for &T {
    fn read32(&self, offset: usize) -> Result<u32, TransportError> { (**self).read32(offset) }

    fn write32(&self, offset: usize, value: u32) -> Result<(), TransportError> {
        (**self).write32(offset, value)
    }

    fn update_bits(&self, offset: usize, mask: u32, value: u32) -> Result<(), TransportError> {
        (**self).update_bits(offset, mask, value)
    }
}

#[cfg(feature = "std")]
impl<T: RegisterAccess + ?Sized> RegisterAccess for std::sync::Arc<T> {
    fn read32(&self, offset: usize) -> Result<u32, TransportError> { (**self).read32(offset) }

    fn write32(&self, offset: usize, value: u32) -> Result<(), TransportError> {
        (**self).write32(offset, value)
    }

    fn update_bits(&self, offset: usize, mask: u32, value: u32) -> Result<(), TransportError> {
        (**self).update_bits(offset, mask, value)
    }
}

/// Secure monitor (trusted OS) fast call interface. Only the call itself is modelled; what the
/// monitor does with it is its own business.
pub trait SecureMonitor {
    /// Issue a 32-bit fast call and return the monitor's raw result word.
    fn fast_call32(&self, smcnr: u32, a0: u32, a1: u32, a2: u32) -> Result<i32, TransportError>;
}

impl<T: SecureMonitor + ?Sized> SecureMonitor for &T {
    fn fast_call32(&self, smcnr: u32, a0: u32, a1: u32, a2: u32) -> Result<i32, TransportError> {
        (**self).fast_call32(smcnr, a0, a1, a2)
    }
}

/// Blocking delays for the worker context. Implementations may sleep, spin or, in emulation,
/// just record the request.
pub trait Delay {
    fn delay_us(&mut self, us: u32);
    fn delay_ms(&mut self, ms: u32) { self.delay_us(ms.saturating_mul(1000)) }
    /// Sleep for some duration in `[min_us, max_us]`.
    fn delay_range_us(&mut self, min_us: u32, max_us: u32);
}

impl<T: Delay + ?Sized> Delay for &mut T {
    fn delay_us(&mut self, us: u32) { (**self).delay_us(us) }

    fn delay_ms(&mut self, ms: u32) { (**self).delay_ms(ms) }

    fn delay_range_us(&mut self, min_us: u32, max_us: u32) { (**self).delay_range_us(min_us, max_us) }
}

#![cfg_attr(not(feature = "std"), no_std)]

//! Drivers for the i.MX always-on blocks: the SNVS low-power real time counter and the USB
//! non-core glue with its charger detection logic.

#[cfg(feature = "std")]
pub mod delay;
pub mod poll;
pub mod snvs;
pub mod transport;
pub mod usbmisc;

pub use snvs::Snvs;
pub use transport::*;

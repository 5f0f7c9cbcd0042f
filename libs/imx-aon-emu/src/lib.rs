//! Hosted stand-ins for the hardware behind `imx-aon-api`, used by the HAL tests and by
//! hosted builds that have no SNVS or usbmisc block to talk to.

pub mod delay;
pub use delay::*;
pub mod monitor;
pub use monitor::*;
pub mod regfile;
pub use regfile::*;
pub mod regulator;
pub use regulator::*;
pub mod snvs;
pub use snvs::*;

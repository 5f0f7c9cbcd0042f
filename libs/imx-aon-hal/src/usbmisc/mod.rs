//! USB non-core ("usbmisc") glue: the per-SoC registers between the ChipIdea controllers and
//! their PHYs. Covers controller init, wakeup source selection and, on i.MX7D, battery
//! charger detection.

pub mod charger;
pub mod imx6;
pub mod imx7;
pub mod regs;
pub mod tunable;

#[cfg(feature = "std")]
mod device;

use imx_aon_api::*;

pub use self::charger::DetectionContext;
#[cfg(feature = "std")]
pub use self::device::UsbMisc;
use self::imx6::{Imx6q, Imx6sx};
use self::imx7::{Imx7d, Imx7ulp};

/// Variant hooks. The defaults are the behavior of a variant that has nothing to do for that
/// hook: success, except for charger detection which is reported as unsupported.
pub trait UsbMiscOps: Sync {
    fn name(&self) -> &'static str;

    /// Program the controller glue for `port`. Leaves wakeup disabled.
    fn init(
        &self,
        _bus: &dyn RegisterAccess,
        _port: &PortConfig,
        _vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        Ok(())
    }

    fn set_wakeup(
        &self,
        _bus: &dyn RegisterAccess,
        _port: &PortConfig,
        _enabled: bool,
        _vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        Ok(())
    }

    /// Whether the controller glue lost its settings, i.e. reads back its power-on reset value.
    fn power_lost_check(&self, _bus: &dyn RegisterAccess, _port: &PortConfig) -> Result<bool, UsbMiscError> {
        Ok(false)
    }

    fn supports_charger_detection(&self) -> bool { false }

    fn charger_detection(
        &self,
        _bus: &dyn RegisterAccess,
        _delay: &mut dyn Delay,
        _port: &PortConfig,
        _ctx: DetectionContext,
    ) -> Result<ChargerType, DetectionError> {
        Err(DetectionError::NotSupported)
    }

    /// Force the termination select signal to `value`, or hand it back to the controller.
    fn term_select_override(
        &self,
        _bus: &dyn RegisterAccess,
        _port: &PortConfig,
        _enable: bool,
        _value: bool,
    ) -> Result<(), UsbMiscError> {
        Ok(())
    }
}

/// Look up the variant for a device tree compatible string.
pub fn ops_for(compatible: &str) -> Option<&'static dyn UsbMiscOps> {
    match compatible {
        "fsl,imx6q-usbmisc" => Some(&Imx6q),
        // the 6UL glue is register compatible with the 6SX
        "fsl,imx6sx-usbmisc" | "fsl,imx6ul-usbmisc" => Some(&Imx6sx),
        "fsl,imx7d-usbmisc" => Some(&Imx7d),
        "fsl,imx7ulp-usbmisc" => Some(&Imx7ulp),
        _ => None,
    }
}

/// Over-current and power polarity bits common to every variant's control register.
pub(crate) fn apply_polarity(mut reg: u32, port: &PortConfig, with_pwr: bool) -> u32 {
    use self::regs::Mx6Ctrl;
    if port.disable_oc {
        reg |= Mx6Ctrl::OVER_CUR_DIS.bits();
    } else if port.oc_active_high {
        reg &= !(Mx6Ctrl::OVER_CUR_DIS | Mx6Ctrl::OVER_CUR_POLARITY).bits();
    }
    if with_pwr && port.pwr_active_high {
        reg |= Mx6Ctrl::PWR_POLARITY.bits();
    }
    reg
}

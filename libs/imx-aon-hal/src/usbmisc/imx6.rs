//! i.MX6Q and i.MX6SX/UL glue: one control register per controller, four controllers.

use imx_aon_api::*;

use super::regs::*;
use super::{apply_polarity, UsbMiscOps};

const MAX_INDEX: u8 = 3;

fn check_index(port: &PortConfig) -> Result<usize, UsbMiscError> {
    if port.index > MAX_INDEX {
        return Err(UsbMiscError::InvalidPort(port.index));
    }
    Ok(mx6_ctrl(port.index))
}

/// Wakeup sources that make sense for the role the port is in.
fn role_wakeup(role: PortRole) -> Mx6Ctrl {
    match role {
        PortRole::Host => Mx6Ctrl::empty(),
        PortRole::Peripheral => Mx6Ctrl::VBUS_WAKEUP,
        PortRole::Otg => Mx6Ctrl::VBUS_WAKEUP | Mx6Ctrl::ID_WAKEUP,
    }
}

pub struct Imx6q;

impl UsbMiscOps for Imx6q {
    fn name(&self) -> &'static str { "imx6q" }

    fn init(
        &self,
        bus: &dyn RegisterAccess,
        port: &PortConfig,
        vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        let ctrl = check_index(port)?;
        critical_section::with(|_| -> Result<(), TransportError> {
            let reg = bus.read32(ctrl)?;
            bus.write32(ctrl, apply_polarity(reg, port, false))?;
            let reg = bus.read32(ctrl)?;
            bus.write32(ctrl, reg | Mx6Ctrl::NON_BURST_SETTING.bits())
        })?;
        if port.index >= 2 {
            log::debug!("usb{}: HSIC setup left to the boot firmware", port.index);
        }
        self.set_wakeup(bus, port, false, vbus)
    }

    fn set_wakeup(
        &self,
        bus: &dyn RegisterAccess,
        port: &PortConfig,
        enabled: bool,
        vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        let ctrl = check_index(port)?;
        if enabled {
            let setting = Mx6Ctrl::WAKEUP_ENABLE | role_wakeup(port.role);
            critical_section::with(|_| bus.update_bits(ctrl, setting.bits(), setting.bits()))?;
            if let Some(vbus) = vbus {
                vbus.enable()?;
            }
        } else {
            let setting = Mx6Ctrl::WAKEUP_ENABLE | Mx6Ctrl::VBUS_WAKEUP | Mx6Ctrl::ID_WAKEUP;
            critical_section::with(|_| -> Result<(), TransportError> {
                let val = bus.read32(ctrl)?;
                if val & Mx6Ctrl::WAKEUP_INTR.bits() != 0 {
                    log::debug!("wakeup int at usb{}", port.index);
                }
                bus.write32(ctrl, val & !setting.bits())
            })?;
            if let Some(vbus) = vbus {
                if vbus.is_enabled() {
                    if let Err(e) = vbus.disable() {
                        log::warn!("usb{}: could not disable vbus wakeup supply: {:?}", port.index, e);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Also drives the i.MX6UL, whose glue is the same.
pub struct Imx6sx;

impl UsbMiscOps for Imx6sx {
    fn name(&self) -> &'static str { "imx6sx" }

    fn init(
        &self,
        bus: &dyn RegisterAccess,
        port: &PortConfig,
        vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        Imx6q.init(bus, port, vbus)?;
        if port.index <= 1 {
            critical_section::with(|_| -> Result<(), TransportError> {
                // wake on B-session valid rather than raw VBUS
                let phy = mx6_otg_phy_ctrl(port.index);
                bus.update_bits(phy, MX6SX_VBUS_WAKEUP_SOURCE_BVALID, MX6SX_VBUS_WAKEUP_SOURCE_BVALID)?;
                // no dp/dm wakeup in device mode while VBUS is away
                bus.update_bits(mx6_ctrl(port.index), Mx6Ctrl::DPDM_WAKEUP_EN.bits(), 0)
            })?;
        }
        Ok(())
    }

    fn set_wakeup(
        &self,
        bus: &dyn RegisterAccess,
        port: &PortConfig,
        enabled: bool,
        vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        Imx6q.set_wakeup(bus, port, enabled, vbus)
    }

    fn power_lost_check(&self, bus: &dyn RegisterAccess, port: &PortConfig) -> Result<bool, UsbMiscError> {
        let ctrl = check_index(port)?;
        let val = critical_section::with(|_| bus.read32(ctrl))?;
        Ok(val == MX6_CTRL_POR_VALUE)
    }
}

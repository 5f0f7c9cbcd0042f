//! i.MX7D and i.MX7ULP glue: a single OTG controller with the USBNC registers next to it.

use imx_aon_api::*;

use super::charger::{self, DetectionContext};
use super::regs::*;
use super::{apply_polarity, UsbMiscOps};

const CTRL: usize = 0;

fn check_index(port: &PortConfig) -> Result<(), UsbMiscError> {
    if port.index >= 1 {
        return Err(UsbMiscError::InvalidPort(port.index));
    }
    Ok(())
}

/// Control register setup shared by both parts.
fn init_ctrl(bus: &dyn RegisterAccess, port: &PortConfig) -> Result<(), TransportError> {
    let reg = bus.read32(CTRL)?;
    bus.write32(CTRL, apply_polarity(reg, port, true))?;
    let reg = bus.read32(CTRL)?;
    bus.write32(CTRL, reg | Mx6Ctrl::NON_BURST_SETTING.bits())
}

/// Transmitter tuning from the board description; zero or out of range keeps the reset value.
fn phy_tuning(mut cfg1: u32, port: &PortConfig) -> u32 {
    let emp = port.emp_curr_control as u32;
    if emp != 0 && emp <= TXPREEMPAMPTUNE0_MASK >> TXPREEMPAMPTUNE0_SHIFT {
        cfg1 = (cfg1 & !TXPREEMPAMPTUNE0_MASK) | (emp << TXPREEMPAMPTUNE0_SHIFT);
    }
    let vref = port.dc_vol_level_adjust as u32;
    if vref != 0 && vref <= TXVREFTUNE0_MASK >> TXVREFTUNE0_SHIFT {
        cfg1 = (cfg1 & !TXVREFTUNE0_MASK) | (vref << TXVREFTUNE0_SHIFT);
    }
    cfg1
}

fn set_wakeup(bus: &dyn RegisterAccess, enabled: bool) -> Result<(), UsbMiscError> {
    let (mask, value) = if enabled {
        (Mx6Ctrl::WAKEUP_ENABLE, Mx6Ctrl::WAKEUP_ENABLE)
    } else {
        (Mx6Ctrl::WAKEUP_ENABLE | Mx6Ctrl::VBUS_WAKEUP | Mx6Ctrl::ID_WAKEUP, Mx6Ctrl::empty())
    };
    critical_section::with(|_| bus.update_bits(CTRL, mask.bits(), value.bits()))?;
    Ok(())
}

fn power_lost_check(bus: &dyn RegisterAccess) -> Result<bool, UsbMiscError> {
    let val = critical_section::with(|_| bus.read32(CTRL))?;
    Ok(val == MX6_CTRL_POR_VALUE)
}

pub struct Imx7d;

impl UsbMiscOps for Imx7d {
    fn name(&self) -> &'static str { "imx7d" }

    fn init(
        &self,
        bus: &dyn RegisterAccess,
        port: &PortConfig,
        _vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        check_index(port)?;
        critical_section::with(|_| -> Result<(), TransportError> {
            init_ctrl(bus, port)?;
            bus.update_bits(
                MX7D_USBNC_USB_CTRL2,
                (Ctrl2::VBUS_WAKEUP_SRC_MASK | Ctrl2::AUTO_RESUME).bits(),
                (Ctrl2::VBUS_WAKEUP_SRC_BVALID | Ctrl2::AUTO_RESUME).bits(),
            )?;
            let cfg1 = bus.read32(MX7D_USB_OTG_PHY_CFG1)?;
            bus.write32(MX7D_USB_OTG_PHY_CFG1, phy_tuning(cfg1, port))
        })?;
        set_wakeup(bus, false)
    }

    fn set_wakeup(
        &self,
        bus: &dyn RegisterAccess,
        _port: &PortConfig,
        enabled: bool,
        _vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        set_wakeup(bus, enabled)
    }

    fn power_lost_check(&self, bus: &dyn RegisterAccess, _port: &PortConfig) -> Result<bool, UsbMiscError> {
        power_lost_check(bus)
    }

    fn supports_charger_detection(&self) -> bool { true }

    fn charger_detection(
        &self,
        bus: &dyn RegisterAccess,
        delay: &mut dyn Delay,
        port: &PortConfig,
        ctx: DetectionContext,
    ) -> Result<ChargerType, DetectionError> {
        let kind = charger::detect(bus, delay, ctx)?;
        log::info!("usb{}: charger type {:?}", port.index, kind);
        Ok(kind)
    }

    fn term_select_override(
        &self,
        bus: &dyn RegisterAccess,
        _port: &PortConfig,
        enable: bool,
        value: bool,
    ) -> Result<(), UsbMiscError> {
        critical_section::with(|_| -> Result<(), TransportError> {
            if enable {
                let val = if value { Ctrl2::TERMSEL_OVERRIDE_VAL.bits() } else { 0 };
                bus.update_bits(MX7D_USBNC_USB_CTRL2, Ctrl2::TERMSEL_OVERRIDE_VAL.bits(), val)?;
                let en = Ctrl2::TERMSEL_OVERRIDE_EN.bits();
                bus.update_bits(MX7D_USBNC_USB_CTRL2, en, en)
            } else {
                bus.update_bits(MX7D_USBNC_USB_CTRL2, Ctrl2::TERMSEL_OVERRIDE_EN.bits(), 0)
            }
        })?;
        Ok(())
    }
}

pub struct Imx7ulp;

impl UsbMiscOps for Imx7ulp {
    fn name(&self) -> &'static str { "imx7ulp" }

    fn init(
        &self,
        bus: &dyn RegisterAccess,
        port: &PortConfig,
        _vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        check_index(port)?;
        critical_section::with(|_| -> Result<(), TransportError> {
            init_ctrl(bus, port)?;
            // the PHY driver owns auto resume on this part
            bus.update_bits(
                MX7D_USBNC_USB_CTRL2,
                Ctrl2::VBUS_WAKEUP_SRC_MASK.bits(),
                Ctrl2::VBUS_WAKEUP_SRC_BVALID.bits(),
            )
        })?;
        set_wakeup(bus, false)
    }

    fn set_wakeup(
        &self,
        bus: &dyn RegisterAccess,
        _port: &PortConfig,
        enabled: bool,
        _vbus: Option<&mut dyn VbusRegulator>,
    ) -> Result<(), UsbMiscError> {
        set_wakeup(bus, enabled)
    }

    fn power_lost_check(&self, bus: &dyn RegisterAccess, _port: &PortConfig) -> Result<bool, UsbMiscError> {
        power_lost_check(bus)
    }
}

#[cfg(test)]
mod tests {
    use imx_aon_emu::{RecordingDelay, RegisterFile};

    use super::*;

    #[test]
    fn imx7d_init() {
        let regs = RegisterFile::new();
        regs.set(CTRL, Mx6Ctrl::WAKEUP_ENABLE.bits() | Mx6Ctrl::VBUS_WAKEUP.bits());
        regs.set(MX7D_USBNC_USB_CTRL2, 0x1);
        regs.set(MX7D_USB_OTG_PHY_CFG1, 0xffff_ffff);
        let port = PortConfig {
            disable_oc: true,
            pwr_active_high: true,
            emp_curr_control: 1,
            dc_vol_level_adjust: 7,
            ..Default::default()
        };
        Imx7d.init(&regs, &port, None).unwrap();
        assert_eq!(
            regs.get(CTRL),
            (Mx6Ctrl::OVER_CUR_DIS | Mx6Ctrl::PWR_POLARITY | Mx6Ctrl::NON_BURST_SETTING).bits()
        );
        assert_eq!(regs.get(MX7D_USBNC_USB_CTRL2), 0x2 | 0x4);
        assert_eq!(regs.get(MX7D_USB_OTG_PHY_CFG1), 0xdf7f_ffff);
    }

    #[test]
    fn tuning_ignores_out_of_range() {
        let port = PortConfig { emp_curr_control: 4, dc_vol_level_adjust: 16, ..Default::default() };
        assert_eq!(phy_tuning(0x1234_5678, &port), 0x1234_5678);
        let port = PortConfig { emp_curr_control: 3, dc_vol_level_adjust: 15, ..Default::default() };
        assert_eq!(phy_tuning(0, &port), (3 << 28) | (15 << 20));
    }

    #[test]
    fn single_controller() {
        let regs = RegisterFile::new();
        let port = PortConfig { index: 1, ..Default::default() };
        assert_eq!(Imx7d.init(&regs, &port, None), Err(UsbMiscError::InvalidPort(1)));
        assert_eq!(Imx7ulp.init(&regs, &port, None), Err(UsbMiscError::InvalidPort(1)));
    }

    #[test]
    fn imx7ulp_init_skips_auto_resume_and_tuning() {
        let regs = RegisterFile::new();
        let port = PortConfig { emp_curr_control: 2, ..Default::default() };
        Imx7ulp.init(&regs, &port, None).unwrap();
        assert_eq!(regs.get(MX7D_USBNC_USB_CTRL2), 0x2);
        assert!(regs.writes_to(MX7D_USB_OTG_PHY_CFG1).is_empty());
    }

    #[test]
    fn wakeup_toggles_enable_only() {
        let regs = RegisterFile::new();
        let port = PortConfig::default();
        regs.set(CTRL, Mx6Ctrl::ID_WAKEUP.bits());
        Imx7d.set_wakeup(&regs, &port, true, None).unwrap();
        assert_eq!(regs.get(CTRL), (Mx6Ctrl::ID_WAKEUP | Mx6Ctrl::WAKEUP_ENABLE).bits());
        Imx7ulp.set_wakeup(&regs, &port, false, None).unwrap();
        assert_eq!(regs.get(CTRL), 0);
    }

    #[test]
    fn term_select() {
        let regs = RegisterFile::new();
        let port = PortConfig::default();
        Imx7d.term_select_override(&regs, &port, true, true).unwrap();
        assert_eq!(regs.get(MX7D_USBNC_USB_CTRL2), 0x30);
        Imx7d.term_select_override(&regs, &port, true, false).unwrap();
        assert_eq!(regs.get(MX7D_USBNC_USB_CTRL2), 0x20);
        Imx7d.term_select_override(&regs, &port, false, false).unwrap();
        assert_eq!(regs.get(MX7D_USBNC_USB_CTRL2), 0);
        // no-op elsewhere
        Imx7ulp.term_select_override(&regs, &port, true, true).unwrap();
        assert_eq!(regs.get(MX7D_USBNC_USB_CTRL2), 0);
    }

    #[test]
    fn detection_only_on_imx7d() {
        let regs = RegisterFile::new();
        let mut delay = RecordingDelay::new();
        let ctx = DetectionContext { board: BoardId::Evk, primary_budget: 120 };
        assert_eq!(
            Imx7ulp.charger_detection(&regs, &mut delay, &PortConfig::default(), ctx),
            Err(DetectionError::NotSupported)
        );
        assert!(delay.calls.is_empty());
        // no VBUS
        assert_eq!(
            Imx7d.charger_detection(&regs, &mut delay, &PortConfig::default(), ctx),
            Err(DetectionError::VbusInvalid)
        );
    }

    #[test]
    fn power_lost() {
        let regs = RegisterFile::new();
        regs.set(CTRL, MX6_CTRL_POR_VALUE);
        assert_eq!(Imx7ulp.power_lost_check(&regs, &PortConfig::default()), Ok(true));
        Imx7d.init(&regs, &PortConfig::default(), None).unwrap();
        assert_eq!(Imx7d.power_lost_check(&regs, &PortConfig::default()), Ok(false));
    }
}

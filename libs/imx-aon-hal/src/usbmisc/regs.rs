//! USB non-core register map. Offsets are relative to the usbmisc block base.

use arbitrary_int::u2;
use bitbybit::bitfield;
use bitflags::bitflags;

/// Per-controller control register, at `index * 4` on i.MX6 and at 0 on i.MX7.
pub const fn mx6_ctrl(index: u8) -> usize { index as usize * 4 }

/// i.MX6SX/UL OTG PHY control, one per OTG controller.
pub const fn mx6_otg_phy_ctrl(index: u8) -> usize { 0x18 + index as usize * 4 }

bitflags! {
    pub struct Mx6Ctrl: u32 {
        const NON_BURST_SETTING = 1 << 1;
        const OVER_CUR_DIS      = 1 << 7;
        const OVER_CUR_POLARITY = 1 << 8;
        const PWR_POLARITY      = 1 << 9;
        const WAKEUP_ENABLE     = 1 << 10;
        const ID_WAKEUP         = 1 << 16;
        const VBUS_WAKEUP       = 1 << 17;
        /// i.MX6SX only
        const DPDM_WAKEUP_EN    = 1 << 29;
        /// Read only, a wakeup interrupt is pending
        const WAKEUP_INTR       = 1 << 31;
    }
}

/// Value of the control register straight out of power-on reset.
pub const MX6_CTRL_POR_VALUE: u32 = 0x3000_1000;

pub const MX6SX_VBUS_WAKEUP_SOURCE_MASK: u32 = 0x3 << 8;
pub const MX6SX_VBUS_WAKEUP_SOURCE_BVALID: u32 = 0x2 << 8;

pub const MX7D_USBNC_USB_CTRL2: usize = 0x4;

bitflags! {
    /// USBNC_USB_CTRL2: overrides of the UTMI+ signals between controller and PHY.
    pub struct Ctrl2: u32 {
        const DM_OVERRIDE_EN      = 1 << 15;
        const DM_OVERRIDE_VAL     = 1 << 14;
        const DP_OVERRIDE_EN      = 1 << 13;
        const DP_OVERRIDE_VAL     = 1 << 12;
        const XCVRSEL_OVERRIDE_EN = 1 << 11;
        const XCVRSEL_LS          = 1 << 10;
        const XCVRSEL_FS          = 1 << 9;
        const OPMODE_OVERRIDE_EN  = 1 << 8;
        const OPMODE_HI           = 1 << 7;
        const OPMODE_LO           = 1 << 6;
        const TERMSEL_OVERRIDE_EN = 1 << 5;
        const TERMSEL_OVERRIDE_VAL = 1 << 4;
        const AUTO_RESUME         = 1 << 2;
        const VBUS_WAKEUP_SRC_HI  = 1 << 1;
        const VBUS_WAKEUP_SRC_LO  = 1 << 0;

        const DP_DM_MASK = Self::DM_OVERRIDE_EN.bits | Self::DM_OVERRIDE_VAL.bits
            | Self::DP_OVERRIDE_EN.bits | Self::DP_OVERRIDE_VAL.bits;
        const XCVRSEL_MASK = Self::XCVRSEL_LS.bits | Self::XCVRSEL_FS.bits;
        const OPMODE_MASK = Self::OPMODE_HI.bits | Self::OPMODE_LO.bits;
        /// OPMODE = 01
        const OPMODE_NON_DRIVING = Self::OPMODE_LO.bits;
        const VBUS_WAKEUP_SRC_MASK = Self::VBUS_WAKEUP_SRC_HI.bits | Self::VBUS_WAKEUP_SRC_LO.bits;
        /// Wake on B-session valid
        const VBUS_WAKEUP_SRC_BVALID = Self::VBUS_WAKEUP_SRC_HI.bits;

        /// Both data line overrides enabled with the value low: no pull-downs.
        const NO_PULL_DOWN_OVERRIDE = Self::DM_OVERRIDE_EN.bits | Self::DP_OVERRIDE_EN.bits;
        /// Low-speed transceiver, normal opmode, termination on; all three overridden.
        const PERIPHERAL_LS_OVERRIDE = Self::XCVRSEL_OVERRIDE_EN.bits | Self::XCVRSEL_LS.bits
            | Self::OPMODE_OVERRIDE_EN.bits | Self::TERMSEL_OVERRIDE_EN.bits | Self::TERMSEL_OVERRIDE_VAL.bits;
        const PERIPHERAL_LS_MASK = Self::XCVRSEL_OVERRIDE_EN.bits | Self::XCVRSEL_MASK.bits
            | Self::OPMODE_OVERRIDE_EN.bits | Self::OPMODE_MASK.bits
            | Self::TERMSEL_OVERRIDE_EN.bits | Self::TERMSEL_OVERRIDE_VAL.bits;
    }
}

pub const MX7D_USB_OTG_PHY_CFG1: usize = 0x30;
pub const TXPREEMPAMPTUNE0_SHIFT: u32 = 28;
pub const TXPREEMPAMPTUNE0_MASK: u32 = 0x3 << TXPREEMPAMPTUNE0_SHIFT;
pub const TXVREFTUNE0_SHIFT: u32 = 20;
pub const TXVREFTUNE0_MASK: u32 = 0xf << TXVREFTUNE0_SHIFT;

pub const MX7D_USB_OTG_PHY_CFG2: usize = 0x34;

bitflags! {
    /// Battery charging detector controls in PHY_CFG2.
    pub struct PhyCfg2: u32 {
        /// Data contact detect
        const CHRG_DCDENB     = 1 << 3;
        /// VDP_SRC onto D+ (primary detection source)
        const CHRG_VDATSRCENB0 = 1 << 2;
        /// Primary detection comparator
        const CHRG_VDATDETENB0 = 1 << 1;
        /// Swap source and sink between D+ and D-
        const CHRG_CHRGSEL    = 1 << 0;

        const CHARGER_DETECTOR = Self::CHRG_DCDENB.bits | Self::CHRG_VDATSRCENB0.bits
            | Self::CHRG_VDATDETENB0.bits | Self::CHRG_CHRGSEL.bits;
    }
}

pub const MX7D_USB_OTG_PHY_STATUS: usize = 0x3c;

/// One read of PHY_STATUS.
#[bitfield(u32)]
#[derive(PartialEq, Eq, Debug)]
pub struct PortSample {
    #[bit(29, r)]
    chrgdet: bool,
    #[bit(3, r)]
    vbus_vld: bool,
    #[bits(0..=1, r)]
    ls: u2,
}

impl PortSample {
    pub fn from_raw(raw: u32) -> Self { PortSample::new_with_raw_value(raw) }

    /// Charger detect comparator output.
    pub fn charger_detected(&self) -> bool { self.chrgdet() }

    pub fn vbus_valid(&self) -> bool { self.vbus_vld() }

    /// Line state as `(bit1 << 1) | bit0`, i.e. `0b10` is D- high.
    pub fn line_state(&self) -> LineState { LineState(self.ls().value()) }
}

/// The two line state bits of a [`PortSample`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LineState(pub u8);

impl LineState {
    pub const SDP: LineState = LineState(0b00);
    pub const A2R1A: LineState = LineState(0b01);
    pub const A1R0A: LineState = LineState(0b10);
    pub const A0R5A: LineState = LineState(0b11);

    /// Line state bit 0.
    pub fn bit0(&self) -> bool { self.0 & 0b01 != 0 }

    /// Line state bit 1.
    pub fn bit1(&self) -> bool { self.0 & 0b10 != 0 }

    /// Accessory charger adapter signatures (A-2.1A, A-1.0A, A-0.5A) seen with the
    /// peripheral low-speed override in place.
    pub fn is_accessory_signature(&self) -> bool {
        matches!(*self, LineState::A2R1A | LineState::A1R0A | LineState::A0R5A)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_fields() {
        let s = PortSample::from_raw((1 << 29) | (1 << 3) | 0b10);
        assert!(s.charger_detected());
        assert!(s.vbus_valid());
        assert_eq!(s.line_state(), LineState::A1R0A);
        assert!(s.line_state().bit1());
        assert!(!s.line_state().bit0());

        let idle = PortSample::from_raw(0);
        assert!(!idle.charger_detected());
        assert_eq!(idle.line_state(), LineState::SDP);
    }

    #[test]
    fn accessory_signatures() {
        assert!(LineState(0b11).is_accessory_signature());
        assert!(LineState(0b10).is_accessory_signature());
        assert!(LineState(0b01).is_accessory_signature());
        assert!(!LineState(0b00).is_accessory_signature());
    }

    #[test]
    fn ctrl2_composites() {
        assert_eq!(Ctrl2::DP_DM_MASK.bits(), 0xf000);
        assert_eq!(Ctrl2::NO_PULL_DOWN_OVERRIDE.bits(), 0xa000);
        assert_eq!(Ctrl2::PERIPHERAL_LS_OVERRIDE.bits(), 0x0d30);
        assert_eq!(Ctrl2::PERIPHERAL_LS_MASK.bits(), 0x0ff0);
        assert_eq!(Ctrl2::OPMODE_NON_DRIVING.bits(), 0x40);
        assert_eq!(PhyCfg2::CHARGER_DETECTOR.bits(), 0xf);
    }
}

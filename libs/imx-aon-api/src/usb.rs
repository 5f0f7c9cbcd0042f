use core::fmt;

use num_derive::{FromPrimitive, ToPrimitive};

use crate::TransportError;

/// Outcome of a charger detection cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive, ToPrimitive)]
pub enum ChargerType {
    Unknown = 0,
    /// SDP: a regular host port, 500mA budget until enumerated.
    StandardDownstreamPort = 1,
    /// CDP: a host port that also advertises charging current.
    ChargingDownstreamPort = 2,
    /// DCP: D+ and D- shorted, no data.
    DedicatedCharger = 3,
    /// ACA: recognised by one of the accessory adapter line state signatures.
    AccessoryChargerAdapter = 4,
}

impl Default for ChargerType {
    fn default() -> Self { ChargerType::Unknown }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ChargerState {
    Absent,
    Present,
}

impl Default for ChargerState {
    fn default() -> Self { ChargerState::Absent }
}

/// Charger record owned by the USB PHY. The detection entry point only ever writes the final
/// outcome into it.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ChargerStatus {
    pub state: ChargerState,
    pub kind: ChargerType,
}

/// Role the controller can take, used to pick the wakeup sources.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PortRole {
    Host,
    Peripheral,
    Otg,
}

/// Static description of one controller port, normally filled from the device tree.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PortConfig {
    pub index: u8,
    pub disable_oc: bool,
    /// Over-current input is active high.
    pub oc_active_high: bool,
    /// Power enable output is active high.
    pub pwr_active_high: bool,
    /// TXPREEMPAMPTUNE0, 0 leaves the reset value.
    pub emp_curr_control: u8,
    /// TXVREFTUNE0, 0 leaves the reset value.
    pub dc_vol_level_adjust: u8,
    pub role: PortRole,
}

impl Default for PortConfig {
    fn default() -> Self {
        PortConfig {
            index: 0,
            disable_oc: false,
            oc_active_high: false,
            pwr_active_high: false,
            emp_curr_control: 0,
            dc_vol_level_adjust: 0,
            role: PortRole::Otg,
        }
    }
}

/// Board identity as reported by the platform.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BoardId {
    /// Evaluation kit or an unidentified board; VBUS is wired straight to the PHY.
    Evk,
    /// Product board; VBUS is sensed by an external Type-C controller and the PHY comparator
    /// cannot be trusted.
    Dmp { set_id: u32 },
}

impl BoardId {
    pub fn vbus_sense_reliable(&self) -> bool { matches!(self, BoardId::Evk) }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegulatorError {
    Failed,
}

/// Supply that keeps VBUS detection alive while the system sleeps. Each usbmisc instance owns
/// its handle.
pub trait VbusRegulator: Send {
    fn enable(&mut self) -> Result<(), RegulatorError>;
    fn disable(&mut self) -> Result<(), RegulatorError>;
    fn is_enabled(&self) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionError {
    /// The data pins never made contact within the debounce budget: VBUS is coming from a
    /// supply with no data lines.
    NoContactDetected,
    /// VBUS comparator says there is no VBUS on a board where it can be trusted.
    VbusInvalid,
    /// The SoC variant has no charger detection logic.
    NotSupported,
    Transport(TransportError),
}

impl DetectionError {
    /// Hard failures point at broken hardware or plumbing; the rest are legitimate
    /// observations that the caller maps onto "charger absent".
    pub fn is_hard_failure(&self) -> bool {
        match self {
            DetectionError::NoContactDetected => false,
            DetectionError::VbusInvalid => false,
            DetectionError::NotSupported => true,
            DetectionError::Transport(_) => true,
        }
    }
}

impl From<TransportError> for DetectionError {
    fn from(e: TransportError) -> Self { DetectionError::Transport(e) }
}

impl fmt::Display for DetectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectionError::NoContactDetected => write!(f, "no data contact, VBUS from a dedicated supply"),
            DetectionError::VbusInvalid => write!(f, "VBUS not valid"),
            DetectionError::NotSupported => write!(f, "charger detection not supported"),
            DetectionError::Transport(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for DetectionError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsbMiscError {
    /// The variant has no controller at this index.
    InvalidPort(u8),
    /// No usbmisc variant matches the compatible string.
    UnsupportedDevice,
    Regulator(RegulatorError),
    Transport(TransportError),
}

impl From<TransportError> for UsbMiscError {
    fn from(e: TransportError) -> Self { UsbMiscError::Transport(e) }
}

impl From<RegulatorError> for UsbMiscError {
    fn from(e: RegulatorError) -> Self { UsbMiscError::Regulator(e) }
}

impl fmt::Display for UsbMiscError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsbMiscError::InvalidPort(index) => write!(f, "no controller at index {}", index),
            UsbMiscError::UnsupportedDevice => write!(f, "unsupported usbmisc variant"),
            UsbMiscError::Regulator(_) => write!(f, "VBUS wakeup regulator failed"),
            UsbMiscError::Transport(e) => write!(f, "{}", e),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UsbMiscError {}

/// Rejected write to a runtime tunable. The previous value stays in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Input is a page or longer.
    TooLong(usize),
    /// Not an integer in any of the accepted notations.
    Invalid,
    OutOfRange(i64),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::TooLong(len) => write!(f, "input too long ({} bytes)", len),
            ConfigError::Invalid => write!(f, "invalid value"),
            ConfigError::OutOfRange(v) => write!(f, "value {} out of range", v),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

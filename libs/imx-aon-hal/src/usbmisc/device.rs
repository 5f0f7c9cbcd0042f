use std::sync::Mutex;

use imx_aon_api::*;

use super::tunable::PrimaryBudget;
use super::{ops_for, DetectionContext, UsbMiscOps};

/// One usbmisc block: the variant hooks bound to a bus, plus the per-instance state the hooks
/// need (board identity, detection tunable, VBUS wakeup supply).
pub struct UsbMisc<R: RegisterAccess> {
    bus: R,
    ops: &'static dyn UsbMiscOps,
    board: BoardId,
    primary_budget: PrimaryBudget,
    /// Serializes detection runs. Wakeup and init only touch registers and rely on the bus
    /// critical sections.
    detection: Mutex<()>,
    vbus_wakeup: Mutex<Option<Box<dyn VbusRegulator>>>,
}

impl<R: RegisterAccess> UsbMisc<R> {
    pub fn new(
        bus: R,
        compatible: &str,
        board: BoardId,
        primary_budget: PrimaryBudget,
        vbus_wakeup: Option<Box<dyn VbusRegulator>>,
    ) -> Result<Self, UsbMiscError> {
        let ops = ops_for(compatible).ok_or_else(|| {
            log::error!("no usbmisc variant for {}", compatible);
            UsbMiscError::UnsupportedDevice
        })?;
        log::info!("usbmisc: {} on {:?}", ops.name(), board);
        Ok(UsbMisc {
            bus,
            ops,
            board,
            primary_budget,
            detection: Mutex::new(()),
            vbus_wakeup: Mutex::new(vbus_wakeup),
        })
    }

    pub fn variant(&self) -> &'static str { self.ops.name() }

    pub fn board(&self) -> BoardId { self.board }

    /// Runtime handle on the primary detection budget.
    pub fn primary_budget(&self) -> &PrimaryBudget { &self.primary_budget }

    pub fn bus(&self) -> &R { &self.bus }

    fn with_vbus<T>(&self, f: impl FnOnce(Option<&mut dyn VbusRegulator>) -> T) -> T {
        let mut guard = self.vbus_wakeup.lock().unwrap_or_else(|e| e.into_inner());
        match guard.as_mut() {
            Some(reg) => f(Some(&mut **reg)),
            None => f(None),
        }
    }

    pub fn init(&self, port: &PortConfig) -> Result<(), UsbMiscError> {
        self.with_vbus(|vbus| self.ops.init(&self.bus, port, vbus))
    }

    pub fn set_wakeup(&self, port: &PortConfig, enabled: bool) -> Result<(), UsbMiscError> {
        self.with_vbus(|vbus| self.ops.set_wakeup(&self.bus, port, enabled, vbus))
    }

    pub fn power_lost_check(&self, port: &PortConfig) -> Result<bool, UsbMiscError> {
        self.ops.power_lost_check(&self.bus, port)
    }

    pub fn term_select_override(&self, port: &PortConfig, enable: bool, value: bool) -> Result<(), UsbMiscError> {
        self.ops.term_select_override(&self.bus, port, enable, value)
    }

    /// Run one detection cycle and return the raw classification.
    pub fn detect(&self, port: &PortConfig, delay: &mut dyn Delay) -> Result<ChargerType, DetectionError> {
        if !self.ops.supports_charger_detection() {
            return Err(DetectionError::NotSupported);
        }
        let _guard = self.detection.lock().unwrap_or_else(|e| e.into_inner());
        self.run_detection(port, delay)
    }

    fn run_detection(&self, port: &PortConfig, delay: &mut dyn Delay) -> Result<ChargerType, DetectionError> {
        let ctx = DetectionContext { board: self.board, primary_budget: self.primary_budget.get() };
        self.ops.charger_detection(&self.bus, delay, port, ctx)
    }

    /// Cable event entry point. On connect the outcome of a detection run is written to `phy`,
    /// on disconnect `phy` is reset. `phy` is left alone when the variant can't detect.
    pub fn charger_detection(
        &self,
        port: &PortConfig,
        connect: bool,
        phy: &mut ChargerStatus,
        delay: &mut dyn Delay,
    ) -> Result<(), DetectionError> {
        if !self.ops.supports_charger_detection() {
            return Err(DetectionError::NotSupported);
        }
        let _guard = self.detection.lock().unwrap_or_else(|e| e.into_inner());
        if !connect {
            *phy = ChargerStatus { state: ChargerState::Absent, kind: ChargerType::Unknown };
            return Ok(());
        }
        match self.run_detection(port, delay) {
            Ok(kind) => {
                *phy = ChargerStatus { state: ChargerState::Present, kind };
                Ok(())
            }
            Err(e) => {
                if e.is_hard_failure() {
                    log::error!("usb{}: charger detection failed: {}", port.index, e);
                } else {
                    log::info!("usb{}: no charger: {}", port.index, e);
                }
                phy.state = ChargerState::Absent;
                Err(e)
            }
        }
    }
}

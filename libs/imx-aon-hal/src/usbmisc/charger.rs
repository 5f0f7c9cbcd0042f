//! i.MX7D battery charging detection, run on the OTG1 PHY once a cable shows up.
//!
//! Detection is a sequence of phases, each of which drives override bits in the PHY and
//! USBNC registers, samples PHY_STATUS until a debounce or stability criterion is met, and
//! puts the overrides back before it returns, whichever way it returns:
//!
//! 1. contact detect: wait for the data pins to touch (DCD),
//! 2. primary detection: VDP_SRC on D+, look for the charger comparator,
//! 3. secondary detection: tell a dedicated charger from a charging host port,
//! 4. line state poll: look for accessory charger adapter signatures that the comparator
//!    can't see.
//!
//! All loops are bounded by poll counts. The pause between polls is jittered, so elapsed time
//! is only approximately `polls * pause`.

use imx_aon_api::*;

use super::regs::*;
use crate::poll::{poll_bounded, Pause, Polled, RunCounter, StableTracker, Step};

pub const CONTACT_POLL_BUDGET: u32 = 100;
/// Contact is confirmed once the pins read low on more than 5 polls in a row.
pub const CONTACT_DEBOUNCE_POLLS: u32 = 6;
const CONTACT_PAUSE: Pause = Pause::RangeUs(5000, 10000);
const BOUNCE_PAUSE: Pause = Pause::RangeUs(5000, 6000);

const PRIMARY_PAUSE: Pause = Pause::RangeUs(1000, 2000);

/// D+/D- need this long to settle after the secondary detection pull up.
pub const SECONDARY_SETTLE_MS: u32 = 40;

const LINE_STATE_SETTLE_MS: u32 = 2;
const LINE_STATE_PAUSE: Pause = Pause::RangeUs(1000, 2000);

/// Poll count and stability threshold for a line state poll.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LineStateBudget {
    pub max_polls: u32,
    /// Consecutive repeats of the same line state needed to trust it.
    pub threshold: u32,
}

/// Used when primary detection found nothing.
pub const LINE_STATE_LONG: LineStateBudget = LineStateBudget { max_polls: 40, threshold: 5 };
/// Used after secondary detection, where contact has long been made.
pub const LINE_STATE_SHORT: LineStateBudget = LineStateBudget { max_polls: 8, threshold: 2 };

/// Inputs to one detection run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DetectionContext {
    pub board: BoardId,
    /// Primary detection poll budget, see [`super::tunable::PrimaryBudget`].
    pub primary_budget: u32,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    ContactDetect,
    PrimaryDetect,
    SecondaryDetect,
    LineStatePoll,
}

/// Working state of one detection run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClassificationState {
    pub phase: Phase,
    /// Polls taken in the current phase.
    pub polls: u32,
    /// Consecutive qualifying samples at the end of the last poll.
    pub stable: u32,
    pub kind: ChargerType,
}

impl Default for ClassificationState {
    fn default() -> Self {
        ClassificationState { phase: Phase::Idle, polls: 0, stable: 0, kind: ChargerType::Unknown }
    }
}

/// Result of a line state poll.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LineStateOutcome {
    Accessory(LineState),
    /// Never stable, or stable on a state that is not an accessory signature. The previous
    /// classification stands.
    Inconclusive,
}

fn sample(bus: &dyn RegisterAccess) -> Result<PortSample, TransportError> {
    Ok(PortSample::from_raw(bus.read32(MX7D_USB_OTG_PHY_STATUS)?))
}

/// Write `value` back to CTRL2.
fn restore_ctrl2(bus: &dyn RegisterAccess, value: u32) -> Result<(), TransportError> {
    critical_section::with(|_| bus.write32(MX7D_USBNC_USB_CTRL2, value))
}

/// Switch off every charger detector source and comparator, and release OPMODE.
pub fn disable_charger_detector(bus: &dyn RegisterAccess) -> Result<(), TransportError> {
    critical_section::with(|_| {
        bus.update_bits(MX7D_USB_OTG_PHY_CFG2, PhyCfg2::CHARGER_DETECTOR.bits(), 0)?;
        // OPMODE back to normal before dropping the override
        bus.update_bits(MX7D_USBNC_USB_CTRL2, Ctrl2::OPMODE_MASK.bits(), 0)?;
        bus.update_bits(MX7D_USBNC_USB_CTRL2, Ctrl2::OPMODE_OVERRIDE_EN.bits(), 0)
    })
}

pub struct Detector<'a> {
    bus: &'a dyn RegisterAccess,
    delay: &'a mut dyn Delay,
    ctx: DetectionContext,
    state: ClassificationState,
}

impl<'a> Detector<'a> {
    pub fn new(bus: &'a dyn RegisterAccess, delay: &'a mut dyn Delay, ctx: DetectionContext) -> Self {
        Detector { bus, delay, ctx, state: ClassificationState::default() }
    }

    pub fn state(&self) -> &ClassificationState { &self.state }

    fn enter(&mut self, phase: Phase) {
        log::debug!("charger detect: {:?} -> {:?}", self.state.phase, phase);
        self.state.phase = phase;
        self.state.polls = 0;
        self.state.stable = 0;
    }

    /// Run all phases and return the classification.
    pub fn run(&mut self) -> Result<ChargerType, DetectionError> {
        self.contact_detect()?;
        if !self.primary_detect()? {
            self.state.kind = ChargerType::StandardDownstreamPort;
            // an accessory adapter doesn't trip the comparator, look for its signature
            if let LineStateOutcome::Accessory(_) = self.line_state_poll(LINE_STATE_LONG)? {
                self.state.kind = ChargerType::AccessoryChargerAdapter;
            }
        } else {
            self.state.kind = self.secondary_detect()?;
            // some wall adapters short D+ to D- behind a Thevenin termination
            if let LineStateOutcome::Accessory(_) = self.line_state_poll(LINE_STATE_SHORT)? {
                self.state.kind = ChargerType::AccessoryChargerAdapter;
            }
        }
        self.enter(Phase::Idle);
        Ok(self.state.kind)
    }

    /// Wait for the data pins to make contact. On failure the detector is switched off
    /// again; on success DCD stays enabled for primary detection to clean up.
    pub fn contact_detect(&mut self) -> Result<(), DetectionError> {
        self.enter(Phase::ContactDetect);
        if !sample(self.bus)?.vbus_valid() {
            if self.ctx.board.vbus_sense_reliable() {
                log::warn!("vbus is not valid");
                return Err(DetectionError::VbusInvalid);
            }
            log::info!("VBUS is sensed by the Type-C controller on this board, skipping check");
        }
        critical_section::with(|_| {
            self.bus.update_bits(MX7D_USB_OTG_PHY_CFG2, PhyCfg2::CHRG_DCDENB.bits(), PhyCfg2::CHRG_DCDENB.bits())
        })?;

        let bus = self.bus;
        let state = &mut self.state;
        let mut contact = RunCounter::new(CONTACT_DEBOUNCE_POLLS);
        let polled = poll_bounded(&mut *self.delay, CONTACT_POLL_BUDGET, |i| -> Result<Step<()>, TransportError> {
            let s = sample(bus)?;
            state.polls = i + 1;
            let touching = contact.observe(!s.line_state().bit0());
            state.stable = contact.run();
            if touching {
                Ok(Step::Done(()))
            } else if contact.run() > 0 {
                Ok(Step::Continue(CONTACT_PAUSE))
            } else {
                Ok(Step::Continue(BOUNCE_PAUSE))
            }
        });
        match polled {
            Ok(Polled::Done { at, .. }) => {
                log::debug!("data pins made contact on poll {}", at);
                Ok(())
            }
            Ok(Polled::Exhausted) => {
                log::info!("no data contact: VBUS is coming from a dedicated power supply");
                disable_charger_detector(self.bus)?;
                Err(DetectionError::NoContactDetected)
            }
            Err(e) => {
                if let Err(cleanup) = disable_charger_detector(self.bus) {
                    log::error!("could not switch off charger detector: {}", cleanup);
                }
                Err(DetectionError::Transport(e))
            }
        }
    }

    /// Returns whether the charger comparator stayed asserted long enough. The detector is
    /// switched off before returning, whatever happened.
    pub fn primary_detect(&mut self) -> Result<bool, DetectionError> {
        self.enter(Phase::PrimaryDetect);
        let result = self.primary_poll();
        let cleanup = disable_charger_detector(self.bus);
        let accepted = result?;
        cleanup?;
        if !accepted {
            log::debug!("it may be a standard downstream port");
        }
        Ok(accepted)
    }

    fn primary_poll(&mut self) -> Result<bool, TransportError> {
        let bus = self.bus;
        critical_section::with(|_| {
            bus.update_bits(MX7D_USBNC_USB_CTRL2, Ctrl2::OPMODE_MASK.bits(), Ctrl2::OPMODE_NON_DRIVING.bits())?;
            bus.update_bits(
                MX7D_USBNC_USB_CTRL2,
                Ctrl2::OPMODE_OVERRIDE_EN.bits(),
                Ctrl2::OPMODE_OVERRIDE_EN.bits(),
            )?;
            // VDP_SRC onto D+, IDM_SINK onto D-, comparator on
            let sources = (PhyCfg2::CHRG_VDATSRCENB0 | PhyCfg2::CHRG_VDATDETENB0).bits();
            bus.update_bits(MX7D_USB_OTG_PHY_CFG2, sources, sources)
        })?;

        let state = &mut self.state;
        let mut detected = RunCounter::new(super::tunable::PRIMARY_DETECTION_ENOUGH_MS);
        let polled = poll_bounded(&mut *self.delay, self.ctx.primary_budget, |i| -> Result<Step<()>, TransportError> {
            let s = sample(bus)?;
            state.polls = i + 1;
            let enough = detected.observe(s.charger_detected());
            state.stable = detected.run();
            Ok(if enough { Step::Done(()) } else { Step::Continue(PRIMARY_PAUSE) })
        })?;
        Ok(polled.is_done())
    }

    /// Tell a dedicated charger (D+ shorted to D-) from a charging downstream port.
    pub fn secondary_detect(&mut self) -> Result<ChargerType, DetectionError> {
        self.enter(Phase::SecondaryDetect);
        let bus = self.bus;
        let saved = critical_section::with(|_| -> Result<u32, TransportError> {
            let saved = bus.read32(MX7D_USBNC_USB_CTRL2)?;
            let mut ctrl2 = saved & !Ctrl2::DP_DM_MASK.bits();
            ctrl2 |= (Ctrl2::DM_OVERRIDE_EN | Ctrl2::DP_OVERRIDE_EN).bits();
            // pull up D+ through the termination
            ctrl2 |= (Ctrl2::TERMSEL_OVERRIDE_EN | Ctrl2::TERMSEL_OVERRIDE_VAL).bits();
            bus.write32(MX7D_USBNC_USB_CTRL2, ctrl2)?;
            Ok(saved)
        })?;

        self.delay.delay_ms(SECONDARY_SETTLE_MS);

        let observed = sample(bus);
        self.state.polls = 1;
        let restored = restore_ctrl2(bus, saved);
        let observed = observed?;
        restored?;
        if observed.line_state().bit1() {
            log::debug!("it is a dedicated charging port");
            Ok(ChargerType::DedicatedCharger)
        } else {
            log::debug!("it is a charging downstream port");
            Ok(ChargerType::ChargingDownstreamPort)
        }
    }

    /// Put the transceiver in low-speed peripheral mode without pull-downs and watch the line
    /// state until it holds still. CTRL2 is restored before returning.
    pub fn line_state_poll(&mut self, budget: LineStateBudget) -> Result<LineStateOutcome, DetectionError> {
        self.enter(Phase::LineStatePoll);
        let bus = self.bus;
        let saved = critical_section::with(|_| -> Result<u32, TransportError> {
            let saved = bus.read32(MX7D_USBNC_USB_CTRL2)?;
            let mut ctrl2 = saved & !Ctrl2::DP_DM_MASK.bits();
            ctrl2 |= Ctrl2::NO_PULL_DOWN_OVERRIDE.bits();
            ctrl2 &= !Ctrl2::PERIPHERAL_LS_MASK.bits();
            ctrl2 |= Ctrl2::PERIPHERAL_LS_OVERRIDE.bits();
            bus.write32(MX7D_USBNC_USB_CTRL2, ctrl2)?;
            Ok(saved)
        })?;

        self.delay.delay_ms(LINE_STATE_SETTLE_MS);
        let state = &mut self.state;
        let mut tracker = StableTracker::new(budget.threshold);
        let polled = poll_bounded(&mut *self.delay, budget.max_polls, |i| -> Result<Step<LineState>, TransportError> {
            let line = sample(bus)?.line_state();
            state.polls = i + 1;
            let stable = tracker.observe(line);
            Ok(if stable { Step::Done(line) } else { Step::Continue(LINE_STATE_PAUSE) })
        });

        let restored = restore_ctrl2(bus, saved);
        self.delay.delay_ms(LINE_STATE_SETTLE_MS);
        let polled = polled?;
        restored?;

        match polled {
            Polled::Done { value, .. } if value.is_accessory_signature() => {
                log::info!("detected A-type charger, line state {:#x}", value.0);
                Ok(LineStateOutcome::Accessory(value))
            }
            Polled::Done { value, .. } => {
                log::debug!("line state settled at {:#x}", value.0);
                Ok(LineStateOutcome::Inconclusive)
            }
            Polled::Exhausted => {
                log::debug!("line state never settled");
                Ok(LineStateOutcome::Inconclusive)
            }
        }
    }
}

/// Classify the port attached to the OTG1 PHY.
pub fn detect(
    bus: &dyn RegisterAccess,
    delay: &mut dyn Delay,
    ctx: DetectionContext,
) -> Result<ChargerType, DetectionError> {
    Detector::new(bus, delay, ctx).run()
}

#[cfg(test)]
mod tests {
    use imx_aon_emu::{DelayCall, RecordingDelay, RegisterFile};

    use super::*;

    const VBUS: u32 = 1 << 3;
    const CHRGDET: u32 = 1 << 29;
    const LS0: u32 = 1 << 0;
    const LS1: u32 = 1 << 1;
    /// What init leaves in CTRL2.
    const CTRL2_IDLE: u32 = 0x6;

    fn evk() -> DetectionContext { DetectionContext { board: BoardId::Evk, primary_budget: 120 } }

    fn port() -> RegisterFile {
        let regs = RegisterFile::new();
        regs.set(MX7D_USBNC_USB_CTRL2, CTRL2_IDLE);
        regs.set(MX7D_USB_OTG_PHY_STATUS, VBUS);
        regs
    }

    /// VBUS check followed by a clean contact.
    fn script_contact(regs: &RegisterFile) {
        regs.script(MX7D_USB_OTG_PHY_STATUS, std::iter::repeat(VBUS).take(1 + CONTACT_DEBOUNCE_POLLS as usize));
    }

    fn script_status(regs: &RegisterFile, value: u32, count: usize) {
        regs.script(MX7D_USB_OTG_PHY_STATUS, std::iter::repeat(value).take(count));
    }

    fn assert_idle(regs: &RegisterFile) {
        assert_eq!(regs.get(MX7D_USBNC_USB_CTRL2), CTRL2_IDLE, "CTRL2 not restored");
        assert_eq!(regs.get(MX7D_USB_OTG_PHY_CFG2), 0, "charger detector left on");
    }

    #[test]
    fn contact_debounce_confirms_on_sixth_consecutive_low() {
        let regs = port();
        regs.script(MX7D_USB_OTG_PHY_STATUS, [VBUS]);
        for &high in &[0, 1, 0, 1, 0, 0, 0, 0, 0, 0] {
            regs.script(MX7D_USB_OTG_PHY_STATUS, [VBUS | high * LS0]);
        }
        regs.set(MX7D_USB_OTG_PHY_STATUS, VBUS | LS0);
        let mut delay = RecordingDelay::new();
        let mut d = Detector::new(&regs, &mut delay, evk());
        assert_eq!(d.contact_detect(), Ok(()));
        // poll index 9
        assert_eq!(d.state().polls, 10);
        assert_eq!(d.state().stable, 6);
        assert_eq!(regs.reads_of(MX7D_USB_OTG_PHY_STATUS), 11);
        assert_eq!(regs.get(MX7D_USB_OTG_PHY_CFG2), PhyCfg2::CHRG_DCDENB.bits());
        assert_eq!(delay.count(DelayCall::RangeUs(5000, 10000)), 7);
        assert_eq!(delay.count(DelayCall::RangeUs(5000, 6000)), 2);
    }

    #[test]
    fn contact_needs_more_than_five() {
        let regs = port();
        regs.script(MX7D_USB_OTG_PHY_STATUS, [VBUS]);
        for &high in &[0, 0, 0, 0, 0, 1, 0, 0, 0, 0, 0, 0] {
            regs.script(MX7D_USB_OTG_PHY_STATUS, [VBUS | high * LS0]);
        }
        regs.set(MX7D_USB_OTG_PHY_STATUS, VBUS | LS0);
        let mut delay = RecordingDelay::new();
        let mut d = Detector::new(&regs, &mut delay, evk());
        assert_eq!(d.contact_detect(), Ok(()));
        assert_eq!(d.state().polls, 12);
    }

    #[test]
    fn no_contact_switches_detector_off() {
        let regs = port();
        regs.set(MX7D_USB_OTG_PHY_STATUS, VBUS | LS0);
        let mut delay = RecordingDelay::new();
        assert_eq!(detect(&regs, &mut delay, evk()), Err(DetectionError::NoContactDetected));
        assert_eq!(regs.reads_of(MX7D_USB_OTG_PHY_STATUS), 1 + CONTACT_POLL_BUDGET as usize);
        assert_eq!(delay.calls.len(), CONTACT_POLL_BUDGET as usize);
        assert_idle(&regs);
    }

    #[test]
    fn vbus_check_depends_on_board() {
        let regs = port();
        regs.set(MX7D_USB_OTG_PHY_STATUS, 0);
        let mut delay = RecordingDelay::new();
        assert_eq!(detect(&regs, &mut delay, evk()), Err(DetectionError::VbusInvalid));
        assert!(regs.writes().is_empty());

        let dmp = DetectionContext { board: BoardId::Dmp { set_id: 1 }, primary_budget: 120 };
        assert_eq!(detect(&regs, &mut delay, dmp), Ok(ChargerType::StandardDownstreamPort));
        assert_idle(&regs);
    }

    #[test]
    fn standard_port_after_full_budget() {
        let regs = port();
        let mut delay = RecordingDelay::new();
        assert_eq!(detect(&regs, &mut delay, evk()), Ok(ChargerType::StandardDownstreamPort));
        // vbus + contact + primary budget + long line state poll (first sample + 5 repeats)
        assert_eq!(regs.reads_of(MX7D_USB_OTG_PHY_STATUS), 1 + 6 + 120 + 6);
        assert_eq!(delay.count(DelayCall::RangeUs(1000, 2000)), 120 + 5);
        assert_eq!(delay.count(DelayCall::Ms(LINE_STATE_SETTLE_MS)), 2);
        assert!(regs
            .writes_to(MX7D_USBNC_USB_CTRL2)
            .contains(&((CTRL2_IDLE & !Ctrl2::PERIPHERAL_LS_MASK.bits()) | 0xa000 | 0x0d30)));
        assert_idle(&regs);
    }

    #[test]
    fn primary_accepts_exactly_fifty() {
        let regs = port();
        script_contact(&regs);
        script_status(&regs, VBUS | CHRGDET, 50);
        let mut delay = RecordingDelay::new();
        let mut d = Detector::new(&regs, &mut delay, evk());
        d.contact_detect().unwrap();
        assert_eq!(d.primary_detect(), Ok(true));
        assert_eq!(d.state().polls, 50);
        assert_eq!(d.state().stable, 50);
        assert_idle(&regs);
    }

    #[test]
    fn primary_rejects_forty_nine() {
        let regs = port();
        script_contact(&regs);
        script_status(&regs, VBUS | CHRGDET, 49);
        let mut delay = RecordingDelay::new();
        let mut d = Detector::new(&regs, &mut delay, evk());
        d.contact_detect().unwrap();
        assert_eq!(d.primary_detect(), Ok(false));
        assert_eq!(d.state().polls, 120);
        assert_idle(&regs);

        let regs = port();
        script_contact(&regs);
        script_status(&regs, VBUS | CHRGDET, 49);
        let mut delay = RecordingDelay::new();
        assert_eq!(detect(&regs, &mut delay, evk()), Ok(ChargerType::StandardDownstreamPort));
    }

    #[test]
    fn primary_budget_limits_polls() {
        let regs = port();
        script_contact(&regs);
        // one miss leaves 49 polls of a 50 poll budget
        script_status(&regs, VBUS, 1);
        script_status(&regs, VBUS | CHRGDET, 60);
        let mut delay = RecordingDelay::new();
        let ctx = DetectionContext { board: BoardId::Evk, primary_budget: 50 };
        let mut d = Detector::new(&regs, &mut delay, ctx);
        d.contact_detect().unwrap();
        assert_eq!(d.primary_detect(), Ok(false));
        assert_eq!(d.state().stable, 49);
    }

    #[test]
    fn dedicated_charger() {
        let regs = port();
        script_contact(&regs);
        script_status(&regs, VBUS | CHRGDET, 50);
        script_status(&regs, VBUS | LS1, 1);
        let mut delay = RecordingDelay::new();
        assert_eq!(detect(&regs, &mut delay, evk()), Ok(ChargerType::DedicatedCharger));
        assert_eq!(delay.count(DelayCall::Ms(SECONDARY_SETTLE_MS)), 1);
        let secondary = CTRL2_IDLE | 0xa000 | (Ctrl2::TERMSEL_OVERRIDE_EN | Ctrl2::TERMSEL_OVERRIDE_VAL).bits();
        assert!(regs.writes_to(MX7D_USBNC_USB_CTRL2).contains(&secondary));
        // short poll on 00: first sample + 2 repeats
        assert_eq!(regs.reads_of(MX7D_USB_OTG_PHY_STATUS), 1 + 6 + 50 + 1 + 3);
        assert_idle(&regs);
    }

    #[test]
    fn charging_downstream_port() {
        let regs = port();
        script_contact(&regs);
        script_status(&regs, VBUS | CHRGDET, 50);
        script_status(&regs, VBUS, 1);
        let mut delay = RecordingDelay::new();
        assert_eq!(detect(&regs, &mut delay, evk()), Ok(ChargerType::ChargingDownstreamPort));
        assert_idle(&regs);
    }

    #[test]
    fn short_poll_runs_after_charging_port_too() {
        let regs = port();
        script_contact(&regs);
        script_status(&regs, VBUS | CHRGDET, 50);
        script_status(&regs, VBUS, 1);
        script_status(&regs, VBUS | LS0, 3);
        let mut delay = RecordingDelay::new();
        assert_eq!(detect(&regs, &mut delay, evk()), Ok(ChargerType::AccessoryChargerAdapter));
        assert_idle(&regs);
    }

    #[test]
    fn accessory_signatures_after_standard() {
        for &line in &[LS0 | LS1, LS1, LS0] {
            let regs = port();
            script_contact(&regs);
            script_status(&regs, VBUS, 120);
            script_status(&regs, VBUS | line, 6);
            let mut delay = RecordingDelay::new();
            assert_eq!(
                detect(&regs, &mut delay, evk()),
                Ok(ChargerType::AccessoryChargerAdapter),
                "line state {:#x}",
                line
            );
            assert_idle(&regs);
        }
    }

    #[test]
    fn unstable_line_state_is_inconclusive() {
        let regs = port();
        regs.script(MX7D_USB_OTG_PHY_STATUS, (0..40).map(|i| VBUS | (i % 2) * LS1));
        let mut delay = RecordingDelay::new();
        let mut d = Detector::new(&regs, &mut delay, evk());
        assert_eq!(d.line_state_poll(LINE_STATE_LONG), Ok(LineStateOutcome::Inconclusive));
        assert_eq!(d.state().polls, 40);
        assert_eq!(regs.get(MX7D_USBNC_USB_CTRL2), CTRL2_IDLE);
    }

    #[test]
    fn signature_must_hold_for_threshold() {
        let regs = port();
        // 11 seen three times in a row (two repeats), then it bounces to 00 and stays there
        script_status(&regs, VBUS | LS0 | LS1, 3);
        let mut delay = RecordingDelay::new();
        let mut d = Detector::new(&regs, &mut delay, evk());
        assert_eq!(d.line_state_poll(LINE_STATE_LONG), Ok(LineStateOutcome::Inconclusive));

        let regs = port();
        script_status(&regs, VBUS | LS0 | LS1, 3);
        let mut delay = RecordingDelay::new();
        let mut d = Detector::new(&regs, &mut delay, evk());
        assert_eq!(
            d.line_state_poll(LINE_STATE_SHORT),
            Ok(LineStateOutcome::Accessory(LineState::A0R5A))
        );
    }

    #[test]
    fn primary_fault_restores_overrides() {
        let regs = port();
        regs.fail_reads_after(MX7D_USB_OTG_PHY_STATUS, 1 + 6 + 10);
        let mut delay = RecordingDelay::new();
        assert_eq!(
            detect(&regs, &mut delay, evk()),
            Err(DetectionError::Transport(TransportError::Fault))
        );
        assert_idle(&regs);
    }

    #[test]
    fn contact_fault_restores_overrides() {
        let regs = port();
        regs.fail_reads_after(MX7D_USB_OTG_PHY_STATUS, 3);
        let mut delay = RecordingDelay::new();
        assert_eq!(
            detect(&regs, &mut delay, evk()),
            Err(DetectionError::Transport(TransportError::Fault))
        );
        assert_idle(&regs);
    }

    #[test]
    fn line_state_fault_restores_overrides() {
        let regs = port();
        regs.fail_reads_after(MX7D_USB_OTG_PHY_STATUS, 1 + 6 + 120 + 2);
        let mut delay = RecordingDelay::new();
        assert_eq!(
            detect(&regs, &mut delay, evk()),
            Err(DetectionError::Transport(TransportError::Fault))
        );
        assert_idle(&regs);
        // restore is followed by the settle delay even on the error path
        assert_eq!(delay.count(DelayCall::Ms(LINE_STATE_SETTLE_MS)), 2);
    }

    #[test]
    fn secondary_fault_restores_overrides() {
        let regs = port();
        script_contact(&regs);
        script_status(&regs, VBUS | CHRGDET, 50);
        regs.fail_reads_after(MX7D_USB_OTG_PHY_STATUS, 1 + 6 + 50);
        let mut delay = RecordingDelay::new();
        assert_eq!(
            detect(&regs, &mut delay, evk()),
            Err(DetectionError::Transport(TransportError::Fault))
        );
        assert_idle(&regs);
    }

    #[test]
    fn failed_override_write_leaves_port_idle() {
        // charger present: the secondary override fails; no charger: the long line state override does
        for &charger in &[true, false] {
            let regs = port();
            script_contact(&regs);
            if charger {
                script_status(&regs, VBUS | CHRGDET, 50);
            }
            // primary detection and switching the detector off write CTRL2 four times
            regs.fail_writes_after(MX7D_USBNC_USB_CTRL2, 4);
            let mut delay = RecordingDelay::new();
            assert_eq!(
                detect(&regs, &mut delay, evk()),
                Err(DetectionError::Transport(TransportError::Fault)),
                "charger {}",
                charger
            );
            assert_idle(&regs);
            assert_eq!(regs.writes_to(MX7D_USBNC_USB_CTRL2).len(), 4);
            assert_eq!(delay.count(DelayCall::Ms(SECONDARY_SETTLE_MS)), 0);
            assert_eq!(delay.count(DelayCall::Ms(LINE_STATE_SETTLE_MS)), 0);
        }
    }
}

use core::fmt::{self, Write};
use core::sync::atomic::{AtomicU32, Ordering};

use imx_aon_api::ConfigError;

/// Default primary detection budget, in polls of roughly a millisecond each.
pub const PRIMARY_DETECTION_MS: u32 = 120;
/// Consecutive charger-detect polls needed to accept a charger. Also the smallest budget
/// that can ever accept one.
pub const PRIMARY_DETECTION_ENOUGH_MS: u32 = 50;
pub const PRIMARY_DETECTION_MAX_MS: u32 = i32::MAX as u32;

const PAGE_SIZE: usize = 4096;

/// How long primary detection keeps sampling the charger detect comparator. The right value
/// depends on the mechanical design of the connector (insertion time, contact order), so it
/// can be trimmed from the device tree and at runtime.
#[derive(Debug)]
pub struct PrimaryBudget {
    ms: AtomicU32,
}

impl PrimaryBudget {
    pub const fn new() -> Self { PrimaryBudget { ms: AtomicU32::new(PRIMARY_DETECTION_MS) } }

    /// Initial value from the `svs,vdm-src-poll-ms` property. Out of range values are clamped
    /// rather than rejected so a bad device tree still boots.
    pub fn from_property(prop: Option<u32>) -> Self {
        let budget = PrimaryBudget::new();
        if let Some(mut ms) = prop {
            if ms > PRIMARY_DETECTION_MAX_MS {
                ms = PRIMARY_DETECTION_MS;
                log::warn!("vdm-src-poll-ms too large, using {}", ms);
            }
            if ms < PRIMARY_DETECTION_ENOUGH_MS {
                ms = PRIMARY_DETECTION_ENOUGH_MS;
                log::warn!("vdm-src-poll-ms too small, using {}", ms);
            }
            budget.ms.store(ms, Ordering::Release);
        }
        budget
    }

    pub fn get(&self) -> u32 { self.ms.load(Ordering::Acquire) }

    pub fn set(&self, ms: u32) -> Result<(), ConfigError> {
        if !(PRIMARY_DETECTION_ENOUGH_MS..=PRIMARY_DETECTION_MAX_MS).contains(&ms) {
            return Err(ConfigError::OutOfRange(ms as i64));
        }
        self.ms.store(ms, Ordering::Release);
        Ok(())
    }

    /// Attribute-style store: accepts decimal, `0x` hex or `0` octal, with an optional
    /// trailing newline. Returns the number of bytes consumed.
    pub fn store(&self, input: &str) -> Result<usize, ConfigError> {
        if input.len() >= PAGE_SIZE {
            log::error!("vdm_src_poll_ms: write too long ({} bytes)", input.len());
            return Err(ConfigError::TooLong(input.len()));
        }
        let value = parse_long(input).ok_or_else(|| {
            log::error!("vdm_src_poll_ms: invalid value {:?}", input);
            ConfigError::Invalid
        })?;
        if value < PRIMARY_DETECTION_ENOUGH_MS as i64 || value > PRIMARY_DETECTION_MAX_MS as i64 {
            log::error!("vdm_src_poll_ms: {} out of range", value);
            return Err(ConfigError::OutOfRange(value));
        }
        self.ms.store(value as u32, Ordering::Release);
        log::info!("vdm_src_poll_ms = {}", value);
        Ok(input.len())
    }

    /// Attribute-style show: the value and a newline.
    pub fn show(&self, out: &mut dyn fmt::Write) -> fmt::Result { writeln!(out, "{}", self.get()) }
}

impl Default for PrimaryBudget {
    fn default() -> Self { Self::new() }
}

/// Signed integer with the radix picked from its prefix. A single trailing newline is
/// allowed, nothing else.
fn parse_long(input: &str) -> Option<i64> {
    let s = input.strip_suffix('\n').unwrap_or(input);
    let (negative, s) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (16, hex)
    } else if s.len() > 1 && s.starts_with('0') {
        (8, &s[1..])
    } else {
        (10, s)
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
        return None;
    }
    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

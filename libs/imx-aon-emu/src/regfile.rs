use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use imx_aon_api::*;

#[derive(Default)]
struct Inner {
    values: HashMap<usize, u32>,
    /// Values handed out by reads before falling back to `values`.
    scripts: HashMap<usize, VecDeque<u32>>,
    /// Bits that ignore writes.
    stuck: HashMap<usize, u32>,
    /// Reads of an offset start failing once this many have succeeded.
    read_faults: HashMap<usize, usize>,
    read_counts: HashMap<usize, usize>,
    /// Same for writes. A failed write is neither logged nor applied.
    write_faults: HashMap<usize, usize>,
    writes: Vec<(usize, u32)>,
}

/// A flat bank of 32-bit registers with scripted reads, a write log and fault injection.
///
/// Reads of an offset first drain its script, then return the last value written (or
/// preset). Writes always update the stored value, except for stuck bits.
pub struct RegisterFile {
    inner: Mutex<Inner>,
}

impl RegisterFile {
    pub fn new() -> Self { RegisterFile { inner: Mutex::new(Inner::default()) } }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Preset a register without logging a write.
    pub fn set(&self, offset: usize, value: u32) { self.lock().values.insert(offset, value); }

    /// Current stored value, bypassing scripts and logs.
    pub fn get(&self, offset: usize) -> u32 { self.lock().values.get(&offset).copied().unwrap_or(0) }

    /// Queue values to be returned by the next reads of `offset`.
    pub fn script<I: IntoIterator<Item = u32>>(&self, offset: usize, values: I) {
        self.lock().scripts.entry(offset).or_default().extend(values);
    }

    pub fn scripted_remaining(&self, offset: usize) -> usize {
        self.lock().scripts.get(&offset).map(|q| q.len()).unwrap_or(0)
    }

    /// Writes to `offset` leave the bits in `mask` untouched.
    pub fn stick_bits(&self, offset: usize, mask: u32) { self.lock().stuck.insert(offset, mask); }

    /// After `ok_reads` more successful reads, every read of `offset` fails.
    pub fn fail_reads_after(&self, offset: usize, ok_reads: usize) {
        let mut inner = self.lock();
        let already = inner.read_counts.get(&offset).copied().unwrap_or(0);
        inner.read_faults.insert(offset, already + ok_reads);
    }

    /// After `ok_writes` more successful writes, every write to `offset` fails.
    pub fn fail_writes_after(&self, offset: usize, ok_writes: usize) {
        let mut inner = self.lock();
        let already = inner.writes.iter().filter(|(o, _)| *o == offset).count();
        inner.write_faults.insert(offset, already + ok_writes);
    }

    pub fn reads_of(&self, offset: usize) -> usize { self.lock().read_counts.get(&offset).copied().unwrap_or(0) }

    pub fn writes_to(&self, offset: usize) -> Vec<u32> {
        self.lock().writes.iter().filter(|(o, _)| *o == offset).map(|(_, v)| *v).collect()
    }

    pub fn writes(&self) -> Vec<(usize, u32)> { self.lock().writes.clone() }
}

impl Default for RegisterFile {
    fn default() -> Self { Self::new() }
}

impl RegisterAccess for RegisterFile {
    fn read32(&self, offset: usize) -> Result<u32, TransportError> {
        let mut inner = self.lock();
        let count = inner.read_counts.get(&offset).copied().unwrap_or(0);
        if let Some(&limit) = inner.read_faults.get(&offset) {
            if count >= limit {
                log::trace!("injected read fault at {:#x}", offset);
                return Err(TransportError::Fault);
            }
        }
        inner.read_counts.insert(offset, count + 1);
        if let Some(value) = inner.scripts.get_mut(&offset).and_then(|q| q.pop_front()) {
            return Ok(value);
        }
        Ok(inner.values.get(&offset).copied().unwrap_or(0))
    }

    fn write32(&self, offset: usize, value: u32) -> Result<(), TransportError> {
        let mut inner = self.lock();
        if let Some(&limit) = inner.write_faults.get(&offset) {
            if inner.writes.iter().filter(|(o, _)| *o == offset).count() >= limit {
                log::trace!("injected write fault at {:#x}", offset);
                return Err(TransportError::Fault);
            }
        }
        inner.writes.push((offset, value));
        let stuck = inner.stuck.get(&offset).copied().unwrap_or(0);
        let old = inner.values.get(&offset).copied().unwrap_or(0);
        inner.values.insert(offset, (old & stuck) | (value & !stuck));
        Ok(())
    }
}

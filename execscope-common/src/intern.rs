//! Producer-side string interning
//!
//! Copies a user-memory string into the next slot of the current CPU's
//! string store and returns the slot's external index. The copy is bounded by
//! the slot size; longer strings are silently truncated. A string that fills
//! the whole slot is stored without a terminator.

use crate::assembler::{ProbeEnv, ProducerError};
use crate::schema::StringData;
use crate::slots::{ExternalIndex, SlotStore};

/// A string copied into the string store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interned {
    /// Reference to store in the payload
    pub index: ExternalIndex,

    /// Bytes copied into the slot, excluding any terminator
    pub len: usize,
}

/// Claim a string slot on the current CPU and copy `source` into it
///
/// The slot is claimed before the copy, so a failed copy still consumes it.
///
/// # Errors
/// - [`ProducerError::SlotUnavailable`] if the claimed slot cannot be looked up
/// - [`ProducerError::Unreadable`] if the source memory cannot be read
#[inline(always)]
pub fn intern<S, P>(strings: &mut S, probe: &P, source: P::Ptr) -> Result<Interned, ProducerError>
where
    S: SlotStore<Slot = StringData>,
    P: ProbeEnv,
{
    let slot = strings.claim_slot();
    let index = ExternalIndex::new(probe.cpu_id(), slot);

    let data = strings.slot_mut(slot).ok_or(ProducerError::SlotUnavailable)?;
    let mut len = probe.read_str(source, &mut data.buffer).map_err(ProducerError::Unreadable)?;

    // The string read reserves the last byte for its terminator
    let last = data.buffer.len() - 1;
    if len == last {
        if let Ok(byte @ 1..) = probe.read_byte(source, last) {
            data.buffer[last] = byte;
            len += 1;
        }
    }

    Ok(Interned { index, len })
}

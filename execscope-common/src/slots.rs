//! Per-CPU slot allocation and external indices
//!
//! Each store (events, strings) is a fixed-capacity array with one private
//! copy per CPU, plus a per-CPU write cursor. Claiming a slot returns the
//! cursor and advances it, wrapping at the store capacity. There is no "full"
//! state: a claim always succeeds and silently reuses the oldest slot.
//!
//! # Re-entrancy hazard
//!
//! The cursor is read-modify-written without atomics, and claiming a slot is
//! not atomic with the payload write that follows. This relies on one probe
//! invocation running per CPU at a time. If an invocation nests on the same
//! CPU before the first completes, both may claim and write the same slot.
//! This is an accepted limitation of the protocol.

use core::fmt;

/// Bits of an [`ExternalIndex`] holding the slot index
pub const SLOT_MASK: u32 = 0x00FF_FFFF;

const CPU_SHIFT: u32 = 24;

/// CPU ids must fit in the high byte of an [`ExternalIndex`]
pub const MAX_CPUS: u32 = 1 << (32 - CPU_SHIFT);

/// Advance a cursor by one, wrapping at `capacity`
///
/// The incremented value is masked to the 24 representable slot bits before
/// the modulo.
#[inline(always)]
#[must_use]
pub const fn next_slot(index: u32, capacity: u32) -> u32 {
    if capacity == 0 {
        return 0;
    }
    (index.wrapping_add(1) & SLOT_MASK) % capacity
}

/// `(cpu, slot)` packed into the 32-bit value carried by notifications
///
/// ```text
///  31      24 23                                0
/// ┌──────────┬───────────────────────────────────┐
/// │   cpu    │               slot                │
/// └──────────┴───────────────────────────────────┘
/// ```
#[repr(transparent)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ExternalIndex(u32);

impl ExternalIndex {
    /// Pack a CPU id and slot index. Out-of-range bits are masked off.
    #[inline(always)]
    #[must_use]
    pub const fn new(cpu: u32, slot: u32) -> Self {
        Self(((cpu & (MAX_CPUS - 1)) << CPU_SHIFT) | (slot & SLOT_MASK))
    }

    #[must_use]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn cpu(self) -> u32 {
        self.0 >> CPU_SHIFT
    }

    #[must_use]
    pub const fn slot(self) -> u32 {
        self.0 & SLOT_MASK
    }

    /// Inverse of [`ExternalIndex::new`]
    #[must_use]
    pub const fn split(self) -> (u32, u32) {
        (self.cpu(), self.slot())
    }

    /// Wire encoding used by the notification channel
    #[must_use]
    pub const fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }

    #[must_use]
    pub const fn from_le_bytes(bytes: [u8; 4]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl fmt::Display for ExternalIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}/slot{}", self.cpu(), self.slot())
    }
}

/// One CPU's view of a fixed-capacity slot store
///
/// Implemented over `PerCpuArray` maps in the probe and over in-memory arenas
/// in userspace. Implementations must never grow: the overwrite semantics of
/// the protocol depend on the fixed capacity.
pub trait SlotStore {
    type Slot;

    /// Number of slots in this CPU's store
    fn capacity(&self) -> u32;

    /// The persisted write cursor for this CPU, if it can be looked up
    fn cursor(&mut self) -> Option<&mut u32>;

    /// Mutable access to one slot, `None` if the lookup fails
    fn slot_mut(&mut self, index: u32) -> Option<&mut Self::Slot>;

    /// Return the current cursor and advance it, wrapping at capacity.
    ///
    /// Never fails. When the cursor itself cannot be looked up, slot 0 is
    /// returned and nothing is persisted.
    #[inline(always)]
    fn claim_slot(&mut self) -> u32 {
        let capacity = self.capacity();
        match self.cursor() {
            Some(cursor) => {
                let index = *cursor;
                *cursor = next_slot(index, capacity);
                index
            }
            None => 0,
        }
    }
}

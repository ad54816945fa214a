//! Per-CPU slot stores as seen by the consumer
//!
//! The consumer only ever reads slots. Two backings implement [`SlotReader`]:
//!
//! - [`MapStore`] - the probe's `PerCpuArray` maps, read through aya
//! - [`PerCpuArena`] - fixed-capacity in-memory stores that also implement the
//!   producer-side [`SlotStore`](execscope_common::SlotStore), so the full
//!   protocol can be exercised without a kernel

pub mod arena;
pub mod map;

pub use arena::{CpuSlots, PerCpuArena};
pub use map::MapStore;

use crate::domain::{CpuId, StoreError};

/// Read access to one slot of a per-CPU store
///
/// Reads are best-effort snapshots: a slot may already hold a newer write
/// than the notification that referenced it.
pub trait SlotReader<T> {
    /// Copy slot `slot` out of `cpu`'s store
    ///
    /// # Errors
    /// Returns [`StoreError`] if the CPU or slot does not exist or the map
    /// lookup fails
    fn read_slot(&self, cpu: CpuId, slot: u32) -> Result<T, StoreError>;
}

impl<T, R: SlotReader<T> + ?Sized> SlotReader<T> for &R {
    fn read_slot(&self, cpu: CpuId, slot: u32) -> Result<T, StoreError> {
        (**self).read_slot(cpu, slot)
    }
}

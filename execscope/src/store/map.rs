//! Slot reader over the probe's `PerCpuArray` maps

use aya::maps::{MapData, PerCpuArray};
use aya::Pod;

use super::SlotReader;
use crate::domain::{CpuId, StoreError};

/// A per-CPU array map taken from the loaded probe
pub struct MapStore<V: Pod> {
    map: PerCpuArray<MapData, V>,
    capacity: u32,
}

impl<V: Pod> MapStore<V> {
    #[must_use]
    pub fn new(map: PerCpuArray<MapData, V>) -> Self {
        let capacity = map.len();
        Self { map, capacity }
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }
}

impl<V: Pod> SlotReader<V> for MapStore<V> {
    /// Copy one CPU's value of `slot`
    ///
    /// The kernel has no single-CPU lookup for per-CPU arrays: every call
    /// copies the slot for all possible CPUs and keeps one. Resolving an
    /// execve costs up to `ARGV_CAPACITY + 2` lookups, so a string lookup
    /// moves `nr_cpus * STRING_BUFFER_SIZE` bytes. Slots differ per lookup,
    /// so there is nothing to cache across one event.
    fn read_slot(&self, cpu: CpuId, slot: u32) -> Result<V, StoreError> {
        if slot >= self.capacity {
            return Err(StoreError::SlotOutOfRange { cpu, slot, capacity: self.capacity });
        }

        // One lookup returns the value of every possible CPU, indexed by CPU id
        let values = self.map.get(&slot, 0)?;
        values.get(cpu.0 as usize).copied().ok_or(StoreError::CpuOutOfRange(cpu))
    }
}

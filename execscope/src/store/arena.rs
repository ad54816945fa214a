//! In-memory per-CPU slot stores
//!
//! Mirrors the layout of the probe's `PerCpuArray` maps: one fixed-capacity
//! array and one write cursor per CPU, allocated once and never grown. Slots
//! start zeroed and are reused without clearing, exactly like the kernel maps.

use execscope_common::SlotStore;
use zerocopy::FromZeros;

use super::SlotReader;
use crate::domain::{CpuId, StoreError};

/// One CPU's slots and write cursor
pub struct CpuSlots<T> {
    slots: Box<[T]>,
    cursor: u32,
}

impl<T> CpuSlots<T> {
    /// Current write cursor (the next slot to be claimed)
    #[must_use]
    pub fn cursor_position(&self) -> u32 {
        self.cursor
    }
}

impl<T> SlotStore for CpuSlots<T> {
    type Slot = T;

    #[allow(clippy::cast_possible_truncation)]
    fn capacity(&self) -> u32 {
        self.slots.len() as u32
    }

    fn cursor(&mut self) -> Option<&mut u32> {
        Some(&mut self.cursor)
    }

    fn slot_mut(&mut self, index: u32) -> Option<&mut T> {
        self.slots.get_mut(index as usize)
    }
}

/// Fixed-capacity slot arrays, one per CPU
pub struct PerCpuArena<T> {
    cpus: Vec<CpuSlots<T>>,
    capacity: u32,
}

impl<T: FromZeros> PerCpuArena<T> {
    /// Allocate `cpus` zeroed stores of `capacity` slots each
    #[must_use]
    pub fn new(cpus: u32, capacity: u32) -> Self {
        let cpus = (0..cpus)
            .map(|_| CpuSlots {
                slots: (0..capacity).map(|_| T::new_zeroed()).collect(),
                cursor: 0,
            })
            .collect();
        Self { cpus, capacity }
    }
}

impl<T> PerCpuArena<T> {
    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn cpu_count(&self) -> u32 {
        self.cpus.len() as u32
    }

    /// The store a producer running on `cpu` writes to
    pub fn cpu_mut(&mut self, cpu: CpuId) -> Option<&mut CpuSlots<T>> {
        self.cpus.get_mut(cpu.0 as usize)
    }

    #[must_use]
    pub fn cpu(&self, cpu: CpuId) -> Option<&CpuSlots<T>> {
        self.cpus.get(cpu.0 as usize)
    }
}

impl<T: Copy> SlotReader<T> for PerCpuArena<T> {
    fn read_slot(&self, cpu: CpuId, slot: u32) -> Result<T, StoreError> {
        let store = self.cpus.get(cpu.0 as usize).ok_or(StoreError::CpuOutOfRange(cpu))?;
        store.slots.get(slot as usize).copied().ok_or(StoreError::SlotOutOfRange {
            cpu,
            slot,
            capacity: self.capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_arena_is_zeroed() {
        let arena = PerCpuArena::<u64>::new(2, 4);
        assert_eq!(arena.cpu_count(), 2);
        assert_eq!(arena.capacity(), 4);
        for cpu in 0..2 {
            for slot in 0..4 {
                assert_eq!(arena.read_slot(CpuId(cpu), slot).unwrap(), 0);
            }
        }
    }

    #[test]
    fn test_cpus_have_independent_cursors() {
        let mut arena = PerCpuArena::<u64>::new(2, 3);
        assert_eq!(arena.cpu_mut(CpuId(0)).unwrap().claim_slot(), 0);
        assert_eq!(arena.cpu_mut(CpuId(0)).unwrap().claim_slot(), 1);
        assert_eq!(arena.cpu_mut(CpuId(1)).unwrap().claim_slot(), 0);
        assert_eq!(arena.cpu(CpuId(0)).unwrap().cursor_position(), 2);
        assert_eq!(arena.cpu(CpuId(1)).unwrap().cursor_position(), 1);
    }

    #[test]
    fn test_writes_are_per_cpu() {
        let mut arena = PerCpuArena::<u64>::new(2, 3);
        *arena.cpu_mut(CpuId(1)).unwrap().slot_mut(2).unwrap() = 42;
        assert_eq!(arena.read_slot(CpuId(1), 2).unwrap(), 42);
        assert_eq!(arena.read_slot(CpuId(0), 2).unwrap(), 0);
    }

    #[test]
    fn test_out_of_range_reads() {
        let arena = PerCpuArena::<u64>::new(1, 3);
        assert!(matches!(arena.read_slot(CpuId(4), 0), Err(StoreError::CpuOutOfRange(CpuId(4)))));
        assert!(matches!(
            arena.read_slot(CpuId(0), 3),
            Err(StoreError::SlotOutOfRange { slot: 3, capacity: 3, .. })
        ));
    }
}

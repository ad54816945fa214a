//! Newtypes for values that are easy to mix up

use std::fmt;

/// Logical CPU number, as reported by `bpf_get_smp_processor_id()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CpuId(pub u32);

impl fmt::Display for CpuId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CPU:{}", self.0)
    }
}

impl From<u32> for CpuId {
    fn from(cpu: u32) -> Self {
        Self(cpu)
    }
}

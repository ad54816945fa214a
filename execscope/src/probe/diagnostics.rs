use anyhow::{Context, Result};
use aya::maps::PerCpuArray;
use aya::Ebpf;

use crate::domain::CpuId;

/// Print the probe's per-CPU write cursors
///
/// A cursor that has wrapped many times between two polls means the
/// consumer is likely reading overwritten slots.
///
/// # Errors
/// Returns an error if a cursor map cannot be accessed
pub fn print_store_diagnostics(bpf: &Ebpf, cpus: &[CpuId]) -> Result<()> {
    eprintln!("\nstore cursors:");
    for name in ["EVENT_DATA_INDEX", "STRING_DATA_INDEX"] {
        let cursors: PerCpuArray<_, u32> =
            PerCpuArray::try_from(bpf.map(name).with_context(|| format!("{name} map not found"))?)?;
        let values = cursors.get(&0, 0)?;

        let line = cpus
            .iter()
            .filter_map(|cpu| values.get(cpu.0 as usize).map(|cursor| format!("{cpu}={cursor}")))
            .collect::<Vec<_>>()
            .join(" ");
        eprintln!("   {name}: {line}");
    }
    Ok(())
}

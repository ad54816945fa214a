//! # eBPF Program Loading and Attachment
//!
//! Loads the compiled probe and wires its maps into the consumer.
//!
//! ## Functions
//!
//! - [`load_ebpf_program()`] - Load eBPF bytecode from the embedded binary
//! - [`init_ebpf_logger()`] - Forward kernel-side log records
//! - [`attach_execve_tracepoint()`] - Attach `syscalls/sys_enter_execve`
//! - [`open_stores()`] - Take the per-CPU event and string stores
//! - [`open_transport()`] - Open one perf buffer per online CPU

use anyhow::{Context, Result};
use aya::{
    include_bytes_aligned,
    maps::{PerCpuArray, PerfEventArray},
    programs::TracePoint,
    Ebpf,
};
use aya_log::EbpfLogger;
use execscope_common::{EventData, StringData};
use log::{info, warn};

use super::{online_cpus, PerfTransport};
use crate::store::MapStore;

/// Load the eBPF program binary
///
/// Always uses the release build: debug builds of the probe pull in
/// formatting code the BPF target cannot link.
///
/// # Errors
/// Returns an error if the eBPF program binary cannot be loaded
pub fn load_ebpf_program() -> Result<Ebpf> {
    let bpf = Ebpf::load(include_bytes_aligned!(
        "../../../target/bpfel-unknown-none/release/execscope"
    ))
    .context("Failed to load eBPF program")?;
    Ok(bpf)
}

/// Initialize eBPF logger
pub fn init_ebpf_logger(bpf: &mut Ebpf) {
    if let Err(e) = EbpfLogger::init(bpf) {
        warn!("Failed to initialize eBPF logger: {e}");
    }
}

/// Load and attach the `sys_enter_execve` tracepoint program
///
/// # Errors
/// Returns an error if the program is missing or cannot be loaded or attached
pub fn attach_execve_tracepoint(bpf: &mut Ebpf) -> Result<()> {
    let program: &mut TracePoint = bpf
        .program_mut("sys_enter_execve")
        .context("sys_enter_execve program not found")?
        .try_into()?;
    program.load()?;
    program.attach("syscalls", "sys_enter_execve")?;
    info!("✓ Attached tracepoint: syscalls/sys_enter_execve");
    Ok(())
}

/// Take the `EVENT_DATA` and `STRING_DATA` maps as slot readers
///
/// # Errors
/// Returns an error if either map is missing or has the wrong type
pub fn open_stores(bpf: &mut Ebpf) -> Result<(MapStore<EventData>, MapStore<StringData>)> {
    let events: PerCpuArray<_, EventData> =
        PerCpuArray::try_from(bpf.take_map("EVENT_DATA").context("EVENT_DATA map not found")?)?;
    let strings: PerCpuArray<_, StringData> =
        PerCpuArray::try_from(bpf.take_map("STRING_DATA").context("STRING_DATA map not found")?)?;

    let events = MapStore::new(events);
    let strings = MapStore::new(strings);
    info!(
        "Event store: {} slots/CPU, string store: {} slots/CPU",
        events.capacity(),
        strings.capacity()
    );
    Ok((events, strings))
}

/// Open the `EVENTS` notification channel on every online CPU
///
/// `pages` is the per-CPU buffer size in pages (a power of two); `None`
/// uses aya's default.
///
/// # Errors
/// Returns an error if the map is missing or a buffer cannot be opened
pub fn open_transport(bpf: &mut Ebpf, pages: Option<usize>) -> Result<PerfTransport> {
    let events = PerfEventArray::try_from(bpf.take_map("EVENTS").context("EVENTS map not found")?)?;
    let cpus = online_cpus()?;
    let transport = PerfTransport::open(events, &cpus, pages)
        .context("Failed to open perf buffers")?;
    info!("✓ Opened perf buffers on {} CPUs", cpus.len());
    Ok(transport)
}

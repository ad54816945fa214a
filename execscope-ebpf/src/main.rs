//! # eBPF Kernel-Side Producer
//!
//! Binds the producer logic from `execscope-common` to kernel maps and helpers.
//!
//! ## Programs
//!
//! - **Tracepoint**: `sys_enter_execve` - one event per `execve(2)` entry
//!
//! ## Maps (Shared with Userspace)
//!
//! - `EVENTS` - Perf event array carrying 4-byte event indices
//! - `EVENT_DATA` / `EVENT_DATA_INDEX` - Per-CPU event store and its cursor
//! - `STRING_DATA` / `STRING_DATA_INDEX` - Per-CPU string store and its cursor
//!
//! ## Build
//!
//! Always compiled in release mode. `vmlinux.rs` holds the kernel type
//! bindings generated by `aya-tool`; `build-ebpf` generates it on first use:
//! ```bash
//! cargo xtask codegen
//! cargo xtask build-ebpf --release
//! ```

#![no_std]
#![no_main]
#![allow(unused_unsafe)]

#[allow(
    clippy::all,
    clippy::pedantic,
    dead_code,
    non_camel_case_types,
    non_snake_case,
    non_upper_case_globals
)]
mod vmlinux;

use aya_ebpf::{
    helpers::{
        bpf_get_current_pid_tgid, bpf_get_current_uid_gid, bpf_ktime_get_ns,
        bpf_probe_read_kernel, bpf_probe_read_user, bpf_probe_read_user_str_bytes,
        r#gen::{bpf_get_current_task, bpf_get_smp_processor_id},
    },
    macros::{map, tracepoint},
    maps::{PerCpuArray, PerfEventArray},
    programs::TracePointContext,
    EbpfContext,
};
use aya_log_ebpf::error;
use execscope_common::{
    emit_sys_enter_execve, EventData, ExternalIndex, ProbeEnv, ProducerError, Publisher,
    SlotStore, StringData, SysEnterExecveArgs, EVENT_MAP_SIZE, STRING_MAP_SIZE,
};
use vmlinux::task_struct;

// ============================================================================
// eBPF Maps - Shared data structures between kernel and userspace
// ============================================================================

/// Notification channel: one `u32` external index per event
#[map]
static EVENTS: PerfEventArray<u32> = PerfEventArray::new(0);

/// Per-CPU event store, one typed payload per slot
#[map]
static EVENT_DATA: PerCpuArray<EventData> = PerCpuArray::with_max_entries(EVENT_MAP_SIZE, 0);

/// Per-CPU write cursor of `EVENT_DATA`
#[map]
static EVENT_DATA_INDEX: PerCpuArray<u32> = PerCpuArray::with_max_entries(1, 0);

/// Per-CPU string store
///
/// Slots are reused without zeroing; userspace tolerates leftover bytes
/// past the terminator.
#[map]
static STRING_DATA: PerCpuArray<StringData> = PerCpuArray::with_max_entries(STRING_MAP_SIZE, 0);

/// Per-CPU write cursor of `STRING_DATA`
#[map]
static STRING_DATA_INDEX: PerCpuArray<u32> = PerCpuArray::with_max_entries(1, 0);

// ============================================================================
// Bindings for the common producer traits
// ============================================================================

/// A per-CPU array store together with its single-entry cursor map
struct MapSlots<T: 'static> {
    data: &'static PerCpuArray<T>,
    cursor: &'static PerCpuArray<u32>,
    capacity: u32,
}

impl<T> SlotStore for MapSlots<T> {
    type Slot = T;

    fn capacity(&self) -> u32 {
        self.capacity
    }

    fn cursor(&mut self) -> Option<&mut u32> {
        // Per-CPU value: only this CPU's invocation touches it
        unsafe { self.cursor.get_ptr_mut(0).map(|ptr| &mut *ptr) }
    }

    fn slot_mut(&mut self, index: u32) -> Option<&mut T> {
        unsafe { self.data.get_ptr_mut(index).map(|ptr| &mut *ptr) }
    }
}

/// Helpers available to a syscall tracepoint
struct TracepointEnv;

impl ProbeEnv for TracepointEnv {
    type Ptr = *const u8;

    fn cpu_id(&self) -> u32 {
        unsafe { bpf_get_smp_processor_id() }
    }

    fn timestamp_ns(&self) -> u64 {
        unsafe { bpf_ktime_get_ns() }
    }

    fn pid_tgid(&self) -> u64 {
        unsafe { bpf_get_current_pid_tgid() }
    }

    /// `current->real_parent->tgid`, or 0 if the task cannot be read
    fn parent_tgid(&self) -> u64 {
        let task = unsafe { bpf_get_current_task() } as *const task_struct;
        if task.is_null() {
            return 0;
        }

        let parent: *const task_struct =
            match unsafe { bpf_probe_read_kernel(&(*task).real_parent) } {
                Ok(parent) => parent,
                Err(_) => return 0,
            };
        if parent.is_null() {
            return 0;
        }

        match unsafe { bpf_probe_read_kernel(&(*parent).tgid) } {
            Ok(tgid) => u64::from(tgid as u32),
            Err(_) => 0,
        }
    }

    fn uid_gid(&self) -> u64 {
        unsafe { bpf_get_current_uid_gid() }
    }

    fn read_str(&self, src: *const u8, dst: &mut [u8]) -> Result<usize, i64> {
        unsafe { bpf_probe_read_user_str_bytes(src, dst).map(<[u8]>::len) }
    }

    fn read_byte(&self, src: *const u8, offset: usize) -> Result<u8, i64> {
        unsafe { bpf_probe_read_user(src.wrapping_add(offset)) }
    }

    fn read_ptr(&self, array: *const u8, index: usize) -> Result<Option<*const u8>, i64> {
        let entry: *const u8 =
            unsafe { bpf_probe_read_user(array.cast::<*const u8>().add(index))? };
        Ok(if entry.is_null() { None } else { Some(entry) })
    }
}

struct PerfPublisher<'a> {
    ctx: &'a TracePointContext,
}

impl Publisher for PerfPublisher<'_> {
    fn publish(&self, index: ExternalIndex) {
        EVENTS.output(self.ctx, &index.raw(), 0);
    }
}

// ============================================================================
// eBPF Program Hooks
// ============================================================================

/// Hook: `syscalls/sys_enter_execve` tracepoint
#[tracepoint]
pub fn sys_enter_execve(ctx: TracePointContext) -> u32 {
    match try_sys_enter_execve(&ctx) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

fn try_sys_enter_execve(ctx: &TracePointContext) -> Result<(), ProducerError> {
    // Layout from /sys/kernel/debug/tracing/events/syscalls/sys_enter_execve/format
    let args: *const SysEnterExecveArgs = ctx.as_ptr() as *const SysEnterExecveArgs;
    let filename = unsafe { (*args).filename } as *const u8;
    let argv = unsafe { (*args).argv } as *const u8;

    let mut events =
        MapSlots { data: &EVENT_DATA, cursor: &EVENT_DATA_INDEX, capacity: EVENT_MAP_SIZE };
    let mut strings =
        MapSlots { data: &STRING_DATA, cursor: &STRING_DATA_INDEX, capacity: STRING_MAP_SIZE };

    let result = emit_sys_enter_execve(
        &TracepointEnv,
        &mut events,
        &mut strings,
        &PerfPublisher { ctx },
        filename,
        argv,
    );

    match result {
        Ok(_) => Ok(()),
        Err(ProducerError::SlotUnavailable) => {
            error!(ctx, "sys_enter_execve abandoned: slot lookup failed");
            Err(ProducerError::SlotUnavailable)
        }
        Err(ProducerError::Unreadable(code)) => {
            error!(ctx, "sys_enter_execve abandoned: unreadable path ({})", code);
            Err(ProducerError::Unreadable(code))
        }
    }
}

#[cfg(all(not(test), target_os = "none"))]
#[panic_handler]
fn panic(_info: &core::panic::PanicInfo) -> ! {
    unsafe { core::hint::unreachable_unchecked() }
}

#[link_section = "license"]
#[no_mangle]
static LICENSE: [u8; 13] = *b"Dual MIT/GPL\0";

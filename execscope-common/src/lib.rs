//! # Shared Data Structures and Producer Logic (eBPF ↔ Userspace)
//!
//! Everything that must agree bit-for-bit between the kernel-side probe and the
//! userspace consumer lives here. All shared types use `#[repr(C)]` so the
//! layout written by the probe is the layout read back by userspace.
//!
//! ## Protocol
//!
//! The probe never sends event payloads through the notification channel.
//! Instead it:
//!
//! 1. claims a slot in the per-CPU **event store** (`EVENT_DATA`)
//! 2. interns every variable-length string into the per-CPU **string store**
//!    (`STRING_DATA`), keeping only a 32-bit [`ExternalIndex`] per string
//! 3. writes the typed payload into the event slot
//! 4. publishes the event slot's [`ExternalIndex`] (4 bytes) through `EVENTS`
//!
//! Userspace splits the index back into `(cpu, slot)`, reads the slot from the
//! per-CPU map and dispatches on the payload's composite [`EventId`].
//!
//! ## Modules
//!
//! - [`event_id`] - Composite event identifier codec
//! - [`slots`] - External index packing and the per-CPU slot allocator
//! - [`schema`] - Event header, typed payloads and the fixed-size slot buffers
//! - [`intern`] - Producer-side string interning
//! - [`assembler`] - Producer-side event assembly and publication

#![cfg_attr(not(test), no_std)]

pub mod assembler;
pub mod event_id;
pub mod intern;
pub mod schema;
pub mod slots;

pub use assembler::{emit_sys_enter_execve, ProbeEnv, ProducerError, Publisher};
pub use event_id::{EventId, EVENTID_SYS_ENTER_EXECVE, SYS_ENTER_EXECVE};
pub use intern::{intern, Interned};
pub use schema::{
    EventData, EventHeader, EventPayload, ExecveEnterEventData, PayloadError, StringData,
    SysEnterExecveArgs, ARGV_CAPACITY, EVENT_BUFFER_SIZE, STRING_BUFFER_SIZE,
};
pub use slots::{next_slot, ExternalIndex, SlotStore, MAX_CPUS, SLOT_MASK};

// ============================================================================
// Store Capacities
// ============================================================================

/// Number of slots in each CPU's event store (`EVENT_DATA`)
pub const EVENT_MAP_SIZE: u32 = 1000;

/// Number of slots in each CPU's string store (`STRING_DATA`)
///
/// One execve consumes up to `ARGV_CAPACITY + 1` string slots, so this store
/// wraps roughly 20 times faster than the event store under execve load.
pub const STRING_MAP_SIZE: u32 = 1000;

#[cfg(feature = "user")]
use aya::Pod;

// These unsafe impls are required for eBPF <-> userspace communication
// Pod trait ensures types can be safely transmitted as plain bytes
#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for EventData {}

#[cfg(feature = "user")]
#[allow(unsafe_code)]
unsafe impl Pod for StringData {}

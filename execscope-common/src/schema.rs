//! Event schema shared by the probe and userspace
//!
//! Every typed payload starts with an [`EventHeader`] and references strings
//! by [`ExternalIndex`](crate::ExternalIndex) instead of embedding them. All
//! payload variants are stored in the same fixed-size [`EventData`] slot,
//! whose size is checked at compile time against the largest variant.

use core::mem::size_of;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::event_id::{EventId, SYS_ENTER_EXECVE};
use crate::slots::ExternalIndex;

// ============================================================================
// Buffer Sizes
// ============================================================================

/// Size of one event slot; must equal the largest payload variant
pub const EVENT_BUFFER_SIZE: usize = 128;

/// Size of one string slot
pub const STRING_BUFFER_SIZE: usize = 2048;

/// Maximum number of `argv` entries captured per execve
pub const ARGV_CAPACITY: usize = 20;

const HEADER_SIZE: usize = size_of::<EventHeader>();

// ============================================================================
// Header and Payloads
// ============================================================================

/// Common prefix of every payload variant
///
/// Written once by the probe and never modified afterwards.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct EventHeader {
    /// Raw composite [`EventId`]
    pub id: u64,

    /// Monotonic timestamp in nanoseconds (`bpf_ktime_get_ns()`)
    pub timestamp: u64,

    /// Thread group id in the high half, thread id in the low half
    pub pid_tgid: u64,

    /// Thread group id of the parent process
    pub parent_tgid: u64,

    /// Group id in the high half, user id in the low half
    pub uid_gid: u64,
}

impl EventHeader {
    #[must_use]
    pub const fn event_id(&self) -> EventId {
        EventId::from_raw(self.id)
    }

    /// Process id (TGID in kernel terms)
    #[must_use]
    pub const fn tgid(&self) -> u32 {
        (self.pid_tgid >> 32) as u32
    }

    /// Thread id (PID in kernel terms)
    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid_tgid as u32
    }

    #[must_use]
    pub const fn uid(&self) -> u32 {
        self.uid_gid as u32
    }

    #[must_use]
    pub const fn gid(&self) -> u32 {
        (self.uid_gid >> 32) as u32
    }
}

/// Payload of `syscalls/sys_enter_execve`
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct ExecveEnterEventData {
    pub header: EventHeader,

    /// Interned path of the executed file
    pub filename: u32,

    /// Number of valid entries in `argv`
    ///
    /// Interning stops at the first unreadable argument, so this may be less
    /// than the real argument count even when it is below [`ARGV_CAPACITY`].
    pub argc: u32,

    /// Interned arguments; entries at `argc..` are stale
    pub argv: [u32; ARGV_CAPACITY],
}

impl ExecveEnterEventData {
    #[must_use]
    pub const fn filename(&self) -> ExternalIndex {
        ExternalIndex::from_raw(self.filename)
    }

    /// Captured argument references, clamped to the array capacity
    pub fn args(&self) -> impl Iterator<Item = ExternalIndex> + '_ {
        let count = (self.argc as usize).min(ARGV_CAPACITY);
        self.argv[..count].iter().map(|raw| ExternalIndex::from_raw(*raw))
    }
}

// ============================================================================
// Slot Buffers
// ============================================================================

/// One event slot, large enough for any payload variant
///
/// The header is a real field so it can be read before the variant is known.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct EventData {
    pub header: EventHeader,
    pub body: [u8; EVENT_BUFFER_SIZE - HEADER_SIZE],
}

/// One string slot
///
/// Holds a truncated copy of a source string. There is no terminator when the
/// source was at least [`STRING_BUFFER_SIZE`] bytes long, and bytes past the
/// terminator may be left over from an earlier, longer string.
#[repr(C)]
#[derive(Clone, Copy, FromBytes, IntoBytes, Immutable, KnownLayout)]
pub struct StringData {
    pub buffer: [u8; STRING_BUFFER_SIZE],
}

const PAYLOAD_SIZES: [usize; 1] = [size_of::<ExecveEnterEventData>()];

const fn largest(sizes: &[usize]) -> usize {
    let mut max = 0;
    let mut i = 0;
    while i < sizes.len() {
        if sizes[i] > max {
            max = sizes[i];
        }
        i += 1;
    }
    max
}

const _: () = assert!(
    largest(&PAYLOAD_SIZES) == EVENT_BUFFER_SIZE,
    "EVENT_BUFFER_SIZE must equal the largest payload variant"
);
const _: () = assert!(EVENT_BUFFER_SIZE % 8 == 0, "event buffer must be 8-byte aligned");
const _: () = assert!(size_of::<EventData>() == EVENT_BUFFER_SIZE);
const _: () = assert!(size_of::<StringData>() == STRING_BUFFER_SIZE);

// ============================================================================
// Typed Payload
// ============================================================================

/// Error decoding an [`EventData`] slot into a typed payload
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PayloadError {
    /// The header carries an identifier with no payload variant
    UnknownEvent(EventId),
}

/// Typed view of an [`EventData`] slot, keyed by the composite event id
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventPayload {
    SysEnterExecve(ExecveEnterEventData),
}

impl EventPayload {
    /// Decode the variant selected by the slot's header id
    ///
    /// # Errors
    /// Returns [`PayloadError::UnknownEvent`] if no variant uses the header id
    pub fn decode(data: &EventData) -> Result<Self, PayloadError> {
        let id = data.header.event_id();
        if id == SYS_ENTER_EXECVE {
            let event: ExecveEnterEventData = zerocopy::transmute!(*data);
            Ok(Self::SysEnterExecve(event))
        } else {
            Err(PayloadError::UnknownEvent(id))
        }
    }

    #[must_use]
    pub const fn header(&self) -> &EventHeader {
        match self {
            Self::SysEnterExecve(event) => &event.header,
        }
    }

    #[must_use]
    pub const fn event_id(&self) -> EventId {
        self.header().event_id()
    }
}

impl EventData {
    /// Reinterpret the slot as the execve payload for in-place writes
    pub fn as_sys_enter_execve_mut(&mut self) -> &mut ExecveEnterEventData {
        zerocopy::transmute_mut!(self)
    }
}

impl From<ExecveEnterEventData> for EventData {
    fn from(event: ExecveEnterEventData) -> Self {
        zerocopy::transmute!(event)
    }
}

/// Tracepoint arguments for `syscalls/sys_enter_execve`
///
/// Layout from `/sys/kernel/debug/tracing/events/syscalls/sys_enter_execve/format`.
/// Pointers are kept as `u64` so the type is usable outside the probe.
#[repr(C)]
pub struct SysEnterExecveArgs {
    /// Common tracepoint fields (type, flags, preempt count, pid)
    #[allow(clippy::pub_underscore_fields)]
    pub __unused__: u64,

    pub syscall_nr: i32,

    #[allow(clippy::pub_underscore_fields)]
    pub _padding: u32,

    /// `const char *filename`
    pub filename: u64,

    /// `const char *const *argv`
    pub argv: u64,

    /// `const char *const *envp`
    pub envp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use zerocopy::FromZeros;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(size_of::<EventHeader>(), 40);
        assert_eq!(size_of::<ExecveEnterEventData>(), EVENT_BUFFER_SIZE);
        assert_eq!(core::mem::align_of::<EventData>(), 8);
        assert_eq!(core::mem::offset_of!(SysEnterExecveArgs, filename), 16);
        assert_eq!(core::mem::offset_of!(SysEnterExecveArgs, argv), 24);
    }

    #[test]
    fn test_decode_execve_written_in_place() {
        let mut slot = EventData::new_zeroed();
        {
            let event = slot.as_sys_enter_execve_mut();
            event.header.id = SYS_ENTER_EXECVE.raw();
            event.header.pid_tgid = (42 << 32) | 43;
            event.filename = ExternalIndex::new(1, 7).raw();
            event.argc = 2;
            event.argv[0] = 8;
            event.argv[1] = 9;
        }

        assert_eq!(slot.header.tgid(), 42);
        assert_eq!(slot.header.pid(), 43);

        let EventPayload::SysEnterExecve(event) = EventPayload::decode(&slot).unwrap();
        assert_eq!(event.filename().split(), (1, 7));
        let args: Vec<u32> = event.args().map(ExternalIndex::raw).collect();
        assert_eq!(args, [8, 9]);
    }

    #[test]
    fn test_decode_rejects_unknown_id() {
        let mut slot = EventData::new_zeroed();
        slot.header.id = EventId::kprobe(1, true).raw();
        assert_eq!(
            EventPayload::decode(&slot),
            Err(PayloadError::UnknownEvent(EventId::kprobe(1, true)))
        );
    }

    #[test]
    fn test_args_clamps_corrupt_argc() {
        let mut event = ExecveEnterEventData::new_zeroed();
        event.argc = 1000;
        assert_eq!(event.args().count(), ARGV_CAPACITY);
    }
}

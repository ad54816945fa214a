//! Producer-side event assembly
//!
//! Runs once per traced syscall. Claims an event slot on the current CPU,
//! writes the header and typed payload in place, interns the referenced
//! strings and publishes the 4-byte event index. Nothing here allocates or
//! blocks; all state lives in the per-CPU stores.
//!
//! The kernel probe and the userspace tests drive the same code through the
//! [`ProbeEnv`], [`SlotStore`] and [`Publisher`] traits.

use crate::event_id::{EventId, SYS_ENTER_EXECVE};
use crate::intern::intern;
use crate::schema::{EventData, EventHeader, StringData, ARGV_CAPACITY};
use crate::slots::{ExternalIndex, SlotStore};

/// Reasons an event under construction is abandoned
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProducerError {
    /// A claimed slot could not be looked up in its store
    SlotUnavailable,

    /// User memory could not be read (helper error code)
    Unreadable(i64),
}

/// Execution context of one probe invocation
pub trait ProbeEnv {
    /// Address of user memory
    type Ptr: Copy;

    /// CPU the probe is running on
    fn cpu_id(&self) -> u32;

    /// Monotonic timestamp in nanoseconds
    fn timestamp_ns(&self) -> u64;

    /// `tgid << 32 | pid` of the current task
    fn pid_tgid(&self) -> u64;

    /// Thread group id of the current task's parent
    fn parent_tgid(&self) -> u64;

    /// `gid << 32 | uid` of the current task
    fn uid_gid(&self) -> u64;

    /// Copy the string at `src` into `dst`, returning the number of bytes copied
    ///
    /// Behaves like `bpf_probe_read_user_str`: copies at most `dst.len() - 1`
    /// bytes and always writes a terminator after them. The count excludes
    /// the terminator.
    ///
    /// # Errors
    /// Returns the helper's error code if `src` cannot be read
    fn read_str(&self, src: Self::Ptr, dst: &mut [u8]) -> Result<usize, i64>;

    /// Read the single byte at `src + offset`
    ///
    /// # Errors
    /// Returns the helper's error code if the byte cannot be read
    fn read_byte(&self, src: Self::Ptr, offset: usize) -> Result<u8, i64>;

    /// Read entry `index` of a NULL-terminated pointer array
    ///
    /// Returns `Ok(None)` at the terminating NULL.
    ///
    /// # Errors
    /// Returns the helper's error code if the entry cannot be read
    fn read_ptr(&self, array: Self::Ptr, index: usize) -> Result<Option<Self::Ptr>, i64>;
}

/// Notification channel towards userspace
pub trait Publisher {
    fn publish(&self, index: ExternalIndex);
}

#[inline(always)]
fn fill_header<P: ProbeEnv>(header: &mut EventHeader, id: EventId, probe: &P) {
    header.id = id.raw();
    header.timestamp = probe.timestamp_ns();
    header.pid_tgid = probe.pid_tgid();
    header.parent_tgid = probe.parent_tgid();
    header.uid_gid = probe.uid_gid();
}

/// Assemble and publish a `sys_enter_execve` event
///
/// The path is interned before the event slot is written; if that fails the
/// event is abandoned and the slot keeps its previous contents. Argument
/// interning stops at the first entry that cannot be read (or at the NULL
/// terminator, or at [`ARGV_CAPACITY`]) and `argc` counts only what was
/// captured.
///
/// Writes exactly one event slot and at most `ARGV_CAPACITY + 1` string slots,
/// all on the current CPU.
///
/// # Errors
/// Returns the [`ProducerError`] that abandoned the event; nothing is published
pub fn emit_sys_enter_execve<P, E, S, T>(
    probe: &P,
    events: &mut E,
    strings: &mut S,
    publisher: &T,
    filename: P::Ptr,
    argv: P::Ptr,
) -> Result<ExternalIndex, ProducerError>
where
    P: ProbeEnv,
    E: SlotStore<Slot = EventData>,
    S: SlotStore<Slot = StringData>,
    T: Publisher,
{
    let slot = events.claim_slot();
    let event_index = ExternalIndex::new(probe.cpu_id(), slot);

    let path = intern(strings, probe, filename)?;

    let data = events.slot_mut(slot).ok_or(ProducerError::SlotUnavailable)?;
    let event = data.as_sys_enter_execve_mut();

    fill_header(&mut event.header, SYS_ENTER_EXECVE, probe);
    event.filename = path.index.raw();

    let mut argc = 0;
    for i in 0..ARGV_CAPACITY {
        let Ok(Some(arg)) = probe.read_ptr(argv, i) else {
            break;
        };
        let Ok(interned) = intern(strings, probe, arg) else {
            break;
        };
        event.argv[i] = interned.index.raw();
        argc += 1;
    }
    event.argc = argc;

    publisher.publish(event_index);
    Ok(event_index)
}

//! Composite event identifiers
//!
//! An [`EventId`] packs a numeric event code together with two flags:
//!
//! ```text
//!  63   62   61                                                    0
//! ┌────┬────┬───────────────────────────────────────────────────────┐
//! │ TP │ EN │                     numeric code                      │
//! └────┴────┴───────────────────────────────────────────────────────┘
//! ```
//!
//! - **TP**: attached via a tracepoint (clear for kprobes)
//! - **EN**: syscall enter event (clear for exit events)
//!
//! Numeric codes are only unique within one `(TP, EN)` combination, so
//! dispatch always keys on the full 64-bit value.

use core::fmt;

const TRACEPOINT_BIT: u64 = 0x8000_0000_0000_0000;
const ENTER_BIT: u64 = 0x4000_0000_0000_0000;
const CODE_MASK: u64 = !(TRACEPOINT_BIT | ENTER_BIT);

/// Numeric code of the `execve` syscall family events
pub const EVENTID_SYS_ENTER_EXECVE: u64 = 1;

/// `syscalls/sys_enter_execve` tracepoint event
pub const SYS_ENTER_EXECVE: EventId = EventId::tracepoint(EVENTID_SYS_ENTER_EXECVE, true);

/// Composite 64-bit event identifier
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(u64);

impl EventId {
    /// Encode a numeric code and its attachment flags.
    ///
    /// Codes must be below 2^62; higher bits are masked off.
    #[must_use]
    pub const fn new(code: u64, is_tracepoint: bool, is_enter: bool) -> Self {
        let mut raw = code & CODE_MASK;
        if is_tracepoint {
            raw |= TRACEPOINT_BIT;
        }
        if is_enter {
            raw |= ENTER_BIT;
        }
        Self(raw)
    }

    #[must_use]
    pub const fn tracepoint(code: u64, is_enter: bool) -> Self {
        Self::new(code, true, is_enter)
    }

    #[must_use]
    pub const fn kprobe(code: u64, is_enter: bool) -> Self {
        Self::new(code, false, is_enter)
    }

    /// Reinterpret a raw header value
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn code(self) -> u64 {
        self.0 & CODE_MASK
    }

    #[must_use]
    pub const fn is_tracepoint(self) -> bool {
        self.0 & TRACEPOINT_BIT != 0
    }

    #[must_use]
    pub const fn is_enter(self) -> bool {
        self.0 & ENTER_BIT != 0
    }

    /// Split back into `(code, is_tracepoint, is_enter)`
    #[must_use]
    pub const fn decode(self) -> (u64, bool, bool) {
        (self.code(), self.is_tracepoint(), self.is_enter())
    }

    /// Returns true if this identifier encodes exactly the given triple
    #[must_use]
    pub const fn matches(self, code: u64, is_tracepoint: bool, is_enter: bool) -> bool {
        self.0 == Self::new(code, is_tracepoint, is_enter).0
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({self} = {:#018x})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = if self.is_tracepoint() { "tp" } else { "kprobe" };
        let phase = if self.is_enter() { "enter" } else { "exit" };
        write!(f, "{kind}:{phase}:{}", self.code())
    }
}

//! Structured error types for execscope
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! Everything below [`BatchError`] is a per-notification soft failure: it is
//! logged and counted, and the next notification is processed normally.

use execscope_common::{EventId, ExternalIndex};
use thiserror::Error;

use super::types::CpuId;

/// Reading a slot from a per-CPU store failed
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("No store for {0}")]
    CpuOutOfRange(CpuId),

    #[error("Slot {slot} out of range on {cpu} (capacity {capacity})")]
    SlotOutOfRange { cpu: CpuId, slot: u32, capacity: u32 },

    #[error(transparent)]
    Map(#[from] aya::maps::MapError),
}

/// An interned string could not be read back
#[derive(Error, Debug)]
#[error("Failed to resolve string {index}: {source}")]
pub struct ResolveError {
    pub index: ExternalIndex,
    #[source]
    pub source: StoreError,
}

/// A handler could not turn a payload into a record
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("Handler {handler} cannot decode event {id}")]
    UnexpectedPayload { handler: &'static str, id: EventId },

    #[error("Unresolvable {field}: {source}")]
    String {
        field: &'static str,
        #[source]
        source: ResolveError,
    },
}

/// A whole notification batch was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchError {
    #[error("Notification batch of {0} bytes is not a multiple of 4")]
    Misaligned(usize),
}

/// One notification could not be dispatched
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Event slot lookup failed for {index}: {source}")]
    SlotLookup {
        index: ExternalIndex,
        #[source]
        source: StoreError,
    },

    #[error("No handler registered for event id {0}")]
    UnknownEvent(EventId),

    #[error(transparent)]
    Handler(#[from] HandlerError),
}

/// The notification transport failed
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("poll(2) on perf buffers failed: {0}")]
    Poll(#[source] std::io::Error),

    #[error(transparent)]
    PerfBuffer(#[from] aya::maps::perf::PerfBufferError),
}

/// The polling loop stopped before cancellation
#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Failed to write record: {0}")]
    Output(#[from] std::io::Error),
}

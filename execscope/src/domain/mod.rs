//! Domain model for execscope
//!
//! Core newtypes and the structured errors of the consumer pipeline.

pub mod errors;
pub mod types;

// Re-export common types for convenience
pub use types::CpuId;

pub use errors::{
    BatchError, DispatchError, HandlerError, PollError, ResolveError, StoreError, TransportError,
};

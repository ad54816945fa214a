//! # execscope - eBPF-based Process Execution Tracer
//!
//! execscope captures every `execve(2)` on the system through a tracepoint
//! probe and turns it into structured records in userspace.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  eBPF Probe (Kernel, per CPU)                   │
//! │  • Tracepoint: syscalls/sys_enter_execve                        │
//! │  • EVENT_DATA / STRING_DATA: per-CPU fixed-capacity slot stores │
//! └───────────────────────┬─────────────────────────────────────────┘
//!                         │ 4-byte event index (EVENTS perf array)
//!                         ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     execscope (This Crate)                      │
//! │                                                                 │
//! │  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐         │
//! │  │  Poll loop   │──▶│    Event     │──▶│  Dispatcher  │         │
//! │  │ (transport)  │   │  Processor   │   │  + handlers  │         │
//! │  └──────────────┘   └──────┬───────┘   └──────┬───────┘         │
//! │                            │ slot reads       │ string reads    │
//! │                            ▼                  ▼                 │
//! │                     ┌─────────────────────────────┐             │
//! │                     │  Per-CPU stores (MapStore)  │             │
//! │                     └─────────────────────────────┘             │
//! │                                                                 │
//! │  records ──▶ stdout (text / JSON) and optional JSON-lines export │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Structure
//!
//! - [`consumer`]: decode, dispatch and output of notifications
//!   - `processor`: batch validation and per-notification error accounting
//!   - `dispatch` / `handlers`: composite-id keyed handler table
//!   - `strings`: resolution of interned strings
//!   - `poll_loop`: the single-threaded polling loop
//!
//! - [`store`]: read access to per-CPU slot stores, backed by the probe's maps
//!   or by in-memory arenas
//!
//! - [`probe`]: eBPF loading, tracepoint attachment and the perf transport
//!
//! - [`export`]: JSON-lines record export
//!
//! - [`cli`], [`preflight`], [`domain`]: arguments, system checks, core types
//!   and errors
//!
//! ## Delivery Guarantees
//!
//! None beyond best effort. Slots are overwritten when a store wraps, so a
//! record may reflect a newer event than the notification that named it, and
//! notifications can be dropped when a perf buffer overflows (reported as
//! lost). Records are ordered per CPU only.
//!
//! ## Typical Usage
//!
//! ```bash
//! sudo ./execscope
//! sudo ./execscope --format json --duration 10
//! sudo ./execscope --export execs.jsonl -q
//! ```

// Expose modules for testing
pub mod cli;
pub mod consumer;
pub mod domain;
pub mod export;
pub mod preflight;
pub mod probe;
pub mod store;

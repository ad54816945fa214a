//! Kernel-facing glue
//!
//! Loader and attachment, the perf transport, CPU enumeration and the
//! store cursor diagnostics. Nothing in `consumer` depends on this module.

pub mod cpu_utils;
pub mod diagnostics;
pub mod ebpf_setup;
pub mod perf_transport;

pub use cpu_utils::online_cpus;
pub use diagnostics::print_store_diagnostics;
pub use ebpf_setup::{
    attach_execve_tracepoint, init_ebpf_logger, load_ebpf_program, open_stores, open_transport,
};
pub use perf_transport::PerfTransport;

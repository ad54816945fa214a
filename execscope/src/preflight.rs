//! Pre-flight checks for execscope
//!
//! Validates system requirements before attempting to load eBPF programs.
//! Provides clear, actionable error messages when requirements aren't met.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use std::path::Path;

/// `bpf_probe_read_user_str` first shipped in Linux 5.5
const MIN_KERNEL_VERSION: (u32, u32) = (5, 5);

/// tracefs locations, newest first
const TRACEPOINT_DIRS: [&str; 2] = [
    "/sys/kernel/tracing/events/syscalls/sys_enter_execve",
    "/sys/kernel/debug/tracing/events/syscalls/sys_enter_execve",
];

/// Run all pre-flight checks before eBPF loading
///
/// # Errors
/// Returns the first failed check
pub fn run_preflight_checks(quiet: bool) -> Result<()> {
    check_privileges()?;
    check_kernel_version()?;
    check_tracepoint(quiet);
    Ok(())
}

/// Check if running with sufficient privileges for eBPF
fn check_privileges() -> Result<()> {
    if unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }

    bail!(
        "Permission denied: execscope requires root privileges to load eBPF programs.\n\n\
         Run with: sudo execscope ..."
    );
}

/// Check if the kernel version is sufficient for eBPF features
fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;

    // "Linux version 6.1.0-arch1-1 ..."
    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");

    let Some((major, minor)) = parse_kernel_release(release) else {
        // Can't parse, assume it's fine
        return Ok(());
    };

    if (major, minor) < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {major}.{minor} is too old.\n\n\
             execscope requires Linux {}.{} or newer for bpf_probe_read_user_str.\n\
             Current kernel: {release}",
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
        );
    }

    Ok(())
}

/// `(major, minor)` of a release string such as `5.15.0-generic`
#[must_use]
pub fn parse_kernel_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;
    Some((major, minor))
}

/// Warn if the execve tracepoint is not visible in tracefs
///
/// Only a warning: tracefs may simply not be mounted, and attachment reports
/// the real error.
fn check_tracepoint(quiet: bool) {
    if quiet {
        return;
    }
    if !TRACEPOINT_DIRS.iter().any(|dir| Path::new(dir).exists()) {
        eprintln!("warning: syscalls/sys_enter_execve not found in tracefs, attachment may fail");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kernel_release() {
        assert_eq!(parse_kernel_release("5.15.0-generic"), Some((5, 15)));
        assert_eq!(parse_kernel_release("6.1.0-arch1-1"), Some((6, 1)));
        assert_eq!(parse_kernel_release("5.4"), Some((5, 4)));
        assert_eq!(parse_kernel_release("5.10rc1"), Some((5, 10)));
        assert_eq!(parse_kernel_release("unknown"), None);
    }

    #[test]
    fn test_minimum_version_ordering() {
        assert!((5, 4) < MIN_KERNEL_VERSION);
        assert!((5, 5) >= MIN_KERNEL_VERSION);
        assert!((6, 0) > MIN_KERNEL_VERSION);
    }
}

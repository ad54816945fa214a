//! Decoded records produced by event handlers

use serde::Serialize;
use std::fmt;

/// A decoded `execve(2)` entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecRecord {
    /// Monotonic timestamp in nanoseconds
    pub timestamp_ns: u64,
    /// Process id (TGID)
    pub pid: u32,
    /// Thread id
    pub tid: u32,
    pub ppid: u32,
    pub uid: u32,
    pub gid: u32,
    /// Path passed to `execve`, possibly truncated
    pub path: String,
    /// Number of arguments captured, not the real argument count
    pub argc: u32,
    pub argv: Vec<String>,
}

impl fmt::Display for ExecRecord {
    #[allow(clippy::cast_precision_loss)]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[EXEC] {:.6} pid={} tid={} ppid={} uid={} gid={} path={} argc={} argv={:?}",
            self.timestamp_ns as f64 / 1_000_000_000.0,
            self.pid,
            self.tid,
            self.ppid,
            self.uid,
            self.gid,
            self.path,
            self.argc,
            self.argv,
        )
    }
}

/// Any record a handler can produce
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventRecord {
    Exec(ExecRecord),
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exec(record) => record.fmt(f),
        }
    }
}

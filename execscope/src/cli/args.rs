//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use crate::consumer::OutputFormat;

#[derive(Parser)]
#[command(
    name = "execscope",
    about = "Trace process execution system-wide with eBPF",
    after_help = "\
EXAMPLES:
    sudo execscope                               Print every execve as text
    sudo execscope --format json                 One JSON object per line
    sudo execscope --duration 30 --export ex.jsonl   Trace for 30s, save records"
)]
pub struct Args {
    /// Output format for records on stdout
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Also write records to FILE as JSON lines
    #[arg(long, value_name = "FILE")]
    pub export: Option<PathBuf>,

    /// Stop after N seconds (0 = unlimited)
    #[arg(long, default_value = "0")]
    pub duration: u64,

    /// Longest single wait for notifications, in milliseconds
    #[arg(long, default_value = "100", value_parser = clap::value_parser!(u64).range(1..))]
    pub poll_timeout_ms: u64,

    /// Perf buffer size per CPU, in pages (power of two)
    #[arg(long, value_parser = parse_pages)]
    pub pages: Option<usize>,

    /// Print statistics every N seconds (0 = only at exit)
    #[arg(long, default_value = "0")]
    pub stats_interval: u64,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    #[must_use]
    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    #[must_use]
    pub fn duration_limit(&self) -> Option<Duration> {
        (self.duration > 0).then(|| Duration::from_secs(self.duration))
    }

    #[must_use]
    pub fn stats_interval(&self) -> Option<Duration> {
        (self.stats_interval > 0).then(|| Duration::from_secs(self.stats_interval))
    }
}

fn parse_pages(value: &str) -> Result<usize, String> {
    let pages: usize = value.parse().map_err(|e| format!("{e}"))?;
    if pages == 0 || !pages.is_power_of_two() {
        return Err(format!("{pages} is not a power of two"));
    }
    Ok(pages)
}

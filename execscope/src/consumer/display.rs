// Time conversions intentionally lose precision for display purposes
#![allow(clippy::cast_precision_loss)]

use std::io::Write;

use super::dispatch::Dispatched;
use super::poll_loop::RecordSink;
use super::processor::ProcessorStats;
use super::record::EventRecord;
use crate::export::RecordExporter;

/// How records are printed on stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// One human-readable line per record
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// Render a record in the requested format, without a trailing newline
///
/// # Errors
/// Returns an error if JSON serialization fails
pub fn format_record(record: &EventRecord, format: OutputFormat) -> serde_json::Result<String> {
    match format {
        OutputFormat::Text => Ok(record.to_string()),
        OutputFormat::Json => serde_json::to_string(record),
    }
}

/// Prints records and optionally mirrors them into an export file
pub struct OutputSink<W: Write, X: Write> {
    out: W,
    format: OutputFormat,
    exporter: Option<RecordExporter<X>>,
}

impl<W: Write, X: Write> OutputSink<W, X> {
    pub fn new(out: W, format: OutputFormat, exporter: Option<RecordExporter<X>>) -> Self {
        Self { out, format, exporter }
    }

    /// Hand back the exporter so it can be finished
    pub fn take_exporter(&mut self) -> Option<RecordExporter<X>> {
        self.exporter.take()
    }
}

impl<W: Write, X: Write> RecordSink for OutputSink<W, X> {
    fn write_record(&mut self, dispatched: &Dispatched) -> std::io::Result<()> {
        let line = format_record(&dispatched.record, self.format)?;
        writeln!(self.out, "{line}")?;
        if let Some(exporter) = self.exporter.as_mut() {
            exporter.write(&dispatched.record)?;
        }
        Ok(())
    }
}

/// Display processor statistics
pub fn display_statistics(stats: &ProcessorStats) {
    eprintln!(
        "stats: batches={} rejected={} notifications={} dispatched={} slot_fail={} unknown={} handler_fail={} lost={}",
        stats.batches,
        stats.rejected_batches,
        stats.notifications,
        stats.dispatched,
        stats.slot_lookup_failures,
        stats.unknown_events,
        stats.handler_failures,
        stats.lost_notifications,
    );
}

/// One-line summary printed when tracing stops
pub fn display_summary(reason: &str, elapsed_secs: f64, stats: &ProcessorStats) {
    eprintln!(
        "\n{reason}: {elapsed_secs:.1}s, {} events ({} notifications, {} skipped, {} lost)",
        stats.dispatched,
        stats.notifications,
        stats.notifications - stats.dispatched,
        stats.lost_notifications,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ExecRecord;

    fn dispatched() -> Dispatched {
        Dispatched {
            handler: "sys_enter_execve",
            record: EventRecord::Exec(ExecRecord {
                path: "/bin/true".to_string(),
                ..ExecRecord::default()
            }),
        }
    }

    #[test]
    fn test_json_output_is_one_line() {
        let mut out = Vec::new();
        let mut sink = OutputSink::<_, Vec<u8>>::new(&mut out, OutputFormat::Json, None);
        sink.write_record(&dispatched()).unwrap();
        sink.write_record(&dispatched()).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 2);
        assert!(text.lines().all(|line| line.contains("\"path\":\"/bin/true\"")));
    }

    #[test]
    fn test_sink_mirrors_into_exporter() {
        let mut out = Vec::new();
        let mut sink =
            OutputSink::new(&mut out, OutputFormat::Text, Some(RecordExporter::new(Vec::new())));
        sink.write_record(&dispatched()).unwrap();

        let exporter = sink.take_exporter().unwrap();
        assert_eq!(exporter.written(), 1);
        assert!(String::from_utf8(out).unwrap().starts_with("[EXEC]"));
    }
}

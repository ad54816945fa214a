//! Record export
//!
//! Writes one JSON object per record (JSON lines), so an export can be
//! streamed while tracing and read back with `jq` or line by line.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::consumer::EventRecord;

/// JSON-lines exporter for decoded records
pub struct RecordExporter<W: Write> {
    writer: W,
    written: u64,
}

impl RecordExporter<BufWriter<File>> {
    /// Create (or truncate) `path` and export into it
    ///
    /// # Errors
    /// Returns an error if the file cannot be created
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create export file: {}", path.display()))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> RecordExporter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Append one record as a single line
    ///
    /// # Errors
    /// Returns an I/O error if serialization or the write fails
    pub fn write(&mut self, record: &EventRecord) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.written
    }

    /// Flush buffered output and return the number of records written
    ///
    /// # Errors
    /// Returns an error if the final flush fails
    pub fn finish(mut self) -> Result<u64> {
        self.writer.flush().context("Failed to flush export")?;
        Ok(self.written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::ExecRecord;

    #[test]
    fn test_one_line_per_record() {
        let mut buffer = Vec::new();
        let mut exporter = RecordExporter::new(&mut buffer);
        for pid in [1, 2] {
            exporter
                .write(&EventRecord::Exec(ExecRecord { pid, ..ExecRecord::default() }))
                .unwrap();
        }
        assert_eq!(exporter.finish().unwrap(), 2);

        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "exec");
        assert_eq!(second["pid"], 2);
    }
}

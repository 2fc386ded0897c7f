use serde_json::Value;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::error::{EmcomError, Result};

/// Destination of the structured records produced by callbacks
pub trait RecordSink: Send {
    fn write_line(&self, line: &str) -> Result<()>;

    /// Emit a record as one compact JSON line
    fn emit(&self, record: &Value) -> Result<()> {
        self.write_line(&serde_json::to_string(record)?)
    }
}

/// Writes every line to standard output and flushes it
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutSink;

impl RecordSink for StdoutSink {
    fn write_line(&self, line: &str) -> Result<()> {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        writeln!(handle, "{}", line)?;
        handle.flush()?;
        Ok(())
    }
}

/// Keeps lines in memory; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Lines that parse as JSON
    pub fn records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }
}

impl RecordSink for MemorySink {
    fn write_line(&self, line: &str) -> Result<()> {
        self.lines
            .lock()
            .map_err(|_| EmcomError::IoError("record buffer poisoned".to_string()))?
            .push(line.to_string());
        Ok(())
    }
}

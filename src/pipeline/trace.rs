// Pipeline progress tracing
// Append-only JSONL trace of arrangement runs and per-phrase decisions

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const STAGE_QUANTIZATION: &str = "quantization";
pub const STAGE_DENSITY: &str = "density";
pub const STAGE_ARRANGEMENT: &str = "arrangement";
pub const STAGE_PHRASE: &str = "phrase";
pub const STAGE_EXPORT: &str = "export";

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// A single trace entry in the pipeline execution log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Run this entry belongs to
    pub run_id: Uuid,

    /// RFC 3339 timestamp of when this entry was created
    pub timestamp: String,

    /// Pipeline stage name (e.g., "quantization", "density", "phrase")
    pub stage: String,

    /// Progress percentage [0.0, 1.0]
    pub progress: f32,

    /// Human-readable message describing current operation
    pub message: String,

    /// Optional structured data (e.g., a phrase decision)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    /// Create a new trace entry with current timestamp
    pub fn new(run_id: Uuid, stage: String, progress: f32, message: String) -> Self {
        TraceEntry {
            run_id,
            timestamp: Utc::now().to_rfc3339(),
            stage,
            progress: progress.clamp(0.0, 1.0),
            message,
            data: None,
        }
    }

    /// Attach structured data
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Serialize to JSON line (with newline)
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Pipeline trace writer
/// Manages append-only JSONL trace file
pub struct TraceWriter {
    file_path: PathBuf,
}

impl TraceWriter {
    /// Create a new trace writer for a specific file
    pub fn new(file_path: PathBuf) -> Self {
        TraceWriter { file_path }
    }

    /// Append a trace entry to the file
    /// Creates file if it doesn't exist
    pub fn write(&self, entry: &TraceEntry) -> Result<(), TraceError> {
        self.write_batch(std::slice::from_ref(entry))
    }

    /// Write multiple entries at once
    pub fn write_batch(&self, entries: &[TraceEntry]) -> Result<(), TraceError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;

        for entry in entries {
            let json_line = entry.to_json_line()?;
            file.write_all(json_line.as_bytes())?;
        }

        file.flush()?;
        Ok(())
    }

    /// Get the trace file path
    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// Helper builder for creating trace entries of one run
pub struct TraceBuilder {
    run_id: Uuid,
    stage: String,
}

impl TraceBuilder {
    /// Start building a trace entry for a stage
    pub fn stage(run_id: Uuid, stage: impl Into<String>) -> Self {
        TraceBuilder {
            run_id,
            stage: stage.into(),
        }
    }

    /// Create a start entry (progress = 0.0)
    pub fn start(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run_id, self.stage, 0.0, message.into())
    }

    /// Create a progress entry
    pub fn progress(self, progress: f32, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run_id, self.stage, progress, message.into())
    }

    /// Create a complete entry (progress = 1.0)
    pub fn complete(self, message: impl Into<String>) -> TraceEntry {
        TraceEntry::new(self.run_id, self.stage, 1.0, message.into())
    }
}

/// In-memory trace of one run, optionally mirrored to a JSONL file
pub struct TraceLog {
    run_id: Uuid,
    entries: Vec<TraceEntry>,
    writer: Option<TraceWriter>,
}

impl TraceLog {
    pub fn new(run_id: Uuid, file_path: Option<PathBuf>) -> Self {
        TraceLog {
            run_id,
            entries: Vec::new(),
            writer: file_path.map(TraceWriter::new),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn stage(&self, stage: &str) -> TraceBuilder {
        TraceBuilder::stage(self.run_id, stage)
    }

    /// Record an entry, appending it to the file if one is configured
    pub fn record(&mut self, entry: TraceEntry) -> Result<(), TraceError> {
        if let Some(writer) = &self.writer {
            writer.write(&entry)?;
        }
        self.entries.push(entry);
        Ok(())
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<TraceEntry> {
        self.entries
    }
}

/// Read trace entries from a JSONL file
pub fn read_trace_file(path: &Path) -> Result<Vec<TraceEntry>, TraceError> {
    let contents = std::fs::read_to_string(path)?;
    let mut entries = Vec::new();

    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }

        let entry: TraceEntry = serde_json::from_str(line)?;
        entries.push(entry);
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_trace_entry_creation() {
        let run_id = Uuid::new_v4();
        let entry = TraceEntry::new(run_id, STAGE_DENSITY.to_string(), 0.5, "Analyzing".to_string());

        assert_eq!(entry.run_id, run_id);
        assert_eq!(entry.stage, "density");
        assert_eq!(entry.progress, 0.5);
        assert!(entry.data.is_none());
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
    }

    #[test]
    fn test_trace_entry_with_data() {
        let entry = TraceBuilder::stage(Uuid::new_v4(), STAGE_PHRASE)
            .progress(0.25, "Phrase 0")
            .with_data(serde_json::json!({ "level": 7, "chords": ["c", "f"] }));

        assert_eq!(entry.data.unwrap()["level"], 7);
    }

    #[test]
    fn test_progress_clamping() {
        let run_id = Uuid::new_v4();
        let low = TraceEntry::new(run_id, "test".to_string(), -0.5, "test".to_string());
        assert_eq!(low.progress, 0.0);

        let high = TraceEntry::new(run_id, "test".to_string(), 1.5, "test".to_string());
        assert_eq!(high.progress, 1.0);
    }

    #[test]
    fn test_trace_builder_start_complete() {
        let run_id = Uuid::new_v4();
        let start = TraceBuilder::stage(run_id, STAGE_EXPORT).start("Starting");
        assert_eq!(start.progress, 0.0);

        let complete = TraceBuilder::stage(run_id, STAGE_EXPORT).complete("Done");
        assert_eq!(complete.progress, 1.0);
        assert_eq!(complete.stage, "export");
    }

    #[test]
    fn test_trace_writer() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("trace.jsonl");
        let writer = TraceWriter::new(trace_path.clone());
        let run_id = Uuid::new_v4();

        writer.write(&TraceBuilder::stage(run_id, "stage1").start("Start")).unwrap();
        writer.write(&TraceBuilder::stage(run_id, "stage1").complete("Done")).unwrap();

        let entries = read_trace_file(&trace_path).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].stage, "stage1");
        assert_eq!(entries[1].progress, 1.0);
        assert!(entries.iter().all(|e| e.run_id == run_id));
    }

    #[test]
    fn test_trace_log_mirrors_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let trace_path = temp_dir.path().join("run.jsonl");
        let mut log = TraceLog::new(Uuid::new_v4(), Some(trace_path.clone()));

        let entry = log.stage(STAGE_QUANTIZATION).complete("12 notes in 3 bars");
        log.record(entry).unwrap();
        let entry = log.stage(STAGE_DENSITY).complete("2 groups");
        log.record(entry).unwrap();

        assert_eq!(log.entries().len(), 2);
        let on_disk = read_trace_file(&trace_path).unwrap();
        assert_eq!(on_disk.len(), 2);
        assert_eq!(on_disk[1].stage, "density");
        assert_eq!(on_disk[0].run_id, log.run_id());
    }

    #[test]
    fn test_trace_log_in_memory() {
        let mut log = TraceLog::new(Uuid::new_v4(), None);
        let entry = log.stage(STAGE_ARRANGEMENT).start("Arranging");
        log.record(entry).unwrap();
        assert_eq!(log.into_entries().len(), 1);
    }

    #[test]
    fn test_json_line_format() {
        let entry = TraceBuilder::stage(Uuid::new_v4(), "test").progress(0.5, "Testing");
        let json_line = entry.to_json_line().unwrap();

        assert!(json_line.ends_with('\n'));
        let parsed: TraceEntry = serde_json::from_str(json_line.trim()).unwrap();
        assert_eq!(parsed.stage, "test");
        assert_eq!(parsed.run_id, entry.run_id);
    }
}

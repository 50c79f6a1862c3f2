// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Stdio};
use std::sync::{Arc, Mutex};

use rebatch::{
    AbortSignal, Batch, BatchError, BatchListener, FieldError, JobListener, JobReport, Record,
    RecordFilter, RecordMapper, RecordProcessor, RecordReader, RecordValidator, RecordWriter,
    ValidationReport,
};

/// The text of a record regardless of whether it has been mapped yet.
pub fn record_text(record: &Record) -> String {
    match record.raw_text() {
        Some(text) => text.to_string(),
        None => record
            .value()
            .and_then(|v| v.get("text"))
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    }
}

/// Mapper wrapping the raw text into a typed `{"text": ...}` payload.
pub struct TextMapper;

impl RecordMapper for TextMapper {
    fn map(&mut self, record: Record) -> Result<Record, BatchError> {
        let text = record
            .raw_text()
            .ok_or_else(|| BatchError::Mapping("record already mapped".to_string()))?
            .to_string();
        let header = record.header().clone();
        Ok(Record::mapped(header, serde_json::json!({ "text": text })))
    }
}

/// Mapper failing on records whose text starts with the given prefix.
pub struct FailOnPrefixMapper {
    pub prefix: &'static str,
}

impl RecordMapper for FailOnPrefixMapper {
    fn map(&mut self, record: Record) -> Result<Record, BatchError> {
        let text = record_text(&record);
        if text.starts_with(self.prefix) {
            return Err(BatchError::Mapping(format!("unmappable record '{}'", text)));
        }
        Ok(record)
    }
}

/// Filter dropping records whose text starts with the given prefix.
pub struct DropPrefixFilter {
    pub prefix: &'static str,
}

impl RecordFilter for DropPrefixFilter {
    fn accepts(&mut self, record: &Record) -> bool {
        !record_text(record).starts_with(self.prefix)
    }
}

/// Validator rejecting records whose text starts with the given prefix.
pub struct RejectPrefixValidator {
    pub prefix: &'static str,
}

impl RecordValidator for RejectPrefixValidator {
    fn validate(&mut self, record: &Record) -> ValidationReport {
        if record_text(record).starts_with(self.prefix) {
            ValidationReport::invalid(vec![FieldError::new("text", "forbidden prefix")])
        } else {
            ValidationReport::valid()
        }
    }
}

/// Processor failing on records whose text starts with the given prefix.
pub struct FailOnPrefixProcessor {
    pub prefix: &'static str,
}

impl RecordProcessor for FailOnPrefixProcessor {
    fn process(&mut self, record: Record) -> Result<Option<Record>, BatchError> {
        let text = record_text(&record);
        if text.starts_with(self.prefix) {
            return Err(BatchError::Processing(format!(
                "unprocessable record '{}'",
                text
            )));
        }
        Ok(Some(record))
    }
}

/// Processor consuming (swallowing) records whose text starts with the
/// given prefix.
pub struct ConsumePrefixProcessor {
    pub prefix: &'static str,
}

impl RecordProcessor for ConsumePrefixProcessor {
    fn process(&mut self, record: Record) -> Result<Option<Record>, BatchError> {
        if record_text(&record).starts_with(self.prefix) {
            Ok(None)
        } else {
            Ok(Some(record))
        }
    }
}

/// Processor flipping an abort signal after a number of records, to
/// exercise cancellation at the next record boundary.
pub struct AbortingProcessor {
    pub after: usize,
    pub signal: AbortSignal,
    pub seen: usize,
}

impl RecordProcessor for AbortingProcessor {
    fn process(&mut self, record: Record) -> Result<Option<Record>, BatchError> {
        self.seen += 1;
        if self.seen >= self.after {
            self.signal.abort();
        }
        Ok(Some(record))
    }
}

/// Reader whose `open` always fails.
pub struct UnopenableReader;

impl RecordReader for UnopenableReader {
    fn open(&mut self) -> Result<(), BatchError> {
        Err(BatchError::Io("source unreachable".to_string()))
    }

    fn read_record(&mut self) -> Result<Option<Record>, BatchError> {
        Ok(None)
    }

    fn close(&mut self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Writer failing on the n-th batch (1-based); earlier batches succeed
/// and are collected.
pub struct FailingBatchWriter {
    pub fail_on: usize,
    pub written: Arc<Mutex<Vec<Vec<String>>>>,
    pub seen: usize,
}

impl FailingBatchWriter {
    pub fn new(fail_on: usize) -> Self {
        Self {
            fail_on,
            written: Arc::new(Mutex::new(Vec::new())),
            seen: 0,
        }
    }

    pub fn written_handle(&self) -> Arc<Mutex<Vec<Vec<String>>>> {
        Arc::clone(&self.written)
    }
}

impl RecordWriter for FailingBatchWriter {
    fn open(&mut self) -> Result<(), BatchError> {
        Ok(())
    }

    fn write_batch(&mut self, batch: &Batch) -> Result<(), BatchError> {
        self.seen += 1;
        if self.seen == self.fail_on {
            return Err(BatchError::Writing("sink rejected batch".to_string()));
        }
        self.written
            .lock()
            .unwrap()
            .push(batch.records().iter().map(record_text).collect());
        Ok(())
    }

    fn close(&mut self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Writer whose `close` fails after an otherwise successful run.
pub struct UnclosableWriter;

impl RecordWriter for UnclosableWriter {
    fn open(&mut self) -> Result<(), BatchError> {
        Ok(())
    }

    fn write_batch(&mut self, _batch: &Batch) -> Result<(), BatchError> {
        Ok(())
    }

    fn close(&mut self) -> Result<(), BatchError> {
        Err(BatchError::Io("sink refused to close".to_string()))
    }
}

/// Batch listener appending every hook invocation to a shared log.
pub struct RecordingBatchListener {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingBatchListener {
    pub fn new(events: &Arc<Mutex<Vec<String>>>) -> Box<Self> {
        Box::new(Self {
            events: Arc::clone(events),
        })
    }
}

impl BatchListener for RecordingBatchListener {
    fn before_batch_reading(&mut self) -> Result<(), BatchError> {
        self.events.lock().unwrap().push("before-reading".to_string());
        Ok(())
    }

    fn after_batch_processing(&mut self, batch: &Batch) -> Result<(), BatchError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("after-processing:{}", batch.len()));
        Ok(())
    }

    fn after_batch_writing(&mut self, batch: &Batch) -> Result<(), BatchError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("after-writing:{}", batch.len()));
        Ok(())
    }

    fn on_batch_writing_error(&mut self, batch: &Batch, error: &BatchError) -> Result<(), BatchError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("writing-error:{}:{}", batch.len(), error.kind()));
        Ok(())
    }
}

/// Job listener appending lifecycle hook invocations to a shared log.
pub struct RecordingJobListener {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl RecordingJobListener {
    pub fn new(events: &Arc<Mutex<Vec<String>>>) -> Box<Self> {
        Box::new(Self {
            events: Arc::clone(events),
        })
    }
}

impl JobListener for RecordingJobListener {
    fn before_job_start(&mut self, job_name: &str) -> Result<(), BatchError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("before-start:{}", job_name));
        Ok(())
    }

    fn after_job_end(&mut self, report: &JobReport) -> Result<(), BatchError> {
        self.events
            .lock()
            .unwrap()
            .push(format!("after-end:{}", report.status()));
        Ok(())
    }
}

/// Job listener whose after-end hook always fails (a critical hook).
pub struct RejectingJobListener;

impl JobListener for RejectingJobListener {
    fn after_job_end(&mut self, _report: &JobReport) -> Result<(), BatchError> {
        Err(BatchError::Listener("audit trail unavailable".to_string()))
    }
}

/// Run the rebatch binary with the given arguments, returning stdout,
/// stderr and the exit code.
pub fn run_rebatch(args: &[&str]) -> (String, String, i32) {
    let cmd = Command::new(env!("CARGO_BIN_EXE_rebatch"))
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start rebatch");

    let output = cmd.wait_with_output().expect("Failed to read output");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Write content to a fresh temp file and return it (keeping the handle
/// alive keeps the file alive).
pub fn input_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write temp file");
    file.flush().expect("Failed to flush temp file");
    file
}

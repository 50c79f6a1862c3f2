use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::batch::Batch;
use crate::error::BatchError;
use crate::listener::{BatchListener, CompositeBatchListener, CompositeJobListener, JobListener};
use crate::pipeline::{
    RecordFilter, RecordMapper, RecordProcessor, RecordReader, RecordValidator, RecordWriter,
};
use crate::record::Record;
use crate::report::JobReport;

/// Job lifecycle states. Transitions only move forward: Created →
/// Started → one of the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Created,
    Started,
    Completed,
    Failed,
    Aborted,
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            JobStatus::Created => "CREATED",
            JobStatus::Started => "STARTED",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Aborted => "ABORTED",
        };
        f.write_str(label)
    }
}

/// Cooperative cancellation flag, observed by the job only at safe
/// per-record boundaries. Clone freely; all clones share the flag.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    flag: Arc<AtomicBool>,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn abort(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_aborted(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Running counters, folded into the report at termination.
#[derive(Debug, Default)]
struct JobMetrics {
    read: usize,
    filtered: usize,
    errors: usize,
    written: usize,
    last_error: Option<BatchError>,
}

/// Configuration surface and assembly point for a job.
///
/// `build` validates the configuration; an invalid one yields
/// `BatchError::Configuration` and the job never starts.
pub struct JobBuilder {
    name: String,
    chunk_size: usize,
    error_threshold: usize,
    reader: Option<Box<dyn RecordReader>>,
    writer: Option<Box<dyn RecordWriter>>,
    mapper: Option<Box<dyn RecordMapper>>,
    filter: Option<Box<dyn RecordFilter>>,
    validator: Option<Box<dyn RecordValidator>>,
    processor: Option<Box<dyn RecordProcessor>>,
    job_listeners: CompositeJobListener,
    batch_listeners: CompositeBatchListener,
    abort: AbortSignal,
}

impl JobBuilder {
    /// Default chunk size when none is configured.
    pub const DEFAULT_CHUNK_SIZE: usize = 100;

    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
            // By default record-level stage errors never fail the job;
            // they are skipped and counted.
            error_threshold: usize::MAX,
            reader: None,
            writer: None,
            mapper: None,
            filter: None,
            validator: None,
            processor: None,
            job_listeners: CompositeJobListener::new(),
            batch_listeners: CompositeBatchListener::new(),
            abort: AbortSignal::new(),
        }
    }

    pub fn reader(mut self, reader: Box<dyn RecordReader>) -> Self {
        self.reader = Some(reader);
        self
    }

    pub fn writer(mut self, writer: Box<dyn RecordWriter>) -> Self {
        self.writer = Some(writer);
        self
    }

    pub fn mapper(mut self, mapper: Box<dyn RecordMapper>) -> Self {
        self.mapper = Some(mapper);
        self
    }

    pub fn filter(mut self, filter: Box<dyn RecordFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn validator(mut self, validator: Box<dyn RecordValidator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn processor(mut self, processor: Box<dyn RecordProcessor>) -> Self {
        self.processor = Some(processor);
        self
    }

    pub fn chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Number of record-level stage errors tolerated before the job
    /// fails. Zero fails on the first error. Filter and validation
    /// rejections are never counted against this threshold.
    pub fn error_threshold(mut self, error_threshold: usize) -> Self {
        self.error_threshold = error_threshold;
        self
    }

    pub fn job_listener(mut self, listener: Box<dyn JobListener>) -> Self {
        self.job_listeners.add(listener);
        self
    }

    pub fn batch_listener(mut self, listener: Box<dyn BatchListener>) -> Self {
        self.batch_listeners.add(listener);
        self
    }

    pub fn abort_signal(mut self, abort: AbortSignal) -> Self {
        self.abort = abort;
        self
    }

    pub fn build(self) -> Result<Job, BatchError> {
        if self.chunk_size == 0 {
            return Err(BatchError::Configuration(
                "chunk size must be at least 1".to_string(),
            ));
        }
        let reader = self.reader.ok_or_else(|| {
            BatchError::Configuration("a record reader is required".to_string())
        })?;
        let writer = self.writer.ok_or_else(|| {
            BatchError::Configuration("a record writer is required".to_string())
        })?;

        Ok(Job {
            name: self.name,
            chunk_size: self.chunk_size,
            error_threshold: self.error_threshold,
            reader,
            writer,
            mapper: self.mapper,
            filter: self.filter,
            validator: self.validator,
            processor: self.processor,
            job_listeners: self.job_listeners,
            batch_listeners: self.batch_listeners,
            abort: self.abort,
            status: JobStatus::Created,
            metrics: JobMetrics::default(),
        })
    }
}

/// The orchestrator: drives the sequential read/transform/batch/write
/// loop and owns all per-run state. One logical thread of control per
/// job; running several jobs means building several jobs.
///
/// `execute` consumes the job, so a finished job can never be re-run with
/// stale counters.
pub struct Job {
    name: String,
    chunk_size: usize,
    error_threshold: usize,
    reader: Box<dyn RecordReader>,
    writer: Box<dyn RecordWriter>,
    mapper: Option<Box<dyn RecordMapper>>,
    filter: Option<Box<dyn RecordFilter>>,
    validator: Option<Box<dyn RecordValidator>>,
    processor: Option<Box<dyn RecordProcessor>>,
    job_listeners: CompositeJobListener,
    batch_listeners: CompositeBatchListener,
    abort: AbortSignal,
    status: JobStatus,
    metrics: JobMetrics,
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job")
            .field("name", &self.name)
            .field("chunk_size", &self.chunk_size)
            .field("error_threshold", &self.error_threshold)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

impl Job {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    /// Run the job to completion and return its report. Never panics and
    /// never propagates an error: every run, successful or not, yields a
    /// report with the final status and the last recorded error.
    pub fn execute(mut self) -> JobReport {
        let start_time = Utc::now();
        self.job_listeners.before_job_start(&self.name);

        match self.open_resources() {
            Ok(()) => {
                self.status = JobStatus::Started;
                self.run_loop();
            }
            Err(e) => {
                self.metrics.last_error = Some(e);
                self.status = JobStatus::Failed;
            }
        }
        self.close_resources();

        let report = JobReport::new(
            self.name.clone(),
            self.status,
            start_time,
            Utc::now(),
            self.metrics.read,
            self.metrics.filtered,
            self.metrics.errors,
            self.metrics.written,
            self.metrics.last_error.clone(),
        );
        match self.job_listeners.after_job_end(&report) {
            Ok(()) => report,
            Err(e) => report.failed_with(e),
        }
    }

    fn open_resources(&mut self) -> Result<(), BatchError> {
        self.reader.open()?;
        self.writer.open()
    }

    /// Close both ends regardless of how the run terminated. A close
    /// failure on an otherwise successful run downgrades it to failed.
    fn close_resources(&mut self) {
        if let Err(e) = self.reader.close() {
            self.note_close_failure(e);
        }
        if let Err(e) = self.writer.close() {
            self.note_close_failure(e);
        }
    }

    fn note_close_failure(&mut self, error: BatchError) {
        eprintln!("Job '{}': close failed: {}", self.name, error);
        if self.status == JobStatus::Completed {
            self.status = JobStatus::Failed;
            self.metrics.last_error = Some(error);
        }
    }

    /// The per-record loop. Sets the terminal status on `self` before
    /// returning.
    fn run_loop(&mut self) {
        let mut batch = Batch::new(self.chunk_size);
        let mut fresh_batch = true;

        loop {
            // Abort is honored only here, between records; a stage call
            // is never interrupted mid-execution. The partial batch is
            // discarded, not written.
            if self.abort.is_aborted() {
                self.status = JobStatus::Aborted;
                return;
            }

            if fresh_batch {
                self.batch_listeners.before_batch_reading();
                fresh_batch = false;
            }

            let record = match self.reader.read_record() {
                Ok(Some(record)) if record.is_poison() => {
                    // Poison means end-of-input for this consumer. It is
                    // never mapped, validated, processed, or written.
                    self.finish(&mut batch);
                    return;
                }
                Ok(Some(record)) => record,
                Ok(None) => {
                    self.finish(&mut batch);
                    return;
                }
                Err(e) => {
                    self.metrics.last_error = Some(e);
                    self.status = JobStatus::Failed;
                    return;
                }
            };
            self.metrics.read += 1;

            let record = match self.apply_stages(record) {
                StageOutcome::Keep(record) => record,
                StageOutcome::Skip => continue,
                StageOutcome::Fatal => return,
            };

            batch.push(record);
            if batch.is_full() {
                let full = batch.take();
                if !self.write_full_batch(&full) {
                    return;
                }
                fresh_batch = true;
            }
        }
    }

    /// Run one record through mapper → filter → validator → processor.
    fn apply_stages(&mut self, record: Record) -> StageOutcome {
        let record = match &mut self.mapper {
            Some(mapper) => match mapper.map(record) {
                Ok(record) => record,
                Err(e) => return self.record_stage_error(e),
            },
            None => record,
        };

        if let Some(filter) = &mut self.filter {
            if !filter.accepts(&record) {
                self.metrics.filtered += 1;
                return StageOutcome::Skip;
            }
        }

        if let Some(validator) = &mut self.validator {
            let validation = validator.validate(&record);
            if !validation.is_valid() {
                for field_error in validation.errors() {
                    eprintln!(
                        "Job '{}': record {} rejected: {}: {}",
                        self.name,
                        record.header().sequence(),
                        field_error.field,
                        field_error.message
                    );
                }
                self.metrics.filtered += 1;
                return StageOutcome::Skip;
            }
        }

        match &mut self.processor {
            Some(processor) => match processor.process(record) {
                Ok(Some(record)) => StageOutcome::Keep(record),
                Ok(None) => {
                    // Consumed by the processor; accounted as filtered so
                    // every input record lands in exactly one bucket.
                    self.metrics.filtered += 1;
                    StageOutcome::Skip
                }
                Err(e) => self.record_stage_error(e),
            },
            None => StageOutcome::Keep(record),
        }
    }

    /// Count a mapper/processor failure. The record is skipped; the job
    /// fails only once the error count exceeds the threshold, so with
    /// threshold N the (N+1)-th failure is fatal.
    fn record_stage_error(&mut self, error: BatchError) -> StageOutcome {
        eprintln!("Job '{}': record skipped: {}", self.name, error);
        self.metrics.errors += 1;
        self.metrics.last_error = Some(error);
        if self.metrics.errors > self.error_threshold {
            self.status = JobStatus::Failed;
            StageOutcome::Fatal
        } else {
            StageOutcome::Skip
        }
    }

    /// Flush the trailing partial batch and complete the run.
    fn finish(&mut self, batch: &mut Batch) {
        if !batch.is_empty() {
            let full = batch.take();
            if !self.write_full_batch(&full) {
                return;
            }
        }
        self.status = JobStatus::Completed;
    }

    /// Write one assembled batch. Returns false when the run must stop:
    /// a write failure is fatal by default, with no partial retry.
    fn write_full_batch(&mut self, full: &Batch) -> bool {
        self.batch_listeners.after_batch_processing(full);
        match self.writer.write_batch(full) {
            Ok(()) => {
                self.metrics.written += full.len();
                self.batch_listeners.after_batch_writing(full);
                true
            }
            Err(e) => {
                if let Err(listener_error) =
                    self.batch_listeners.on_batch_writing_error(full, &e)
                {
                    eprintln!("Job '{}': {}", self.name, listener_error);
                }
                self.metrics.last_error = Some(e);
                self.status = JobStatus::Failed;
                false
            }
        }
    }
}

enum StageOutcome {
    Keep(Record),
    Skip,
    Fatal,
}

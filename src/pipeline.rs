use crate::batch::Batch;
use crate::error::BatchError;
use crate::record::Record;

// Core pipeline stage contracts.
//
// Each stage is a narrow capability implemented by external collaborators.
// A record passes through at most one invocation of each stage per run,
// and stages must not retry internally; the engine guarantees isolation,
// not resilience of individual stages.

/// Produce records from a data source.
pub trait RecordReader: Send {
    /// Connect to or enumerate the source. Failure ends the job before
    /// any record is read.
    fn open(&mut self) -> Result<(), BatchError>;

    /// Return the next record, `None` at end of stream, or a poison
    /// record. Must return within a bounded time; readers over blocking
    /// transports yield `None` on timeout rather than blocking forever.
    fn read_record(&mut self) -> Result<Option<Record>, BatchError>;

    /// Release the source. Invoked on every exit path.
    fn close(&mut self) -> Result<(), BatchError>;
}

/// Turn a raw record into a typed one.
pub trait RecordMapper: Send {
    fn map(&mut self, record: Record) -> Result<Record, BatchError>;
}

/// Decide whether a record continues through the pipeline. A `false`
/// result is a silent skip, never an error.
pub trait RecordFilter: Send {
    fn accepts(&mut self, record: &Record) -> bool;
}

/// Check a record against domain rules.
pub trait RecordValidator: Send {
    fn validate(&mut self, record: &Record) -> ValidationReport;
}

/// Apply business logic to a record. Returning `Ok(None)` means the stage
/// consumed the record; it is not written and is counted as filtered.
pub trait RecordProcessor: Send {
    fn process(&mut self, record: Record) -> Result<Option<Record>, BatchError>;
}

/// Write batches to a data sink. A batch is all-or-nothing: a failed
/// write leaves the whole batch unwritten.
pub trait RecordWriter: Send {
    fn open(&mut self) -> Result<(), BatchError>;

    fn write_batch(&mut self, batch: &Batch) -> Result<(), BatchError>;

    /// Release the sink. Invoked on every exit path.
    fn close(&mut self) -> Result<(), BatchError>;
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Outcome of validating one record.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    errors: Vec<FieldError>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self { errors: Vec::new() }
    }

    pub fn invalid(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }
}

use serde::Serialize;
use std::fmt;

/// Error kinds produced by the engine and its pipeline stages.
///
/// Each variant maps to one row of the failure-isolation policy: mapping
/// and processing errors are recoverable per record up to the configured
/// threshold, everything else ends the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum BatchError {
    /// Invalid job configuration; the job never starts.
    Configuration(String),
    /// Reader/writer open, close, or mid-stream read failure.
    Io(String),
    /// A mapper failed on a single record.
    Mapping(String),
    /// A processor failed on a single record.
    Processing(String),
    /// A batch write failed; the whole batch is considered unwritten.
    Writing(String),
    /// A critical listener hook failed.
    Listener(String),
}

impl BatchError {
    /// Short kind label used in diagnostics and report output.
    pub fn kind(&self) -> &'static str {
        match self {
            BatchError::Configuration(_) => "configuration",
            BatchError::Io(_) => "io",
            BatchError::Mapping(_) => "mapping",
            BatchError::Processing(_) => "processing",
            BatchError::Writing(_) => "writing",
            BatchError::Listener(_) => "listener",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            BatchError::Configuration(msg)
            | BatchError::Io(msg)
            | BatchError::Mapping(msg)
            | BatchError::Processing(msg)
            | BatchError::Writing(msg)
            | BatchError::Listener(msg) => msg,
        }
    }
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error: {}", self.kind(), self.message())
    }
}

impl std::error::Error for BatchError {}

impl From<std::io::Error> for BatchError {
    fn from(e: std::io::Error) -> Self {
        BatchError::Io(e.to_string())
    }
}

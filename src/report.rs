use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::error::BatchError;
use crate::job::JobStatus;

/// Immutable summary of a completed or failed run. Built exactly once by
/// the job at termination; the sole externally consumed result object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReport {
    job_name: String,
    status: JobStatus,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    read_count: usize,
    filtered_count: usize,
    error_count: usize,
    write_count: usize,
    last_error: Option<BatchError>,
}

impl JobReport {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        job_name: String,
        status: JobStatus,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        read_count: usize,
        filtered_count: usize,
        error_count: usize,
        write_count: usize,
        last_error: Option<BatchError>,
    ) -> Self {
        Self {
            job_name,
            status,
            start_time,
            end_time,
            read_count,
            filtered_count,
            error_count,
            write_count,
            last_error,
        }
    }

    /// Rebuild this report as failed, keeping counters and timestamps.
    /// Used when a critical after-end listener rejects an otherwise
    /// finished run.
    pub(crate) fn failed_with(mut self, error: BatchError) -> Self {
        self.status = JobStatus::Failed;
        self.last_error = Some(error);
        self
    }

    pub fn job_name(&self) -> &str {
        &self.job_name
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> DateTime<Utc> {
        self.end_time
    }

    pub fn read_count(&self) -> usize {
        self.read_count
    }

    pub fn filtered_count(&self) -> usize {
        self.filtered_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn write_count(&self) -> usize {
        self.write_count
    }

    pub fn last_error(&self) -> Option<&BatchError> {
        self.last_error.as_ref()
    }

    /// Wall-clock duration of the run.
    pub fn duration(&self) -> Duration {
        (self.end_time - self.start_time)
            .to_std()
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for JobReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Job '{}' {}: {} read, {} written, {} filtered, {} errors in {}",
            self.job_name,
            self.status,
            self.read_count,
            self.write_count,
            self.filtered_count,
            self.error_count,
            humantime::format_duration(Duration::from_millis(
                self.duration().as_millis() as u64
            )),
        )?;
        if let Some(ref error) = self.last_error {
            write!(f, "; last error: {}", error)?;
        }
        Ok(())
    }
}

use crate::batch::Batch;
use crate::error::BatchError;
use crate::report::JobReport;

/// Observation hooks fired at job lifecycle boundaries. All methods are
/// no-ops by default so listeners implement only what they need.
pub trait JobListener: Send {
    fn before_job_start(&mut self, job_name: &str) -> Result<(), BatchError> {
        let _ = job_name;
        Ok(())
    }

    fn after_job_end(&mut self, report: &JobReport) -> Result<(), BatchError> {
        let _ = report;
        Ok(())
    }
}

/// Observation hooks fired at batch boundaries.
pub trait BatchListener: Send {
    fn before_batch_reading(&mut self) -> Result<(), BatchError> {
        Ok(())
    }

    fn after_batch_processing(&mut self, batch: &Batch) -> Result<(), BatchError> {
        let _ = batch;
        Ok(())
    }

    fn after_batch_writing(&mut self, batch: &Batch) -> Result<(), BatchError> {
        let _ = batch;
        Ok(())
    }

    fn on_batch_writing_error(&mut self, batch: &Batch, error: &BatchError) -> Result<(), BatchError> {
        let _ = (batch, error);
        Ok(())
    }
}

/// Handle returned on registration, used to remove a delegate later.
/// Removal before a dispatch excludes the delegate from that and all
/// subsequent dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(usize);

fn log_hook_failure(hook: &str, error: &BatchError) {
    eprintln!("Listener failure in {} hook (ignored): {}", hook, error);
}

/// Ordered fan-out of job-level hooks to any number of delegates.
///
/// Dispatch invokes delegates strictly in registration order. The
/// before-start hook is non-critical: a failing delegate is logged and the
/// remaining delegates still run. The after-end hook is critical: dispatch
/// stops at the first failure and the error propagates, forcing the run's
/// final status to failed.
#[derive(Default)]
pub struct CompositeJobListener {
    delegates: Vec<(ListenerId, Box<dyn JobListener>)>,
    next_id: usize,
}

impl CompositeJobListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Box<dyn JobListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.delegates.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.delegates.len();
        self.delegates.retain(|(delegate_id, _)| *delegate_id != id);
        self.delegates.len() < before
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    pub fn before_job_start(&mut self, job_name: &str) {
        for (_, listener) in &mut self.delegates {
            if let Err(e) = listener.before_job_start(job_name) {
                log_hook_failure("before-job-start", &e);
            }
        }
    }

    pub fn after_job_end(&mut self, report: &JobReport) -> Result<(), BatchError> {
        for (_, listener) in &mut self.delegates {
            listener
                .after_job_end(report)
                .map_err(|e| BatchError::Listener(format!("after-job-end: {}", e.message())))?;
        }
        Ok(())
    }
}

/// Ordered fan-out of batch-level hooks to any number of delegates.
///
/// Same policy as the job-level composite: before-reading,
/// after-processing and after-writing are non-critical (logged, remaining
/// delegates run); on-writing-error is critical.
#[derive(Default)]
pub struct CompositeBatchListener {
    delegates: Vec<(ListenerId, Box<dyn BatchListener>)>,
    next_id: usize,
}

impl CompositeBatchListener {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, listener: Box<dyn BatchListener>) -> ListenerId {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.delegates.push((id, listener));
        id
    }

    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.delegates.len();
        self.delegates.retain(|(delegate_id, _)| *delegate_id != id);
        self.delegates.len() < before
    }

    pub fn is_empty(&self) -> bool {
        self.delegates.is_empty()
    }

    pub fn before_batch_reading(&mut self) {
        for (_, listener) in &mut self.delegates {
            if let Err(e) = listener.before_batch_reading() {
                log_hook_failure("before-batch-reading", &e);
            }
        }
    }

    pub fn after_batch_processing(&mut self, batch: &Batch) {
        for (_, listener) in &mut self.delegates {
            if let Err(e) = listener.after_batch_processing(batch) {
                log_hook_failure("after-batch-processing", &e);
            }
        }
    }

    pub fn after_batch_writing(&mut self, batch: &Batch) {
        for (_, listener) in &mut self.delegates {
            if let Err(e) = listener.after_batch_writing(batch) {
                log_hook_failure("after-batch-writing", &e);
            }
        }
    }

    pub fn on_batch_writing_error(
        &mut self,
        batch: &Batch,
        error: &BatchError,
    ) -> Result<(), BatchError> {
        for (_, listener) in &mut self.delegates {
            listener
                .on_batch_writing_error(batch, error)
                .map_err(|e| BatchError::Listener(format!("on-batch-writing-error: {}", e.message())))?;
        }
        Ok(())
    }
}

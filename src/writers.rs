use crossbeam_channel::Sender;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::batch::Batch;
use crate::error::BatchError;
use crate::pipeline::RecordWriter;
use crate::record::{Payload, Record};

/// Render one record as an output line: raw text as-is, mapped payloads
/// as compact JSON.
fn payload_line(record: &Record) -> String {
    match record.payload() {
        Payload::Raw(text) => text.clone(),
        Payload::Mapped(value) => value.to_string(),
        Payload::Poison => String::new(),
    }
}

/// Writer printing one line per record to stdout.
pub struct StandardOutputRecordWriter;

impl StandardOutputRecordWriter {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StandardOutputRecordWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordWriter for StandardOutputRecordWriter {
    fn open(&mut self) -> Result<(), BatchError> {
        Ok(())
    }

    fn write_batch(&mut self, batch: &Batch) -> Result<(), BatchError> {
        let stdout = std::io::stdout();
        let mut lock = stdout.lock();
        for record in batch {
            writeln!(lock, "{}", payload_line(record))
                .map_err(|e| BatchError::Writing(format!("stdout write failed: {}", e)))?;
        }
        lock.flush()
            .map_err(|e| BatchError::Writing(format!("stdout flush failed: {}", e)))
    }

    fn close(&mut self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Writer appending one line per record to a file created at open time.
pub struct FlatFileRecordWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FlatFileRecordWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            writer: None,
        }
    }
}

impl RecordWriter for FlatFileRecordWriter {
    fn open(&mut self) -> Result<(), BatchError> {
        let file = File::create(&self.path).map_err(|e| {
            BatchError::Io(format!("cannot create '{}': {}", self.path.display(), e))
        })?;
        self.writer = Some(BufWriter::new(file));
        Ok(())
    }

    fn write_batch(&mut self, batch: &Batch) -> Result<(), BatchError> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| BatchError::Io("writer not opened".to_string()))?;
        for record in batch {
            writeln!(writer, "{}", payload_line(record)).map_err(|e| {
                BatchError::Writing(format!("write failed on '{}': {}", self.path.display(), e))
            })?;
        }
        writer.flush().map_err(|e| {
            BatchError::Writing(format!("flush failed on '{}': {}", self.path.display(), e))
        })
    }

    fn close(&mut self) -> Result<(), BatchError> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().map_err(|e| {
                BatchError::Io(format!("close failed on '{}': {}", self.path.display(), e))
            })?;
        }
        Ok(())
    }
}

/// Shared view of the batches a `CollectingRecordWriter` received.
#[derive(Debug, Clone, Default)]
pub struct CollectedBatches {
    batches: Arc<Mutex<Vec<Batch>>>,
}

impl CollectedBatches {
    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    /// All records across all batches, in write order.
    pub fn records(&self) -> Vec<Record> {
        self.batches
            .lock()
            .unwrap()
            .iter()
            .flat_map(|batch| batch.records().iter().cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.lock().unwrap().is_empty()
    }
}

/// Writer keeping every batch in memory behind a shared handle. Useful in
/// tests and for fan-in of small runs.
pub struct CollectingRecordWriter {
    collected: CollectedBatches,
}

impl CollectingRecordWriter {
    pub fn new() -> Self {
        Self {
            collected: CollectedBatches::default(),
        }
    }

    /// A handle that stays valid after the writer is consumed by a job.
    pub fn collected(&self) -> CollectedBatches {
        self.collected.clone()
    }
}

impl Default for CollectingRecordWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordWriter for CollectingRecordWriter {
    fn open(&mut self) -> Result<(), BatchError> {
        Ok(())
    }

    fn write_batch(&mut self, batch: &Batch) -> Result<(), BatchError> {
        self.collected.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }

    fn close(&mut self) -> Result<(), BatchError> {
        Ok(())
    }
}

/// Writer pushing records into a crossbeam channel, the producer end of a
/// queued sink. A disconnected consumer fails the batch.
pub struct ChannelRecordWriter {
    sender: Sender<Record>,
}

impl ChannelRecordWriter {
    pub fn new(sender: Sender<Record>) -> Self {
        Self { sender }
    }
}

impl RecordWriter for ChannelRecordWriter {
    fn open(&mut self) -> Result<(), BatchError> {
        Ok(())
    }

    fn write_batch(&mut self, batch: &Batch) -> Result<(), BatchError> {
        for record in batch {
            self.sender
                .send(record.clone())
                .map_err(|_| BatchError::Writing("channel consumer disconnected".to_string()))?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), BatchError> {
        Ok(())
    }
}

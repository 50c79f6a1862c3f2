// Core library for the rebatch record-batch processing engine

mod batch;
mod broadcast;
mod error;
mod job;
mod listener;
mod pipeline;
mod readers;
mod record;
mod report;
pub mod unix;
mod writers;

pub use batch::Batch;
pub use broadcast::{PoisonBroadcastListener, PoisonBroadcaster};
pub use error::BatchError;
pub use job::{AbortSignal, Job, JobBuilder, JobStatus};
pub use listener::{
    BatchListener, CompositeBatchListener, CompositeJobListener, JobListener, ListenerId,
};
pub use pipeline::{
    FieldError, RecordFilter, RecordMapper, RecordProcessor, RecordReader, RecordValidator,
    RecordWriter, ValidationReport,
};
pub use readers::{
    ChannelRecordReader, FileRecordReader, FlatFileRecordReader, InMemoryRecordReader,
};
pub use record::{Header, Payload, Record};
pub use report::JobReport;
pub use writers::{
    ChannelRecordWriter, CollectedBatches, CollectingRecordWriter, FlatFileRecordWriter,
    StandardOutputRecordWriter,
};

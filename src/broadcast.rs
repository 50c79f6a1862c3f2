use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::BatchError;
use crate::listener::JobListener;
use crate::record::Record;
use crate::report::JobReport;

/// Fan-out of the end-of-input signal to independent consumers.
///
/// Holds one channel per active consumer of a logically shared stream and,
/// on logical end-of-work, delivers exactly one poison record to each.
/// This is the only cross-consumer coordination primitive: there is no
/// shared lock or counter, only the sentinel riding each consumer's own
/// channel.
///
/// Delivery guarantee: at most once per channel. The first `broadcast`
/// wins; later calls, including concurrent ones from several completing
/// jobs, are no-ops. Consumers that already went away are tolerated
/// silently.
pub struct PoisonBroadcaster {
    channels: Vec<Sender<Record>>,
    source: String,
    fired: AtomicBool,
}

impl PoisonBroadcaster {
    pub fn new(channels: Vec<Sender<Record>>) -> Self {
        Self::with_source(channels, "poison-broadcaster")
    }

    /// Set the source label stamped on the poison records, useful when
    /// several broadcasters coexist.
    pub fn with_source(channels: Vec<Sender<Record>>, source: impl Into<String>) -> Self {
        Self {
            channels,
            source: source.into(),
            fired: AtomicBool::new(false),
        }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn has_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Send one poison record per channel. Returns the number of signals
    /// delivered by this call: zero when another call already fired, or
    /// when no channels are registered.
    pub fn broadcast(&self) -> usize {
        if self.fired.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let mut delivered = 0;
        for channel in &self.channels {
            if channel.send(Record::poison(self.source.clone())).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

/// Job listener firing a shared broadcaster when its job ends, so that
/// downstream consumers of the job's output learn the stream is done.
pub struct PoisonBroadcastListener {
    broadcaster: Arc<PoisonBroadcaster>,
}

impl PoisonBroadcastListener {
    pub fn new(broadcaster: Arc<PoisonBroadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl JobListener for PoisonBroadcastListener {
    fn after_job_end(&mut self, _report: &JobReport) -> Result<(), BatchError> {
        self.broadcaster.broadcast();
        Ok(())
    }
}

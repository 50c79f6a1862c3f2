use anyhow::Result;
use std::process;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::thread;

use crate::job::AbortSignal;

#[cfg(unix)]
use signal_hook::{consts::SIGINT, consts::SIGTERM, iterator::Signals};

#[cfg(windows)]
use signal_hook::{consts::SIGINT, iterator::Signals};

/// Standard Unix exit codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    InvalidUsage = 2,
    SignalInt = 130,  // 128 + SIGINT (2)
    SignalTerm = 143, // 128 + SIGTERM (15)
}

impl ExitCode {
    pub fn exit(self) -> ! {
        process::exit(self as i32)
    }

    /// The exit code conventionally paired with a terminating signal.
    pub fn from_signal(signal: i32) -> Self {
        match signal {
            #[cfg(unix)]
            SIGTERM => ExitCode::SignalTerm,
            _ => ExitCode::SignalInt,
        }
    }
}

/// Signal handler for graceful shutdown.
///
/// The first SIGINT/SIGTERM flips the job's abort signal so the run stops
/// at the next record boundary and still produces a report. A second
/// signal exits immediately.
pub struct SignalHandler {
    last_signal: Arc<AtomicI32>,
    _handle: thread::JoinHandle<()>,
}

impl SignalHandler {
    pub fn install(abort: AbortSignal) -> Result<Self> {
        #[cfg(unix)]
        let signals_to_handle = vec![SIGINT, SIGTERM];

        #[cfg(windows)]
        let signals_to_handle = vec![SIGINT]; // Windows only supports SIGINT reliably

        let mut signals = Signals::new(&signals_to_handle)?;
        let last_signal = Arc::new(AtomicI32::new(0));

        let handle = {
            let last_signal = Arc::clone(&last_signal);
            thread::spawn(move || {
                for sig in signals.forever() {
                    if abort.is_aborted() {
                        // Second signal: the run is not winding down fast
                        // enough for the caller, give up immediately.
                        ExitCode::from_signal(sig).exit();
                    }
                    eprintln!("Received signal {}, aborting at next record boundary...", sig);
                    last_signal.store(sig, Ordering::Relaxed);
                    abort.abort();
                }
            })
        };

        Ok(SignalHandler {
            last_signal,
            _handle: handle,
        })
    }

    /// Exit code for an aborted run: reflects the signal that triggered the
    /// abort, or SIGINT's code when the abort was not signal-driven.
    pub fn abort_exit_code(&self) -> ExitCode {
        match self.last_signal.load(Ordering::Relaxed) {
            0 => ExitCode::SignalInt,
            sig => ExitCode::from_signal(sig),
        }
    }
}

use crossbeam_channel::{Receiver, RecvTimeoutError};
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::BatchError;
use crate::pipeline::RecordReader;
use crate::record::Record;

/// Reader over a fixed set of in-memory lines. Mostly useful in tests and
/// for replaying small captured inputs.
pub struct InMemoryRecordReader {
    source: String,
    lines: VecDeque<String>,
    sequence: usize,
    opened: bool,
}

impl InMemoryRecordReader {
    pub fn new(source: impl Into<String>, lines: Vec<impl Into<String>>) -> Self {
        Self {
            source: source.into(),
            lines: lines.into_iter().map(Into::into).collect(),
            sequence: 0,
            opened: false,
        }
    }
}

impl RecordReader for InMemoryRecordReader {
    fn open(&mut self) -> Result<(), BatchError> {
        self.opened = true;
        self.sequence = 0;
        Ok(())
    }

    fn read_record(&mut self) -> Result<Option<Record>, BatchError> {
        if !self.opened {
            return Err(BatchError::Io("reader not opened".to_string()));
        }
        Ok(self.lines.pop_front().map(|line| {
            self.sequence += 1;
            Record::raw(self.sequence, self.source.clone(), line)
        }))
    }

    fn close(&mut self) -> Result<(), BatchError> {
        self.opened = false;
        Ok(())
    }
}

/// Reader producing one raw record per line of a flat file.
pub struct FlatFileRecordReader {
    path: PathBuf,
    reader: Option<BufReader<File>>,
    sequence: usize,
}

impl FlatFileRecordReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            reader: None,
            sequence: 0,
        }
    }

    fn source(&self) -> String {
        self.path.display().to_string()
    }
}

impl RecordReader for FlatFileRecordReader {
    fn open(&mut self) -> Result<(), BatchError> {
        let file = File::open(&self.path)
            .map_err(|e| BatchError::Io(format!("cannot open '{}': {}", self.path.display(), e)))?;
        self.reader = Some(BufReader::new(file));
        self.sequence = 0;
        Ok(())
    }

    fn read_record(&mut self) -> Result<Option<Record>, BatchError> {
        let reader = self
            .reader
            .as_mut()
            .ok_or_else(|| BatchError::Io("reader not opened".to_string()))?;

        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => Ok(None),
            Ok(_) => {
                let text = line.trim_end_matches(['\n', '\r']).to_string();
                self.sequence += 1;
                Ok(Some(Record::raw(self.sequence, self.source(), text)))
            }
            Err(e) => Err(BatchError::Io(format!(
                "read failed on '{}': {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn close(&mut self) -> Result<(), BatchError> {
        self.reader = None;
        Ok(())
    }
}

/// Reader producing one record per regular file of a directory; the
/// payload is the file path.
///
/// The file list is collected once at `open` into a finite, name-sorted
/// sequence, then consumed lazily. Sorting keeps two runs over the same
/// directory identical.
pub struct FileRecordReader {
    directory: PathBuf,
    recursive: bool,
    paths: VecDeque<PathBuf>,
    sequence: usize,
    opened: bool,
}

impl FileRecordReader {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            recursive: false,
            paths: VecDeque::new(),
            sequence: 0,
            opened: false,
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    fn collect_files(&self, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        let mut entries: Vec<PathBuf> = std::fs::read_dir(dir)?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(|entry| entry.path())
            .collect();
        entries.sort();

        for path in entries {
            if path.is_file() {
                out.push(path);
            } else if self.recursive && path.is_dir() {
                self.collect_files(&path, out)?;
            }
        }
        Ok(())
    }
}

impl RecordReader for FileRecordReader {
    fn open(&mut self) -> Result<(), BatchError> {
        if !self.directory.is_dir() {
            return Err(BatchError::Io(format!(
                "'{}' is not a readable directory",
                self.directory.display()
            )));
        }
        let mut paths = Vec::new();
        self.collect_files(&self.directory, &mut paths)
            .map_err(|e| {
                BatchError::Io(format!(
                    "cannot list '{}': {}",
                    self.directory.display(),
                    e
                ))
            })?;
        self.paths = paths.into();
        self.sequence = 0;
        self.opened = true;
        Ok(())
    }

    fn read_record(&mut self) -> Result<Option<Record>, BatchError> {
        if !self.opened {
            return Err(BatchError::Io("reader not opened".to_string()));
        }
        Ok(self.paths.pop_front().map(|path| {
            self.sequence += 1;
            Record::raw(
                self.sequence,
                self.directory.display().to_string(),
                path.display().to_string(),
            )
        }))
    }

    fn close(&mut self) -> Result<(), BatchError> {
        self.opened = false;
        self.paths.clear();
        Ok(())
    }
}

/// Reader pulling records from a crossbeam channel, the consumer end of a
/// queued source.
///
/// Receives are bounded by a timeout so the orchestrator always regains
/// control: a timeout or a disconnected producer yields end-of-stream
/// rather than blocking forever. Records arrive with the headers their
/// producer assigned, poison records included.
pub struct ChannelRecordReader {
    receiver: Receiver<Record>,
    timeout: Duration,
}

impl ChannelRecordReader {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(receiver: Receiver<Record>) -> Self {
        Self {
            receiver,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl RecordReader for ChannelRecordReader {
    fn open(&mut self) -> Result<(), BatchError> {
        Ok(())
    }

    fn read_record(&mut self) -> Result<Option<Record>, BatchError> {
        match self.receiver.recv_timeout(self.timeout) {
            Ok(record) => Ok(Some(record)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn close(&mut self) -> Result<(), BatchError> {
        Ok(())
    }
}

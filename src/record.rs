use chrono::{DateTime, Utc};
use serde::Serialize;

/// Provenance metadata attached to a record at read time.
///
/// Headers compare equal when sequence number and source match; the
/// creation timestamp is deliberately excluded so that two runs over the
/// same input produce records that compare equal.
#[derive(Debug, Clone, Serialize)]
pub struct Header {
    sequence: usize,
    source: String,
    created_at: DateTime<Utc>,
}

impl Header {
    pub fn new(sequence: usize, source: impl Into<String>) -> Self {
        Self {
            sequence,
            source: source.into(),
            created_at: Utc::now(),
        }
    }

    pub fn sequence(&self) -> usize {
        self.sequence
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl PartialEq for Header {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence && self.source == other.source
    }
}

impl Eq for Header {}

/// The payload variants a record can carry.
///
/// `Poison` is a distinct discriminant, not an empty payload: consumers
/// check `Record::is_poison` without inspecting payload shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Payload {
    /// Unparsed input as produced by a reader.
    Raw(String),
    /// Typed payload produced by a mapper.
    Mapped(serde_json::Value),
    /// End-of-input sentinel for queued consumers.
    Poison,
}

/// One unit of work flowing through the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    header: Header,
    payload: Payload,
}

impl Record {
    pub fn new(header: Header, payload: Payload) -> Self {
        Self { header, payload }
    }

    /// Create a raw record as readers do, one header per read call.
    pub fn raw(sequence: usize, source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            header: Header::new(sequence, source),
            payload: Payload::Raw(text.into()),
        }
    }

    /// Create a mapped record, keeping the header of the record it came from.
    pub fn mapped(header: Header, value: serde_json::Value) -> Self {
        Self {
            header,
            payload: Payload::Mapped(value),
        }
    }

    /// Create a poison record. Poison records never enter the pipeline, so
    /// their sequence number of zero is never observed downstream.
    pub fn poison(source: impl Into<String>) -> Self {
        Self {
            header: Header::new(0, source),
            payload: Payload::Poison,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn is_poison(&self) -> bool {
        matches!(self.payload, Payload::Poison)
    }

    /// The raw text payload, if this record has not been mapped yet.
    pub fn raw_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Raw(text) => Some(text),
            _ => None,
        }
    }

    /// The typed payload, if this record has been mapped.
    pub fn value(&self) -> Option<&serde_json::Value> {
        match &self.payload {
            Payload::Mapped(value) => Some(value),
            _ => None,
        }
    }
}

// Error types for ID3v2 decoding

use std::fmt;
use std::io;

use thiserror::Error;

/// Fixed-width fields of the CHAP and CTOC payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    StartTime,
    EndTime,
    StartOffset,
    EndOffset,
    Flags,
    EntryCount,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::StartTime => "start time",
            Field::EndTime => "end time",
            Field::StartOffset => "start offset",
            Field::EndOffset => "end offset",
            Field::Flags => "flags",
            Field::EntryCount => "entry count",
        };
        f.write_str(name)
    }
}

/// Main error type for tag and frame decoding.
#[derive(Debug, Error)]
pub enum Id3Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("unsupported ID3v2 version 2.{0}")]
    UnsupportedVersion(u8),

    #[error("invalid frame id {0:?}")]
    InvalidFrameId(String),

    #[error("no null terminator found for element id")]
    MissingElementIdTerminator,

    #[error("error reading {field}: {source}")]
    TruncatedField {
        field: Field,
        #[source]
        source: io::Error,
    },

    #[error("error reading entry {index}: {source}")]
    EntryRead {
        index: usize,
        #[source]
        source: io::Error,
    },

    #[error("error reading embedded frames: {0}")]
    Embedded(#[from] EmbeddedError),

    #[error("malformed {name} frame: {reason}")]
    MalformedFrame { name: String, reason: &'static str },
}

/// Failures of the embedded sub-frame region of CHAP/CTOC payloads.
#[derive(Debug, Error)]
pub enum EmbeddedError {
    #[error("{0}")]
    Frame(#[source] Box<Id3Error>),

    #[error("padding found where {remaining} embedded bytes remain")]
    MissingFrame { remaining: u64 },

    #[error("frame {name} occupies {size} bytes but only {remaining} remain")]
    Overrun { name: String, size: u64, remaining: u64 },

    #[error("{declared} embedded bytes declared but only {available} available")]
    Underrun { declared: u64, available: u64 },
}

/// Result type alias using Id3Error.
pub type Result<T> = std::result::Result<T, Id3Error>;

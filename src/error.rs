//! Error types

use crate::binary::read::ReadEof;
use std::fmt;

/// Errors that originate when decoding table data.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ParseError {
    /// The buffer is shorter than the fixed header, or a length/count field
    /// implies a region outside the buffer.
    MalformedHeader,
    /// Decoded run boundaries are non-monotonic or overlapping.
    InconsistentSegment,
    /// A recognised format tag this codec does not implement.
    UnsupportedFormat(u16),
}

impl From<ReadEof> for ParseError {
    fn from(_error: ReadEof) -> Self {
        ParseError::MalformedHeader
    }
}

impl From<std::num::TryFromIntError> for ParseError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        ParseError::MalformedHeader
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedHeader => write!(f, "malformed table header"),
            ParseError::InconsistentSegment => write!(f, "inconsistent segment boundaries"),
            ParseError::UnsupportedFormat(tag) => write!(f, "unsupported format {}", tag),
        }
    }
}

impl std::error::Error for ParseError {}

/// Errors that originate when encoding table data.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum WriteError {
    /// A value does not fit the format, e.g. a character code beyond the
    /// 16-bit code space of a format 4 subtable.
    BadValue,
    /// The chosen encoding would overflow an offset or count field.
    CapacityExceeded,
}

impl From<std::num::TryFromIntError> for WriteError {
    fn from(_error: std::num::TryFromIntError) -> Self {
        WriteError::CapacityExceeded
    }
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::BadValue => write!(f, "write: bad value"),
            WriteError::CapacityExceeded => write!(f, "write: field capacity exceeded"),
        }
    }
}

impl std::error::Error for WriteError {}

/// Enum that can hold read (`ParseError`) and write errors
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum ReadWriteError {
    Read(ParseError),
    Write(WriteError),
}

impl From<ParseError> for ReadWriteError {
    fn from(error: ParseError) -> Self {
        ReadWriteError::Read(error)
    }
}

impl From<WriteError> for ReadWriteError {
    fn from(error: WriteError) -> Self {
        ReadWriteError::Write(error)
    }
}

impl fmt::Display for ReadWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadWriteError::Read(err) => write!(f, "read error: {}", err),
            ReadWriteError::Write(err) => write!(f, "write error: {}", err),
        }
    }
}

impl std::error::Error for ReadWriteError {}

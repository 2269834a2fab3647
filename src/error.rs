//! The single error type shared by every module in this crate.

use std::fmt;

pub type Result<T> = std::result::Result<T, Error>;

/// Nothing useful to return besides success or failure.
pub type UnitResult = Result<()>;

pub use std::io::Error as IoError;

/// Everything that can go wrong while describing a field, choosing compression
/// parameters, planning chunks, or reading/writing a compressed stream.
#[derive(Debug)]
pub enum Error {
    /// A scalar kind tag did not match any of the four supported kinds.
    BadScalar(String),

    /// A field's rank was not in the supported 1..=4 range.
    BadRank(usize),

    /// An extent did not fit the per-rank metadata bit budget (classical header only).
    MetadataTooLarge { axis: usize, extent: usize },

    /// A mode value (short or long encoding) was out of the legal range.
    BadMode(String),

    /// A header's magic or codec version did not match what this crate writes.
    BadHeader(String),

    /// An unknown tiling strategy tag.
    BadMethod(String),

    /// No block codec capability is registered for a (rank, scalar) pair.
    UnsupportedConfiguration(String),

    /// A bit-stream write would exceed the capacity of its backing buffer.
    BufferOverflow,

    /// Wraps a lower-level I/O failure, e.g. from a `Write`-backed destination.
    Io(IoError),
}

impl Error {
    pub fn bad_scalar(message: impl Into<String>) -> Self {
        Error::BadScalar(message.into())
    }

    pub fn bad_mode(message: impl Into<String>) -> Self {
        Error::BadMode(message.into())
    }

    pub fn bad_header(message: impl Into<String>) -> Self {
        Error::BadHeader(message.into())
    }

    pub fn bad_method(message: impl Into<String>) -> Self {
        Error::BadMethod(message.into())
    }

    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedConfiguration(message.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadScalar(message) => write!(f, "unsupported scalar kind: {}", message),
            Error::BadRank(rank) => write!(f, "unsupported rank: {} (expected 1..=4)", rank),
            Error::MetadataTooLarge { axis, extent } => write!(
                f, "extent {} on axis {} exceeds the metadata bit budget for its rank",
                extent, axis
            ),
            Error::BadMode(message) => write!(f, "invalid compression mode: {}", message),
            Error::BadHeader(message) => write!(f, "malformed stream header: {}", message),
            Error::BadMethod(message) => write!(f, "unknown tiling method: {}", message),
            Error::UnsupportedConfiguration(message) => write!(f, "unsupported configuration: {}", message),
            Error::BufferOverflow => write!(f, "bit-stream write exceeded buffer capacity"),
            Error::Io(io) => write!(f, "I/O error: {}", io),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(io) => Some(io),
            _ => None,
        }
    }
}

/// Enable using the `?` operator on `io::Result`.
impl From<IoError> for Error {
    fn from(error: IoError) -> Self {
        Error::Io(error)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn display_mentions_the_offending_axis() {
        let error = Error::MetadataTooLarge { axis: 2, extent: 1 << 20 };
        let message = error.to_string();
        assert!(message.contains("axis 2"));
    }

    #[test]
    fn io_error_round_trips_through_from() {
        let io = IoError::new(std::io::ErrorKind::Other, "disk full");
        let error: Error = io.into();
        assert!(matches!(error, Error::Io(_)));
    }
}

use std::io;

use thiserror::Error;

/// A specialized [`Result`](std::result::Result) type for cabinet operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for cabinet parsing and decompression.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The file does not start with the `MSCF` cabinet signature.
    #[error("not a cabinet file (invalid signature)")]
    BadSignature,

    /// The cabinet declares a format version this crate does not understand.
    #[error("unsupported cabinet version {major}.{minor}")]
    UnsupportedVersion {
        /// Declared major version.
        major: u8,
        /// Declared minor version.
        minor: u8,
    },

    /// A file entry points outside the folder table.
    #[error("file entry folder index {index} out of bounds ({count} folders)")]
    InvalidFolderReference {
        /// Folder index stored in the file entry.
        index: u16,
        /// Number of folders in the cabinet.
        count: usize,
    },

    /// No file with the requested name exists in the cabinet.
    #[error("no such file in cabinet: {0:?}")]
    FileNotFound(String),

    /// A data block continues into the next cabinet of a spanned set.
    #[error("data block continues into next cabinet; spanned sets are not supported")]
    ContinuationUnsupported,

    /// The folder declares a compression scheme outside the format.
    #[error("unknown compression type {0:#06x}")]
    UnknownCompression(u16),

    /// The folder uses Quantum compression, which this crate does not decode.
    #[error("quantum decompression is not supported")]
    UnsupportedCompression,

    /// An MSZIP data block did not start with the `CK` signature, or its
    /// DEFLATE payload was malformed.
    #[error("invalid MSZIP block: {0}")]
    InvalidMszip(String),

    /// An LZX Huffman tree had an inconsistent code-length vector.
    #[error("invalid LZX huffman tree: {0}")]
    InvalidTree(&'static str),

    /// An LZX block header was structurally invalid.
    #[error("invalid LZX block: {0}")]
    InvalidBlock(String),

    /// The underlying source ended in the middle of a record or stream.
    #[error("unexpected end of cabinet data")]
    UnexpectedEof,

    /// A data block failed checksum verification.
    #[error("data block checksum mismatch (expected {expected:#010x}, actual {actual:#010x})")]
    ChecksumMismatch {
        /// Checksum stored in the data-block header.
        expected: u32,
        /// Checksum computed over the block.
        actual: u32,
    },

    /// An I/O error from the underlying source.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn invalid_block(msg: impl Into<String>) -> Error {
        Error::InvalidBlock(msg.into())
    }

    pub(crate) fn invalid_mszip(msg: impl Into<String>) -> Error {
        Error::InvalidMszip(msg.into())
    }
}

// The folder reader latches its first error and repeats it on later reads;
// `io::Error` is not `Clone`, so the latched copy keeps its kind and message.
impl Clone for Error {
    fn clone(&self) -> Error {
        match self {
            Error::BadSignature => Error::BadSignature,
            Error::UnsupportedVersion { major, minor } => {
                Error::UnsupportedVersion { major: *major, minor: *minor }
            }
            Error::InvalidFolderReference { index, count } => {
                Error::InvalidFolderReference { index: *index, count: *count }
            }
            Error::FileNotFound(name) => Error::FileNotFound(name.clone()),
            Error::ContinuationUnsupported => Error::ContinuationUnsupported,
            Error::UnknownCompression(bits) => Error::UnknownCompression(*bits),
            Error::UnsupportedCompression => Error::UnsupportedCompression,
            Error::InvalidMszip(msg) => Error::InvalidMszip(msg.clone()),
            Error::InvalidTree(msg) => Error::InvalidTree(*msg),
            Error::InvalidBlock(msg) => Error::InvalidBlock(msg.clone()),
            Error::UnexpectedEof => Error::UnexpectedEof,
            Error::ChecksumMismatch { expected, actual } => {
                Error::ChecksumMismatch { expected: *expected, actual: *actual }
            }
            Error::Io(inner) => {
                Error::Io(io::Error::new(inner.kind(), inner.to_string()))
            }
        }
    }
}

impl From<Error> for io::Error {
    fn from(error: Error) -> io::Error {
        match error {
            Error::Io(inner) => inner,
            Error::UnexpectedEof => {
                io::Error::new(io::ErrorKind::UnexpectedEof, error)
            }
            Error::FileNotFound(_) => {
                io::Error::new(io::ErrorKind::NotFound, error)
            }
            _ => io::Error::new(io::ErrorKind::InvalidData, error),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::Error;

    #[test]
    fn unexpected_eof_keeps_its_io_kind() {
        let err: io::Error = Error::UnexpectedEof.into();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn io_errors_pass_through_unwrapped() {
        let inner = io::Error::new(io::ErrorKind::PermissionDenied, "nope");
        let err: io::Error = Error::Io(inner).into();
        assert_eq!(err.kind(), io::ErrorKind::PermissionDenied);
    }

    #[test]
    fn clone_preserves_variant() {
        let err = Error::ChecksumMismatch { expected: 1, actual: 2 };
        match err.clone() {
            Error::ChecksumMismatch { expected: 1, actual: 2 } => {}
            other => panic!("unexpected clone: {other:?}"),
        }
    }
}

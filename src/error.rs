use std::fmt;
use std::io;

/// Unified error type for the storage engine.
///
/// "Key not found" and "key deleted" are lookup outcomes, not errors; see
/// [`LookupResult`](crate::types::LookupResult).
#[derive(Debug)]
pub enum Error {
    /// IO error from disk operations.
    Io(io::Error),
    /// Data corruption detected (CRC mismatch, bad format, etc).
    Corruption(String),
    /// The file does not end with the SSTable magic number.
    BadMagic(u64),
    /// The file is shorter than an SSTable footer.
    TableTooShort(u64),
    /// Unexpected end of data while decoding.
    Eof,
    /// The engine has been closed.
    Closed,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "IO error: {e}"),
            Error::Corruption(msg) => write!(f, "Corruption: {msg}"),
            Error::BadMagic(magic) => {
                write!(f, "not an sstable (bad magic number {magic:#018x})")
            }
            Error::TableTooShort(len) => {
                write!(f, "file is too short to be an sstable ({len} bytes)")
            }
            Error::Eof => write!(f, "Unexpected end of data"),
            Error::Closed => write!(f, "Database is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// `io::Error` is not `Clone`; a copy keeps its kind and message.
impl Clone for Error {
    fn clone(&self) -> Self {
        match self {
            Error::Io(e) => Error::Io(io::Error::new(e.kind(), e.to_string())),
            Error::Corruption(msg) => Error::Corruption(msg.clone()),
            Error::BadMagic(magic) => Error::BadMagic(*magic),
            Error::TableTooShort(len) => Error::TableTooShort(*len),
            Error::Eof => Error::Eof,
            Error::Closed => Error::Closed,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            return Error::Eof;
        }
        Error::Io(e)
    }
}

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

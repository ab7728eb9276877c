use crate::value::Kind;
use std::fmt;

/// The result type for everything in the frame crate.
pub type Result<T> = std::result::Result<T, Error>;

/// The error type for everything in the frame crate.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The frame holds a different type than the caller asked for.
    TypeMismatch { expected: Kind, found: Kind },

    /// The payload does not have the shape its tag promises.
    Corrupt(String),

    /// The first byte of the frame is not a tag we know about.
    UnknownTag(u8),

    /// A checked numeric operation (or a time value) left the representable range.
    Overflow,

    DivideByZero,
}

impl Error {
    pub(crate) fn corrupt<T: fmt::Display>(msg: T) -> Self {
        Error::Corrupt(msg.to_string())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::TypeMismatch { expected, found } => {
                write!(f, "type mismatch: expected {}, found {}", expected, found)
            }
            Error::Corrupt(msg) => write!(f, "corrupt frame: {}", msg),
            Error::UnknownTag(tag) => write!(f, "unknown type tag 0x{:02x}", tag),
            Error::Overflow => write!(f, "numeric overflow"),
            Error::DivideByZero => write!(f, "division by zero"),
        }
    }
}

impl std::error::Error for Error {}

use frame::Kind;
use std::fmt;
use std::io;

/// Return type for tower operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    /// The key (or the field, member or timestamp inside a structure) is absent.
    NotFound,

    /// A structure cannot be created over a key that already holds something.
    AlreadyExists,

    /// The key holds a different type than the operation works on.
    TypeMismatch { expected: Kind, found: Kind },

    /// Stored data violates an invariant: a malformed frame, or structure
    /// metadata that disagrees with its items.
    Corrupt(String),

    /// An index outside the list, or an argument outside its allowed range.
    OutOfRange,

    /// The key name lies in the namespace tower keeps for itself.
    ReservedKey(String),

    /// Popping from an empty list.
    Empty,

    Overflow,

    DivideByZero,

    EncryptionFailure(String),

    /// Wrong key, or the ciphertext was tampered with.
    DecryptionFailure(String),

    /// No provider is registered under the algorithm id.
    UnknownAlgorithm(String),

    Config(String),

    /// Propagated from the storage engine.
    Io(engine::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound => write!(f, "Key not found"),
            Error::AlreadyExists => write!(f, "Key already exists"),
            Error::TypeMismatch { expected, found } => {
                write!(f, "Wrong type: expected {}, found {}", expected, found)
            }
            Error::Corrupt(msg) => write!(f, "Corrupt data: {}", msg),
            Error::OutOfRange => write!(f, "Index out of range"),
            Error::ReservedKey(key) => write!(f, "Reserved key: {}", key),
            Error::Empty => write!(f, "List is empty"),
            Error::Overflow => write!(f, "Numeric overflow"),
            Error::DivideByZero => write!(f, "Division by zero"),
            Error::EncryptionFailure(msg) => write!(f, "Encryption failed: {}", msg),
            Error::DecryptionFailure(msg) => write!(f, "Decryption failed: {}", msg),
            Error::UnknownAlgorithm(id) => write!(f, "Unknown algorithm: {}", id),
            Error::Config(msg) => write!(f, "Bad configuration: {}", msg),
            Error::Io(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<frame::Error> for Error {
    fn from(error: frame::Error) -> Self {
        match error {
            frame::Error::TypeMismatch { expected, found } => {
                Error::TypeMismatch { expected, found }
            }
            frame::Error::Corrupt(msg) => Error::Corrupt(msg),
            frame::Error::UnknownTag(tag) => Error::Corrupt(format!("unknown type tag {}", tag)),
            frame::Error::Overflow => Error::Overflow,
            frame::Error::DivideByZero => Error::DivideByZero,
        }
    }
}

impl From<engine::Error> for Error {
    fn from(error: engine::Error) -> Self {
        Error::Io(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::Io(engine::Error::IoError(error))
    }
}

impl From<ron::de::Error> for Error {
    fn from(error: ron::de::Error) -> Self {
        Error::Config(error.to_string())
    }
}

use std::fmt::{self, Display};
use std::io;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    SledError(sled::Error),
    /// The engine configuration cannot be used as given.
    Config(String),
}

impl From<sled::Error> for Error {
    fn from(error: sled::Error) -> Self {
        Error::SledError(error)
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::IoError(error)
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::IoError(err) => Display::fmt(err, f),
            Error::SledError(err) => Display::fmt(err, f),
            Error::Config(msg) => write!(f, "bad engine configuration: {}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::SledError(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

//! The binary value format used for everything tower writes to its storage engine.
//!
//! A frame is a single type-tag byte, followed by a payload whose shape depends on
//! the tag, followed by an 8-byte expiry trailer. Numerics are fixed-width and
//! little-endian so any reader can decode them without knowing the writer's
//! platform. Payload lengths are implied by the frame length and checked exactly
//! when decoding.

mod codec;
mod decimal;
mod error;
mod value;

pub use codec::Frame;
pub use decimal::Decimal;
pub use error::{Error, Result};
pub use value::{
    BloomHandle, CountHandle, EncryptedRecord, Kind, ListHandle, PasswordRecord, SecretShare,
    Value,
};

pub use chrono;
pub use num_bigint;
pub use uuid;

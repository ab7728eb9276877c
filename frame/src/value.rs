use crate::decimal::Decimal;
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use num_bigint::BigInt;
use std::fmt;
use uuid::Uuid;

/// The type of a value, as recorded by the tag byte at the start of its frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Null,
    Int,
    Float,
    Decimal,
    BigInt,
    String,
    Bool,
    Timestamp,
    Time,
    Duration,
    Binary,
    Uuid,
    List,
    Map,
    Set,
    TimeSeries,
    Bloom,
    Password,
    Encrypted,
    SecretShare,
    Bitmap,
}

impl Kind {
    /// The on-disk tag byte. These values are part of the storage format and must
    /// never be renumbered.
    pub fn tag(self) -> u8 {
        match self {
            Kind::Null => 0x00,
            Kind::Int => 0x01,
            Kind::Float => 0x02,
            Kind::Decimal => 0x03,
            Kind::BigInt => 0x04,
            Kind::String => 0x05,
            Kind::Bool => 0x06,
            Kind::Timestamp => 0x07,
            Kind::Time => 0x08,
            Kind::Duration => 0x09,
            Kind::Binary => 0x0a,
            Kind::Uuid => 0x0b,
            Kind::List => 0x10,
            Kind::Map => 0x11,
            Kind::Set => 0x12,
            Kind::TimeSeries => 0x13,
            Kind::Bloom => 0x14,
            Kind::Password => 0x15,
            Kind::Encrypted => 0x16,
            Kind::SecretShare => 0x17,
            Kind::Bitmap => 0x18,
        }
    }

    pub fn from_tag(tag: u8) -> Result<Kind> {
        let kind = match tag {
            0x00 => Kind::Null,
            0x01 => Kind::Int,
            0x02 => Kind::Float,
            0x03 => Kind::Decimal,
            0x04 => Kind::BigInt,
            0x05 => Kind::String,
            0x06 => Kind::Bool,
            0x07 => Kind::Timestamp,
            0x08 => Kind::Time,
            0x09 => Kind::Duration,
            0x0a => Kind::Binary,
            0x0b => Kind::Uuid,
            0x10 => Kind::List,
            0x11 => Kind::Map,
            0x12 => Kind::Set,
            0x13 => Kind::TimeSeries,
            0x14 => Kind::Bloom,
            0x15 => Kind::Password,
            0x16 => Kind::Encrypted,
            0x17 => Kind::SecretShare,
            0x18 => Kind::Bitmap,
            _ => return Err(Error::UnknownTag(tag)),
        };
        Ok(kind)
    }

    /// Structures own item keys besides their metadata key.
    pub fn is_structure(self) -> bool {
        match self {
            Kind::List | Kind::Map | Kind::Set | Kind::TimeSeries | Kind::Bloom => true,
            _ => false,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Kind::Null => "null",
            Kind::Int => "int64",
            Kind::Float => "float64",
            Kind::Decimal => "decimal",
            Kind::BigInt => "biginteger",
            Kind::String => "string",
            Kind::Bool => "bool",
            Kind::Timestamp => "timestamp",
            Kind::Time => "time",
            Kind::Duration => "duration",
            Kind::Binary => "binary",
            Kind::Uuid => "uuid",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Set => "set",
            Kind::TimeSeries => "timeseries",
            Kind::Bloom => "bloomfilter",
            Kind::Password => "password",
            Kind::Encrypted => "encrypted",
            Kind::SecretShare => "secretshare",
            Kind::Bitmap => "bitmap",
        };
        f.write_str(name)
    }
}

/// Metadata of a deque. An empty list is always `{ head: 0, tail: -1, len: 0 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListHandle {
    pub head: i64,
    pub tail: i64,
    pub len: i64,
}

impl ListHandle {
    pub fn empty() -> Self {
        ListHandle {
            head: 0,
            tail: -1,
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for ListHandle {
    fn default() -> Self {
        ListHandle::empty()
    }
}

/// Metadata of maps, sets and time series: the number of live items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CountHandle {
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BloomHandle {
    pub slots: u8,
    pub salt: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordRecord {
    pub algorithm: String,
    pub hash: Vec<u8>,
    pub salt: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedRecord {
    pub algorithm: String,
    pub ciphertext: Vec<u8>,
    pub nonce: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretShare {
    pub index: u8,
    pub threshold: u8,
    pub share: Vec<u8>,
}

/// Every value tower can store at a key or inside a structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    BigInt(BigInt),
    String(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Time(NaiveTime),
    Duration(Duration),
    Binary(Vec<u8>),
    Uuid(Uuid),
    List(ListHandle),
    Map(CountHandle),
    Set(CountHandle),
    TimeSeries(CountHandle),
    Bloom(BloomHandle),
    Password(PasswordRecord),
    Encrypted(EncryptedRecord),
    SecretShare(SecretShare),
    Bitmap(Vec<u8>),
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Null => Kind::Null,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Decimal(_) => Kind::Decimal,
            Value::BigInt(_) => Kind::BigInt,
            Value::String(_) => Kind::String,
            Value::Bool(_) => Kind::Bool,
            Value::Timestamp(_) => Kind::Timestamp,
            Value::Time(_) => Kind::Time,
            Value::Duration(_) => Kind::Duration,
            Value::Binary(_) => Kind::Binary,
            Value::Uuid(_) => Kind::Uuid,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Set(_) => Kind::Set,
            Value::TimeSeries(_) => Kind::TimeSeries,
            Value::Bloom(_) => Kind::Bloom,
            Value::Password(_) => Kind::Password,
            Value::Encrypted(_) => Kind::Encrypted,
            Value::SecretShare(_) => Kind::SecretShare,
            Value::Bitmap(_) => Kind::Bitmap,
        }
    }

    /// Builds the error returned when this value is not of the `expected` kind.
    pub fn mismatch(&self, expected: Kind) -> Error {
        Error::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<BigInt> for Value {
    fn from(i: BigInt) -> Self {
        Value::BigInt(i)
    }
}

impl From<Uuid> for Value {
    fn from(u: Uuid) -> Self {
        Value::Uuid(u)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(t: DateTime<Utc>) -> Self {
        Value::Timestamp(t)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "(null)"),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::BigInt(i) => write!(f, "{}", i),
            Value::String(s) => write!(f, "{}", s),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Time(t) => write!(f, "{}", t),
            Value::Duration(d) => write!(f, "{}", d),
            Value::Binary(b) | Value::Bitmap(b) => write!(f, "({} bytes)", b.len()),
            Value::Uuid(u) => write!(f, "{}", u),
            Value::List(h) => write!(f, "(list of {})", h.len),
            Value::Map(h) => write!(f, "(map of {})", h.count),
            Value::Set(h) => write!(f, "(set of {})", h.count),
            Value::TimeSeries(h) => write!(f, "(timeseries of {})", h.count),
            Value::Bloom(h) => write!(f, "(bloomfilter of {})", h.count),
            Value::Password(p) => write!(f, "(password, {})", p.algorithm),
            Value::Encrypted(e) => write!(f, "(encrypted, {})", e.algorithm),
            Value::SecretShare(s) => write!(f, "(share {} of {})", s.index, s.threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_stable() {
        let kinds = [
            Kind::Null,
            Kind::Int,
            Kind::Float,
            Kind::Decimal,
            Kind::BigInt,
            Kind::String,
            Kind::Bool,
            Kind::Timestamp,
            Kind::Time,
            Kind::Duration,
            Kind::Binary,
            Kind::Uuid,
            Kind::List,
            Kind::Map,
            Kind::Set,
            Kind::TimeSeries,
            Kind::Bloom,
            Kind::Password,
            Kind::Encrypted,
            Kind::SecretShare,
            Kind::Bitmap,
        ];
        for kind in kinds.iter() {
            assert_eq!(Kind::from_tag(kind.tag()).unwrap(), *kind);
        }
        assert_eq!(Kind::String.tag(), 0x05);
        assert_eq!(Kind::from_tag(0x7f), Err(Error::UnknownTag(0x7f)));
    }

    #[test]
    fn only_composites_are_structures() {
        assert!(Kind::List.is_structure());
        assert!(Kind::Bloom.is_structure());
        assert!(!Kind::Password.is_structure());
        assert!(!Kind::String.is_structure());
    }
}

//! How logical keys map onto physical storage keys.
//!
//! A structure's metadata lives at the logical key itself. Its items live at
//! `logical ++ ":" ++ marker ++ ":" ++ selector`, so a prefix scan over
//! `logical ++ ":" ++ marker ++ ":"` returns exactly that structure's items.
//! Selectors that need an order (list indices, timestamps) are encoded so that
//! bytewise comparison matches numeric comparison.

use crate::{Error, Result};
use chrono::{DateTime, TimeZone, Utc};

const SEPARATOR: u8 = b':';

const SIGN_BIT: u64 = 1 << 63;

/// Distinguishes the items of different structure kinds under one logical key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    List,
    Map,
    Set,
    Bloom,
    Series,
}

impl Marker {
    fn byte(self) -> u8 {
        match self {
            Marker::List => b'L',
            Marker::Map => b'M',
            Marker::Set => b'S',
            Marker::Bloom => b'B',
            Marker::Series => b'T',
        }
    }
}

/// The prefix shared by every item of the structure at `key`.
pub fn prefix(key: &str, marker: Marker) -> Vec<u8> {
    let mut out = Vec::with_capacity(key.len() + 3);
    out.extend_from_slice(key.as_bytes());
    out.push(SEPARATOR);
    out.push(marker.byte());
    out.push(SEPARATOR);
    out
}

pub fn item(key: &str, marker: Marker, selector: &[u8]) -> Vec<u8> {
    let mut out = prefix(key, marker);
    out.extend_from_slice(selector);
    out
}

/// Big-endian with the sign bit flipped, so that -1 sorts before 0.
pub fn index_selector(index: i64) -> [u8; 8] {
    ((index as u64) ^ SIGN_BIT).to_be_bytes()
}

pub fn decode_index(selector: &[u8]) -> Result<i64> {
    if selector.len() != 8 {
        return Err(Error::Corrupt(format!(
            "index selector has {} bytes",
            selector.len()
        )));
    }
    let mut buf = [0u8; 8];
    buf.copy_from_slice(selector);
    Ok((u64::from_be_bytes(buf) ^ SIGN_BIT) as i64)
}

pub fn time_selector(at: &DateTime<Utc>) -> Result<[u8; 8]> {
    let nanos = at.timestamp_nanos_opt().ok_or(Error::Overflow)?;
    Ok(index_selector(nanos))
}

pub fn decode_time(selector: &[u8]) -> Result<DateTime<Utc>> {
    Ok(Utc.timestamp_nanos(decode_index(selector)?))
}

/// Returns what follows `prefix` in `key`.
pub fn selector<'a>(key: &'a [u8], prefix: &[u8]) -> Result<&'a [u8]> {
    if key.starts_with(prefix) {
        Ok(&key[prefix.len()..])
    } else {
        Err(Error::Corrupt(format!(
            "{:?} is outside its structure prefix",
            String::from_utf8_lossy(key)
        )))
    }
}

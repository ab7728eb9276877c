use crate::decimal::Decimal;
use crate::value::{
    BloomHandle, CountHandle, EncryptedRecord, Kind, ListHandle, PasswordRecord, SecretShare,
    Value,
};
use crate::{Error, Result};
use chrono::{DateTime, Duration, NaiveTime, TimeZone, Timelike, Utc};
use num_bigint::{BigInt, Sign};
use std::convert::TryInto;
use uuid::Uuid;

/// Size of the expiry trailer at the end of every frame.
const EXPIRY_SIZE: usize = 8;

const NANOS_PER_SECOND: i64 = 1_000_000_000;

macro_rules! write_int {
    ($buf:expr, $x:expr) => {
        $buf.extend_from_slice(&$x.to_le_bytes());
    };
}

macro_rules! write_prefixed {
    ($buf:expr, $bytes:expr) => {
        let bytes: &[u8] = $bytes;
        let len: u32 = bytes.len().try_into().map_err(|_| Error::Overflow)?;
        write_int!($buf, len);
        $buf.extend_from_slice(bytes);
    };
}

/// A value as stored at one physical key, along with its expiry time.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub value: Value,
    pub expire_at: Option<DateTime<Utc>>,
}

impl Frame {
    pub fn new(value: Value) -> Self {
        Frame {
            value,
            expire_at: None,
        }
    }

    pub fn with_expiry(value: Value, expire_at: Option<DateTime<Utc>>) -> Self {
        Frame { value, expire_at }
    }

    pub fn kind(&self) -> Kind {
        self.value.kind()
    }

    /// Serializes the frame. Fails only when a value cannot be represented in its
    /// fixed-width field (timestamps and durations beyond ±292 years, byte strings
    /// longer than `u32::MAX`).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut buf = Vec::with_capacity(1 + EXPIRY_SIZE + 16);
        buf.push(self.value.kind().tag());
        encode_payload(&self.value, &mut buf)?;
        let expire_at = match self.expire_at {
            Some(t) => timestamp_nanos(&t)?,
            None => 0,
        };
        write_int!(buf, expire_at);
        Ok(buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Frame> {
        let kind = Frame::peek_kind(bytes)?;
        decode_frame(kind, bytes)
    }

    /// Decodes the frame, failing with `TypeMismatch` before touching the payload if
    /// it holds something other than `expected`.
    pub fn decode_as(bytes: &[u8], expected: Kind) -> Result<Frame> {
        let found = Frame::peek_kind(bytes)?;
        if found != expected {
            return Err(Error::TypeMismatch { expected, found });
        }
        decode_frame(found, bytes)
    }

    /// Reads only the tag byte.
    pub fn peek_kind(bytes: &[u8]) -> Result<Kind> {
        if bytes.len() < 1 + EXPIRY_SIZE {
            return Err(Error::corrupt(format!(
                "frame of {} bytes is shorter than its header",
                bytes.len()
            )));
        }
        Kind::from_tag(bytes[0])
    }
}

fn timestamp_nanos(t: &DateTime<Utc>) -> Result<i64> {
    t.timestamp_nanos_opt().ok_or(Error::Overflow)
}

fn encode_payload(value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::Null => {}
        Value::Int(i) => {
            write_int!(buf, *i);
        }
        Value::Float(x) => {
            write_int!(buf, x.to_bits());
        }
        Value::Decimal(d) => {
            write_int!(buf, d.coefficient);
            write_int!(buf, d.scale);
        }
        Value::BigInt(i) => {
            let (sign, magnitude) = i.to_bytes_be();
            buf.push(if sign == Sign::Minus { 1 } else { 0 });
            buf.extend_from_slice(&magnitude);
        }
        Value::String(s) => {
            write_prefixed!(buf, s.as_bytes());
        }
        Value::Bool(b) => buf.push(*b as u8),
        Value::Timestamp(t) => {
            write_int!(buf, timestamp_nanos(t)?);
        }
        Value::Time(t) => {
            let nanos = i64::from(t.num_seconds_from_midnight()) * NANOS_PER_SECOND
                + i64::from(t.nanosecond());
            write_int!(buf, nanos);
        }
        Value::Duration(d) => {
            write_int!(buf, d.num_nanoseconds().ok_or(Error::Overflow)?);
        }
        Value::Binary(bytes) | Value::Bitmap(bytes) => {
            write_prefixed!(buf, bytes);
        }
        Value::Uuid(u) => buf.extend_from_slice(u.as_bytes()),
        Value::List(h) => {
            write_int!(buf, h.head);
            write_int!(buf, h.tail);
            write_int!(buf, h.len);
        }
        Value::Map(h) | Value::Set(h) | Value::TimeSeries(h) => {
            write_int!(buf, h.count);
        }
        Value::Bloom(h) => {
            buf.push(h.slots);
            write_int!(buf, h.count);
            write_prefixed!(buf, h.salt.as_bytes());
        }
        Value::Password(p) => {
            write_prefixed!(buf, p.algorithm.as_bytes());
            write_prefixed!(buf, &p.hash);
            write_prefixed!(buf, &p.salt);
        }
        Value::Encrypted(e) => {
            write_prefixed!(buf, e.algorithm.as_bytes());
            write_prefixed!(buf, &e.ciphertext);
            write_prefixed!(buf, &e.nonce);
        }
        Value::SecretShare(s) => {
            buf.push(s.index);
            buf.push(s.threshold);
            write_prefixed!(buf, &s.share);
        }
    }
    Ok(())
}

/// Reads fields off a payload, refusing to run past its end.
struct Payload<'a> {
    bytes: &'a [u8],
    pos: usize,
    kind: Kind,
}

impl<'a> Payload<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self.pos.checked_add(n).filter(|end| *end <= self.bytes.len());
        match end {
            Some(end) => {
                let out = &self.bytes[self.pos..end];
                self.pos = end;
                Ok(out)
            }
            None => Err(Error::corrupt(format!(
                "{} payload truncated at byte {}",
                self.kind, self.pos
            ))),
        }
    }

    fn rest(&mut self) -> &'a [u8] {
        let out = &self.bytes[self.pos..];
        self.pos = self.bytes.len();
        out
    }

    fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn i32(&mut self) -> Result<i32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(i32::from_le_bytes(buf))
    }

    fn i64(&mut self) -> Result<i64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(i64::from_le_bytes(buf))
    }

    fn u64(&mut self) -> Result<u64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(u64::from_le_bytes(buf))
    }

    fn prefixed(&mut self) -> Result<Vec<u8>> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        let len = u32::from_le_bytes(buf) as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn string(&mut self) -> Result<String> {
        let bytes = self.prefixed()?;
        String::from_utf8(bytes)
            .map_err(|_| Error::corrupt(format!("{} payload is not UTF-8", self.kind)))
    }

    /// Every byte of the payload must have been consumed.
    fn finish(self) -> Result<()> {
        if self.pos != self.bytes.len() {
            return Err(Error::corrupt(format!(
                "{} payload has {} trailing bytes",
                self.kind,
                self.bytes.len() - self.pos
            )));
        }
        Ok(())
    }
}

fn decode_frame(kind: Kind, bytes: &[u8]) -> Result<Frame> {
    let body_end = bytes.len() - EXPIRY_SIZE;
    let mut payload = Payload {
        bytes: &bytes[1..body_end],
        pos: 0,
        kind,
    };
    let value = decode_payload(kind, &mut payload)?;
    payload.finish()?;

    let mut trailer = [0u8; EXPIRY_SIZE];
    trailer.copy_from_slice(&bytes[body_end..]);
    let expire_at = match i64::from_le_bytes(trailer) {
        0 => None,
        nanos => Some(Utc.timestamp_nanos(nanos)),
    };

    Ok(Frame { value, expire_at })
}

fn decode_payload(kind: Kind, p: &mut Payload) -> Result<Value> {
    let value = match kind {
        Kind::Null => Value::Null,
        Kind::Int => Value::Int(p.i64()?),
        Kind::Float => Value::Float(f64::from_bits(p.u64()?)),
        Kind::Decimal => {
            let coefficient = p.i64()?;
            let scale = p.i32()?;
            Value::Decimal(Decimal::new(coefficient, scale))
        }
        Kind::BigInt => {
            let sign = match p.u8()? {
                0 => Sign::Plus,
                1 => Sign::Minus,
                other => return Err(Error::corrupt(format!("bad sign byte {}", other))),
            };
            let magnitude = p.rest();
            if magnitude.is_empty() {
                return Err(Error::corrupt("biginteger has no magnitude"));
            }
            Value::BigInt(BigInt::from_bytes_be(sign, magnitude))
        }
        Kind::String => Value::String(p.string()?),
        Kind::Bool => match p.u8()? {
            0 => Value::Bool(false),
            1 => Value::Bool(true),
            other => return Err(Error::corrupt(format!("bad bool byte {}", other))),
        },
        Kind::Timestamp => Value::Timestamp(Utc.timestamp_nanos(p.i64()?)),
        Kind::Time => {
            let nanos = p.i64()?;
            if nanos < 0 {
                return Err(Error::corrupt("negative time of day"));
            }
            let secs = (nanos / NANOS_PER_SECOND) as u32;
            let frac = (nanos % NANOS_PER_SECOND) as u32;
            let time = NaiveTime::from_num_seconds_from_midnight_opt(secs, frac)
                .ok_or_else(|| Error::corrupt("time of day out of range"))?;
            Value::Time(time)
        }
        Kind::Duration => Value::Duration(Duration::nanoseconds(p.i64()?)),
        Kind::Binary => Value::Binary(p.prefixed()?),
        Kind::Uuid => {
            let bytes = p.take(16)?;
            Value::Uuid(Uuid::from_slice(bytes).map_err(Error::corrupt)?)
        }
        Kind::List => {
            let head = p.i64()?;
            let tail = p.i64()?;
            let len = p.i64()?;
            if len < 0 || (len == 0 && (head, tail) != (0, -1)) {
                return Err(Error::corrupt(format!(
                    "list handle {{{}, {}, {}}} is not a valid deque",
                    head, tail, len
                )));
            }
            Value::List(ListHandle { head, tail, len })
        }
        Kind::Map => Value::Map(CountHandle { count: p.u64()? }),
        Kind::Set => Value::Set(CountHandle { count: p.u64()? }),
        Kind::TimeSeries => Value::TimeSeries(CountHandle { count: p.u64()? }),
        Kind::Bloom => {
            let slots = p.u8()?;
            let count = p.u64()?;
            let salt = p.string()?;
            Value::Bloom(BloomHandle { slots, salt, count })
        }
        Kind::Password => Value::Password(PasswordRecord {
            algorithm: p.string()?,
            hash: p.prefixed()?,
            salt: p.prefixed()?,
        }),
        Kind::Encrypted => Value::Encrypted(EncryptedRecord {
            algorithm: p.string()?,
            ciphertext: p.prefixed()?,
            nonce: p.prefixed()?,
        }),
        Kind::SecretShare => Value::SecretShare(SecretShare {
            index: p.u8()?,
            threshold: p.u8()?,
            share: p.prefixed()?,
        }),
        Kind::Bitmap => Value::Bitmap(p.prefixed()?),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_layout_is_tag_then_little_endian() {
        let bytes = Frame::new(Value::Int(0x0102)).encode().unwrap();
        assert_eq!(bytes[0], 0x01);
        assert_eq!(&bytes[1..9], &[0x02, 0x01, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[9..], &[0u8; 8]);
    }

    #[test]
    fn string_is_length_prefixed() {
        let bytes = Frame::new(Value::from("hey")).encode().unwrap();
        assert_eq!(&bytes[..8], &[0x05, 3, 0, 0, 0, b'h', b'e', b'y']);
        assert_eq!(bytes.len(), 1 + 4 + 3 + 8);
    }

    #[test]
    fn decimal_payload_is_twelve_bytes() {
        let bytes = Frame::new(Value::Decimal(Decimal::new(10050, 2)))
            .encode()
            .unwrap();
        assert_eq!(bytes.len(), 1 + 12 + 8);
    }

    #[test]
    fn biginteger_is_sign_then_big_endian() {
        let bytes = Frame::new(Value::BigInt(BigInt::from(-258)))
            .encode()
            .unwrap();
        assert_eq!(&bytes[..4], &[0x04, 1, 0x01, 0x02]);
    }

    #[test]
    fn expiry_trailer_survives() {
        let at = Utc.timestamp_nanos(1_600_000_000_123_456_789);
        let frame = Frame::with_expiry(Value::Bool(true), Some(at));
        let decoded = Frame::decode(&frame.encode().unwrap()).unwrap();
        assert_eq!(decoded.expire_at, Some(at));
    }

    #[test]
    fn trailing_payload_bytes_are_corrupt() {
        let mut bytes = Frame::new(Value::Int(7)).encode().unwrap();
        bytes.insert(9, 0xff);
        match Frame::decode(&bytes) {
            Err(Error::Corrupt(_)) => {}
            other => panic!("expected corrupt, got {:?}", other),
        }
    }

    #[test]
    fn truncated_payload_is_corrupt() {
        let bytes = Frame::new(Value::Int(7)).encode().unwrap();
        let short = [&bytes[..5], &bytes[9..]].concat();
        match Frame::decode(&short) {
            Err(Error::Corrupt(_)) => {}
            other => panic!("expected corrupt, got {:?}", other),
        }
    }

    #[test]
    fn empty_list_must_be_canonical() {
        let mut bytes = vec![Kind::List.tag()];
        bytes.extend_from_slice(&5i64.to_le_bytes());
        bytes.extend_from_slice(&4i64.to_le_bytes());
        bytes.extend_from_slice(&0i64.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(Frame::decode(&bytes).is_err());
    }
}

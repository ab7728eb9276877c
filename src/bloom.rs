//! Membership filters.
//!
//! Each added item stores its own vector of slot hashes under the literal item
//! string, instead of setting bits in one shared bitset. A lookup recomputes the
//! vector and compares it with the stored one, so answers are exact: no false
//! positives for strings never added, no false negatives for strings that were.

use crate::keys::{self, Marker};
use crate::{Error, Result, Tower};
use chrono::{DateTime, Utc};
use frame::{BloomHandle, Frame, Kind, Value};
use metrohash::MetroHash64;
use std::hash::Hasher;
use uuid::Uuid;

pub const DEFAULT_SLOTS: u8 = 3;

pub const MIN_SLOTS: u8 = 3;

pub const MAX_SLOTS: u8 = 5;

const METROHASH_SEED: u64 = 0x385f_829f_0031_3111;

/// 2^64 / golden ratio, rounded to odd.
const GOLDEN: u64 = 0x9e37_79b9_7f4a_7c15;

/// Computes `slots` hashes of `item + salt`: the first is the base hash, each
/// following one is the previous multiplied by `GOLDEN`.
fn slot_vector(item: &str, salt: &str, slots: u8) -> Vec<u8> {
    let mut hasher = MetroHash64::with_seed(METROHASH_SEED);
    hasher.write(item.as_bytes());
    hasher.write(salt.as_bytes());
    let mut hash = hasher.finish();

    let mut out = Vec::with_capacity(slots as usize * 8);
    for _ in 0..slots {
        out.extend_from_slice(&hash.to_le_bytes());
        hash = hash.wrapping_mul(GOLDEN);
    }
    out
}

/// Bloom filter operations of a `Tower`.
pub struct Blooms<'a> {
    tower: &'a Tower,
}

impl Tower {
    pub fn blooms(&self) -> Blooms<'_> {
        Blooms { tower: self }
    }
}

impl<'a> Blooms<'a> {
    fn meta(&self, key: &str) -> Result<(BloomHandle, Option<DateTime<Utc>>)> {
        let frame = self.tower.read_as(key.as_bytes(), Kind::Bloom)?;
        match frame.value {
            Value::Bloom(handle) => Ok((handle, frame.expire_at)),
            other => Err(other.mismatch(Kind::Bloom).into()),
        }
    }

    fn store_meta(
        &self,
        key: &str,
        handle: BloomHandle,
        expire_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.tower.write(
            key.as_bytes(),
            &Frame::with_expiry(Value::Bloom(handle), expire_at),
        )
    }

    /// Creates an empty filter with `slots` hashes per item (3 if `None`).
    pub fn create(&self, key: &str, slots: Option<u8>) -> Result<()> {
        let slots = slots.unwrap_or(DEFAULT_SLOTS);
        if slots < MIN_SLOTS || slots > MAX_SLOTS {
            return Err(Error::OutOfRange);
        }
        let handle = BloomHandle {
            slots,
            salt: Uuid::new_v4().to_simple().to_string(),
            count: 0,
        };
        let _guard = self.tower.lock(key);
        self.tower.create_locked(key, Value::Bloom(handle))
    }

    /// Adds `item`, returning the number of distinct items afterwards.
    pub fn add(&self, key: &str, item: &str) -> Result<u64> {
        let _guard = self.tower.lock(key);
        let (mut handle, expire_at) = self.meta(key)?;
        let item_key = keys::item(key, Marker::Bloom, item.as_bytes());
        let is_new = self.tower.engine.get(&item_key)?.is_none();

        let vector = slot_vector(item, &handle.salt, handle.slots);
        self.tower
            .write(&item_key, &Frame::new(Value::Binary(vector)))?;
        if is_new {
            handle.count = handle.count.checked_add(1).ok_or(Error::Overflow)?;
            self.store_meta(key, handle.clone(), expire_at)?;
        }
        Ok(handle.count)
    }

    pub fn contains(&self, key: &str, item: &str) -> Result<bool> {
        let _guard = self.tower.rlock(key);
        let (handle, _) = self.meta(key)?;
        let stored = match self
            .tower
            .read(&keys::item(key, Marker::Bloom, item.as_bytes()))?
        {
            Some(frame) => frame.value,
            None => return Ok(false),
        };
        let expected = slot_vector(item, &handle.salt, handle.slots);
        Ok(stored == Value::Binary(expected))
    }

    pub fn len(&self, key: &str) -> Result<u64> {
        let _guard = self.tower.rlock(key);
        Ok(self.meta(key)?.0.count)
    }

    /// Forgets every item but keeps the filter, its slots and its salt.
    pub fn clear(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        let (mut handle, expire_at) = self.meta(key)?;
        self.tower.remove_items(key, Marker::Bloom)?;
        handle.count = 0;
        self.store_meta(key, handle, expire_at)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        let frame = self.tower.read_as(key.as_bytes(), Kind::Bloom)?;
        self.tower.purge_locked(key, &frame)
    }
}

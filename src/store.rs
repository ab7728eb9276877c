use crate::clock::{CachedClock, Clock, SystemClock};
use crate::config::TowerConfig;
use crate::expiry::EXPIRY_PREFIX;
use crate::keys::{self, Marker};
use crate::lock::{LockTable, ReadGuard, WriteGuard};
use crate::secure::Providers;
use crate::{Error, Result};
use chrono::{DateTime, Duration, Utc};
use engine::Engine;
use frame::{CountHandle, Decimal, Frame, Kind, Value};
use slog::Logger;
use std::convert::TryFrom;
use std::path::Path;
use std::sync::Arc;

/// Largest bitmap a frame can carry.
const MAX_BITMAP_BYTES: u32 = u32::MAX;

/// Writes under the expiry namespace would be taken for bucket lists.
fn check_user_key(key: &str) -> Result<()> {
    if key.starts_with(EXPIRY_PREFIX) {
        Err(Error::ReservedKey(key.to_owned()))
    } else {
        Ok(())
    }
}

/// An embedded store of typed values and structures over one ordered engine.
///
/// Every operation takes the logical key first and holds that key's lock for its
/// whole read-modify-write sequence. No operation holds two keys' locks at once.
///
/// Example:
///
/// ```rust
/// # use tower::{Tower, TowerConfig, Value};
/// let tower = Tower::open(TowerConfig::memory()).unwrap();
/// tower.set("greeting", Value::from("hello")).unwrap();
/// assert_eq!(tower.get("greeting").unwrap(), Value::from("hello"));
/// ```
pub struct Tower {
    pub(crate) engine: Arc<dyn Engine>,
    pub(crate) locks: LockTable,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) providers: Providers,
    pub(crate) precision: Duration,
    pub(crate) slog: Logger,
}

impl Tower {
    pub fn open(config: TowerConfig) -> Result<Tower> {
        let logger = engine::get_default_logger();
        Tower::open_with_logger(config, &logger)
    }

    /// Opens the configured engine and builds a `Tower` over it.
    pub fn open_with_logger(config: TowerConfig, logger: &Logger) -> Result<Tower> {
        let slog = logger.new(o!("path" => format!("{:?}", &config.storage.path)));
        let engine = engine::open(&config.storage, &slog)?;
        let clock: Arc<dyn Clock> = if config.clock_refresh_ms == 0 {
            Arc::new(SystemClock)
        } else {
            Arc::new(CachedClock::start(std::time::Duration::from_millis(
                config.clock_refresh_ms,
            ))?)
        };
        info!(slog, "Opened tower"; "engine" => format!("{:?}", config.storage.kind),
              "locks" => format!("{:?}", config.locks));
        Ok(Tower::with_engine(engine, clock, &config, &slog))
    }

    /// Builds a `Tower` over an already-open engine and an explicit clock.
    pub fn with_engine(
        engine: Arc<dyn Engine>,
        clock: Arc<dyn Clock>,
        config: &TowerConfig,
        logger: &Logger,
    ) -> Tower {
        let precision = Duration::seconds(config.expiry.precision_secs.max(1) as i64);
        Tower {
            engine,
            locks: LockTable::new(config.locks),
            clock,
            providers: Providers::default(),
            precision,
            slog: logger.clone(),
        }
    }

    /// Opens a sled-backed store in `dir` with default settings.
    pub fn open_dir(dir: &Path) -> Result<Tower> {
        let mut config = TowerConfig::default();
        config.storage.path = dir.join("tower.db");
        Tower::open(config)
    }

    pub fn with_providers(mut self, providers: Providers) -> Self {
        self.providers = providers;
        self
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn logger(&self) -> &Logger {
        &self.slog
    }

    pub fn flush(&self) -> Result<()> {
        Ok(self.engine.flush()?)
    }

    pub(crate) fn lock(&self, key: &str) -> WriteGuard {
        self.locks.lock(key)
    }

    pub(crate) fn rlock(&self, key: &str) -> ReadGuard {
        self.locks.rlock(key)
    }

    pub(crate) fn read(&self, key: &[u8]) -> Result<Option<Frame>> {
        match self.engine.get(key)? {
            Some(bytes) => Ok(Some(Frame::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Reads a frame that must exist and hold `kind`.
    pub(crate) fn read_as(&self, key: &[u8], kind: Kind) -> Result<Frame> {
        match self.engine.get(key)? {
            Some(bytes) => Ok(Frame::decode_as(&bytes, kind)?),
            None => Err(Error::NotFound),
        }
    }

    pub(crate) fn write(&self, key: &[u8], frame: &Frame) -> Result<()> {
        let bytes = frame.encode()?;
        self.engine.set(key, &bytes)?;
        Ok(())
    }

    pub(crate) fn remove(&self, key: &[u8]) -> Result<()> {
        self.engine.delete(key)?;
        Ok(())
    }

    /// Writes fresh structure metadata. The caller holds the key's lock.
    pub(crate) fn create_locked(&self, key: &str, handle: Value) -> Result<()> {
        check_user_key(key)?;
        if self.engine.get(key.as_bytes())?.is_some() {
            return Err(Error::AlreadyExists);
        }
        trace!(self.slog, "Creating {}", handle.kind(); "key" => key);
        self.write(key.as_bytes(), &Frame::new(handle))
    }

    /// Removes whatever `frame` (read from `key`) describes: every item first,
    /// then the metadata. The caller holds the key's lock.
    pub(crate) fn purge_locked(&self, key: &str, frame: &Frame) -> Result<()> {
        match &frame.value {
            Value::List(handle) => {
                if !handle.is_empty() {
                    for index in handle.head..=handle.tail {
                        self.remove(&keys::item(key, Marker::List, &keys::index_selector(index)))?;
                    }
                }
            }
            Value::Map(_) => self.remove_items(key, Marker::Map)?,
            Value::Set(_) => self.remove_items(key, Marker::Set)?,
            Value::TimeSeries(_) => self.remove_items(key, Marker::Series)?,
            Value::Bloom(_) => self.remove_items(key, Marker::Bloom)?,
            _ => {}
        }
        self.remove(key.as_bytes())
    }

    /// Deletes every item key under the structure's prefix.
    pub(crate) fn remove_items(&self, key: &str, marker: Marker) -> Result<()> {
        let prefix = keys::prefix(key, marker);
        for (item, _) in self.engine.scan_prefix(&prefix)? {
            self.remove(&item)?;
        }
        Ok(())
    }

    /// Counts the item keys under the structure's prefix.
    pub(crate) fn count_items(&self, key: &str, marker: Marker) -> Result<u64> {
        let prefix = keys::prefix(key, marker);
        let mut count = 0u64;
        self.engine.range_prefix(&prefix, &mut |_, _| {
            count += 1;
            engine::Visit::Continue
        })?;
        Ok(count)
    }

    /// Reads the metadata of a counted structure (map, set or time series).
    pub(crate) fn count_meta(
        &self,
        key: &str,
        kind: Kind,
    ) -> Result<(CountHandle, Option<DateTime<Utc>>)> {
        let frame = self.read_as(key.as_bytes(), kind)?;
        match frame.value {
            Value::Map(handle) | Value::Set(handle) | Value::TimeSeries(handle) => {
                Ok((handle, frame.expire_at))
            }
            other => Err(other.mismatch(kind).into()),
        }
    }

    pub(crate) fn store_count_meta(
        &self,
        key: &str,
        kind: Kind,
        handle: CountHandle,
        expire_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let value = match kind {
            Kind::Map => Value::Map(handle),
            Kind::Set => Value::Set(handle),
            Kind::TimeSeries => Value::TimeSeries(handle),
            other => {
                return Err(Error::Corrupt(format!("{} has no item count", other)));
            }
        };
        self.write(key.as_bytes(), &Frame::with_expiry(value, expire_at))
    }

    pub fn exists(&self, key: &str) -> Result<bool> {
        let _guard = self.rlock(key);
        Ok(self.engine.get(key.as_bytes())?.is_some())
    }

    /// What the key currently holds.
    pub fn kind(&self, key: &str) -> Result<Kind> {
        let _guard = self.rlock(key);
        match self.engine.get(key.as_bytes())? {
            Some(bytes) => Ok(Frame::peek_kind(&bytes)?),
            None => Err(Error::NotFound),
        }
    }

    /// Deletes whatever is stored at `key`, structure items included.
    pub fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.lock(key);
        let frame = self.read(key.as_bytes())?.ok_or(Error::NotFound)?;
        trace!(self.slog, "Deleting {}", frame.kind(); "key" => key);
        self.purge_locked(key, &frame)
    }

    /// Replaces the value at `key`, clearing any expiry. Structures must be
    /// deleted first, since overwriting their metadata would orphan their items.
    pub fn set(&self, key: &str, value: Value) -> Result<()> {
        if value.kind().is_structure() {
            return Err(Error::TypeMismatch {
                expected: Kind::Null,
                found: value.kind(),
            });
        }
        check_user_key(key)?;
        let _guard = self.lock(key);
        if let Some(bytes) = self.engine.get(key.as_bytes())? {
            let found = Frame::peek_kind(&bytes)?;
            if found.is_structure() {
                return Err(Error::TypeMismatch {
                    expected: value.kind(),
                    found,
                });
            }
        }
        trace!(self.slog, "Setting {}", value.kind(); "key" => key);
        self.write(key.as_bytes(), &Frame::new(value))
    }

    pub fn get(&self, key: &str) -> Result<Value> {
        let _guard = self.rlock(key);
        let frame = self.read(key.as_bytes())?.ok_or(Error::NotFound)?;
        Ok(frame.value)
    }

    /// Like `get`, but fails with `TypeMismatch` unless the value is a `kind`.
    pub fn get_as(&self, key: &str, kind: Kind) -> Result<Value> {
        let _guard = self.rlock(key);
        Ok(self.read_as(key.as_bytes(), kind)?.value)
    }

    /// Rewrites a scalar in place, keeping its expiry. `update` receives `None`
    /// when the key is absent.
    fn update_scalar<F>(&self, key: &str, update: F) -> Result<Value>
    where
        F: FnOnce(Option<Value>) -> Result<Value>,
    {
        let _guard = self.lock(key);
        let (current, expire_at) = match self.read(key.as_bytes())? {
            Some(frame) => (Some(frame.value), frame.expire_at),
            None => (None, None),
        };
        let next = update(current)?;
        self.write(key.as_bytes(), &Frame::with_expiry(next.clone(), expire_at))?;
        Ok(next)
    }

    /// Adds `by` to the integer at `key`, starting from zero if it is absent.
    pub fn incr_by(&self, key: &str, by: i64) -> Result<i64> {
        let next = self.update_scalar(key, |current| match current {
            None => Ok(Value::Int(by)),
            Some(Value::Int(i)) => Ok(Value::Int(i.checked_add(by).ok_or(Error::Overflow)?)),
            Some(other) => Err(other.mismatch(Kind::Int).into()),
        })?;
        match next {
            Value::Int(i) => Ok(i),
            other => Err(other.mismatch(Kind::Int).into()),
        }
    }

    pub fn incr_by_float(&self, key: &str, by: f64) -> Result<f64> {
        let next = self.update_scalar(key, |current| match current {
            None => Ok(Value::Float(by)),
            Some(Value::Float(x)) => {
                let sum = x + by;
                if sum.is_finite() {
                    Ok(Value::Float(sum))
                } else {
                    Err(Error::Overflow)
                }
            }
            Some(other) => Err(other.mismatch(Kind::Float).into()),
        })?;
        match next {
            Value::Float(x) => Ok(x),
            other => Err(other.mismatch(Kind::Float).into()),
        }
    }

    /// Adds to the decimal at `key`, aligning scales first.
    pub fn decimal_add(&self, key: &str, by: Decimal) -> Result<Decimal> {
        let next = self.update_scalar(key, |current| match current {
            None => Ok(Value::Decimal(by)),
            Some(Value::Decimal(d)) => Ok(Value::Decimal(d.checked_add(by)?)),
            Some(other) => Err(other.mismatch(Kind::Decimal).into()),
        })?;
        match next {
            Value::Decimal(d) => Ok(d),
            other => Err(other.mismatch(Kind::Decimal).into()),
        }
    }

    /// Sets or clears one bit of the bitmap at `key`, growing it as needed.
    /// Returns the bit's previous value.
    /// Fails with `OutOfRange` once the bitmap would outgrow a frame payload.
    pub fn set_bit(&self, key: &str, offset: u64, on: bool) -> Result<bool> {
        if offset / 8 >= u64::from(MAX_BITMAP_BYTES) {
            return Err(Error::OutOfRange);
        }
        let byte = usize::try_from(offset / 8).map_err(|_| Error::OutOfRange)?;
        let mask = 0x80u8 >> (offset % 8);
        let mut previous = false;
        self.update_scalar(key, |current| {
            let mut bits = match current {
                None => Vec::new(),
                Some(Value::Bitmap(bits)) => bits,
                Some(other) => return Err(other.mismatch(Kind::Bitmap).into()),
            };
            if bits.len() <= byte {
                bits.resize(byte + 1, 0);
            }
            previous = bits[byte] & mask != 0;
            if on {
                bits[byte] |= mask;
            } else {
                bits[byte] &= !mask;
            }
            Ok(Value::Bitmap(bits))
        })?;
        Ok(previous)
    }

    /// Bits past the end of the bitmap read as zero.
    pub fn get_bit(&self, key: &str, offset: u64) -> Result<bool> {
        let _guard = self.rlock(key);
        let bits = match self.read_as(key.as_bytes(), Kind::Bitmap)?.value {
            Value::Bitmap(bits) => bits,
            other => return Err(other.mismatch(Kind::Bitmap).into()),
        };
        let byte = (offset / 8) as usize;
        let mask = 0x80u8 >> (offset % 8);
        Ok(bits.get(byte).map_or(false, |b| b & mask != 0))
    }

    pub fn bit_count(&self, key: &str) -> Result<u64> {
        let _guard = self.rlock(key);
        match self.read_as(key.as_bytes(), Kind::Bitmap)?.value {
            Value::Bitmap(bits) => Ok(bits.iter().map(|b| u64::from(b.count_ones())).sum()),
            other => Err(other.mismatch(Kind::Bitmap).into()),
        }
    }
}

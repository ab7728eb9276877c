use crate::keys::{self, Marker};
use crate::{Error, Result, Tower};
use chrono::{DateTime, Utc};
use engine::Visit;
use frame::{CountHandle, Frame, Kind, Value};

/// Time-ordered series operations of a `Tower`. At most one point per timestamp.
pub struct Series<'a> {
    tower: &'a Tower,
}

impl Tower {
    pub fn series(&self) -> Series<'_> {
        Series { tower: self }
    }
}

fn point_key(key: &str, at: &DateTime<Utc>) -> Result<Vec<u8>> {
    Ok(keys::item(key, Marker::Series, &keys::time_selector(at)?))
}

impl<'a> Series<'a> {
    pub fn create(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        self.tower
            .create_locked(key, Value::TimeSeries(CountHandle::default()))
    }

    /// Records `value` at `at`, replacing any point already there. Returns the
    /// number of points afterwards.
    pub fn add(&self, key: &str, at: DateTime<Utc>, value: Value) -> Result<u64> {
        let _guard = self.tower.lock(key);
        let (mut handle, expire_at) = self.tower.count_meta(key, Kind::TimeSeries)?;
        let item = point_key(key, &at)?;
        let is_new = self.tower.engine.get(&item)?.is_none();

        self.tower.write(&item, &Frame::new(value))?;
        if is_new {
            handle.count = handle.count.checked_add(1).ok_or(Error::Overflow)?;
            self.tower
                .store_count_meta(key, Kind::TimeSeries, handle, expire_at)?;
        }
        Ok(handle.count)
    }

    pub fn get(&self, key: &str, at: DateTime<Utc>) -> Result<Value> {
        let _guard = self.tower.rlock(key);
        self.tower.count_meta(key, Kind::TimeSeries)?;
        match self.tower.read(&point_key(key, &at)?)? {
            Some(frame) => Ok(frame.value),
            None => Err(Error::NotFound),
        }
    }

    /// Removes the point at `at` if there is one. Returns the number of points
    /// afterwards.
    pub fn remove(&self, key: &str, at: DateTime<Utc>) -> Result<u64> {
        let _guard = self.tower.lock(key);
        let (mut handle, expire_at) = self.tower.count_meta(key, Kind::TimeSeries)?;
        let item = point_key(key, &at)?;
        if self.tower.engine.get(&item)?.is_none() {
            return Ok(handle.count);
        }

        self.tower.remove(&item)?;
        handle.count = handle.count.saturating_sub(1);
        self.tower
            .store_count_meta(key, Kind::TimeSeries, handle, expire_at)?;
        Ok(handle.count)
    }

    /// Every point with `from <= t <= to`, oldest first.
    pub fn range(
        &self,
        key: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<(DateTime<Utc>, Value)>> {
        let _guard = self.tower.rlock(key);
        self.tower.count_meta(key, Kind::TimeSeries)?;
        if from > to {
            return Ok(Vec::new());
        }

        let prefix = keys::prefix(key, Marker::Series);
        let lower = keys::time_selector(&from)?;
        let upper = keys::time_selector(&to)?;
        let mut raw = Vec::new();
        self.tower.engine.range_prefix(&prefix, &mut |item, bytes| {
            let selector = &item[prefix.len()..];
            if selector < &lower[..] {
                Visit::Continue
            } else if selector > &upper[..] {
                Visit::Abort
            } else {
                raw.push((selector.to_vec(), bytes.to_vec()));
                Visit::Continue
            }
        })?;

        raw.into_iter()
            .map(|(selector, bytes)| -> Result<(DateTime<Utc>, Value)> {
                Ok((keys::decode_time(&selector)?, Frame::decode(&bytes)?.value))
            })
            .collect()
    }

    /// The most recent point, if any.
    pub fn latest(&self, key: &str) -> Result<Option<(DateTime<Utc>, Value)>> {
        let _guard = self.tower.rlock(key);
        self.tower.count_meta(key, Kind::TimeSeries)?;
        let prefix = keys::prefix(key, Marker::Series);
        let mut last = None;
        self.tower.engine.range_prefix(&prefix, &mut |item, bytes| {
            last = Some((item.to_vec(), bytes.to_vec()));
            Visit::Continue
        })?;
        match last {
            Some((item, bytes)) => {
                let at = keys::decode_time(keys::selector(&item, &prefix)?)?;
                Ok(Some((at, Frame::decode(&bytes)?.value)))
            }
            None => Ok(None),
        }
    }

    pub fn len(&self, key: &str) -> Result<u64> {
        let _guard = self.tower.rlock(key);
        Ok(self.tower.count_meta(key, Kind::TimeSeries)?.0.count)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        let frame = self.tower.read_as(key.as_bytes(), Kind::TimeSeries)?;
        self.tower.purge_locked(key, &frame)
    }
}

use crate::keys::{self, Marker};
use crate::{Error, Result, Tower};
use frame::{CountHandle, Frame, Kind, Value};

/// Map (field to value) operations of a `Tower`.
pub struct Maps<'a> {
    tower: &'a Tower,
}

impl Tower {
    pub fn maps(&self) -> Maps<'_> {
        Maps { tower: self }
    }
}

fn field_key(key: &str, field: &str) -> Vec<u8> {
    keys::item(key, Marker::Map, field.as_bytes())
}

impl<'a> Maps<'a> {
    pub fn create(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        self.tower
            .create_locked(key, Value::Map(CountHandle::default()))
    }

    /// Sets `field`, returning the number of fields afterwards. Only a new field
    /// changes the count.
    pub fn set(&self, key: &str, field: &str, value: Value) -> Result<u64> {
        let _guard = self.tower.lock(key);
        let (mut handle, expire_at) = self.tower.count_meta(key, Kind::Map)?;
        let item = field_key(key, field);
        let is_new = self.tower.engine.get(&item)?.is_none();

        self.tower.write(&item, &Frame::new(value))?;
        if is_new {
            handle.count = handle.count.checked_add(1).ok_or(Error::Overflow)?;
            self.tower
                .store_count_meta(key, Kind::Map, handle, expire_at)?;
        }
        trace!(self.tower.slog, "Set field"; "key" => key, "field" => field, "new" => is_new);
        Ok(handle.count)
    }

    pub fn get(&self, key: &str, field: &str) -> Result<Value> {
        let _guard = self.tower.rlock(key);
        self.tower.count_meta(key, Kind::Map)?;
        match self.tower.read(&field_key(key, field))? {
            Some(frame) => Ok(frame.value),
            None => Err(Error::NotFound),
        }
    }

    pub fn contains(&self, key: &str, field: &str) -> Result<bool> {
        let _guard = self.tower.rlock(key);
        self.tower.count_meta(key, Kind::Map)?;
        Ok(self.tower.engine.get(&field_key(key, field))?.is_some())
    }

    /// Removes `field` if present, returning the number of fields afterwards.
    pub fn remove(&self, key: &str, field: &str) -> Result<u64> {
        let _guard = self.tower.lock(key);
        let (mut handle, expire_at) = self.tower.count_meta(key, Kind::Map)?;
        let item = field_key(key, field);
        if self.tower.engine.get(&item)?.is_none() {
            return Ok(handle.count);
        }

        self.tower.remove(&item)?;
        handle.count = handle.count.saturating_sub(1);
        self.tower
            .store_count_meta(key, Kind::Map, handle, expire_at)?;
        Ok(handle.count)
    }

    pub fn len(&self, key: &str) -> Result<u64> {
        let _guard = self.tower.rlock(key);
        Ok(self.tower.count_meta(key, Kind::Map)?.0.count)
    }

    /// Every field and its value, ordered by field.
    pub fn entries(&self, key: &str) -> Result<Vec<(String, Value)>> {
        let _guard = self.tower.rlock(key);
        self.tower.count_meta(key, Kind::Map)?;
        let prefix = keys::prefix(key, Marker::Map);
        let mut out = Vec::new();
        for (item, bytes) in self.tower.engine.scan_prefix(&prefix)? {
            let field = String::from_utf8(keys::selector(&item, &prefix)?.to_vec())
                .map_err(|_| Error::Corrupt(format!("map {:?} has a non-UTF-8 field", key)))?;
            out.push((field, Frame::decode(&bytes)?.value));
        }
        Ok(out)
    }

    pub fn keys(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .entries(key)?
            .into_iter()
            .map(|(field, _)| field)
            .collect())
    }

    pub fn values(&self, key: &str) -> Result<Vec<Value>> {
        Ok(self
            .entries(key)?
            .into_iter()
            .map(|(_, value)| value)
            .collect())
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        let frame = self.tower.read_as(key.as_bytes(), Kind::Map)?;
        self.tower.purge_locked(key, &frame)
    }
}

use crate::keys::{self, Marker};
use crate::{Error, Result, Tower};
use frame::{CountHandle, Frame, Kind, Value};

/// Unique-member set operations of a `Tower`.
pub struct Sets<'a> {
    tower: &'a Tower,
}

impl Tower {
    pub fn sets(&self) -> Sets<'_> {
        Sets { tower: self }
    }
}

fn member_key(key: &str, member: &str) -> Vec<u8> {
    keys::item(key, Marker::Set, member.as_bytes())
}

impl<'a> Sets<'a> {
    pub fn create(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        self.tower
            .create_locked(key, Value::Set(CountHandle::default()))
    }

    /// Adds `member`, returning the cardinality afterwards. Adding an existing
    /// member changes nothing.
    pub fn add(&self, key: &str, member: &str) -> Result<u64> {
        let _guard = self.tower.lock(key);
        let (mut handle, expire_at) = self.tower.count_meta(key, Kind::Set)?;
        let item = member_key(key, member);
        if self.tower.engine.get(&item)?.is_some() {
            return Ok(handle.count);
        }

        self.tower.write(&item, &Frame::new(Value::Null))?;
        handle.count = handle.count.checked_add(1).ok_or(Error::Overflow)?;
        self.tower
            .store_count_meta(key, Kind::Set, handle, expire_at)?;
        Ok(handle.count)
    }

    /// Removes `member`, returning the cardinality afterwards. Removing an absent
    /// member changes nothing.
    pub fn remove(&self, key: &str, member: &str) -> Result<u64> {
        let _guard = self.tower.lock(key);
        let (mut handle, expire_at) = self.tower.count_meta(key, Kind::Set)?;
        let item = member_key(key, member);
        if self.tower.engine.get(&item)?.is_none() {
            return Ok(handle.count);
        }

        self.tower.remove(&item)?;
        handle.count = handle.count.saturating_sub(1);
        self.tower
            .store_count_meta(key, Kind::Set, handle, expire_at)?;
        Ok(handle.count)
    }

    pub fn is_member(&self, key: &str, member: &str) -> Result<bool> {
        let _guard = self.tower.rlock(key);
        self.tower.count_meta(key, Kind::Set)?;
        Ok(self.tower.engine.get(&member_key(key, member))?.is_some())
    }

    pub fn cardinality(&self, key: &str) -> Result<u64> {
        let _guard = self.tower.rlock(key);
        Ok(self.tower.count_meta(key, Kind::Set)?.0.count)
    }

    /// Every member, in byte order.
    pub fn members(&self, key: &str) -> Result<Vec<String>> {
        let _guard = self.tower.rlock(key);
        self.tower.count_meta(key, Kind::Set)?;
        let prefix = keys::prefix(key, Marker::Set);
        let mut out = Vec::new();
        for (item, _) in self.tower.engine.scan_prefix(&prefix)? {
            let member = String::from_utf8(keys::selector(&item, &prefix)?.to_vec())
                .map_err(|_| Error::Corrupt(format!("set {:?} has a non-UTF-8 member", key)))?;
            out.push(member);
        }
        Ok(out)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        let frame = self.tower.read_as(key.as_bytes(), Kind::Set)?;
        self.tower.purge_locked(key, &frame)
    }
}

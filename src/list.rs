//! Double-ended lists.
//!
//! Items live at consecutive indices `head..=tail`. Pushing left decrements
//! `head`, pushing right increments `tail`, so indices can be negative.

use crate::keys::{self, Marker};
use crate::{Error, Result, Tower};
use chrono::{DateTime, Utc};
use frame::{Frame, Kind, ListHandle, Value};

/// List operations of a `Tower`.
pub struct Lists<'a> {
    tower: &'a Tower,
}

impl Tower {
    pub fn lists(&self) -> Lists<'_> {
        Lists { tower: self }
    }
}

#[derive(Clone, Copy)]
enum End {
    Left,
    Right,
}

/// Resolves a possibly negative index against `len`.
fn normalize(index: i64, len: i64) -> i64 {
    if index < 0 {
        len.saturating_add(index)
    } else {
        index
    }
}

/// Turns `start..=end` into an offset span within `0..len`, or `None` if empty.
fn span(start: i64, end: i64, len: i64) -> Option<(i64, i64)> {
    let start = normalize(start, len).max(0);
    let end = normalize(end, len).min(len - 1);
    if len == 0 || start > end {
        None
    } else {
        Some((start, end))
    }
}

impl<'a> Lists<'a> {
    pub(crate) fn item_key(key: &str, index: i64) -> Vec<u8> {
        keys::item(key, Marker::List, &keys::index_selector(index))
    }

    /// Reads the list metadata along with the key's expiry.
    pub(crate) fn meta(&self, key: &str) -> Result<(ListHandle, Option<DateTime<Utc>>)> {
        let frame = self.tower.read_as(key.as_bytes(), Kind::List)?;
        match frame.value {
            Value::List(handle) => Ok((handle, frame.expire_at)),
            other => Err(other.mismatch(Kind::List).into()),
        }
    }

    pub(crate) fn store_meta(
        &self,
        key: &str,
        handle: ListHandle,
        expire_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        self.tower.write(
            key.as_bytes(),
            &Frame::with_expiry(Value::List(handle), expire_at),
        )
    }

    pub(crate) fn read_item(&self, key: &str, index: i64) -> Result<Option<Value>> {
        Ok(self
            .tower
            .read(&Lists::item_key(key, index))?
            .map(|frame| frame.value))
    }

    fn write_item(&self, key: &str, index: i64, value: Value) -> Result<()> {
        self.tower
            .write(&Lists::item_key(key, index), &Frame::new(value))
    }

    /// Creates an empty list.
    pub fn create(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        self.tower.create_locked(key, Value::List(ListHandle::empty()))
    }

    pub fn push_left(&self, key: &str, value: Value) -> Result<i64> {
        let _guard = self.tower.lock(key);
        self.push_locked(key, value, End::Left)
    }

    pub fn push_right(&self, key: &str, value: Value) -> Result<i64> {
        let _guard = self.tower.lock(key);
        self.push_locked(key, value, End::Right)
    }

    /// Appends on the right, creating the list first if the key is absent.
    pub(crate) fn push_right_creating(&self, key: &str, value: Value) -> Result<i64> {
        let _guard = self.tower.lock(key);
        if self.tower.read(key.as_bytes())?.is_none() {
            self.store_meta(key, ListHandle::empty(), None)?;
        }
        self.push_locked(key, value, End::Right)
    }

    fn push_locked(&self, key: &str, value: Value, end: End) -> Result<i64> {
        let (mut handle, expire_at) = self.meta(key)?;
        let len = handle.len.checked_add(1).ok_or(Error::Overflow)?;
        let index = match end {
            End::Left => handle.head.checked_sub(1).ok_or(Error::Overflow)?,
            End::Right => handle.tail.checked_add(1).ok_or(Error::Overflow)?,
        };

        self.write_item(key, index, value)?;

        // The canonical empty list {0, -1} becomes {-1, -1} or {0, 0}.
        match end {
            End::Left => handle.head = index,
            End::Right => handle.tail = index,
        }
        handle.len = len;
        self.store_meta(key, handle, expire_at)?;

        trace!(self.tower.slog, "Pushed"; "key" => key, "index" => index, "len" => len);
        Ok(len)
    }

    pub fn pop_left(&self, key: &str) -> Result<Value> {
        let _guard = self.tower.lock(key);
        self.pop_locked(key, End::Left)
    }

    pub fn pop_right(&self, key: &str) -> Result<Value> {
        let _guard = self.tower.lock(key);
        self.pop_locked(key, End::Right)
    }

    fn pop_locked(&self, key: &str, end: End) -> Result<Value> {
        let (mut handle, expire_at) = self.meta(key)?;
        if handle.is_empty() {
            return Err(Error::Empty);
        }

        let index = match end {
            End::Left => handle.head,
            End::Right => handle.tail,
        };
        let value = self.read_item(key, index)?.ok_or_else(|| {
            Error::Corrupt(format!("list {:?} is missing item {}", key, index))
        })?;
        self.tower.remove(&Lists::item_key(key, index))?;

        if handle.len == 1 {
            handle = ListHandle::empty();
        } else {
            match end {
                End::Left => handle.head += 1,
                End::Right => handle.tail -= 1,
            }
            handle.len -= 1;
        }
        self.store_meta(key, handle, expire_at)?;
        Ok(value)
    }

    /// Reads one item. Negative indices count back from the tail.
    pub fn index(&self, key: &str, index: i64) -> Result<Value> {
        let _guard = self.tower.rlock(key);
        let (handle, _) = self.meta(key)?;
        let offset = normalize(index, handle.len);
        if offset < 0 || offset >= handle.len {
            return Err(Error::OutOfRange);
        }
        let index = handle.head + offset;
        self.read_item(key, index)?
            .ok_or_else(|| Error::Corrupt(format!("list {:?} is missing item {}", key, index)))
    }

    /// Reads the items from `start` to `end` inclusive. Bounds may be negative and
    /// are clamped to the list; an inverted span yields no items.
    pub fn range(&self, key: &str, start: i64, end: i64) -> Result<Vec<Value>> {
        let _guard = self.tower.rlock(key);
        let (handle, _) = self.meta(key)?;
        let (start, end) = match span(start, end, handle.len) {
            Some(span) => span,
            None => return Ok(Vec::new()),
        };

        let mut out = Vec::with_capacity((end - start + 1) as usize);
        for offset in start..=end {
            // Skip items removed out from under a stale handle.
            if let Some(value) = self.read_item(key, handle.head + offset)? {
                out.push(value);
            }
        }
        Ok(out)
    }

    /// Overwrites the item at `index` without changing the length.
    pub fn set(&self, key: &str, index: i64, value: Value) -> Result<()> {
        let _guard = self.tower.lock(key);
        let (handle, _) = self.meta(key)?;
        let offset = normalize(index, handle.len);
        if offset < 0 || offset >= handle.len {
            return Err(Error::OutOfRange);
        }
        self.write_item(key, handle.head + offset, value)
    }

    /// Keeps only the items from `start` to `end` inclusive.
    pub fn trim(&self, key: &str, start: i64, end: i64) -> Result<()> {
        let _guard = self.tower.lock(key);
        let (handle, expire_at) = self.meta(key)?;
        if handle.is_empty() {
            return Ok(());
        }

        let next = match span(start, end, handle.len) {
            Some((start, end)) => {
                let keep_head = handle.head + start;
                let keep_tail = handle.head + end;
                for index in handle.head..keep_head {
                    self.tower.remove(&Lists::item_key(key, index))?;
                }
                for index in (keep_tail + 1)..=handle.tail {
                    self.tower.remove(&Lists::item_key(key, index))?;
                }
                ListHandle {
                    head: keep_head,
                    tail: keep_tail,
                    len: end - start + 1,
                }
            }
            None => {
                for index in handle.head..=handle.tail {
                    self.tower.remove(&Lists::item_key(key, index))?;
                }
                ListHandle::empty()
            }
        };

        debug!(self.tower.slog, "Trimmed list";
               "key" => key, "from" => handle.len, "to" => next.len);
        self.store_meta(key, next, expire_at)
    }

    /// Removes the whole list in one step and returns its items in order. An
    /// absent list yields nothing.
    pub(crate) fn take_all(&self, key: &str) -> Result<Vec<Value>> {
        let _guard = self.tower.lock(key);
        let (handle, _) = match self.meta(key) {
            Err(Error::NotFound) => return Ok(Vec::new()),
            other => other?,
        };

        let mut items = Vec::with_capacity(handle.len.max(0) as usize);
        if !handle.is_empty() {
            for index in handle.head..=handle.tail {
                if let Some(value) = self.read_item(key, index)? {
                    items.push(value);
                }
                self.tower.remove(&Lists::item_key(key, index))?;
            }
        }
        self.tower.remove(key.as_bytes())?;
        Ok(items)
    }

    pub fn len(&self, key: &str) -> Result<i64> {
        let _guard = self.tower.rlock(key);
        Ok(self.meta(key)?.0.len)
    }

    /// Removes every item, then the list itself.
    pub fn delete(&self, key: &str) -> Result<()> {
        let _guard = self.tower.lock(key);
        let frame = self.tower.read_as(key.as_bytes(), Kind::List)?;
        self.tower.purge_locked(key, &frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_normalizes_and_clamps() {
        assert_eq!(span(0, -1, 3), Some((0, 2)));
        assert_eq!(span(-2, -1, 3), Some((1, 2)));
        assert_eq!(span(-100, 100, 3), Some((0, 2)));
        assert_eq!(span(2, 1, 3), None);
        assert_eq!(span(0, -1, 0), None);
        assert_eq!(span(5, 10, 3), None);
    }

    #[test]
    fn normalize_counts_from_the_tail() {
        assert_eq!(normalize(-1, 4), 3);
        assert_eq!(normalize(2, 4), 2);
        assert_eq!(normalize(i64::MIN, 4), i64::MIN + 4);
    }
}

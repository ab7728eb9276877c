//! Reconciling structure metadata with the items actually stored.
//!
//! Metadata and items are written separately, so a crash between the two
//! writes can leave a count off by one or a list with a hole. `repair` rebuilds
//! the metadata from the items under the structure's prefix.

use crate::keys::{self, Marker};
use crate::list::Lists;
use crate::{Error, Result, Tower};
use chrono::{DateTime, Utc};
use frame::{BloomHandle, CountHandle, Frame, Kind, ListHandle, Value};

/// Item counts before and after a repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepairReport {
    pub kind: Kind,
    pub before: u64,
    pub after: u64,
    /// Whether anything was rewritten.
    pub changed: bool,
}

impl Tower {
    /// Rebuilds the metadata of the structure at `key` from its items. Scalars
    /// are always consistent and come back unchanged.
    pub fn repair(&self, key: &str) -> Result<RepairReport> {
        let _guard = self.lock(key);
        let frame = self.read(key.as_bytes())?.ok_or(Error::NotFound)?;
        let kind = frame.kind();
        let expire_at = frame.expire_at;

        let report = match frame.value {
            Value::List(handle) => self.repair_list(key, handle, expire_at)?,
            Value::Map(handle) => self.recount(key, Kind::Map, Marker::Map, handle, expire_at)?,
            Value::Set(handle) => self.recount(key, Kind::Set, Marker::Set, handle, expire_at)?,
            Value::TimeSeries(handle) => {
                self.recount(key, Kind::TimeSeries, Marker::Series, handle, expire_at)?
            }
            Value::Bloom(handle) => {
                let before = handle.count;
                let after = self.count_items(key, Marker::Bloom)?;
                if before != after {
                    let handle = BloomHandle {
                        count: after,
                        ..handle
                    };
                    self.write(
                        key.as_bytes(),
                        &Frame::with_expiry(Value::Bloom(handle), expire_at),
                    )?;
                }
                RepairReport {
                    kind,
                    before,
                    after,
                    changed: before != after,
                }
            }
            _ => RepairReport {
                kind,
                before: 0,
                after: 0,
                changed: false,
            },
        };

        if report.changed {
            warn!(self.slog, "Repaired {}", kind; "key" => key,
                  "before" => report.before, "after" => report.after);
        } else {
            debug!(self.slog, "Nothing to repair"; "key" => key);
        }
        Ok(report)
    }

    fn recount(
        &self,
        key: &str,
        kind: Kind,
        marker: Marker,
        handle: CountHandle,
        expire_at: Option<DateTime<Utc>>,
    ) -> Result<RepairReport> {
        let before = handle.count;
        let after = self.count_items(key, marker)?;
        if before != after {
            self.store_count_meta(key, kind, CountHandle { count: after }, expire_at)?;
        }
        Ok(RepairReport {
            kind,
            before,
            after,
            changed: before != after,
        })
    }

    /// Renumbers the surviving items contiguously, starting at the lowest
    /// index present.
    fn repair_list(
        &self,
        key: &str,
        handle: ListHandle,
        expire_at: Option<DateTime<Utc>>,
    ) -> Result<RepairReport> {
        let prefix = keys::prefix(key, Marker::List);
        let mut present = Vec::new();
        for (item, _) in self.engine.scan_prefix(&prefix)? {
            present.push(keys::decode_index(keys::selector(&item, &prefix)?)?);
        }

        let mut changed = false;
        let next = match present.first() {
            None => ListHandle::empty(),
            Some(&start) => {
                // Ascending order means every target slot is either free or
                // already vacated by an earlier move.
                for (offset, &index) in present.iter().enumerate() {
                    let target = start + offset as i64;
                    if target != index {
                        let bytes = self.engine.get(&Lists::item_key(key, index))?;
                        if let Some(bytes) = bytes {
                            self.engine.set(&Lists::item_key(key, target), &bytes)?;
                            self.remove(&Lists::item_key(key, index))?;
                            changed = true;
                        }
                    }
                }
                let len = present.len() as i64;
                ListHandle {
                    head: start,
                    tail: start + len - 1,
                    len,
                }
            }
        };

        if next != handle {
            self.write(
                key.as_bytes(),
                &Frame::with_expiry(Value::List(next), expire_at),
            )?;
            changed = true;
        }
        Ok(RepairReport {
            kind: Kind::List,
            before: handle.len.max(0) as u64,
            after: next.len as u64,
            changed,
        })
    }
}

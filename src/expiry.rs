//! Key expiry.
//!
//! An expiry is stored in the target's own frame and the key's name is also
//! appended to a bucket list, one list per `precision`-wide slice of time. A
//! sweep walks the due buckets and deletes each candidate whose stored expiry
//! has really passed. Entries left behind by `remove_ttl` or by a later
//! `set_ttl` are recognized at sweep time and dropped.

use crate::{Error, Result, Tower};
use chrono::{DateTime, Duration, Utc};
use engine::Visit;
use frame::{Frame, Value};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Bucket lists live under this prefix. Each bucket key is the prefix followed
/// by exactly `BUCKET_DIGITS` decimal digits.
pub const EXPIRY_PREFIX: &str = "__expiry__:";

const BUCKET_DIGITS: usize = 20;

const SIGN_BIT: u64 = 1 << 63;

/// What one sweep did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Buckets visited.
    pub buckets: u64,
    /// Keys deleted because their expiry had passed.
    pub deleted: u64,
    /// Stale entries: the key is gone, has no expiry, or was re-scheduled.
    pub skipped: u64,
    /// Keys not yet due, put back into their bucket.
    pub pending: u64,
}

impl SweepReport {
    fn absorb(&mut self, other: SweepReport) {
        self.buckets += other.buckets;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
        self.pending += other.pending;
    }
}

/// Orders bucket times as unsigned numbers of fixed width.
fn bucket_ordinal(secs: i64) -> u64 {
    (secs as u64) ^ SIGN_BIT
}

fn bucket_key(secs: i64) -> String {
    format!(
        "{}{:0width$}",
        EXPIRY_PREFIX,
        bucket_ordinal(secs),
        width = BUCKET_DIGITS
    )
}

fn parse_bucket(key: &[u8]) -> Option<u64> {
    let digits = key.get(EXPIRY_PREFIX.len()..)?;
    if digits.len() != BUCKET_DIGITS {
        return None;
    }
    std::str::from_utf8(digits).ok()?.parse().ok()
}

impl Tower {
    fn precision_secs(&self) -> i64 {
        self.precision.num_seconds().max(1)
    }

    /// Start of the bucket holding `at`.
    fn floor_bucket(&self, at: DateTime<Utc>) -> i64 {
        let p = self.precision_secs();
        at.timestamp().div_euclid(p) * p
    }

    /// The first bucket boundary at or after `at`.
    fn ceil_bucket(&self, at: DateTime<Utc>) -> i64 {
        let floor = self.floor_bucket(at);
        if floor == at.timestamp() && at.timestamp_subsec_nanos() == 0 {
            floor
        } else {
            floor + self.precision_secs()
        }
    }

    /// Makes `key` expire at `expire_at`, replacing any earlier expiry.
    /// Returns `false` and changes nothing unless `expire_at` is in the future.
    pub fn set_ttl(&self, key: &str, expire_at: DateTime<Utc>) -> Result<bool> {
        if expire_at <= self.now() {
            return Ok(false);
        }
        {
            let _guard = self.lock(key);
            let frame = self.read(key.as_bytes())?.ok_or(Error::NotFound)?;
            self.write(
                key.as_bytes(),
                &Frame::with_expiry(frame.value, Some(expire_at)),
            )?;
        }

        let bucket = bucket_key(self.ceil_bucket(expire_at));
        self.lists()
            .push_right_creating(&bucket, Value::String(key.to_owned()))?;
        trace!(self.slog, "Scheduled expiry"; "key" => key, "bucket" => &bucket);
        Ok(true)
    }

    pub fn expire_in(&self, key: &str, ttl: Duration) -> Result<bool> {
        let expire_at = self
            .now()
            .checked_add_signed(ttl)
            .ok_or(Error::Overflow)?;
        self.set_ttl(key, expire_at)
    }

    /// Clears the expiry of `key`. The bucket entry stays behind and is ignored
    /// by the sweep.
    pub fn remove_ttl(&self, key: &str) -> Result<()> {
        let _guard = self.lock(key);
        let frame = self.read(key.as_bytes())?.ok_or(Error::NotFound)?;
        if frame.expire_at.is_some() {
            self.write(key.as_bytes(), &Frame::new(frame.value))?;
        }
        Ok(())
    }

    pub fn expire_at(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let _guard = self.rlock(key);
        Ok(self.read(key.as_bytes())?.ok_or(Error::NotFound)?.expire_at)
    }

    /// Sweeps with the tower's clock.
    pub fn sweep_now(&self) -> Result<SweepReport> {
        self.sweep(self.now())
    }

    /// Deletes every key whose expiry is at or before `now`, visiting every
    /// bucket up to the one that `now` falls into.
    pub fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let limit = bucket_ordinal(self.ceil_bucket(now));
        let mut due = Vec::new();
        self.engine
            .range_prefix(EXPIRY_PREFIX.as_bytes(), &mut |key, _| {
                match parse_bucket(key) {
                    Some(ordinal) if ordinal > limit => Visit::Abort,
                    Some(_) => {
                        due.push(String::from_utf8_lossy(key).into_owned());
                        Visit::Continue
                    }
                    // Items of a bucket list.
                    None => Visit::Continue,
                }
            })?;

        let mut report = SweepReport::default();
        for bucket in due {
            match self.sweep_bucket(&bucket, now) {
                Ok(done) => report.absorb(done),
                Err(err) => {
                    warn!(self.slog, "Skipping unreadable bucket";
                          "bucket" => &bucket, "error" => %err);
                }
            }
        }
        if report.deleted > 0 || report.skipped > 0 {
            info!(self.slog, "Swept expired keys";
                  "buckets" => report.buckets, "deleted" => report.deleted,
                  "skipped" => report.skipped, "pending" => report.pending);
        }
        Ok(report)
    }

    /// Drains `bucket` under its lock, then settles each candidate under the
    /// candidate's own lock. Entries appended after the drain land in a fresh
    /// list and wait for the next sweep.
    fn sweep_bucket(&self, bucket: &str, now: DateTime<Utc>) -> Result<SweepReport> {
        let mut report = SweepReport {
            buckets: 1,
            ..SweepReport::default()
        };
        let candidates = self.lists().take_all(bucket)?;

        for candidate in candidates {
            let name = match candidate {
                Value::String(name) => name,
                other => {
                    warn!(self.slog, "Dropping non-key bucket entry";
                          "bucket" => bucket, "kind" => %other.kind());
                    report.skipped += 1;
                    continue;
                }
            };
            match self.expire_candidate(&name, bucket, now) {
                Ok(Outcome::Deleted) => report.deleted += 1,
                Ok(Outcome::Stale) => report.skipped += 1,
                Ok(Outcome::NotDue) => {
                    let requeued = self
                        .lists()
                        .push_right_creating(bucket, Value::String(name.clone()));
                    if let Err(err) = requeued {
                        error!(self.slog, "Lost expiry entry";
                               "key" => name.as_str(), "bucket" => bucket, "error" => %err);
                    }
                    report.pending += 1;
                }
                Err(err) => {
                    warn!(self.slog, "Skipping expiry candidate";
                          "key" => name.as_str(), "error" => %err);
                    report.skipped += 1;
                }
            }
        }
        Ok(report)
    }

    /// Deletes `name` if its own stored expiry has passed. Takes only the
    /// candidate's lock.
    fn expire_candidate(&self, name: &str, bucket: &str, now: DateTime<Utc>) -> Result<Outcome> {
        let _guard = self.lock(name);
        let frame = match self.read(name.as_bytes())? {
            Some(frame) => frame,
            None => return Ok(Outcome::Stale),
        };
        match frame.expire_at {
            None => Ok(Outcome::Stale),
            Some(at) if at <= now => {
                debug!(self.slog, "Expiring {}", frame.kind(); "key" => name);
                self.purge_locked(name, &frame)?;
                Ok(Outcome::Deleted)
            }
            Some(at) if bucket_key(self.ceil_bucket(at)) == bucket => Ok(Outcome::NotDue),
            Some(_) => Ok(Outcome::Stale),
        }
    }
}

enum Outcome {
    Deleted,
    Stale,
    NotDue,
}

/// Sweeps a tower periodically on a background thread until stopped or
/// dropped.
pub struct Sweeper {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    pub fn spawn(tower: Arc<Tower>, interval: std::time::Duration) -> Result<Sweeper> {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        let handle = thread::Builder::new()
            .name("tower-sweeper".to_owned())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    thread::park_timeout(interval);
                    if flag.load(Ordering::Acquire) {
                        break;
                    }
                    if let Err(err) = tower.sweep_now() {
                        error!(tower.slog, "Sweep failed"; "error" => %err);
                    }
                }
            })?;
        Ok(Sweeper {
            stop,
            handle: Some(handle),
        })
    }

    /// Stops the thread and waits for the sweep in progress, if any.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.thread().unpark();
            let _ = handle.join();
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

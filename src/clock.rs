//! Sources of "now" for expiry decisions.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Reads the system clock on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

fn to_nanos(at: DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    nanos: AtomicI64,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            nanos: AtomicI64::new(to_nanos(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        self.nanos.store(to_nanos(at), Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let by = by.num_nanoseconds().unwrap_or(i64::MAX);
        self.nanos.fetch_add(by, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// A snapshot of the system clock refreshed by one background thread, so hot
/// paths read an atomic instead of making a system call.
///
/// The refresh thread holds only a weak reference and exits after the clock is
/// dropped.
#[derive(Debug, Clone)]
pub struct CachedClock {
    nanos: Arc<AtomicI64>,
}

impl CachedClock {
    pub fn start(refresh: std::time::Duration) -> std::io::Result<Self> {
        let nanos = Arc::new(AtomicI64::new(to_nanos(Utc::now())));
        let weak: Weak<AtomicI64> = Arc::downgrade(&nanos);
        thread::Builder::new()
            .name("tower-clock".to_owned())
            .spawn(move || loop {
                thread::sleep(refresh);
                match weak.upgrade() {
                    Some(nanos) => nanos.store(to_nanos(Utc::now()), Ordering::Release),
                    None => break,
                }
            })?;
        Ok(CachedClock { nanos })
    }
}

impl Clock for CachedClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_nanos(self.nanos.load(Ordering::Acquire))
    }
}

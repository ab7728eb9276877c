use dashmap::DashMap;
use metrohash::MetroHash64;
use parking_lot::{RawRwLock, RwLock};
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::Arc;

pub type WriteGuard = lock_api::ArcRwLockWriteGuard<RawRwLock, ()>;

pub type ReadGuard = lock_api::ArcRwLockReadGuard<RawRwLock, ()>;

const STRIPE_SEED: u64 = 0x385f_829f_0031_3111;

/// How logical keys are assigned locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LockMode {
    /// One lock per distinct key, created on first use and kept for the life of
    /// the process. Memory grows with the number of keys ever touched.
    PerKey,

    /// A fixed array of locks; keys hashing to the same stripe serialize against
    /// each other.
    Striped { stripes: usize },
}

impl Default for LockMode {
    fn default() -> Self {
        LockMode::PerKey
    }
}

enum Table {
    PerKey(DashMap<String, Arc<RwLock<()>>>),
    Striped(Vec<Arc<RwLock<()>>>),
}

/// Hands out the reader/writer lock guarding each logical key.
///
/// Guards own their lock, so they can be held across calls and are released on
/// drop, including on early returns.
pub struct LockTable {
    table: Table,
}

impl LockTable {
    pub fn new(mode: LockMode) -> Self {
        let table = match mode {
            LockMode::PerKey => Table::PerKey(DashMap::new()),
            LockMode::Striped { stripes } => Table::Striped(
                (0..stripes.max(1))
                    .map(|_| Arc::new(RwLock::new(())))
                    .collect(),
            ),
        };
        LockTable { table }
    }

    /// Exclusive lock on `key`.
    pub fn lock(&self, key: &str) -> WriteGuard {
        self.handle(key).write_arc()
    }

    /// Shared lock on `key`.
    pub fn rlock(&self, key: &str) -> ReadGuard {
        self.handle(key).read_arc()
    }

    /// Number of locks currently allocated.
    pub fn len(&self) -> usize {
        match &self.table {
            Table::PerKey(locks) => locks.len(),
            Table::Striped(stripes) => stripes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn handle(&self, key: &str) -> Arc<RwLock<()>> {
        match &self.table {
            Table::PerKey(locks) => {
                if let Some(lock) = locks.get(key) {
                    return lock.value().clone();
                }
                // Racing first touches converge on whichever insert wins.
                locks
                    .entry(key.to_owned())
                    .or_insert_with(|| Arc::new(RwLock::new(())))
                    .value()
                    .clone()
            }
            Table::Striped(stripes) => {
                let mut hasher = MetroHash64::with_seed(STRIPE_SEED);
                hasher.write(key.as_bytes());
                let stripe = (hasher.finish() % stripes.len() as u64) as usize;
                stripes[stripe].clone()
            }
        }
    }
}

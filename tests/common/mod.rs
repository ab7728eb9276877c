#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use slog::Logger;
use std::sync::Arc;
use tower::{LockMode, ManualClock, MemoryEngine, Tower, TowerConfig};

/// 1970-01-12T13:46:40Z, not on a minute boundary.
pub const START_SECS: i64 = 1_000_000;

pub struct Fixture {
    pub tower: Tower,
    pub clock: Arc<ManualClock>,
    pub engine: MemoryEngine,
}

pub fn start() -> DateTime<Utc> {
    Utc.timestamp_opt(START_SECS, 0).unwrap()
}

pub fn fixture() -> Fixture {
    fixture_with(TowerConfig::memory())
}

pub fn striped() -> Fixture {
    let mut config = TowerConfig::memory();
    config.locks = LockMode::Striped { stripes: 4 };
    fixture_with(config)
}

pub fn fixture_with(config: TowerConfig) -> Fixture {
    let logger = Logger::root(slog::Discard, slog::o!());
    let clock = Arc::new(ManualClock::new(start()));
    let engine = MemoryEngine::new();
    let tower = Tower::with_engine(Arc::new(engine.clone()), clock.clone(), &config, &logger);
    Fixture {
        tower,
        clock,
        engine,
    }
}

/// Physical key of list item `index`.
pub fn list_item(key: &str, index: i64) -> Vec<u8> {
    let mut out = format!("{}:L:", key).into_bytes();
    out.extend_from_slice(&((index as u64) ^ (1 << 63)).to_be_bytes());
    out
}

//! An embedded store of typed values and data structures (lists, maps, sets,
//! membership filters and time series) layered over one ordered key/value
//! engine, with per-key locking and bucketed key expiry.
#[macro_use]
extern crate slog;

mod bloom;
mod clock;
mod config;
mod error;
mod expiry;
mod keys;
mod list;
mod lock;
mod map;
mod repair;
mod secure;
mod series;
mod set;
mod store;

pub use crate::bloom::Blooms;
pub use crate::clock::{CachedClock, Clock, ManualClock, SystemClock};
pub use crate::config::{ExpiryConfig, TowerConfig};
pub use crate::error::{Error, Result};
pub use crate::expiry::{SweepReport, Sweeper};
pub use crate::list::Lists;
pub use crate::lock::LockMode;
pub use crate::map::Maps;
pub use crate::repair::RepairReport;
pub use crate::secure::{Cipher, HashParams, PasswordHasher, Providers};
pub use crate::series::Series;
pub use crate::set::Sets;
pub use crate::store::Tower;

pub use engine::{Engine, EngineConfig, EngineKind, MemoryEngine, SledEngine};
pub use frame::{Decimal, Frame, Kind, Value};

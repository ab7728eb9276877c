//! The ordered byte-keyed storage engines tower is layered on.
#[macro_use]
extern crate slog;
extern crate slog_async;
extern crate slog_term;

use slog::{Drain, Logger};
use std::sync::Arc;

mod config;
mod error;
mod memory;
mod sled_engine;

pub use crate::config::{EngineConfig, EngineKind};
pub use crate::error::{Error, Result};
pub use crate::memory::MemoryEngine;
pub use crate::sled_engine::SledEngine;

pub fn get_default_logger() -> Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::CompactFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();
    slog::Logger::root(drain, o!("version" => env!("CARGO_PKG_VERSION")))
}

/// Whether a prefix scan should keep going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
    Continue,
    Abort,
}

/// An ordered key/value store with point reads and writes and prefix scans.
///
/// Keys are compared bytewise. Each `set` and `delete` is applied on its own;
/// there are no multi-key transactions.
pub trait Engine: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn set(&self, key: &[u8], frame: &[u8]) -> Result<()>;

    /// Removing a key that does not exist is not an error.
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Calls `visit` on every pair whose key starts with `prefix`, in key order,
    /// until it returns `Visit::Abort`.
    fn range_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Visit,
    ) -> Result<()>;

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Collects every pair under `prefix`.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut out = Vec::new();
        self.range_prefix(prefix, &mut |key, frame| {
            out.push((key.to_vec(), frame.to_vec()));
            Visit::Continue
        })?;
        Ok(out)
    }
}

/// Opens the engine described by `config`.
pub fn open(config: &EngineConfig, logger: &Logger) -> Result<Arc<dyn Engine>> {
    match config.kind {
        EngineKind::Sled => Ok(Arc::new(SledEngine::open_with_logger(config, logger)?)),
        EngineKind::Memory => {
            info!(logger, "Opening in-memory engine");
            Ok(Arc::new(MemoryEngine::new()))
        }
    }
}

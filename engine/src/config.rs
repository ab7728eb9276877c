use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineKind {
    Sled,
    Memory,
}

/// How to open the storage engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub kind: EngineKind,

    /// Directory holding the database files. Ignored by the memory engine.
    pub path: PathBuf,

    /// Bytes of page cache kept in memory.
    pub cache_capacity: u64,

    /// Size of each write buffer, in bytes. Must be a power of two.
    pub write_buffer: usize,

    /// Background flush period; `None` disables background flushing.
    pub flush_every_ms: Option<u64>,

    /// Flush after every single write so it is durable before the call returns.
    pub sync_writes: bool,

    /// Remove the database files when the engine is dropped.
    pub temporary: bool,
}

pub const DEFAULT_CACHE_CAPACITY: u64 = 64 * 1024 * 1024;

pub const DEFAULT_WRITE_BUFFER: usize = 8 * 1024 * 1024;

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            kind: EngineKind::Sled,
            path: PathBuf::from("tower.db"),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            write_buffer: DEFAULT_WRITE_BUFFER,
            flush_every_ms: Some(500),
            sync_writes: true,
            temporary: false,
        }
    }
}

impl EngineConfig {
    pub fn memory() -> Self {
        EngineConfig {
            kind: EngineKind::Memory,
            ..EngineConfig::default()
        }
    }

    pub fn sled<P: Into<PathBuf>>(path: P) -> Self {
        EngineConfig {
            path: path.into(),
            ..EngineConfig::default()
        }
    }
}

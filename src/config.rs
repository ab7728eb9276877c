use crate::lock::LockMode;
use crate::Result;
use engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Everything needed to open a `Tower`. Every field has a default, so a config
/// file only needs to mention what it changes, e.g.
///
/// ```text
/// (
///     storage: (path: "/var/lib/tower", cache_capacity: 1073741824),
///     locks: Striped(stripes: 1024),
///     expiry: (precision_secs: 30),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerConfig {
    pub storage: EngineConfig,
    pub locks: LockMode,
    pub expiry: ExpiryConfig,

    /// How often the cached clock re-reads the system clock. Zero reads the
    /// system clock directly on every call.
    pub clock_refresh_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpiryConfig {
    /// Width of an expiry bucket.
    pub precision_secs: u64,

    /// Period of the background sweeper.
    pub sweep_interval_ms: u64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        ExpiryConfig {
            precision_secs: 60,
            sweep_interval_ms: 1000,
        }
    }
}

impl Default for TowerConfig {
    fn default() -> Self {
        TowerConfig {
            storage: EngineConfig::default(),
            locks: LockMode::default(),
            expiry: ExpiryConfig::default(),
            clock_refresh_ms: 100,
        }
    }
}

impl TowerConfig {
    /// Configuration for a throwaway in-memory store.
    pub fn memory() -> Self {
        TowerConfig {
            storage: EngineConfig::memory(),
            ..TowerConfig::default()
        }
    }

    pub fn from_ron(text: &str) -> Result<Self> {
        let config: TowerConfig = ron::de::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        TowerConfig::from_ron(&text)
    }

    fn validate(&self) -> Result<()> {
        if self.expiry.precision_secs == 0 {
            return Err(crate::Error::Config(
                "expiry.precision_secs must be positive".to_owned(),
            ));
        }
        if let LockMode::Striped { stripes: 0 } = self.locks {
            return Err(crate::Error::Config(
                "locks.stripes must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

use crate::config::EngineConfig;
use crate::{Engine, Error, Result, Visit};
use sled::Db;
use slog::Logger;

/// A durable engine backed by a sled database.
pub struct SledEngine {
    pub db: Db,
    sync_writes: bool,
    slog: Logger,
}

impl SledEngine {
    pub fn open(config: &EngineConfig) -> Result<SledEngine> {
        let logger = crate::get_default_logger();
        SledEngine::open_with_logger(config, &logger)
    }

    pub fn open_with_logger(config: &EngineConfig, logger: &Logger) -> Result<SledEngine> {
        let slog = logger.new(o!("path" => format!("{:?}", &config.path)));

        if !config.write_buffer.is_power_of_two() {
            return Err(Error::Config(format!(
                "write_buffer {} is not a power of two",
                config.write_buffer
            )));
        }

        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .segment_size(config.write_buffer)
            .flush_every_ms(config.flush_every_ms)
            .temporary(config.temporary)
            .open()?;

        info!(slog, "Opened sled engine"; "recovered" => db.was_recovered());

        Ok(SledEngine {
            db,
            sync_writes: config.sync_writes,
            slog,
        })
    }

    fn sync(&self) -> Result<()> {
        if self.sync_writes {
            self.db.flush()?;
        }
        Ok(())
    }
}

impl Drop for SledEngine {
    fn drop(&mut self) {
        if let Err(e) = self.db.flush() {
            error!(self.slog, "Error flushing to disk: {:?}", e);
        }
    }
}

impl Engine for SledEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.db.get(key)?.map(|frame| frame.to_vec()))
    }

    fn set(&self, key: &[u8], frame: &[u8]) -> Result<()> {
        self.db.insert(key, frame)?;
        self.sync()
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.db.remove(key)?;
        self.sync()
    }

    fn range_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Visit,
    ) -> Result<()> {
        for item in self.db.scan_prefix(prefix) {
            let (key, frame) = item?;
            if visit(&key, &frame) == Visit::Abort {
                break;
            }
        }
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

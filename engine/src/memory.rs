use crate::{Engine, Result, Visit};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

/// An ordered in-memory engine. Nothing survives the process.
///
/// Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    data: Arc<RwLock<BTreeMap<Vec<u8>, Vec<u8>>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        MemoryEngine::default()
    }

    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }
}

impl Engine for MemoryEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &[u8], frame: &[u8]) -> Result<()> {
        self.data.write().insert(key.to_vec(), frame.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn range_prefix(
        &self,
        prefix: &[u8],
        visit: &mut dyn FnMut(&[u8], &[u8]) -> Visit,
    ) -> Result<()> {
        // Snapshot first so the visitor may write back without deadlocking.
        let pairs: Vec<(Vec<u8>, Vec<u8>)> = {
            let data = self.data.read();
            data.range(prefix.to_vec()..)
                .take_while(|(key, _)| key.starts_with(prefix))
                .map(|(key, frame)| (key.clone(), frame.clone()))
                .collect()
        };
        for (key, frame) in pairs {
            if visit(&key, &frame) == Visit::Abort {
                break;
            }
        }
        Ok(())
    }
}

use std::sync::{Arc, PoisonError, RwLock};

use crate::{Error, Forest, load_forest};

/// A shared slot holding the forest that inference callers should use.
///
/// Forests are never modified in place. Reloading builds a complete new
/// forest and swaps the reference; callers that already hold the previous
/// `Arc` keep scoring against it until they drop it.
#[derive(Debug)]
pub struct ForestHandle {
    current: RwLock<Arc<Forest>>,
}

impl ForestHandle {
    pub fn new(forest: Forest) -> Self {
        Self {
            current: RwLock::new(Arc::new(forest)),
        }
    }

    /// The forest to use for the next prediction.
    pub fn current(&self) -> Arc<Forest> {
        // The lock only ever guards a pointer swap, so a poisoned lock still
        // holds a complete forest.
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Install `forest` and hand back the one it replaced.
    pub fn replace(&self, forest: Forest) -> Arc<Forest> {
        let forest = Arc::new(forest);
        let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *guard, forest)
    }

    /// Decode `bytes` and install the result. On error the current forest
    /// stays in place.
    pub fn reload(&self, bytes: &[u8]) -> Result<Arc<Forest>, Error> {
        let forest = load_forest(bytes)?;
        log::debug!("replacing forest with {} trees", forest.num_trees());
        Ok(self.replace(forest))
    }
}

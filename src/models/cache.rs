//! Process-wide model cache.

use crate::core::errors::DermaError;
use crate::models::arch::LesionModel;
use crate::models::loader::load_model;
use candle_core::Device;
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Caches loaded models by checkpoint path.
///
/// Each path maps to a cell that is initialized at most once, so concurrent
/// requests for the same checkpoint share a single load; later requests reuse
/// the cached model without touching the filesystem again.
pub struct ModelCache {
    slots: Mutex<HashMap<PathBuf, Arc<OnceCell<Arc<LesionModel>>>>>,
    device: Device,
}

impl ModelCache {
    /// Creates an empty cache loading onto `device`.
    pub fn new(device: Device) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            device,
        }
    }

    /// The device models are loaded onto.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Returns the model for `path`, loading it on first use.
    ///
    /// A failed load leaves the slot empty, so a later call retries from
    /// disk. A successful load is permanent until [`invalidate`] or
    /// [`clear`].
    ///
    /// [`invalidate`]: ModelCache::invalidate
    /// [`clear`]: ModelCache::clear
    pub fn get_or_load(&self, path: &Path) -> Result<Arc<LesionModel>, DermaError> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots
                .entry(path.to_path_buf())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };
        let model = slot.get_or_try_init(|| {
            tracing::debug!(path = %path.display(), "cache miss, loading model");
            load_model(path, &self.device).map(Arc::new)
        })?;
        Ok(model.clone())
    }

    /// Drops the cached model for `path`, if any.
    pub fn invalidate(&self, path: &Path) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.remove(path);
    }

    /// Drops every cached model.
    pub fn clear(&self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_load_does_not_poison_the_slot() {
        let cache = ModelCache::new(Device::Cpu);
        let path = Path::new("/nonexistent/checkpoint.pt");
        assert!(cache.get_or_load(path).is_err());
        // The slot stays retryable rather than caching the failure.
        assert!(cache.get_or_load(path).is_err());
    }

    #[test]
    fn invalidate_unknown_path_is_a_no_op() {
        let cache = ModelCache::new(Device::Cpu);
        cache.invalidate(Path::new("/nonexistent/checkpoint.pt"));
        cache.clear();
    }
}

//! Shared, read-only cache of generated orientation sets.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use nmr_core::errors::NmrError;

use crate::scheme::{generate, OrientationSet};
use crate::volume::IntegrationVolume;

type CacheKey = (IntegrationVolume, u32);

/// Memoises orientation sets by `(volume, resolution)`.
///
/// Entries are immutable once inserted and handed out behind [`Arc`], so a
/// single cache may be shared by reference across concurrent runs.
#[derive(Debug, Default)]
pub struct OrientationCache {
    entries: RwLock<BTreeMap<CacheKey, Arc<OrientationSet>>>,
}

impl OrientationCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached set or generates and stores it.
    pub fn get_or_generate(
        &self,
        resolution: u32,
        volume: IntegrationVolume,
    ) -> Result<Arc<OrientationSet>, NmrError> {
        let key = (volume, resolution);
        if let Some(hit) = self.read_entry(&key)? {
            return Ok(hit);
        }

        let generated = Arc::new(generate(resolution, volume)?);
        log::debug!(
            "generated {} orientations for volume={} resolution={}",
            generated.len(),
            volume,
            resolution
        );

        let mut guard = self.entries.write().map_err(|_| poisoned())?;
        // Another caller may have raced us; keep whichever landed first.
        let entry = guard.entry(key).or_insert(generated);
        Ok(Arc::clone(entry))
    }

    /// Number of cached sets.
    pub fn len(&self) -> Result<usize, NmrError> {
        Ok(self.entries.read().map_err(|_| poisoned())?.len())
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> Result<bool, NmrError> {
        Ok(self.len()? == 0)
    }

    fn read_entry(&self, key: &CacheKey) -> Result<Option<Arc<OrientationSet>>, NmrError> {
        let guard = self.entries.read().map_err(|_| poisoned())?;
        Ok(guard.get(key).cloned())
    }
}

fn poisoned() -> NmrError {
    NmrError::configuration(
        "orientation-cache-poisoned",
        "orientation cache lock was poisoned by a panicking writer",
    )
    .with_hint("discard this cache and create a new one")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_lookups_share_one_allocation() {
        let cache = OrientationCache::new();
        let first = cache.get_or_generate(6, IntegrationVolume::Octant).unwrap();
        let second = cache.get_or_generate(6, IntegrationVolume::Octant).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len().unwrap(), 1);
    }

    #[test]
    fn distinct_volumes_are_cached_separately() {
        let cache = OrientationCache::new();
        cache.get_or_generate(3, IntegrationVolume::Octant).unwrap();
        cache.get_or_generate(3, IntegrationVolume::Sphere).unwrap();
        assert_eq!(cache.len().unwrap(), 2);
    }

    #[test]
    fn poisoned_cache_reports_an_error_everywhere() {
        let cache = OrientationCache::new();
        cache.get_or_generate(2, IntegrationVolume::Octant).unwrap();
        let _ = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = cache.entries.write().unwrap();
            panic!("writer died");
        }));

        let err = cache.get_or_generate(2, IntegrationVolume::Octant).unwrap_err();
        assert!(matches!(err, NmrError::Configuration(_)));
        assert_eq!(err.info().code, "orientation-cache-poisoned");
        assert!(cache.len().is_err());
        assert!(cache.is_empty().is_err());
    }
}

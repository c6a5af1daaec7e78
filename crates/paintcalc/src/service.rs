//! Async entry point: the engine behind the result cache

use crate::cache::{CacheStats, CacheStore, ResultCache};
use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::input::EstimateInput;
use crate::result::CalculationResult;
use std::sync::Arc;

/// Calculates estimates, sharing results between identical requests
#[derive(Debug, Clone)]
pub struct EstimateService {
    engine: Arc<Engine>,
    cache: Option<Arc<ResultCache>>,
}

impl EstimateService {
    /// Cache according to the engine's configuration
    pub fn new(engine: Engine) -> Self {
        let cache = engine
            .config()
            .cache
            .enabled
            .then(|| Arc::new(ResultCache::new(engine.config().cache.ttl())));
        Self {
            engine: Arc::new(engine),
            cache,
        }
    }

    /// Cache with an external store behind the in-memory entries
    pub fn with_store(engine: Engine, store: Arc<dyn CacheStore>) -> Self {
        let cache = engine
            .config()
            .cache
            .enabled
            .then(|| Arc::new(ResultCache::with_store(engine.config().cache.ttl(), store)));
        Self {
            engine: Arc::new(engine),
            cache,
        }
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn cache(&self) -> Option<&Arc<ResultCache>> {
        self.cache.as_ref()
    }

    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(|cache| cache.stats())
    }

    /// Calculate `input`, reusing a cached or in-flight result when there is one
    pub async fn calculate(&self, input: EstimateInput) -> Result<Arc<CalculationResult>> {
        let engine = Arc::clone(&self.engine);
        match &self.cache {
            Some(cache) => {
                let fingerprint = engine.fingerprint(&input);
                cache
                    .get_or_compute(fingerprint, move || engine.calculate(&input))
                    .await
            }
            None => tokio::task::spawn_blocking(move || engine.calculate(&input))
                .await
                .map_err(|e| EngineError::Join(e.to_string()))?
                .map(Arc::new),
        }
    }
}

//! Pipeline configuration: thread pool, tiling strategy, and target chunk size.
//!
//! Built through a small builder rather than mutated in place, so a `Config` is `Send + Sync`
//! and trivially shareable across one compress/decompress call - the same posture the teacher's
//! reader/writer option structs take, just without a thread pool field to thread through.

use std::sync::Arc;

use rayon::ThreadPool;

use crate::driver::default_pool;
use crate::error::Result;
use crate::tiling::TilingMethod;

/// Default number of 4-wide blocks a planner aims to pack into one chunk. Matches the worked
/// example in the distilled specification (a 2048x2048 F32 plane split at roughly 8K-block
/// chunks keeps per-chunk scratch buffers in the low tens of kilobytes).
pub const DEFAULT_TARGET_BLOCKS_PER_CHUNK: usize = 5208;

#[derive(Clone)]
pub struct Config {
    pool: Option<Arc<ThreadPool>>,
    tiling: TilingMethod,
    target_blocks_per_chunk: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self { pool: None, tiling: TilingMethod::BestCache, target_blocks_per_chunk: DEFAULT_TARGET_BLOCKS_PER_CHUNK }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supplies an externally-built pool; otherwise a default one is built lazily on first use.
    pub fn with_pool(mut self, pool: Arc<ThreadPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_tiling(mut self, method: TilingMethod, target_blocks_per_chunk: usize) -> Self {
        self.tiling = method;
        self.target_blocks_per_chunk = target_blocks_per_chunk.max(1);
        self
    }

    pub fn tiling_method(&self) -> TilingMethod {
        self.tiling
    }

    pub fn target_blocks_per_chunk(&self) -> usize {
        self.target_blocks_per_chunk
    }

    /// Returns the supplied pool, or builds a fresh default one. Callers that compress or
    /// decompress more than once should build a pool up front with [`Config::with_pool`] rather
    /// than rely on this, since a fresh pool is not cached across calls.
    pub fn pool(&self) -> Result<Arc<ThreadPool>> {
        match &self.pool {
            Some(pool) => Ok(pool.clone()),
            None => Ok(Arc::new(default_pool()?)),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn default_config_uses_best_cache_tiling() {
        let config = Config::new();
        assert_eq!(config.tiling_method(), TilingMethod::BestCache);
        assert_eq!(config.target_blocks_per_chunk(), DEFAULT_TARGET_BLOCKS_PER_CHUNK);
    }

    #[test]
    fn with_tiling_overrides_method_and_target() {
        let config = Config::new().with_tiling(TilingMethod::MakeEqual, 256);
        assert_eq!(config.tiling_method(), TilingMethod::MakeEqual);
        assert_eq!(config.target_blocks_per_chunk(), 256);
    }
}

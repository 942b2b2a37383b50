use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tracing::info;

use crate::cache::index::CacheIndex;
use crate::error::{AppError, Result};
use crate::types::{CacheStats, RawDraw};

// ---------------------------------------------------------------------------
// DrawCache — published-snapshot cell
// ---------------------------------------------------------------------------

/// Holds the currently published [`CacheIndex`].
///
/// Builds run off-lock; publishing is a single reference store under a write
/// lock held only for the swap. Readers clone the `Arc` and keep working
/// against their snapshot even while a refresh is in flight — they see either
/// the old or the new fully-built index, never a partial one.
///
/// There is no TTL and no implicit rebuild: an explicit `build`/`refresh`
/// call is the only way a new snapshot appears. Calling the read path before
/// the first build is a `CacheNotReady` error.
pub struct DrawCache {
    snapshot: RwLock<Option<Arc<CacheIndex>>>,
    version: AtomicU64,
}

impl DrawCache {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            snapshot: RwLock::new(None),
            version: AtomicU64::new(0),
        })
    }

    /// Full rebuild from the supplied raw records, then atomic publish.
    /// Invalid records are dropped inside the build (see [`CacheIndex::build`]).
    pub fn build(&self, raws: &[RawDraw]) -> CacheStats {
        let started = Instant::now();
        let version = self.version.fetch_add(1, Ordering::Relaxed) + 1;
        let index = Arc::new(CacheIndex::build(raws, version));
        let stats = index.stats();

        {
            let mut published = self.snapshot.write().unwrap_or_else(|e| e.into_inner());
            *published = Some(index);
        }

        info!(
            version,
            total_draws = stats.total_draws,
            dropped = stats.dropped_records,
            build_ms = started.elapsed().as_millis() as u64,
            "Cache build complete: v{version}, {} draws ({} dropped) in {}ms",
            stats.total_draws,
            stats.dropped_records,
            started.elapsed().as_millis(),
        );
        stats
    }

    /// Identical to [`build`](Self::build) — a refresh is always a full
    /// rebuild and an atomic swap, never an in-place mutation.
    pub fn refresh(&self, raws: &[RawDraw]) -> CacheStats {
        self.build(raws)
    }

    /// Current snapshot, or `CacheNotReady` before the first build.
    pub fn snapshot(&self) -> Result<Arc<CacheIndex>> {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or(AppError::CacheNotReady)
    }

    /// Read-only stats of the published snapshot; never triggers a rebuild.
    pub fn stats(&self) -> Result<CacheStats> {
        Ok(self.snapshot()?.stats())
    }

    pub fn is_ready(&self) -> bool {
        self.snapshot
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

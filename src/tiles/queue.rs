//! Load queue: reconciles a view request against the cache, dispatches the
//! missing tile fetches in parallel and barriers on their completion.
//!
//! Exactly one request is serviced at a time. A newer request supersedes the
//! prior one: its still-pending fetches are aborted through their task
//! handles and the prior barrier resolves to [`FieldError::Superseded`].
//! Tiles that finished loading before the supersede stay cached and are
//! reused by later requests.

use crate::tiles::cache::{TileCache, TileKey};
use crate::tiles::source::TileSource;
use crate::{FieldError, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::{AbortHandle, JoinHandle};

struct PendingFetch {
    key: TileKey,
    handle: AbortHandle,
}

#[derive(Default)]
struct PendingSet {
    /// Monotonic request id; cleanup only touches its own generation
    generation: u64,
    fetches: Vec<PendingFetch>,
}

impl PendingSet {
    /// Abort every in-flight fetch and drop its never-populated cache
    /// placeholder so a later request re-fetches. Aborting an already
    /// finished task is a no-op, which makes this idempotent.
    fn abort_all(&mut self, cache: &TileCache) {
        for fetch in self.fetches.drain(..) {
            fetch.handle.abort();
            cache.remove_if_pending(&fetch.key);
        }
    }
}

/// Dispatches tile fetches through the external [`TileSource`] and tracks
/// the one in-flight view request
pub struct LoadQueue {
    source: Arc<dyn TileSource>,
    cache: TileCache,
    tile_len: usize,
    pending: Mutex<PendingSet>,
}

impl LoadQueue {
    pub fn new(source: Arc<dyn TileSource>, cache: TileCache, tile_len: usize) -> Self {
        Self {
            source,
            cache,
            tile_len,
            pending: Mutex::new(PendingSet::default()),
        }
    }

    /// Ensure every key in `keys` has a loaded buffer in the cache.
    ///
    /// Cached tiles are marked current and skipped; the rest are fetched
    /// concurrently, one task per tile. Returns once all fetches for this
    /// request finished, or with the first load error (remaining fetches
    /// are aborted, no partial field is produced), or with
    /// [`FieldError::Superseded`] / [`FieldError::Timeout`].
    pub async fn load(&self, keys: Vec<TileKey>, timeout: Option<Duration>) -> Result<()> {
        self.cache.begin_view();

        let queue: Vec<TileKey> = keys
            .into_iter()
            .filter(|key| !self.cache.mark_current(key))
            .collect();

        let (generation, handles) = {
            let mut pending = match self.pending.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            // supersede whatever request was still in flight
            pending.abort_all(&self.cache);
            pending.generation += 1;

            let mut handles = Vec::with_capacity(queue.len());
            for key in queue {
                self.cache.insert_pending(key.clone());
                let task = tokio::spawn(fetch_tile(
                    Arc::clone(&self.source),
                    self.cache.clone(),
                    key.clone(),
                    self.tile_len,
                ));
                pending.fetches.push(PendingFetch {
                    key,
                    handle: task.abort_handle(),
                });
                handles.push(task);
            }
            (pending.generation, handles)
        };

        if handles.is_empty() {
            log::debug!("view request satisfied from cache");
            return Ok(());
        }
        log::debug!("fetching {} tiles", handles.len());

        let barrier = join_fetches(handles);
        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, barrier)
                .await
                .unwrap_or(Err(FieldError::Timeout)),
            None => barrier.await,
        };

        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if pending.generation == generation {
            if result.is_err() {
                pending.abort_all(&self.cache);
            } else {
                pending.fetches.clear();
            }
        }

        match &result {
            Err(FieldError::Superseded) => log::debug!("view request superseded"),
            Err(err) => log::warn!("view request failed: {err}"),
            Ok(()) => {}
        }
        result
    }

    /// Aborts any in-flight request; safe to call at any time
    pub fn cancel(&self) {
        let mut pending = match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        pending.abort_all(&self.cache);
    }

    #[cfg(test)]
    fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .map(|pending| pending.fetches.len())
            .unwrap_or(0)
    }
}

/// Completion barrier over one request's fetch tasks, in completion order
/// so the first error returns immediately; the cleanup pass then aborts
/// whatever is still running.
async fn join_fetches(handles: Vec<JoinHandle<Result<()>>>) -> Result<()> {
    let mut fetches: FuturesUnordered<JoinHandle<Result<()>>> = handles.into_iter().collect();
    while let Some(joined) = fetches.next().await {
        match joined {
            Ok(result) => result?,
            Err(err) if err.is_cancelled() => return Err(FieldError::Superseded),
            Err(err) => return Err(FieldError::Load(format!("tile task failed: {err}"))),
        }
    }
    Ok(())
}

/// One spawned fetch: load through the collaborator, validate the buffer
/// length, publish to the cache.
async fn fetch_tile(
    source: Arc<dyn TileSource>,
    cache: TileCache,
    key: TileKey,
    tile_len: usize,
) -> Result<()> {
    log::debug!("get tile: {key}");
    let data = source.load(&key).await?;
    if data.len() != tile_len {
        return Err(FieldError::TileSize {
            expected: tile_len,
            actual: data.len(),
            key,
        });
    }
    cache.complete(&key, data);
    Ok(())
}

use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Uniquely identifies one tile: variable layer, tile coordinate, zoom.
///
/// `variable` distinguishes independent scalar layers fetched for the same
/// geographic cell, e.g. the two components of a wind field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub variable: String,
    pub x: u32,
    pub y: u32,
    pub zoom: u8,
}

impl TileKey {
    pub fn new(variable: impl Into<String>, x: u32, y: u32, zoom: u8) -> Self {
        Self {
            variable: variable.into(),
            x,
            y,
            zoom,
        }
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.variable, self.x, self.y, self.zoom)
    }
}

/// Lifecycle state of one cached tile.
///
/// A tile is created pending when first enqueued and its buffer is written
/// exactly once on load completion; readers only ever observe `data` as
/// fully absent or fully populated.
#[derive(Debug, Clone)]
pub struct TileState {
    pub key: TileKey,
    pub data: Option<Arc<Vec<f32>>>,
    pub loading: bool,
    /// Whether the most recent view request still needs this tile. Stale
    /// tiles are kept until an external eviction policy prunes them.
    pub current: bool,
    pub loaded_at: Option<Instant>,
}

impl TileState {
    fn pending(key: TileKey) -> Self {
        Self {
            key,
            data: None,
            loading: true,
            current: true,
            loaded_at: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.data.is_some()
    }

    fn mark_loaded(&mut self, data: Arc<Vec<f32>>) {
        self.data = Some(data);
        self.loading = false;
        self.current = true;
        self.loaded_at = Some(Instant::now());
    }
}

/// Keyed store of loaded tile buffers, shared between the load queue and
/// the field assembler. Only the queue mutates it; the core never evicts,
/// it only flips `current` so an external policy can prune.
#[derive(Debug, Default)]
pub struct TileCache {
    inner: Arc<Mutex<FxHashMap<TileKey, TileState>>>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a loaded tile's buffer
    pub fn get(&self, key: &TileKey) -> Option<Arc<Vec<f32>>> {
        self.inner.lock().ok()?.get(key)?.data.clone()
    }

    /// Snapshot of a tile's state
    pub fn state(&self, key: &TileKey) -> Option<TileState> {
        self.inner.lock().ok()?.get(key).cloned()
    }

    /// Marks every cached tile as not needed by the current view. Called at
    /// the start of each request before the needed set is marked again.
    pub fn begin_view(&self) {
        if let Ok(mut tiles) = self.inner.lock() {
            for tile in tiles.values_mut() {
                tile.current = false;
            }
        }
    }

    /// If a loaded tile exists for `key`, protect it from pruning and
    /// return true; a re-fetch is then unnecessary.
    pub fn mark_current(&self, key: &TileKey) -> bool {
        if let Ok(mut tiles) = self.inner.lock() {
            if let Some(tile) = tiles.get_mut(key) {
                if tile.is_loaded() {
                    tile.current = true;
                    return true;
                }
            }
        }
        false
    }

    /// Record that a fetch for `key` is in flight
    pub(crate) fn insert_pending(&self, key: TileKey) {
        if let Ok(mut tiles) = self.inner.lock() {
            tiles.insert(key.clone(), TileState::pending(key));
        }
    }

    /// Populate a pending tile's buffer; written exactly once per tile
    pub(crate) fn complete(&self, key: &TileKey, data: Vec<f32>) {
        if let Ok(mut tiles) = self.inner.lock() {
            tiles
                .entry(key.clone())
                .or_insert_with(|| TileState::pending(key.clone()))
                .mark_loaded(Arc::new(data));
        }
    }

    /// Drop a placeholder whose fetch was aborted, so a later request
    /// re-fetches instead of waiting on a buffer that will never arrive.
    pub(crate) fn remove_if_pending(&self, key: &TileKey) {
        if let Ok(mut tiles) = self.inner.lock() {
            if tiles.get(key).is_some_and(|t| !t.is_loaded()) {
                tiles.remove(key);
            }
        }
    }

    /// Evicts every stale (`current == false`) tile and returns how many
    /// were removed. The core never calls this itself; it is the hook for
    /// an external cache-eviction policy.
    pub fn retain_current(&self) -> usize {
        if let Ok(mut tiles) = self.inner.lock() {
            let before = tiles.len();
            tiles.retain(|_, tile| tile.current);
            before - tiles.len()
        } else {
            0
        }
    }

    /// Number of cached tiles, pending ones included
    pub fn len(&self) -> usize {
        self.inner.lock().map(|tiles| tiles.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Clear all tiles from the cache
    pub fn clear(&self) {
        if let Ok(mut tiles) = self.inner.lock() {
            tiles.clear();
        }
    }
}

impl Clone for TileCache {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

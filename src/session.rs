//! Session object tying the coordinate mapper, tile cache, load queue and
//! assembler together behind the public request/query API.
//!
//! Each session owns its cache, so independent sessions (e.g. several map
//! layers over different variables) never share tile state.

use crate::core::config::FieldConfig;
use crate::core::geo::{LatLng, LatLngBounds};
use crate::core::grid::GridLayout;
use crate::field::assemble::assemble;
use crate::field::Field;
use crate::tiles::cache::{TileCache, TileKey};
use crate::tiles::queue::LoadQueue;
use crate::tiles::source::TileSource;
use crate::Result;
use std::sync::{Arc, RwLock};

/// One field-assembly session over a fixed global grid
pub struct FieldSession {
    config: FieldConfig,
    layout: GridLayout,
    cache: TileCache,
    queue: LoadQueue,
    current: RwLock<Option<Arc<Field>>>,
}

impl std::fmt::Debug for FieldSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldSession").finish_non_exhaustive()
    }
}

impl FieldSession {
    /// Builds a session, failing fast on a malformed configuration
    pub fn new(config: FieldConfig, source: Arc<dyn TileSource>) -> Result<Self> {
        config.validate()?;
        let layout = config.layout();
        let cache = TileCache::new();
        let queue = LoadQueue::new(source, cache.clone(), config.tile_len());
        Ok(Self {
            config,
            layout,
            cache,
            queue,
            current: RwLock::new(None),
        })
    }

    /// Loads whatever tiles the view still needs and assembles the field.
    ///
    /// Picks the finest zoom level that covers `view` with at most four
    /// tiles, fetches the missing tiles in parallel, and resolves with the
    /// stitched field once all of them landed. Calling again before that
    /// supersedes the prior request: its pending fetches are aborted and
    /// the earlier call resolves with [`crate::FieldError::Superseded`].
    pub async fn request_field(&self, view: &LatLngBounds) -> Result<Arc<Field>> {
        let zoom = self.layout.pick_zoom(view);
        let range = self.layout.tile_range(view, zoom);

        let mut keys = Vec::new();
        for (x, y) in range.iter() {
            for variable in self.config.mode.variables() {
                keys.push(TileKey::new(variable, x, y, zoom));
            }
        }
        log::debug!(
            "view request needs {} tiles at zoom {zoom} ({} per variable)",
            keys.len(),
            range.count()
        );

        self.queue.load(keys, self.config.load_timeout).await?;

        let field = Arc::new(assemble(
            &self.layout,
            &self.config.mode,
            zoom,
            view,
            &self.cache,
        )?);
        if let Ok(mut current) = self.current.write() {
            *current = Some(Arc::clone(&field));
        }
        Ok(field)
    }

    /// Scalar sample against the most recently assembled field
    pub fn value(&self, point: &LatLng) -> Option<f64> {
        self.field()?.value(point)
    }

    /// Vector sample against the most recently assembled field
    pub fn vector(&self, point: &LatLng) -> Option<[f64; 2]> {
        self.field()?.vector(point)
    }

    /// The most recently assembled field, if any request completed
    pub fn field(&self) -> Option<Arc<Field>> {
        self.current.read().ok()?.clone()
    }

    /// Aborts any in-flight request; idempotent
    pub fn cancel(&self) {
        self.queue.cancel();
    }

    /// The session's tile cache, exposed so an external eviction policy can
    /// prune stale tiles via [`TileCache::retain_current`]
    pub fn cache(&self) -> &TileCache {
        &self.cache
    }

    pub fn config(&self) -> &FieldConfig {
        &self.config
    }
}

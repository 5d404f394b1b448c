use crate::tiles::cache::TileKey;
use crate::Result;
use async_trait::async_trait;

/// Trait representing anything that can produce decoded tile buffers.
///
/// This is the seam to the outside world: implementations own transport and
/// binary decoding entirely, the library only sees the flat sample buffer.
/// A successful load must return exactly `tile_width * tile_height` samples
/// in row-major order (row index = y, column index = x within the tile);
/// the queue rejects anything else with [`crate::FieldError::TileSize`].
///
/// Loads for one request are dispatched concurrently, one task per tile,
/// and may be cancelled at any await point when the request is superseded.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Fetch and decode the tile identified by `key`
    async fn load(&self, key: &TileKey) -> Result<Vec<f32>>;
}

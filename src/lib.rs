//! # tilefield
//!
//! Assembles a continuous scalar or vector grid ("field") covering a
//! requested geographic viewport from independently loaded raster tiles,
//! then answers bilinear point-sample queries against it.
//!
//! The crate deliberately stops at the tile boundary: fetching and decoding
//! tile bytes is the job of a [`TileSource`] implementation supplied by the
//! caller, and nothing here renders or persists anything. A typical session:
//!
//! ```no_run
//! # async fn demo() -> tilefield::Result<()> {
//! use std::sync::Arc;
//! use tilefield::{FieldConfig, FieldSession, LatLng, LatLngBounds};
//!
//! # let source: Arc<dyn tilefield::TileSource> = unimplemented!();
//! let session = FieldSession::new(FieldConfig::default(), source)?;
//! let view = LatLngBounds::from_coords(30.0, 130.0, 40.0, 140.0);
//! let field = session.request_field(&view).await?;
//! let wind = field.vector(&LatLng::new(35.0, 135.0));
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod field;
pub mod session;
pub mod tiles;

// Re-export public API
pub use crate::core::{
    config::{FieldConfig, FieldMode},
    geo::{LatLng, LatLngBounds},
    grid::{FieldPoint, GridLayout, TileRange},
};
pub use crate::field::{Field, GridOffset};
pub use crate::session::FieldSession;
pub use crate::tiles::{
    cache::{TileCache, TileKey, TileState},
    source::TileSource,
};

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, FieldError>;

/// Common error types
#[derive(Debug, thiserror::Error)]
pub enum FieldError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("tile load failed: {0}")]
    Load(String),

    #[error("tile {key} returned {actual} samples, expected {expected}")]
    TileSize {
        key: TileKey,
        expected: usize,
        actual: usize,
    },

    #[error("request superseded by a newer view")]
    Superseded,

    #[error("timed out waiting for tile loads")]
    Timeout,
}

/// Error type alias for convenience
pub type Error = FieldError;

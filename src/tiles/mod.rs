pub mod cache;
pub mod queue;
pub mod source;

// Re-exports for convenience
pub use cache::{TileCache, TileKey, TileState};
pub use source::TileSource;

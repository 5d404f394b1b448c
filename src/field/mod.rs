pub mod assemble;
pub mod sample;

pub use sample::GridOffset;

use crate::core::geo::{LatLng, LatLngBounds};

/// Sample buffers of an assembled field, row-major with row stride `width`
#[derive(Debug, Clone)]
pub(crate) enum FieldData {
    Scalar(Vec<f32>),
    Vector { u: Vec<f32>, v: Vec<f32> },
}

/// A contiguous grid stitched from one view request's tiles.
///
/// One field is live per completed request; building the next field does
/// not retain the previous one. `lat_lng_bounds` is the exact rectangle the
/// grid covers, computed from its corner grid points rather than from the
/// request bounds, and every cell inside it was copied from exactly one
/// tile.
#[derive(Debug, Clone)]
pub struct Field {
    /// Geographic location of the field's top-left (north-west) grid point
    pub(crate) origin: LatLng,
    /// Cell height in degrees of latitude
    pub(crate) dlat: f64,
    /// Cell width in degrees of longitude
    pub(crate) dlng: f64,
    /// Grid points per row (`fnx`)
    pub(crate) width: usize,
    /// Grid rows (`fny`)
    pub(crate) height: usize,
    pub(crate) bounds: LatLngBounds,
    pub(crate) zoom: u8,
    pub(crate) data: FieldData,
}

impl Field {
    pub fn origin(&self) -> LatLng {
        self.origin
    }

    pub fn cell_size(&self) -> (f64, f64) {
        (self.dlat, self.dlng)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Exact rectangle covered by the grid
    pub fn lat_lng_bounds(&self) -> &LatLngBounds {
        &self.bounds
    }

    /// Zoom level the field was assembled at
    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    pub fn is_vector(&self) -> bool {
        matches!(self.data, FieldData::Vector { .. })
    }
}

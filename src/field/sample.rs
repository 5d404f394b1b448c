//! Bilinear point sampling over an assembled [`Field`].
//!
//! Queries outside the field's bounds are not errors; they answer `None`.
//! The geographic entry points share one floor/remainder implementation
//! with the precomputed-offset fast path, so scanning a field along a line
//! only pays the axis arithmetic once per coordinate.

use crate::core::geo::LatLng;
use crate::field::{Field, FieldData};

/// Precomputed position along one field axis: the grid index of the cell's
/// near edge plus the fractional offset into the cell, in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridOffset {
    pub index: usize,
    pub frac: f64,
}

impl Field {
    /// Scalar sample at `point`, or `None` outside the field's bounds or
    /// on a vector field
    pub fn value(&self, point: &LatLng) -> Option<f64> {
        let x = self.x_offset(point.lng)?;
        let y = self.y_offset(point.lat)?;
        self.value_at(x, y)
    }

    /// Vector sample at `point`, or `None` outside the field's bounds or
    /// on a scalar field
    pub fn vector(&self, point: &LatLng) -> Option<[f64; 2]> {
        let x = self.x_offset(point.lng)?;
        let y = self.y_offset(point.lat)?;
        self.vector_at(x, y)
    }

    /// Precompute the horizontal axis offset for `lng`, reusable across
    /// many samples at different latitudes
    pub fn x_offset(&self, lng: f64) -> Option<GridOffset> {
        if lng < self.bounds.west() || lng > self.bounds.east() {
            return None;
        }
        let x = ((lng - self.origin.lng) / self.dlng).floor();
        let frac = (lng - (self.origin.lng + self.dlng * x)) / self.dlng;
        self.axis_offset(x, frac, self.width)
    }

    /// Precompute the vertical axis offset for `lat` (row 0 is the north
    /// edge, so the axis runs southward)
    pub fn y_offset(&self, lat: f64) -> Option<GridOffset> {
        if lat < self.bounds.south() || lat > self.bounds.north() {
            return None;
        }
        let y = ((self.origin.lat - lat) / self.dlat).floor();
        let frac = ((self.origin.lat - self.dlat * y) - lat) / self.dlat;
        self.axis_offset(y, frac, self.height)
    }

    /// Normalizes a floored axis position so that `index + 1` is always a
    /// valid cell: a query exactly on the far edge becomes the last cell
    /// with fraction 1, which blends to the edge value exactly.
    fn axis_offset(&self, floored: f64, frac: f64, len: usize) -> Option<GridOffset> {
        let mut index = floored as i64;
        let mut frac = frac;
        if index < 0 {
            // inside bounds but floored past the origin by float error
            index = 0;
            frac = 0.0;
        }
        let mut index = index as usize;
        if index + 1 >= len {
            if len < 2 {
                return None;
            }
            index = len - 2;
            frac = 1.0;
        }
        Some(GridOffset { index, frac })
    }

    /// Bilinear blend of the four cells around a precomputed offset pair
    pub fn value_at(&self, x: GridOffset, y: GridOffset) -> Option<f64> {
        let FieldData::Scalar(values) = &self.data else {
            return None;
        };
        Some(bilinear(
            x.frac,
            y.frac,
            self.at(values, x.index, y.index),
            self.at(values, x.index + 1, y.index),
            self.at(values, x.index, y.index + 1),
            self.at(values, x.index + 1, y.index + 1),
        ))
    }

    /// Vector counterpart of [`Field::value_at`], blending both component
    /// buffers with the same weights
    pub fn vector_at(&self, x: GridOffset, y: GridOffset) -> Option<[f64; 2]> {
        let FieldData::Vector { u, v } = &self.data else {
            return None;
        };
        Some([
            bilinear(
                x.frac,
                y.frac,
                self.at(u, x.index, y.index),
                self.at(u, x.index + 1, y.index),
                self.at(u, x.index, y.index + 1),
                self.at(u, x.index + 1, y.index + 1),
            ),
            bilinear(
                x.frac,
                y.frac,
                self.at(v, x.index, y.index),
                self.at(v, x.index + 1, y.index),
                self.at(v, x.index, y.index + 1),
                self.at(v, x.index + 1, y.index + 1),
            ),
        ])
    }

    /// Raw scalar grid value at `(x, y)`. No bounds checking; callers are
    /// responsible for `x < width` and `y < height`. `NaN` on vector fields.
    pub fn cell(&self, x: usize, y: usize) -> f32 {
        match &self.data {
            FieldData::Scalar(values) => values[x + self.width * y],
            FieldData::Vector { .. } => f32::NAN,
        }
    }

    /// Raw vector grid value at `(x, y)`. No bounds checking. `NaN`s on
    /// scalar fields.
    pub fn cell_vector(&self, x: usize, y: usize) -> [f32; 2] {
        match &self.data {
            FieldData::Vector { u, v } => {
                let n = x + self.width * y;
                [u[n], v[n]]
            }
            FieldData::Scalar(_) => [f32::NAN, f32::NAN],
        }
    }

    fn at(&self, buffer: &[f32], x: usize, y: usize) -> f64 {
        f64::from(buffer[x + self.width * y])
    }
}

/// Weights: `rx = 1 - dx`, `ry = 1 - dy`;
/// result = `v00*rx*ry + v10*dx*ry + v01*rx*dy + v11*dx*dy`
fn bilinear(dx: f64, dy: f64, v00: f64, v10: f64, v01: f64, v11: f64) -> f64 {
    let rx = 1.0 - dx;
    let ry = 1.0 - dy;
    v00 * (rx * ry) + v10 * (dx * ry) + v01 * (rx * dy) + v11 * (dx * dy)
}

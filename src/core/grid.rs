//! Coordinate mapping between geographic space and the tiled grid.
//!
//! The global grid is an equirectangular lat/lon rectangle subdivided into
//! `2^zoom x 2^zoom` tiles per zoom level. Each tile carries `tnx x tny`
//! sample points and adjacent tiles share their boundary row/column, so the
//! cell size per axis is `tile_span / (tn - 1)` and the last column of tile
//! `t` is the same grid point as the first column of tile `t + 1`.

use crate::core::geo::{LatLng, LatLngBounds};

/// A grid point addressed by which tile it falls in, then by its pixel
/// offset inside that tile. Indices are signed so that points outside the
/// grid can be represented before [`GridLayout::clamp`] is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldPoint {
    pub tx: i64,
    pub ty: i64,
    pub x: i64,
    pub y: i64,
}

impl FieldPoint {
    pub fn new(tx: i64, ty: i64, x: i64, y: i64) -> Self {
        Self { tx, ty, x, y }
    }
}

/// Inclusive tile-index rectangle covering a view at one zoom level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRange {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl TileRange {
    /// Number of tiles in the range
    pub fn count(&self) -> u32 {
        (self.max_x - self.min_x + 1) * (self.max_y - self.min_y + 1)
    }

    /// Iterates tile coordinates row by row
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        let xs = self.min_x..=self.max_x;
        (self.min_y..=self.max_y).flat_map(move |y| xs.clone().map(move |x| (x, y)))
    }
}

/// Fixed global grid geometry for one session
#[derive(Debug, Clone)]
pub struct GridLayout {
    bounds: LatLngBounds,
    tnx: usize,
    tny: usize,
    /// Ascending, coarsest level first
    zoom_levels: Vec<u8>,
}

impl GridLayout {
    /// Callers normally go through `FieldConfig::layout`, which validates
    /// the inputs first.
    pub fn new(bounds: LatLngBounds, tnx: usize, tny: usize, zoom_levels: Vec<u8>) -> Self {
        Self {
            bounds,
            tnx,
            tny,
            zoom_levels,
        }
    }

    pub fn bounds(&self) -> &LatLngBounds {
        &self.bounds
    }

    pub fn tile_width(&self) -> usize {
        self.tnx
    }

    pub fn tile_height(&self) -> usize {
        self.tny
    }

    /// Tiles per axis at `zoom`
    pub fn tiles_per_axis(zoom: u8) -> u32 {
        1u32 << zoom
    }

    /// Geographic extent of one tile at `zoom` as (lat degrees, lng degrees)
    pub fn tile_span(&self, zoom: u8) -> (f64, f64) {
        let (lat_span, lng_span) = self.bounds.span();
        let nz = f64::from(Self::tiles_per_axis(zoom));
        (lat_span / nz, lng_span / nz)
    }

    /// Grid cell size at `zoom` as (dlat, dlng). Tiles share edge points,
    /// so a tile of `tn` points spans `tn - 1` cells.
    pub fn cell_size(&self, zoom: u8) -> (f64, f64) {
        let (tlat, tlng) = self.tile_span(zoom);
        (tlat / (self.tny - 1) as f64, tlng / (self.tnx - 1) as f64)
    }

    /// Picks the finest configured zoom level whose clamped tile range covers
    /// `view` with at most 4 tiles, bounding the number of parallel fetches
    /// per request. Falls back to the coarsest level when none qualifies.
    pub fn pick_zoom(&self, view: &LatLngBounds) -> u8 {
        for &zoom in self.zoom_levels.iter().rev() {
            if self.tile_range(view, zoom).count() <= 4 {
                return zoom;
            }
        }
        self.zoom_levels.first().copied().unwrap_or(0)
    }

    /// Computes the inclusive tile rectangle covering `view` at `zoom`,
    /// clamped to the valid index range on both axes.
    pub fn tile_range(&self, view: &LatLngBounds, zoom: u8) -> TileRange {
        let origin = self.bounds.north_west();
        let (tlat, tlng) = self.tile_span(zoom);
        let max_t = i64::from(Self::tiles_per_axis(zoom)) - 1;

        let clamp = |v: f64| -> u32 { (v.floor() as i64).clamp(0, max_t) as u32 };

        TileRange {
            min_x: clamp((view.west() - origin.lng) / tlng),
            min_y: clamp((origin.lat - view.north()) / tlat),
            max_x: clamp((view.east() - origin.lng) / tlng),
            max_y: clamp((origin.lat - view.south()) / tlat),
        }
    }

    /// Maps a geographic point to a tile index plus in-tile pixel index.
    ///
    /// With `round_up` the result advances one grid point past the floor,
    /// which is how the far (south-east) corner of a requested field gains
    /// the extra row/column that keeps bilinear reads inside the buffer.
    /// Advancing past the last pixel lands on pixel 1 of the next tile:
    /// pixel 0 there is the same shared grid point as the pixel we left.
    pub fn field_point(&self, p: &LatLng, zoom: u8, round_up: bool) -> FieldPoint {
        let origin = self.bounds.north_west();
        let (tlat, tlng) = self.tile_span(zoom);
        let (dlat, dlng) = self.cell_size(zoom);

        let mut tx = ((p.lng - origin.lng) / tlng).floor() as i64;
        let mut ty = ((origin.lat - p.lat) / tlat).floor() as i64;

        // tile origin
        let tox = origin.lng + tlng * tx as f64;
        let toy = origin.lat - tlat * ty as f64;

        // tile grid point
        let mut x = ((p.lng - tox) / dlng).floor() as i64;
        let mut y = ((toy - p.lat) / dlat).floor() as i64;

        if round_up {
            if x + 1 < self.tnx as i64 {
                x += 1;
            } else {
                tx += 1;
                x = 1;
            }

            if y + 1 < self.tny as i64 {
                y += 1;
            } else {
                ty += 1;
                y = 1;
            }
        }

        FieldPoint::new(tx, ty, x, y)
    }

    /// Clamps tile index and in-tile pixel to the valid range so viewport
    /// edges outside the grid degrade to the nearest valid edge cell.
    pub fn clamp(&self, p: FieldPoint, zoom: u8) -> FieldPoint {
        let nz = i64::from(Self::tiles_per_axis(zoom));
        let mut p = p;

        if p.tx < 0 {
            p.tx = 0;
            p.x = 0;
        } else if p.tx >= nz {
            p.tx = nz - 1;
            p.x = self.tnx as i64 - 1;
        }

        if p.ty < 0 {
            p.ty = 0;
            p.y = 0;
        } else if p.ty >= nz {
            p.ty = nz - 1;
            p.y = self.tny as i64 - 1;
        }

        p.x = p.x.clamp(0, self.tnx as i64 - 1);
        p.y = p.y.clamp(0, self.tny as i64 - 1);
        p
    }

    /// Inverse mapping from a grid point back to geographic coordinates
    pub fn latlng(&self, p: &FieldPoint, zoom: u8) -> LatLng {
        let origin = self.bounds.north_west();
        let (tlat, tlng) = self.tile_span(zoom);
        let (dlat, dlng) = self.cell_size(zoom);

        LatLng::new(
            origin.lat - tlat * p.ty as f64 - dlat * p.y as f64,
            origin.lng + tlng * p.tx as f64 + dlng * p.x as f64,
        )
    }
}

//! Field assembly: stitches the loaded tile set for one request into a
//! single contiguous buffer.
//!
//! The assembler runs synchronously once the load queue's barrier has
//! passed, so it never observes a partially loaded tile set. The field's
//! far corner is computed with round-up so the buffer always carries one
//! grid point beyond the strict viewport, keeping the interpolator's
//! `x + 1` / `y + 1` reads in range.

use crate::core::geo::{LatLng, LatLngBounds};
use crate::core::grid::{FieldPoint, GridLayout};
use crate::field::{Field, FieldData};
use crate::tiles::cache::{TileCache, TileKey};
use crate::{FieldError, FieldMode, Result};

/// Stitch the tiles covering `view` at `zoom` into a [`Field`].
///
/// Every tile in the covered range must already be loaded; a miss means
/// the queue's completion tracking is broken and fails the request.
pub(crate) fn assemble(
    layout: &GridLayout,
    mode: &FieldMode,
    zoom: u8,
    view: &LatLngBounds,
    cache: &TileCache,
) -> Result<Field> {
    let p1 = layout.clamp(layout.field_point(&view.north_west(), zoom, false), zoom);
    let p2 = layout.clamp(layout.field_point(&view.south_east(), zoom, true), zoom);

    let (dlat, dlng) = layout.cell_size(zoom);
    let tnx = layout.tile_width() as i64;
    let tny = layout.tile_height() as i64;

    // adjacent tiles share an edge, so a tile advances the grid by tn - 1
    let width = ((p2.tx - p1.tx) * (tnx - 1) - p1.x + p2.x + 1) as usize;
    let height = ((p2.ty - p1.ty) * (tny - 1) - p1.y + p2.y + 1) as usize;

    let origin = layout.latlng(&p1, zoom);
    let corner = layout.latlng(&p2, zoom);
    let bounds = LatLngBounds::new(
        LatLng::new(corner.lat, origin.lng),
        LatLng::new(origin.lat, corner.lng),
    );

    let data = match mode {
        FieldMode::Scalar { variable } => {
            FieldData::Scalar(copy_variable(layout, zoom, p1, p2, width, variable, cache)?)
        }
        FieldMode::Vector { u, v } => FieldData::Vector {
            u: copy_variable(layout, zoom, p1, p2, width, u, cache)?,
            v: copy_variable(layout, zoom, p1, p2, width, v, cache)?,
        },
    };

    log::debug!(
        "assembled {}x{} field at zoom {zoom} from tiles [{},{}]..[{},{}]",
        width,
        height,
        p1.tx,
        p1.ty,
        p2.tx,
        p2.ty
    );

    Ok(Field {
        origin,
        dlat,
        dlng,
        width,
        height,
        bounds,
        zoom,
        data,
    })
}

/// Copy one variable's sub-rectangles out of every covered tile.
///
/// First and last tiles are clipped to `p1`/`p2`'s in-tile offsets; for the
/// remaining tiles the copy starts at pixel 1 because pixel 0 repeats the
/// previous tile's shared edge. Each tile's contribution is therefore
/// written exactly once, with no gaps between neighbours.
fn copy_variable(
    layout: &GridLayout,
    zoom: u8,
    p1: FieldPoint,
    p2: FieldPoint,
    width: usize,
    variable: &str,
    cache: &TileCache,
) -> Result<Vec<f32>> {
    let tnx = layout.tile_width() as i64;
    let tny = layout.tile_height() as i64;
    let height = ((p2.ty - p1.ty) * (tny - 1) - p1.y + p2.y + 1) as usize;
    let mut dst = vec![0.0f32; width * height];

    for ty in p1.ty..=p2.ty {
        for tx in p1.tx..=p2.tx {
            let key = TileKey::new(variable, tx as u32, ty as u32, zoom);
            let tile = cache.get(&key).ok_or_else(|| {
                FieldError::Load(format!("tile {key} missing from cache at assembly"))
            })?;

            let x1 = if tx == p1.tx { p1.x } else { 1 };
            let x2 = if tx == p2.tx { p2.x } else { tnx - 1 };
            let y1 = if ty == p1.ty { p1.y } else { 1 };
            let y2 = if ty == p2.ty { p2.y } else { tny - 1 };
            if x2 < x1 || y2 < y1 {
                // the far corner sits on this tile's shared edge, which the
                // neighbour already wrote
                continue;
            }

            // destination of this tile's first contributed pixel
            let fx = (tx - p1.tx) * (tnx - 1) + x1 - p1.x;
            let fy = (ty - p1.ty) * (tny - 1) + y1 - p1.y;
            let run = (x2 - x1 + 1) as usize;

            for iy in y1..=y2 {
                let src = (tnx * iy + x1) as usize;
                let dst0 = (fy + iy - y1) as usize * width + fx as usize;
                dst[dst0..dst0 + run].copy_from_slice(&tile[src..src + run]);
            }
        }
    }

    Ok(dst)
}

//! Session configuration and fail-fast validation

use crate::core::geo::LatLngBounds;
use crate::core::grid::GridLayout;
use crate::{FieldError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Largest zoom level for which `2^zoom` tiles per axis stays sane
const MAX_ZOOM: u8 = 24;

/// Which variables a session fetches and how samples are interpreted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldMode {
    /// One layer of scalar samples
    Scalar { variable: String },
    /// Two layers interpreted as the axis components of a vector
    Vector { u: String, v: String },
}

impl FieldMode {
    pub fn scalar(variable: impl Into<String>) -> Self {
        Self::Scalar {
            variable: variable.into(),
        }
    }

    pub fn vector(u: impl Into<String>, v: impl Into<String>) -> Self {
        Self::Vector {
            u: u.into(),
            v: v.into(),
        }
    }

    /// Variable names fetched per tile coordinate
    pub fn variables(&self) -> Vec<&str> {
        match self {
            Self::Scalar { variable } => vec![variable],
            Self::Vector { u, v } => vec![u, v],
        }
    }

    pub fn is_vector(&self) -> bool {
        matches!(self, Self::Vector { .. })
    }
}

/// Configuration for a field session, immutable once the session is built
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Geographic rectangle the global grid covers
    pub bounds: LatLngBounds,
    /// Supported zoom levels, ascending (coarsest first)
    pub zoom_levels: Vec<u8>,
    /// Sample points per tile along longitude (`tnx`)
    pub tile_width: usize,
    /// Sample points per tile along latitude (`tny`)
    pub tile_height: usize,
    pub mode: FieldMode,
    /// Upper bound on one request's tile loads; `None` waits indefinitely
    pub load_timeout: Option<Duration>,
}

impl Default for FieldConfig {
    /// The JMA MSM wind grid the library grew up on
    fn default() -> Self {
        Self {
            bounds: LatLngBounds::from_coords(22.4, 120.0, 47.6, 150.0),
            zoom_levels: vec![1, 2],
            tile_width: 241,
            tile_height: 253,
            mode: FieldMode::vector("UGRD", "VGRD"),
            load_timeout: None,
        }
    }
}

impl FieldConfig {
    /// Checks the configuration once at session setup; none of these are
    /// recoverable at query time.
    pub fn validate(&self) -> Result<()> {
        let (lat_span, lng_span) = self.bounds.span();
        if lat_span <= 0.0 || lng_span <= 0.0 {
            return Err(FieldError::Configuration(format!(
                "grid bounds must have positive extent, got {lat_span} x {lng_span} degrees"
            )));
        }
        if !self.bounds.south_west.is_valid() || !self.bounds.north_east.is_valid() {
            return Err(FieldError::Configuration(
                "grid bounds outside valid lat/lng range".to_string(),
            ));
        }

        if self.zoom_levels.is_empty() {
            return Err(FieldError::Configuration(
                "zoom level list must not be empty".to_string(),
            ));
        }
        if !self.zoom_levels.windows(2).all(|w| w[0] < w[1]) {
            return Err(FieldError::Configuration(
                "zoom levels must be strictly ascending, coarsest first".to_string(),
            ));
        }
        if let Some(&max) = self.zoom_levels.last() {
            if max > MAX_ZOOM {
                return Err(FieldError::Configuration(format!(
                    "zoom level {max} exceeds the supported maximum {MAX_ZOOM}"
                )));
            }
        }

        if self.tile_width < 2 || self.tile_height < 2 {
            return Err(FieldError::Configuration(format!(
                "tile dimensions must be at least 2x2, got {}x{}",
                self.tile_width, self.tile_height
            )));
        }

        if self.mode.variables().iter().any(|v| v.is_empty()) {
            return Err(FieldError::Configuration(
                "variable names must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Samples per tile buffer
    pub fn tile_len(&self) -> usize {
        self.tile_width * self.tile_height
    }

    pub(crate) fn layout(&self) -> GridLayout {
        GridLayout::new(
            self.bounds.clone(),
            self.tile_width,
            self.tile_height,
            self.zoom_levels.clone(),
        )
    }
}

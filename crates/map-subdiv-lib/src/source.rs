//! Map data sources
//!
//! A [`MapSource`] hands out the bounds and the ordered element sequences a tile hierarchy is
//! built from. [`MapDetails`] is the plain in-memory implementation; an [`crate::Area`] is also a
//! source so lower levels can be derived from it.

use crate::{Bounds, MapLine, MapPoint, MapShape};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Read access to the elements of a map
pub trait MapSource {
    fn bounds(&self) -> Bounds;
    fn points(&self) -> &[MapPoint];
    fn lines(&self) -> &[MapLine];
    fn shapes(&self) -> &[MapShape];
}

/// In-memory map data with bounds that grow to cover every added element
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapDetails {
    bounds: Option<Bounds>,
    points: Vec<MapPoint>,
    lines: Vec<MapLine>,
    shapes: Vec<MapShape>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MapDetails {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with fixed bounds; elements outside them still widen the bounds
    pub fn with_bounds(bounds: Bounds) -> Self {
        Self {
            bounds: Some(bounds),
            ..Self::default()
        }
    }

    pub fn add_point(&mut self, point: MapPoint) {
        self.grow(Bounds::of_point(&point.location));
        self.points.push(point);
    }

    pub fn add_line(&mut self, line: MapLine) {
        if line.is_empty() {
            return;
        }
        self.grow(line.bounds());
        self.lines.push(line);
    }

    pub fn add_shape(&mut self, shape: MapShape) {
        if shape.is_empty() {
            return;
        }
        self.grow(shape.bounds());
        self.shapes.push(shape);
    }

    fn grow(&mut self, other: Bounds) {
        self.bounds = Some(match self.bounds {
            Some(bounds) => bounds.union(&other),
            None => other,
        });
    }
}

impl MapSource for MapDetails {
    fn bounds(&self) -> Bounds {
        self.bounds
            .unwrap_or_else(|| Bounds::of_point(&crate::Coord::default()))
    }

    fn points(&self) -> &[MapPoint] {
        &self.points
    }

    fn lines(&self) -> &[MapLine] {
        &self.lines
    }

    fn shapes(&self) -> &[MapShape] {
        &self.shapes
    }
}

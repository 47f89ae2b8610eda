//! Map elements: points, open lines and closed shapes
//!
//! Every element carries [`Attributes`] (feature type code, visibility range and label). Lines and
//! shapes keep a bounding box that grows as points are appended. A [`MapShape`] always holds a
//! closed ring; the constructor closes it when needed.

use crate::{Bounds, Coord, Result, SubdivError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// The finest map resolution
pub const MAX_RESOLUTION: u8 = 24;

/// Type codes at or above this value use the extended encoding
pub const EXTENDED_TYPE_BASE: u32 = 0x10000;

/// Styling and visibility shared by every element kind
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Attributes {
    /// Target device feature type
    pub type_code: u32,
    /// Coarsest resolution at which the element is drawn
    pub min_resolution: u8,
    /// Finest resolution at which the element is drawn
    pub max_resolution: u8,
    /// Label handle, passed through to the tile sink untouched
    pub label: Option<String>,
}

impl Attributes {
    /// Attributes visible at every resolution up to the finest one
    pub fn new(type_code: u32) -> Self {
        Self {
            type_code,
            min_resolution: 0,
            max_resolution: MAX_RESOLUTION,
            label: None,
        }
    }

    pub fn with_resolutions(mut self, min_resolution: u8, max_resolution: u8) -> Self {
        self.min_resolution = min_resolution;
        self.max_resolution = max_resolution;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[inline]
    pub fn has_extended_type(&self) -> bool {
        self.type_code >= EXTENDED_TYPE_BASE
    }

    /// Whether the element is drawn at `resolution`
    #[inline]
    pub fn is_visible_at(&self, resolution: u8) -> bool {
        self.min_resolution <= resolution && resolution <= self.max_resolution
    }

    /// Same type, visibility range and label, so two elements may be merged
    pub fn is_similar(&self, other: &Attributes) -> bool {
        self.type_code == other.type_code
            && self.min_resolution == other.min_resolution
            && self.max_resolution == other.max_resolution
            && self.label == other.label
    }
}

/// The three element kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Point,
    Line,
    Shape,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKind::Point => write!(f, "point"),
            ElementKind::Line => write!(f, "line"),
            ElementKind::Shape => write!(f, "shape"),
        }
    }
}

/// A single-coordinate feature
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapPoint {
    pub attrs: Attributes,
    pub location: Coord,
    /// Indexed points (cities and the like) have their own per-tile counter
    #[cfg_attr(feature = "serde", serde(default))]
    pub indexed: bool,
}

impl MapPoint {
    pub fn new(attrs: Attributes, location: Coord) -> Self {
        Self {
            attrs,
            location,
            indexed: false,
        }
    }

    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// An open sequence of points
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapLine {
    attrs: Attributes,
    points: Vec<Coord>,
    bounds: Bounds,
    road: bool,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MapLine {
    pub fn new(attrs: Attributes, points: Vec<Coord>) -> Self {
        let bounds = bounds_of(&points);
        Self {
            attrs,
            points,
            bounds,
            road: false,
        }
    }

    /// Mark this line as part of the routing network
    pub fn into_road(mut self) -> Self {
        self.road = true;
        self
    }

    #[inline]
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    #[inline]
    pub fn points(&self) -> &[Coord] {
        &self.points
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[inline]
    pub fn is_road(&self) -> bool {
        self.road
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Centre of the bounding box
    pub fn location(&self) -> Coord {
        self.bounds.center()
    }

    /// Append a point, growing the bounding box
    pub fn push_point(&mut self, co: Coord) {
        self.bounds = if self.points.is_empty() {
            Bounds::of_point(&co)
        } else {
            grow_bounds(self.bounds, &self.points, &co)
        };
        self.points.push(co);
    }

    /// Copy of the line's attributes carrying a different point sequence
    pub fn with_points(&self, points: Vec<Coord>) -> Self {
        Self {
            attrs: self.attrs.clone(),
            bounds: bounds_of(&points),
            points,
            road: self.road,
        }
    }

    /// All points at the same position, so the line has no extent
    pub fn is_degenerate(&self) -> bool {
        match self.points.first() {
            Some(first) => self.points.iter().all(|p| p == first),
            None => true,
        }
    }

    pub fn into_points(self) -> Vec<Coord> {
        self.points
    }
}

/// A closed ring (first point == last point)
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MapShape {
    attrs: Attributes,
    points: Vec<Coord>,
    bounds: Bounds,
    /// Produced by clipping against a tile boundary
    #[cfg_attr(feature = "serde", serde(default))]
    clipped: bool,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MapShape {
    /// Create a shape, closing the ring when the last point differs from the first
    pub fn new(attrs: Attributes, mut points: Vec<Coord>) -> Self {
        close_ring(&mut points);
        let bounds = bounds_of(&points);
        Self {
            attrs,
            points,
            bounds,
            clipped: false,
        }
    }

    #[inline]
    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    #[inline]
    pub fn points(&self) -> &[Coord] {
        &self.points
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[inline]
    pub fn is_clipped(&self) -> bool {
        self.clipped
    }

    pub fn mark_clipped(mut self) -> Self {
        self.clipped = true;
        self
    }

    /// Centre of the bounding box
    pub fn location(&self) -> Coord {
        self.bounds.center()
    }

    /// Copy of the shape's attributes carrying a different ring
    pub fn with_points(&self, mut points: Vec<Coord>) -> Self {
        close_ring(&mut points);
        Self {
            attrs: self.attrs.clone(),
            bounds: bounds_of(&points),
            points,
            clipped: self.clipped,
        }
    }

    pub fn into_points(self) -> Vec<Coord> {
        self.points
    }
}

/// A point, line or shape as it flows through a filter chain
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Point(MapPoint),
    Line(MapLine),
    Shape(MapShape),
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Element {
    pub fn kind(&self) -> ElementKind {
        match self {
            Element::Point(_) => ElementKind::Point,
            Element::Line(_) => ElementKind::Line,
            Element::Shape(_) => ElementKind::Shape,
        }
    }

    pub fn attrs(&self) -> &Attributes {
        match self {
            Element::Point(p) => &p.attrs,
            Element::Line(l) => l.attrs(),
            Element::Shape(s) => s.attrs(),
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            Element::Point(p) => Bounds::of_point(&p.location),
            Element::Line(l) => l.bounds(),
            Element::Shape(s) => s.bounds(),
        }
    }

    /// Representative location used to place the element in a grid cell
    pub fn location(&self) -> Coord {
        match self {
            Element::Point(p) => p.location,
            Element::Line(l) => l.location(),
            Element::Shape(s) => s.location(),
        }
    }

    pub fn points(&self) -> &[Coord] {
        match self {
            Element::Point(p) => std::slice::from_ref(&p.location),
            Element::Line(l) => l.points(),
            Element::Shape(s) => s.points(),
        }
    }

    /// Copy of a line or shape carrying a different point sequence
    ///
    /// Fails for points, which have no sequence to replace.
    pub fn with_points(&self, points: Vec<Coord>, filter: &'static str) -> Result<Element> {
        match self {
            Element::Line(l) => Ok(Element::Line(l.with_points(points))),
            Element::Shape(s) => Ok(Element::Shape(s.with_points(points))),
            Element::Point(_) => Err(SubdivError::WrongElementKind {
                filter,
                expected: "line or shape",
                found: ElementKind::Point,
            }),
        }
    }

    /// Check that this is a line or shape before a polyline filter touches it
    pub fn expect_polyline(&self, filter: &'static str) -> Result<()> {
        match self {
            Element::Point(_) => Err(SubdivError::WrongElementKind {
                filter,
                expected: "line or shape",
                found: ElementKind::Point,
            }),
            _ => Ok(()),
        }
    }

    pub fn into_line(self, filter: &'static str) -> Result<MapLine> {
        match self {
            Element::Line(l) => Ok(l),
            other => Err(SubdivError::WrongElementKind {
                filter,
                expected: "line",
                found: other.kind(),
            }),
        }
    }

    pub fn into_shape(self, filter: &'static str) -> Result<MapShape> {
        match self {
            Element::Shape(s) => Ok(s),
            other => Err(SubdivError::WrongElementKind {
                filter,
                expected: "shape",
                found: other.kind(),
            }),
        }
    }
}

impl From<MapPoint> for Element {
    fn from(point: MapPoint) -> Self {
        Element::Point(point)
    }
}

impl From<MapLine> for Element {
    fn from(line: MapLine) -> Self {
        Element::Line(line)
    }
}

impl From<MapShape> for Element {
    fn from(shape: MapShape) -> Self {
        Element::Shape(shape)
    }
}

fn bounds_of(points: &[Coord]) -> Bounds {
    Bounds::from_coords(points).unwrap_or_else(|| Bounds::of_point(&Coord::default()))
}

/// Box of `points` grown to also cover `co`
///
/// A one unit axis may be a widened degenerate one, which only the points can tell. That check
/// runs at most once per axis, as the box is wider afterwards.
fn grow_bounds(bounds: Bounds, points: &[Coord], co: &Coord) -> Bounds {
    let max_lat = if bounds.height() == 1
        && co.lat() < bounds.min_lat()
        && points.iter().all(|p| p.lat() != bounds.max_lat())
    {
        bounds.min_lat()
    } else {
        bounds.max_lat()
    };
    let max_lon = if bounds.width() == 1
        && co.lon() < bounds.min_lon()
        && points.iter().all(|p| p.lon() != bounds.max_lon())
    {
        bounds.min_lon()
    } else {
        bounds.max_lon()
    };
    Bounds::new(
        bounds.min_lat().min(co.lat()),
        bounds.min_lon().min(co.lon()),
        max_lat.max(co.lat()),
        max_lon.max(co.lon()),
    )
}

fn close_ring(points: &mut Vec<Coord>) {
    if let (Some(first), Some(last)) = (points.first().copied(), points.last().copied()) {
        if first != last {
            points.push(first);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_is_closed_on_construction() {
        let shape = MapShape::new(
            Attributes::new(0x01),
            vec![Coord::new(0, 0), Coord::new(0, 10), Coord::new(10, 10)],
        );
        assert_eq!(shape.len(), 4);
        assert_eq!(shape.points()[0], shape.points()[3]);
    }

    #[test]
    fn test_line_bounds_grow() {
        let mut line = MapLine::new(Attributes::new(0x02), vec![Coord::new(0, 0)]);
        line.push_point(Coord::new(10, -5));
        assert_eq!(line.bounds(), Bounds::new(0, -5, 10, 0));
        assert_eq!(line.location(), Coord::new(5, -3));
    }

    #[test]
    fn test_pushed_bounds_match_rebuilt_bounds() {
        let runs: [&[(i32, i32)]; 4] = [
            &[(0, 0), (0, 10), (0, -4)],
            &[(5, 5), (5, 5), (4, 5), (9, 2)],
            &[(0, 0), (1, 0), (-3, 0), (-3, 7)],
            &[(10, 10), (-10, -10), (3, 20)],
        ];
        for run in runs {
            let points: Vec<Coord> = run.iter().map(|&(lat, lon)| Coord::new(lat, lon)).collect();
            let mut line = MapLine::new(Attributes::new(0x02), Vec::new());
            for co in &points {
                line.push_point(*co);
            }
            assert_eq!(line.bounds(), MapLine::new(Attributes::new(0x02), points).bounds());
        }
    }

    #[test]
    fn test_is_similar() {
        let a = Attributes::new(0x10).with_label("Main");
        let b = Attributes::new(0x10).with_label("Main");
        let c = Attributes::new(0x10).with_label("Other");
        let d = Attributes::new(0x10)
            .with_label("Main")
            .with_resolutions(20, 24);
        assert!(a.is_similar(&b));
        assert!(!a.is_similar(&c));
        assert!(!a.is_similar(&d));
    }

    #[test]
    fn test_visibility_and_extended() {
        let attrs = Attributes::new(0x10101).with_resolutions(18, 22);
        assert!(attrs.has_extended_type());
        assert!(attrs.is_visible_at(20));
        assert!(!attrs.is_visible_at(17));
        assert!(!attrs.is_visible_at(24));
        assert!(!Attributes::new(0x2f).has_extended_type());
    }

    #[test]
    fn test_kind_conversion_errors() {
        let line: Element = MapLine::new(Attributes::new(1), vec![Coord::new(0, 0)]).into();
        assert!(line.clone().into_line("test").is_ok());
        let err = line.into_shape("test").unwrap_err();
        assert!(matches!(
            err,
            SubdivError::WrongElementKind {
                found: ElementKind::Line,
                ..
            }
        ));
    }

    #[test]
    fn test_degenerate_line() {
        let line = MapLine::new(
            Attributes::new(1),
            vec![Coord::new(3, 3), Coord::new(3, 3)],
        );
        assert!(line.is_degenerate());
        let line = line.with_points(vec![Coord::new(3, 3), Coord::new(3, 4)]);
        assert!(!line.is_degenerate());
    }
}

//! Area - A bounded container of map elements that can be split into a grid of smaller ones
//!
//! An [`Area`] keeps running byte-size estimates and active-element counters for the resolution
//! it was built for, so the [`crate::Splitter`] can decide whether it fits a subdivision without
//! walking its contents again. Areas are filled once and then consumed by a split.

use crate::filters::{
    Collector, FilterChain, FilterConfig, LineSizeSplitterFilter, MAX_POINT_IN_ELEMENT,
    MAX_POINTS_IN_LINE, PolygonSubdivSizeSplitterFilter, clip_shape,
};
use crate::splitter::{LimitViolation, MIN_DIMENSION};
use crate::{Bounds, Coord, Element, MapLine, MapPoint, MapShape, MapSource, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Estimated bytes for a point record
const POINT_SIZE: usize = 9;

/// Fixed bytes per line or shape record
const RECORD_OVERHEAD: usize = 11;

/// Bytes per line or shape point
const BYTES_PER_POINT: usize = 4;

/// The six size budgets of a subdivision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SizeKind {
    Point,
    Line,
    Shape,
    ExtPoint,
    ExtLine,
    ExtShape,
}

impl SizeKind {
    pub const ALL: [SizeKind; 6] = [
        SizeKind::Point,
        SizeKind::Line,
        SizeKind::Shape,
        SizeKind::ExtPoint,
        SizeKind::ExtLine,
        SizeKind::ExtShape,
    ];

    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            SizeKind::ExtPoint | SizeKind::ExtLine | SizeKind::ExtShape
        )
    }

    fn index(&self) -> usize {
        match self {
            SizeKind::Point => 0,
            SizeKind::Line => 1,
            SizeKind::Shape => 2,
            SizeKind::ExtPoint => 3,
            SizeKind::ExtLine => 4,
            SizeKind::ExtShape => 5,
        }
    }
}

impl fmt::Display for SizeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SizeKind::Point => "points",
            SizeKind::Line => "lines",
            SizeKind::Shape => "shapes",
            SizeKind::ExtPoint => "extended points",
            SizeKind::ExtLine => "extended lines",
            SizeKind::ExtShape => "extended shapes",
        };
        f.write_str(name)
    }
}

/// Estimated encoded bytes per [`SizeKind`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ElementSizes([usize; 6]);

impl ElementSizes {
    #[inline]
    pub fn get(&self, kind: SizeKind) -> usize {
        self.0[kind.index()]
    }

    fn add(&mut self, kind: SizeKind, bytes: usize) {
        self.0[kind.index()] += bytes;
    }

    /// Sum over every kind
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// Sum over the standard (non-extended) kinds, which share the region budget
    pub fn standard_total(&self) -> usize {
        self.get(SizeKind::Point) + self.get(SizeKind::Line) + self.get(SizeKind::Shape)
    }
}

/// Estimated bytes for a line or shape of `num_points` points
///
/// Counts the records it will need once cut into pieces of at most 250 points.
pub fn estimate_polyline_size(num_points: usize) -> usize {
    if num_points == 0 {
        return 0;
    }
    RECORD_OVERHEAD * record_count(num_points, MAX_POINTS_IN_LINE) + BYTES_PER_POINT * num_points
}

fn record_count(num_points: usize, per_record: usize) -> usize {
    1 + num_points.saturating_sub(1) / per_record
}

/// A bounded set of points, lines and shapes at one resolution
#[derive(Debug, Clone)]
pub struct Area {
    bounds: Bounds,
    full_bounds: Option<Bounds>,
    resolution: u8,
    points: Vec<MapPoint>,
    lines: Vec<MapLine>,
    shapes: Vec<MapShape>,
    sizes: ElementSizes,
    active_points: usize,
    active_indexed_points: usize,
    active_lines: usize,
    active_shapes: usize,
    violations: Vec<LimitViolation>,
}

/// Where a shape goes during a clipping split
enum Placement {
    Whole(usize),
    Pieces(Vec<(usize, MapShape)>),
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Area {
    /// Build the root area of a level from `source`
    ///
    /// Points outside the source bounds are dropped. Lines pass through the line size splitter
    /// and shapes through the subdivision-fit polygon splitter, so nothing admitted is too large
    /// for every possible tile. With `clip_shapes`, shapes are first clipped to the bounds.
    pub fn new(source: &impl MapSource, resolution: u8, clip_shapes: bool) -> Result<Self> {
        let bounds = source.bounds();
        let mut area = Area::empty(bounds, resolution);

        for point in source.points() {
            if bounds.contains_coord(&point.location) {
                area.add_point(point.clone());
            } else {
                tracing::error!(
                    type_code = point.attrs.type_code,
                    lat = point.location.lat(),
                    lon = point.location.lon(),
                    ?bounds,
                    resolution,
                    "point outside of the map area, dropped"
                );
            }
        }

        let config = FilterConfig::new(resolution, bounds);
        let mut admitted = Vec::new();
        {
            let mut chain = FilterChain::new(config);
            chain.add(LineSizeSplitterFilter::new());
            chain.add(Collector::new(&mut admitted));
            for line in source.lines() {
                let _ = chain.start(line.clone().into())?;
            }
        }
        {
            let mut chain = FilterChain::new(config);
            chain.add(PolygonSubdivSizeSplitterFilter::new());
            chain.add(Collector::new(&mut admitted));
            for shape in source.shapes() {
                if clip_shapes {
                    for piece in clip_shape(shape, &bounds) {
                        let _ = chain.start(piece.into())?;
                    }
                } else {
                    let _ = chain.start(shape.clone().into())?;
                }
            }
        }

        for element in admitted {
            match element {
                Element::Line(line) if line.len() >= 2 => area.add_line(line),
                Element::Shape(shape) if shape.len() >= 4 => area.add_shape(shape),
                _ => {}
            }
        }
        Ok(area)
    }

    /// An area with no content yet
    pub fn empty(bounds: Bounds, resolution: u8) -> Self {
        Self {
            bounds,
            full_bounds: None,
            resolution,
            points: Vec::new(),
            lines: Vec::new(),
            shapes: Vec::new(),
            sizes: ElementSizes::default(),
            active_points: 0,
            active_indexed_points: 0,
            active_lines: 0,
            active_shapes: 0,
            violations: Vec::new(),
        }
    }

    /// Split into an `nx` by `ny` grid of `bounds`, moving every element into one cell
    ///
    /// Elements go to the cell holding their location; locations outside the grid go to the
    /// nearest edge cell. With `by_contents`, elements are dealt round-robin instead.
    ///
    /// The result holds exactly `nx * ny` areas, possibly empty, with one exception: a 1 by 1
    /// split by contents returns two areas sharing the same bounds.
    pub fn split(self, nx: usize, ny: usize, bounds: &Bounds, by_contents: bool) -> Vec<Area> {
        let (nx, ny) = (nx.max(1), ny.max(1));
        if by_contents {
            let cells = if nx * ny == 1 {
                vec![*bounds; 2]
            } else {
                bounds.split(nx, ny)
            };
            return self.deal(cells);
        }
        self.distribute(bounds.split(nx, ny), nx, ny, bounds, false)
    }

    /// Split into a grid whose inner edges sit on the level's grid, clipping shapes to cells
    ///
    /// Gives the area back unchanged when the aligned grid would have an empty cell.
    pub fn split_aligned(
        self,
        nx: usize,
        ny: usize,
        bounds: &Bounds,
        shift: u8,
    ) -> std::result::Result<Vec<Area>, Area> {
        let (nx, ny) = (nx.max(1), ny.max(1));
        match bounds.split_aligned(nx, ny, shift) {
            Some(cells) => Ok(self.distribute(cells, nx, ny, bounds, true)),
            None => {
                tracing::debug!(?bounds, nx, ny, shift, "no aligned grid for area");
                Err(self)
            }
        }
    }

    fn distribute(
        self,
        cells: Vec<Bounds>,
        nx: usize,
        ny: usize,
        bounds: &Bounds,
        clip: bool,
    ) -> Vec<Area> {
        let n = cells.len();
        let mut used = vec![false; n];

        let point_cells: Vec<usize> = self
            .points
            .iter()
            .map(|p| pick_cell(&cells, nx, ny, &p.location))
            .collect();
        for &i in &point_cells {
            used[i] = true;
        }

        // Zero sized lines only survive as roads
        let mut line_cells: Vec<Option<usize>> = self
            .lines
            .iter()
            .map(|l| (l.is_road() || !l.is_degenerate()).then(|| pick_cell(&cells, nx, ny, &l.location())))
            .collect();
        for &i in line_cells.iter().flatten() {
            used[i] = true;
        }

        let mut shape_places: Vec<Placement> = self
            .shapes
            .iter()
            .map(|s| {
                if clip {
                    place_clipped(&cells, s)
                } else {
                    Placement::Whole(pick_cell(&cells, nx, ny, &s.location()))
                }
            })
            .collect();
        for place in &shape_places {
            match place {
                Placement::Whole(i) => used[*i] = true,
                Placement::Pieces(pieces) => pieces.iter().for_each(|(i, _)| used[*i] = true),
            }
        }

        // Many long ways or big shapes sharing one centre all land in the same half of a
        // near-minimum box; deal them out instead so the split makes progress
        let shifted = bounds.max_dimension() >> (crate::MAX_RESOLUTION - self.resolution);
        if n == 2
            && shifted < 2 * (MIN_DIMENSION + 1)
            && used[0] != used[1]
            && (self.lines.len() > 1 || self.shapes.len() > 1)
        {
            tracing::debug!(?bounds, "all content in one half, dealing lines and shapes round-robin");
            let mut next = 0;
            for cell in line_cells.iter_mut().flatten() {
                next = (next + 1) % n;
                *cell = next;
            }
            if !clip {
                for place in shape_places.iter_mut() {
                    next = (next + 1) % n;
                    *place = Placement::Whole(next);
                }
            }
        }

        let mut areas: Vec<Area> = cells
            .iter()
            .map(|b| Area::empty(*b, self.resolution))
            .collect();
        for (point, i) in self.points.into_iter().zip(point_cells) {
            areas[i].add_point(point);
        }
        for (line, cell) in self.lines.into_iter().zip(line_cells) {
            if let Some(i) = cell {
                areas[i].add_line(line);
            }
        }
        for (shape, place) in self.shapes.into_iter().zip(shape_places) {
            match place {
                Placement::Whole(i) => areas[i].add_shape(shape),
                Placement::Pieces(pieces) => {
                    for (i, piece) in pieces {
                        areas[i].add_shape(piece);
                    }
                }
            }
        }
        areas
    }

    /// Round-robin every element over areas with the given bounds
    fn deal(self, cells: Vec<Bounds>) -> Vec<Area> {
        let n = cells.len();
        let mut areas: Vec<Area> = cells
            .into_iter()
            .map(|b| Area::empty(b, self.resolution))
            .collect();
        let mut next = 0;
        let mut step = || {
            let i = next;
            next = (next + 1) % n;
            i
        };
        for point in self.points {
            areas[step()].add_point(point);
        }
        for line in self.lines {
            areas[step()].add_line(line);
        }
        for shape in self.shapes {
            areas[step()].add_shape(shape);
        }
        areas
    }

    fn add_point(&mut self, point: MapPoint) {
        self.grow(Bounds::of_point(&point.location));
        if point.attrs.is_visible_at(self.resolution) {
            if point.attrs.has_extended_type() {
                self.sizes.add(SizeKind::ExtPoint, POINT_SIZE);
            } else {
                self.sizes.add(SizeKind::Point, POINT_SIZE);
                if point.indexed {
                    self.active_indexed_points += 1;
                } else {
                    self.active_points += 1;
                }
            }
        }
        self.points.push(point);
    }

    fn add_line(&mut self, line: MapLine) {
        self.grow(line.bounds());
        if line.attrs().is_visible_at(self.resolution) {
            let size = estimate_polyline_size(line.len());
            if line.attrs().has_extended_type() {
                self.sizes.add(SizeKind::ExtLine, size);
            } else {
                self.sizes.add(SizeKind::Line, size);
                self.active_lines += record_count(line.len(), MAX_POINTS_IN_LINE);
            }
        }
        self.lines.push(line);
    }

    fn add_shape(&mut self, shape: MapShape) {
        self.grow(shape.bounds());
        if shape.attrs().is_visible_at(self.resolution) {
            let size = estimate_polyline_size(shape.len());
            if shape.attrs().has_extended_type() {
                self.sizes.add(SizeKind::ExtShape, size);
            } else {
                self.sizes.add(SizeKind::Shape, size);
                self.active_shapes += record_count(shape.len(), MAX_POINT_IN_ELEMENT);
            }
        }
        self.shapes.push(shape);
    }

    fn grow(&mut self, other: Bounds) {
        self.full_bounds = Some(match self.full_bounds {
            Some(b) => b.union(&other),
            None => other,
        });
    }

    /// The bounds the area was created with
    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Box covering every element, which may reach past [`Area::bounds`]
    #[inline]
    pub fn full_bounds(&self) -> Option<Bounds> {
        self.full_bounds
    }

    #[inline]
    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    pub fn estimated_sizes(&self) -> &ElementSizes {
        &self.sizes
    }

    /// Total estimated bytes over every kind
    pub fn estimated_size(&self) -> usize {
        self.sizes.total()
    }

    /// Active points, plain and indexed
    pub fn num_points(&self) -> usize {
        self.active_points + self.active_indexed_points
    }

    pub fn num_indexed_points(&self) -> usize {
        self.active_indexed_points
    }

    /// Active line records, counting the pieces long lines will be cut into
    pub fn num_lines(&self) -> usize {
        self.active_lines
    }

    pub fn num_shapes(&self) -> usize {
        self.active_shapes
    }

    pub fn has_data(&self) -> bool {
        !(self.points.is_empty() && self.lines.is_empty() && self.shapes.is_empty())
    }

    /// Number of stored elements of every kind, visible or not
    pub fn element_count(&self) -> usize {
        self.points.len() + self.lines.len() + self.shapes.len()
    }

    /// Hard limits this leaf still breaks after splitting gave up
    pub fn limit_violations(&self) -> &[LimitViolation] {
        &self.violations
    }

    pub(crate) fn set_limit_violations(&mut self, violations: Vec<LimitViolation>) {
        self.violations = violations;
    }

    /// The largest line or shape, by point count
    pub(crate) fn largest_element(&self) -> Option<(u32, usize)> {
        let lines = self.lines.iter().map(|l| (l.attrs().type_code, l.len()));
        let shapes = self.shapes.iter().map(|s| (s.attrs().type_code, s.len()));
        lines.chain(shapes).max_by_key(|&(_, n)| n)
    }

    /// Take the contents out of the area
    pub fn into_contents(self) -> (Vec<MapPoint>, Vec<MapLine>, Vec<MapShape>) {
        (self.points, self.lines, self.shapes)
    }
}

impl MapSource for Area {
    fn bounds(&self) -> Bounds {
        self.bounds
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

/// Index of the grid cell holding `at`, clamped to the edge cells
///
/// `cells` is in column-major order, so column `x` starts at `x * ny`.
fn pick_cell(cells: &[Bounds], nx: usize, ny: usize, at: &Coord) -> usize {
    let x = (0..nx)
        .find(|&x| at.lon() < cells[x * ny].max_lon())
        .unwrap_or(nx - 1);
    let y = (0..ny)
        .find(|&y| at.lat() < cells[y].max_lat())
        .unwrap_or(ny - 1);
    x * ny + y
}

/// Keep a shape whole when it fits one cell, clip it to every cell otherwise
fn place_clipped(cells: &[Bounds], shape: &MapShape) -> Placement {
    if cells.len() == 1 {
        return Placement::Whole(0);
    }
    let sb = shape.bounds();
    // Large shapes may reach a little into the neighbour; small ones need some slack
    let margin = if sb.width().min(sb.height()) > 8 { -2 } else { 2 };
    let probe = sb.expanded(margin);
    if let Some(i) = cells.iter().position(|c| c.contains(&probe)) {
        return Placement::Whole(i);
    }

    let mut pieces = Vec::new();
    for (i, cell) in cells.iter().enumerate() {
        pieces.extend(clip_shape(shape, cell).into_iter().map(|p| (i, p)));
    }
    Placement::Pieces(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Attributes, MapDetails};

    fn point(lat: i32, lon: i32) -> MapPoint {
        MapPoint::new(Attributes::new(0x2f00), Coord::new(lat, lon))
    }

    fn line(points: &[(i32, i32)]) -> MapLine {
        MapLine::new(
            Attributes::new(0x01),
            points.iter().map(|&(a, b)| Coord::new(a, b)).collect(),
        )
    }

    fn square(type_code: u32, lat: i32, lon: i32, size: i32) -> MapShape {
        MapShape::new(
            Attributes::new(type_code),
            vec![
                Coord::new(lat, lon),
                Coord::new(lat, lon + size),
                Coord::new(lat + size, lon + size),
                Coord::new(lat + size, lon),
            ],
        )
    }

    #[test]
    fn test_estimate_polyline_size() {
        assert_eq!(estimate_polyline_size(0), 0);
        assert_eq!(estimate_polyline_size(1), 15);
        assert_eq!(estimate_polyline_size(250), 11 + 1000);
        assert_eq!(estimate_polyline_size(251), 22 + 1004);
    }

    #[test]
    fn test_admission() {
        let mut details = MapDetails::with_bounds(Bounds::new(0, 0, 1000, 1000));
        details.add_point(point(10, 10));
        details.add_point(point(5000, 5000));
        details.add_line(line(&[(0, 0), (100, 100)]));
        details.add_shape(square(0x50, 100, 100, 50));

        // The far point widened the source bounds, so it is inside
        let area = Area::new(&details, 24, false).unwrap();
        assert_eq!(area.points().len(), 2);

        let fixed = Area::new(&FixedBounds(details), 24, false).unwrap();
        assert_eq!(fixed.points().len(), 1);
        assert_eq!(fixed.lines().len(), 1);
        assert_eq!(fixed.shapes().len(), 1);
        assert_eq!(fixed.num_points(), 1);
        assert_eq!(fixed.num_lines(), 1);
        assert_eq!(fixed.num_shapes(), 1);
        let sizes = fixed.estimated_sizes();
        assert_eq!(sizes.get(SizeKind::Point), 9);
        assert_eq!(sizes.get(SizeKind::Line), 11 + 8);
        assert_eq!(sizes.get(SizeKind::Shape), 11 + 20);
        assert_eq!(fixed.estimated_size(), 9 + 19 + 31);
    }

    #[test]
    fn test_malformed_elements_dropped() {
        let mut details = MapDetails::with_bounds(Bounds::new(0, 0, 1000, 1000));
        details.add_line(line(&[(5, 5)]));
        details.add_line(line(&[(0, 0), (100, 100)]));
        details.add_shape(MapShape::new(
            Attributes::new(0x50),
            vec![Coord::new(0, 0), Coord::new(0, 5)],
        ));

        let area = Area::new(&details, 24, false).unwrap();
        assert_eq!(area.lines().len(), 1);
        assert!(area.shapes().is_empty());
    }

    /// Source whose bounds stay at 0..1000 whatever it holds
    struct FixedBounds(MapDetails);

    impl MapSource for FixedBounds {
        fn bounds(&self) -> Bounds {
            Bounds::new(0, 0, 1000, 1000)
        }
        fn points(&self) -> &[MapPoint] {
            self.0.points()
        }
        fn lines(&self) -> &[MapLine] {
            self.0.lines()
        }
        fn shapes(&self) -> &[MapShape] {
            self.0.shapes()
        }
    }

    #[test]
    fn test_admission_splits_oversized_lines() {
        let mut details = MapDetails::new();
        details.add_line(line(&[(0, 0), (0, 100_000)]));
        let area = Area::new(&details, 24, false).unwrap();
        assert!(area.lines().len() >= 4);
        for l in area.lines() {
            assert!(l.bounds().max_dimension() <= 0x8000);
        }
    }

    #[test]
    fn test_admission_clips_shapes() {
        let mut details = MapDetails::with_bounds(Bounds::new(0, 0, 100, 100));
        details.add_shape(square(0x50, 50, 50, 100));
        let area = Area::new(&FixedBoundsOf(details, Bounds::new(0, 0, 100, 100)), 24, true).unwrap();
        assert_eq!(area.shapes().len(), 1);
        assert!(area.shapes()[0].is_clipped());
        assert_eq!(area.shapes()[0].bounds(), Bounds::new(50, 50, 100, 100));
    }

    struct FixedBoundsOf(MapDetails, Bounds);

    impl MapSource for FixedBoundsOf {
        fn bounds(&self) -> Bounds {
            self.1
        }
        fn points(&self) -> &[MapPoint] {
            self.0.points()
        }
        fn lines(&self) -> &[MapLine] {
            self.0.lines()
        }
        fn shapes(&self) -> &[MapShape] {
            self.0.shapes()
        }
    }

    #[test]
    fn test_counters_skip_invisible_and_extended() {
        let mut area = Area::empty(Bounds::new(0, 0, 100, 100), 20);
        area.add_point(point(1, 1));
        area.add_point(MapPoint::new(
            Attributes::new(0x2f00).with_resolutions(22, 24),
            Coord::new(2, 2),
        ));
        area.add_point(MapPoint::new(Attributes::new(0x10100), Coord::new(3, 3)));
        area.add_point(point(4, 4).indexed());
        assert_eq!(area.num_points(), 2);
        assert_eq!(area.num_indexed_points(), 1);
        assert_eq!(area.estimated_sizes().get(SizeKind::Point), 18);
        assert_eq!(area.estimated_sizes().get(SizeKind::ExtPoint), 9);
        assert_eq!(area.points().len(), 4);
    }

    #[test]
    fn test_split_grid_assignment() {
        let bounds = Bounds::new(0, 0, 100, 200);
        let mut area = Area::empty(bounds, 24);
        area.add_point(point(10, 10));
        area.add_point(point(90, 190));
        area.add_point(point(-50, 500));
        area.add_line(line(&[(10, 110), (20, 120)]));

        let parts = area.split(2, 2, &bounds, false);
        assert_eq!(parts.len(), 4);
        // Column-major: index = x * ny + y
        assert_eq!(parts[0].points().len(), 1);
        assert_eq!(parts[3].points().len(), 1);
        // Out of range goes to the nearest edge cell (x = 1, y = 0)
        assert_eq!(parts[2].points().len(), 1);
        assert_eq!(parts[2].lines().len(), 1);
        assert!(!parts[1].has_data());
        for part in &parts {
            assert!(bounds.contains(&part.bounds()));
        }
    }

    #[test]
    fn test_split_conserves_elements() {
        let bounds = Bounds::new(0, 0, 1000, 1000);
        let mut area = Area::empty(bounds, 24);
        for i in 0..50 {
            area.add_point(point(i * 19 % 1000, i * 37 % 1000));
            area.add_line(line(&[(i * 13 % 1000, i * 7 % 1000), (i * 13 % 1000 + 5, i * 7 % 1000 + 5)]));
            area.add_shape(square(0x50, i * 17 % 900, i * 11 % 900, 20));
        }
        let parts = area.split(3, 2, &bounds, false);
        assert_eq!(parts.len(), 6);
        let total: usize = parts.iter().map(Area::element_count).sum();
        assert_eq!(total, 150);
        for part in &parts {
            if let Some(full) = part.full_bounds() {
                for l in part.lines() {
                    assert!(full.contains(&l.bounds()));
                }
                for s in part.shapes() {
                    assert!(full.contains(&s.bounds()));
                }
            }
        }
    }

    #[test]
    fn test_split_drops_zero_sized_lines_except_roads() {
        let bounds = Bounds::new(0, 0, 100, 100);
        let mut area = Area::empty(bounds, 24);
        area.add_line(line(&[(5, 5), (5, 5)]));
        area.add_line(line(&[(5, 5), (5, 5)]).into_road());
        let parts = area.split(1, 1, &bounds, false);
        assert_eq!(parts[0].lines().len(), 1);
        assert!(parts[0].lines()[0].is_road());
    }

    #[test]
    fn test_content_split() {
        let bounds = Bounds::new(0, 0, 10, 10);
        let mut area = Area::empty(bounds, 24);
        for _ in 0..5 {
            area.add_line(line(&[(0, 0), (10, 10)]));
        }
        let parts = area.split(1, 1, &bounds, true);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].bounds(), parts[1].bounds());
        assert_eq!(parts[0].lines().len() + parts[1].lines().len(), 5);
        assert!(parts[0].lines().len().abs_diff(parts[1].lines().len()) <= 1);

        // Any other grid keeps its cell count, empty cells included
        assert_eq!(Area::empty(bounds, 24).split(3, 2, &bounds, true).len(), 6);
        assert_eq!(Area::empty(bounds, 24).split(3, 2, &bounds, false).len(), 6);
    }

    #[test]
    fn test_coincident_lines_dealt_out() {
        // Small box, every line centred in the right half
        let bounds = Bounds::new(0, 0, 20, 20);
        let mut area = Area::empty(bounds, 24);
        for _ in 0..4 {
            area.add_line(line(&[(0, 12), (20, 18)]));
        }
        let parts = area.split(2, 1, &bounds, false);
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].lines().len(), 2);
        assert_eq!(parts[1].lines().len(), 2);
    }

    #[test]
    fn test_split_aligned_clips_straddling_shapes() {
        let bounds = Bounds::new(0, 0, 64, 128);
        let mut area = Area::empty(bounds, 20);
        area.add_shape(square(0x50, 10, 40, 48));
        area.add_shape(square(0x50, 10, 4, 20));

        let parts = area.split_aligned(2, 1, &bounds, 4).unwrap();
        assert_eq!(parts.len(), 2);
        assert_eq!(parts[0].bounds().max_lon(), 64);
        // The small square stays whole on the left, the big one is cut in two
        assert_eq!(parts[0].shapes().len(), 2);
        assert_eq!(parts[1].shapes().len(), 1);
        assert!(parts[1].shapes()[0].is_clipped());
        assert!(parts.iter().flat_map(|p| p.shapes()).filter(|s| !s.is_clipped()).count() == 1);
    }

    #[test]
    fn test_split_aligned_gives_area_back() {
        let bounds = Bounds::new(0, 0, 8, 8);
        let mut area = Area::empty(bounds, 20);
        area.add_point(point(1, 1));
        let back = area.split_aligned(2, 1, &bounds, 4).unwrap_err();
        assert_eq!(back.points().len(), 1);
    }
}

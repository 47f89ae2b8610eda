//! Polygon splitting by boolean clipping
//!
//! All splitters share one step: take the ring's bounding box, cut it in half across its longer
//! side and intersect the polygon with each half. Pieces that still fail the splitter's test are
//! cut again until everything passes. The variants differ only in their test.

use super::{Filter, FilterConfig, Flow, Next};
use crate::area::estimate_polyline_size;
use crate::geometry::{multipolygon_to_rings, ring_to_polygon};
use crate::splitter::{MAX_RGN_SIZE, MAX_XT_SHAPES_SIZE};
use crate::{Bounds, Element, MapShape, Result};

use geo::{BooleanOps, LineString, Polygon, Rect};
use std::collections::VecDeque;

/// Most points a single shape record can hold
pub const MAX_POINT_IN_ELEMENT: usize = 250;

/// Largest shape extent in shifted units
const MAX_SIZE: i32 = 0x7fff;

/// The map background polygon covers everything and is never split for size
const BACKGROUND_TYPE: u32 = 0x4a;

/// Cut `shape` in two across the longer side of its bounding box
///
/// Each half may come back as several rings, every one with a smaller box than the input. A
/// shape that cannot be cut that way (no area, or a box one unit across) yields nothing.
pub fn split_shape(shape: &MapShape) -> Vec<MapShape> {
    let Some((min, max)) = raw_extent(shape) else {
        return Vec::new();
    };
    let (width, height) = (max.x - min.x, max.y - min.y);
    if width <= 0.0 || height <= 0.0 || width.max(height) < 2.0 {
        return Vec::new();
    }

    let (r1, r2) = if width > height {
        let half = (width / 2.0).floor();
        (
            Rect::new(min, geo::Coord { x: min.x + half, y: max.y }),
            Rect::new(geo::Coord { x: min.x + half, y: min.y }, max),
        )
    } else {
        let half = (height / 2.0).floor();
        (
            Rect::new(min, geo::Coord { x: max.x, y: min.y + half }),
            Rect::new(geo::Coord { x: min.x, y: min.y + half }, max),
        )
    };

    let polygon = ring_to_polygon(shape.points());
    let mut pieces = intersect(shape, &polygon, &r1.to_polygon());
    pieces.extend(intersect(shape, &polygon, &r2.to_polygon()));
    if pieces.iter().any(|piece| piece.bounds() == shape.bounds()) {
        return Vec::new();
    }
    pieces
}

/// Clip `shape` to `bounds`
///
/// A shape already inside the bounds comes back unchanged; clipped pieces are marked as such.
pub fn clip_shape(shape: &MapShape, bounds: &Bounds) -> Vec<MapShape> {
    if bounds.contains(&shape.bounds()) {
        return vec![shape.clone()];
    }
    if !bounds.intersects(&shape.bounds()) {
        return Vec::new();
    }
    let polygon = ring_to_polygon(shape.points());
    intersect(shape, &polygon, &bounds.to_rect().to_polygon())
        .into_iter()
        .map(MapShape::mark_clipped)
        .collect()
}

/// Split until every piece passes `is_ok`, using an explicit work queue
///
/// Every cut shrinks the pieces' boxes, so the queue drains. A piece that fails `is_ok` but
/// cannot be cut again is kept as it is.
fn split_until(shape: &MapShape, is_ok: impl Fn(&MapShape) -> bool) -> Vec<MapShape> {
    let mut done = Vec::new();
    let mut queue = VecDeque::from([shape.clone()]);
    while let Some(piece) = queue.pop_front() {
        if is_ok(&piece) {
            done.push(piece);
            continue;
        }
        let halves = split_shape(&piece);
        if halves.is_empty() {
            tracing::warn!(
                type_code = piece.attrs().type_code,
                points = piece.len(),
                "shape too large but cannot be split any further, keeping it"
            );
            done.push(piece);
        } else {
            queue.extend(halves);
        }
    }
    done
}

/// Forward every piece, combining their flows
fn forward_all(pieces: Vec<MapShape>, next: &mut Next<'_, '_>) -> Result<Flow> {
    let mut flow = Flow::Emitted;
    for piece in pieces {
        flow = flow.and(next.proceed(piece.into())?);
    }
    Ok(flow)
}

fn intersect(prototype: &MapShape, polygon: &Polygon<f64>, clip: &Polygon<f64>) -> Vec<MapShape> {
    multipolygon_to_rings(&polygon.intersection(clip))
        .into_iter()
        .map(|ring| prototype.with_points(ring))
        .collect()
}

fn raw_extent(shape: &MapShape) -> Option<(geo::Coord<f64>, geo::Coord<f64>)> {
    let ls: LineString<f64> = shape.points().iter().map(|c| c.to_geo()).collect();
    let rect = geo::BoundingRect::bounding_rect(&ls)?;
    Some((rect.min(), rect.max()))
}

/// Split shapes with too many points for one record
#[derive(Debug)]
pub struct PolygonSplitterFilter {
    max_points: usize,
}

impl PolygonSplitterFilter {
    pub fn new() -> Self {
        Self::with_max_points(MAX_POINT_IN_ELEMENT)
    }

    /// Use a different point limit (at least 5)
    pub fn with_max_points(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(5),
        }
    }
}

impl Default for PolygonSplitterFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for PolygonSplitterFilter {
    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        let shape = element.into_shape("PolygonSplitterFilter")?;
        if shape.len() < self.max_points {
            return next.proceed(shape.into());
        }
        let max_points = self.max_points;
        let pieces = split_until(&shape, |s| s.len() < max_points);
        tracing::debug!(
            points = shape.len(),
            pieces = pieces.len(),
            "split shape with too many points"
        );
        forward_all(pieces, next)
    }
}

/// Split shapes whose extent is too large at the current level
#[derive(Debug, Default)]
pub struct PolygonSizeSplitterFilter {
    max_size: i32,
}

impl PolygonSizeSplitterFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_size_ok(&self, shape: &MapShape) -> bool {
        shape.attrs().type_code == BACKGROUND_TYPE
            || shape.bounds().max_dimension() < self.max_size
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for PolygonSizeSplitterFilter {
    fn init(&mut self, config: &FilterConfig) {
        self.max_size = MAX_SIZE << config.shift().min(16);
    }

    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        let shape = element.into_shape("PolygonSizeSplitterFilter")?;
        if self.is_size_ok(&shape) {
            return next.proceed(shape.into());
        }
        let pieces = split_until(&shape, |s| self.is_size_ok(s));
        forward_all(pieces, next)
    }
}

/// Split shapes that could never fit a single subdivision
///
/// Checks the estimated record size against the region (or extended-type) budget and the
/// extent against the subdivision extent limit.
#[derive(Debug, Default)]
pub struct PolygonSubdivSizeSplitterFilter {
    max_size: i32,
}

impl PolygonSubdivSizeSplitterFilter {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_size_ok(&self, shape: &MapShape) -> bool {
        let size = estimate_polyline_size(shape.len());
        let budget = if shape.attrs().has_extended_type() {
            MAX_XT_SHAPES_SIZE
        } else {
            MAX_RGN_SIZE
        };
        size <= budget && shape.bounds().max_dimension() <= self.max_size
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for PolygonSubdivSizeSplitterFilter {
    fn init(&mut self, config: &FilterConfig) {
        // 0x8000 keeps generated full-tile polygons in one piece
        self.max_size = (MAX_SIZE << config.shift().min(16)).max(0x8000);
    }

    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        let shape = element.into_shape("PolygonSubdivSizeSplitterFilter")?;
        if self.is_size_ok(&shape) {
            return next.proceed(shape.into());
        }
        let pieces = split_until(&shape, |s| self.is_size_ok(s));
        tracing::debug!(
            points = shape.len(),
            max_dimension = shape.bounds().max_dimension(),
            pieces = pieces.len(),
            "split shape too large for a subdivision"
        );
        forward_all(pieces, next)
    }
}

/// Forward shapes as they are and bisect only those a later stage reports as too large
///
/// [`Flow::NeedsSplit`] coming back from the rest of the chain stops here: the shape is cut in
/// two and each half is tried again. A shape that cannot be cut any further is forwarded one last
/// time and kept whatever the answer.
#[derive(Debug, Default)]
pub struct ReactivePolygonSplitterFilter {
    retries: usize,
}

impl ReactivePolygonSplitterFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bisections done so far
    #[inline]
    pub fn retries(&self) -> usize {
        self.retries
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for ReactivePolygonSplitterFilter {
    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        let shape = element.into_shape("ReactivePolygonSplitterFilter")?;
        let mut pending = vec![shape];
        while let Some(shape) = pending.pop() {
            if next.proceed(shape.clone().into())? == Flow::Emitted {
                continue;
            }
            let halves = split_shape(&shape);
            if halves.is_empty() {
                tracing::warn!(
                    type_code = shape.attrs().type_code,
                    points = shape.len(),
                    "shape still too large but cannot be split any further, keeping it"
                );
                let _ = next.proceed(shape.into())?;
                continue;
            }
            self.retries += 1;
            tracing::debug!(
                points = shape.len(),
                halves = halves.len(),
                "downstream needs a smaller shape, bisecting"
            );
            pending.extend(halves.into_iter().rev());
        }
        Ok(Flow::Emitted)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{run_filter, shape};
    use super::super::{Collector, FilterChain};
    use super::*;
    use crate::geometry::signed_area2;
    use crate::{Attributes, Coord};

    /// Ring of a 100 x 100 box with square teeth along every side, 600+ corners, all on the
    /// integer grid so every cut lands on whole units
    fn toothed_box() -> MapShape {
        let mut pts = Vec::new();
        for k in 0..75 {
            let x = 10 + k;
            let (a, b) = if k % 2 == 0 { (0, 5) } else { (5, 0) };
            pts.push((a, x));
            pts.push((b, x));
        }
        pts.push((0, 100));
        for k in 0..75 {
            let y = 10 + k;
            let (a, b) = if k % 2 == 0 { (100, 95) } else { (95, 100) };
            pts.push((y, a));
            pts.push((y, b));
        }
        pts.push((100, 100));
        for k in 0..75 {
            let x = 90 - k;
            let (a, b) = if k % 2 == 0 { (100, 95) } else { (95, 100) };
            pts.push((a, x));
            pts.push((b, x));
        }
        pts.push((100, 0));
        for k in 0..75 {
            let y = 90 - k;
            let (a, b) = if k % 2 == 0 { (0, 5) } else { (5, 0) };
            pts.push((y, a));
            pts.push((y, b));
        }
        MapShape::new(
            Attributes::new(0x3c).with_label("Lake"),
            shape(&pts).into_points(),
        )
    }

    fn area(points: &[Coord]) -> i64 {
        signed_area2(points).abs()
    }

    /// Terminal stage that refuses shapes with more than `limit` points
    struct PointLimit<'a> {
        limit: usize,
        out: &'a mut Vec<Element>,
    }

    impl Filter for PointLimit<'_> {
        fn apply(&mut self, element: Element, _next: &mut Next<'_, '_>) -> Result<Flow> {
            if element.points().len() > self.limit {
                return Ok(Flow::NeedsSplit);
            }
            self.out.push(element);
            Ok(Flow::Emitted)
        }
    }

    /// Terminal stage that records everything and always asks for a smaller shape
    struct AlwaysTooLarge<'a> {
        seen: &'a mut Vec<Element>,
    }

    impl Filter for AlwaysTooLarge<'_> {
        fn apply(&mut self, element: Element, _next: &mut Next<'_, '_>) -> Result<Flow> {
            self.seen.push(element);
            Ok(Flow::NeedsSplit)
        }
    }

    fn run_always_too_large(input: MapShape) -> Vec<Element> {
        let mut seen = Vec::new();
        {
            let mut chain = FilterChain::new(FilterConfig::new(24, Bounds::new(0, 0, 10, 10)));
            chain.add(ReactivePolygonSplitterFilter::new());
            chain.add(AlwaysTooLarge { seen: &mut seen });
            assert_eq!(chain.start(input.into()).unwrap(), Flow::Emitted);
        }
        seen
    }

    #[test]
    fn test_many_points_split_by_count() {
        let input = toothed_box();
        assert!(input.len() > 600);
        let input_area = area(input.points());

        let out = run_filter(PolygonSplitterFilter::new(), 24, vec![input.clone().into()]).unwrap();
        assert!(out.len() >= 3, "got {} pieces", out.len());
        let mut total = 0;
        for piece in &out {
            assert!(piece.points().len() < MAX_POINT_IN_ELEMENT);
            assert_eq!(piece.attrs(), input.attrs());
            assert_eq!(piece.points().first(), piece.points().last());
            total += area(piece.points());
        }
        let diff = (total - input_area).abs() as f64;
        assert!(diff <= input_area as f64 * 0.01, "{total} vs {input_area}");
    }

    #[test]
    fn test_small_shape_passes() {
        let input = shape(&[(0, 0), (0, 10), (10, 10), (10, 0)]);
        let out = run_filter(PolygonSplitterFilter::new(), 24, vec![input.clone().into()]).unwrap();
        assert_eq!(out, vec![Element::Shape(input)]);
    }

    #[test]
    fn test_split_shape_halves_longer_side() {
        let input = shape(&[(0, 0), (0, 100), (40, 100), (40, 0)]);
        let halves = split_shape(&input);
        assert_eq!(halves.len(), 2);
        for half in &halves {
            assert_eq!(half.bounds().width(), 50);
            assert_eq!(half.bounds().height(), 40);
            assert_eq!(area(half.points()), 2 * 50 * 40);
        }
    }

    #[test]
    fn test_split_shape_drops_flat_shapes() {
        let flat = shape(&[(0, 0), (0, 100), (0, 50)]);
        assert!(split_shape(&flat).is_empty());
    }

    #[test]
    fn test_unit_square_cannot_be_split() {
        let unit = shape(&[(0, 0), (0, 1), (1, 1), (1, 0)]);
        assert!(split_shape(&unit).is_empty());

        let bar = shape(&[(0, 0), (0, 2), (1, 2), (1, 0)]);
        let halves = split_shape(&bar);
        assert_eq!(halves.len(), 2);
        assert!(halves.iter().all(|h| h.bounds().max_dimension() == 1));
    }

    #[test]
    fn test_reactive_stops_at_smallest_pieces() {
        let input = shape(&[(0, 0), (0, 10), (10, 10), (10, 0)]);
        let seen = run_always_too_large(input);

        // The square ends up as 100 unit squares, each offered once more after the last refusal
        let units: Vec<&Element> = seen
            .iter()
            .filter(|e| e.bounds().max_dimension() == 1)
            .collect();
        assert_eq!(units.len(), 200);
        let total: i64 = units.iter().map(|e| area(e.points())).sum();
        assert_eq!(total, 2 * 2 * 100);
    }

    #[test]
    fn test_reactive_keeps_shape_it_cannot_split() {
        let unit = shape(&[(0, 0), (0, 1), (1, 1), (1, 0)]);
        let seen = run_always_too_large(unit.clone());
        assert_eq!(seen, vec![Element::Shape(unit.clone()), Element::Shape(unit)]);
    }

    #[test]
    fn test_size_splitter() {
        let input = shape(&[(0, 0), (0, 100_000), (1000, 100_000), (1000, 0)]);
        let out = run_filter(PolygonSizeSplitterFilter::new(), 24, vec![input.into()]).unwrap();
        assert!(out.len() >= 4);
        for piece in &out {
            assert!(piece.bounds().max_dimension() < MAX_SIZE);
        }
        let total: i64 = out.iter().map(|p| area(p.points())).sum();
        assert_eq!(total, 2 * 100_000 * 1000);
    }

    #[test]
    fn test_size_splitter_scales_with_shift() {
        // 100000 units is below 0x7fff << 2
        let input = shape(&[(0, 0), (0, 100_000), (1000, 100_000), (1000, 0)]);
        let out = run_filter(PolygonSizeSplitterFilter::new(), 22, vec![input.into()]).unwrap();
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_subdiv_size_splitter() {
        let input = shape(&[(0, 0), (0, 0x10000), (100, 0x10000), (100, 0)]);
        let out =
            run_filter(PolygonSubdivSizeSplitterFilter::new(), 24, vec![input.into()]).unwrap();
        assert_eq!(out.len(), 2);
        for piece in &out {
            assert!(piece.bounds().max_dimension() <= 0x8000);
        }
    }

    #[test]
    fn test_reactive_splits_on_demand() {
        // Extra points along the long sides so halves carry fewer points
        let mut pts: Vec<(i32, i32)> = (0..=10).map(|i| (0, i * 10)).collect();
        pts.extend((0..=10).rev().map(|i| (40, i * 10)));
        let input = shape(&pts);
        let input_area = area(input.points());

        let mut out = Vec::new();
        {
            let config = FilterConfig::new(24, Bounds::new(0, 0, 100, 100));
            let mut chain = FilterChain::new(config);
            chain.add(ReactivePolygonSplitterFilter::new());
            chain.add(PointLimit {
                limit: 10,
                out: &mut out,
            });
            assert_eq!(chain.start(input.into()).unwrap(), Flow::Emitted);
        }
        assert!(out.len() >= 2);
        for piece in &out {
            assert!(piece.points().len() <= 10);
        }
        let total: i64 = out.iter().map(|p| area(p.points())).sum();
        assert_eq!(total, input_area);
    }

    #[test]
    fn test_reactive_passes_accepted_shapes() {
        let input = shape(&[(0, 0), (0, 10), (10, 10), (10, 0)]);
        let mut out = Vec::new();
        {
            let mut chain = FilterChain::new(FilterConfig::new(24, Bounds::new(0, 0, 10, 10)));
            chain.add(ReactivePolygonSplitterFilter::new());
            chain.add(Collector::new(&mut out));
            assert_eq!(chain.start(input.clone().into()).unwrap(), Flow::Emitted);
        }
        assert_eq!(out, vec![Element::Shape(input)]);
    }

    #[test]
    fn test_clip_shape() {
        let input = shape(&[(0, 0), (0, 100), (100, 100), (100, 0)]);
        let inside = clip_shape(&input, &Bounds::new(-10, -10, 110, 110));
        assert_eq!(inside, vec![input.clone()]);
        assert!(!inside[0].is_clipped());

        let pieces = clip_shape(&input, &Bounds::new(0, 0, 50, 100));
        assert_eq!(pieces.len(), 1);
        assert!(pieces[0].is_clipped());
        assert_eq!(area(pieces[0].points()), 2 * 50 * 100);

        assert!(clip_shape(&input, &Bounds::new(500, 500, 600, 600)).is_empty());
    }

    #[test]
    fn test_rejects_lines() {
        let line = crate::MapLine::new(Attributes::new(1), vec![Coord::new(0, 0), Coord::new(1, 1)]);
        assert!(run_filter(PolygonSplitterFilter::new(), 24, vec![line.into()]).is_err());
    }
}

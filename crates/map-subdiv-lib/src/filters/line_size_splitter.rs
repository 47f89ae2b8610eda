use super::{Filter, FilterConfig, Flow, Next};
use crate::{Coord, Element, Result};

/// Largest extent a line may have in shifted units
pub const MAX_SIZE: i32 = 0x7fff;

/// Cut lines whose bounding box is too large for a single subdivision
///
/// Segments longer than the limit first get midpoints inserted, then points are collected
/// until the running bounding box overflows; each part starts with the last point of the
/// previous one.
#[derive(Debug, Default)]
pub struct LineSizeSplitterFilter {
    max_size: i32,
}

impl LineSizeSplitterFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size limit in map units for the given shift
    pub fn max_size_for_shift(shift: u8) -> i32 {
        let shift = u32::from(shift.min(16));
        let scaled = (i64::from(MAX_SIZE) << shift).max(0x8000);
        scaled.min((1 << 24) - 1) as i32
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for LineSizeSplitterFilter {
    fn init(&mut self, config: &FilterConfig) {
        self.max_size = Self::max_size_for_shift(config.shift());
    }

    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        let line = element.into_line("LineSizeSplitterFilter")?;
        if line.bounds().max_dimension() < self.max_size {
            return next.proceed(line.into());
        }
        if line.is_road() {
            tracing::error!(
                type_code = line.attrs().type_code,
                max_dimension = line.bounds().max_dimension(),
                "road is too large and gets split, routing across the cut will be broken"
            );
        } else {
            tracing::debug!(
                max_dimension = line.bounds().max_dimension(),
                "line bbox too big, splitting"
            );
        }

        // A slightly smaller limit gives better results when subdivisions are created later
        let points = insert_midpoints(line.points(), self.max_size - 10);

        let mut flow = Flow::Emitted;
        let mut dim = Dim::new();
        let mut part: Vec<Coord> = Vec::new();
        let mut prev: Option<Coord> = None;
        for co in points {
            dim.add(&co);
            if let Some(p) = prev {
                if dim.max_dimension() > self.max_size {
                    let chunk = std::mem::replace(&mut part, vec![p]);
                    flow = flow.and(next.proceed(line.with_points(chunk).into())?);
                    dim = Dim::new();
                    dim.add(&p);
                    dim.add(&co);
                }
            }
            part.push(co);
            prev = Some(co);
        }
        if part.len() > 1 {
            flow = flow.and(next.proceed(line.with_points(part).into())?);
        }
        Ok(flow)
    }
}

/// Insert midpoints until no segment spans more than `max_size` on either axis
fn insert_midpoints(points: &[Coord], max_size: i32) -> Vec<Coord> {
    let mut result = Vec::with_capacity(points.len());
    let mut pending: Vec<(Coord, Coord)> = Vec::new();
    if let Some(first) = points.first() {
        result.push(*first);
    }
    for w in points.windows(2) {
        // Depth-first on the left half keeps the output in order
        pending.push((w[0], w[1]));
        while let Some((p1, p2)) = pending.pop() {
            let width = (p1.lon() as i64 - p2.lon() as i64).abs();
            let height = (p1.lat() as i64 - p2.lat() as i64).abs();
            if width > max_size as i64 || height > max_size as i64 {
                let mid = p1.between(&p2, 0.5);
                pending.push((mid, p2));
                pending.push((p1, mid));
            } else {
                result.push(p2);
            }
        }
    }
    result
}

/// Running bounding box of a part
struct Dim {
    min_lat: i32,
    min_lon: i32,
    max_lat: i32,
    max_lon: i32,
}

impl Dim {
    fn new() -> Self {
        Self {
            min_lat: i32::MAX,
            min_lon: i32::MAX,
            max_lat: i32::MIN,
            max_lon: i32::MIN,
        }
    }

    fn add(&mut self, co: &Coord) {
        self.min_lat = self.min_lat.min(co.lat());
        self.max_lat = self.max_lat.max(co.lat());
        self.min_lon = self.min_lon.min(co.lon());
        self.max_lon = self.max_lon.max(co.lon());
    }

    fn max_dimension(&self) -> i32 {
        (self.max_lon - self.min_lon).max(self.max_lat - self.min_lat)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{line, run_filter, shape};
    use super::*;

    #[test]
    fn test_max_size_for_shift() {
        assert_eq!(LineSizeSplitterFilter::max_size_for_shift(0), 0x8000);
        assert_eq!(LineSizeSplitterFilter::max_size_for_shift(2), 0x7fff << 2);
        assert_eq!(
            LineSizeSplitterFilter::max_size_for_shift(20),
            (1 << 24) - 1
        );
    }

    #[test]
    fn test_small_line_passes() {
        let input = line(&[(0, 0), (100, 100), (0, 200)]);
        let out = run_filter(LineSizeSplitterFilter::new(), 24, vec![input.clone().into()]).unwrap();
        assert_eq!(out, vec![Element::Line(input)]);
    }

    #[test]
    fn test_long_line_is_split() {
        let pts: Vec<(i32, i32)> = (0..=100).map(|i| (0, i * 1000)).collect();
        let out = run_filter(LineSizeSplitterFilter::new(), 24, vec![line(&pts).into()]).unwrap();
        assert!(out.len() >= 4);
        for pair in out.windows(2) {
            assert_eq!(pair[0].points().last(), pair[1].points().first());
        }
        for part in &out {
            assert!(part.bounds().max_dimension() <= 0x8000 + 1);
        }
        assert_eq!(out[0].points()[0], crate::Coord::new(0, 0));
        assert_eq!(
            out.last().unwrap().points().last(),
            Some(&crate::Coord::new(0, 100_000))
        );
    }

    #[test]
    fn test_long_segment_gets_midpoints() {
        let out = run_filter(
            LineSizeSplitterFilter::new(),
            24,
            vec![line(&[(0, 0), (0, 200_000)]).into()],
        )
        .unwrap();
        assert!(out.len() >= 7);
        for part in &out {
            assert!(part.points().len() >= 2);
            assert!(part.bounds().max_dimension() <= 0x8000 + 1);
        }
    }

    #[test]
    fn test_insert_midpoints_keeps_order() {
        let pts = [Coord::new(0, 0), Coord::new(0, 100), Coord::new(0, 110)];
        let out = insert_midpoints(&pts, 30);
        assert_eq!(out.first(), Some(&Coord::new(0, 0)));
        assert_eq!(out.last(), Some(&Coord::new(0, 110)));
        for w in out.windows(2) {
            assert!(w[0].lon() < w[1].lon());
            assert!(w[1].lon() - w[0].lon() <= 30);
        }
    }

    #[test]
    fn test_rejects_shapes() {
        let ring = shape(&[(0, 0), (0, 10), (10, 10)]);
        assert!(run_filter(LineSizeSplitterFilter::new(), 24, vec![ring.into()]).is_err());
    }
}

use super::{Filter, FilterConfig, Flow, Next};
use crate::{Coord, Element, Result};

/// Douglas-Peucker simplification with a tolerance that scales with the level's shift
///
/// The tolerance is `filter_distance * 2^shift` map units, so the filter does nothing at shift 0.
/// Preserved points split the line into independent runs, each simplified on its own, so they
/// always survive along with the shape of the line on both sides of them.
#[derive(Debug)]
pub struct DouglasPeuckerFilter {
    filter_distance: f64,
    max_error: f64,
}

impl DouglasPeuckerFilter {
    /// `filter_distance` is the tolerance at the finest resolution, in map units
    pub fn new(filter_distance: f64) -> Self {
        Self {
            filter_distance,
            max_error: 0.0,
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for DouglasPeuckerFilter {
    fn init(&mut self, config: &FilterConfig) {
        self.max_error = match config.shift() {
            0 => 0.0,
            shift => self.filter_distance * f64::from(1u32 << shift),
        };
    }

    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        element.expect_polyline("DouglasPeuckerFilter")?;
        if self.max_error <= 0.0 || element.points().len() <= 2 {
            return next.proceed(element);
        }

        let simplified = simplify(element.points(), self.max_error);
        if simplified.len() == element.points().len() {
            return next.proceed(element);
        }
        let element = element.with_points(simplified, "DouglasPeuckerFilter")?;
        next.proceed(element)
    }
}

/// Simplify `points`, treating every preserved point as a fixed run boundary
pub(crate) fn simplify(points: &[Coord], max_error: f64) -> Vec<Coord> {
    let n = points.len();
    let mut keep = vec![false; n];
    keep[0] = true;
    keep[n - 1] = true;

    let mut end = n - 1;
    for i in (1..n - 1).rev() {
        if points[i].is_preserved() {
            keep[i] = true;
            mark_kept(points, i, end, max_error, &mut keep);
            end = i;
        }
    }
    mark_kept(points, 0, end, max_error, &mut keep);

    points
        .iter()
        .zip(keep)
        .filter_map(|(p, k)| k.then_some(*p))
        .collect()
}

/// Mark the points of `start..=end` that have to stay, using an explicit work stack
fn mark_kept(points: &[Coord], start: usize, end: usize, max_error: f64, keep: &mut [bool]) {
    let mut stack = vec![(start, end)];
    while let Some((start, end)) = stack.pop() {
        if end <= start + 1 {
            continue;
        }
        let a = &points[start];
        let b = &points[end];
        let mut max_distance = 0.0;
        let mut max_index = end;
        for i in (start + 1..end).rev() {
            let distance = distance_to_segment(&points[i], a, b);
            if distance > max_distance {
                max_distance = distance;
                max_index = i;
            }
        }
        if max_distance > max_error {
            keep[max_index] = true;
            stack.push((start, max_index));
            stack.push((max_index, end));
        }
    }
}

/// Distance from `p` to the segment `a`-`b`, falling back to the nearest end point when the
/// projection lies outside the segment or the segment has no length
fn distance_to_segment(p: &Coord, a: &Coord, b: &Coord) -> f64 {
    let dx = (b.lon() - a.lon()) as f64;
    let dy = (b.lat() - a.lat()) as f64;
    let len2 = dx * dx + dy * dy;
    let frac = if len2 == 0.0 {
        0.0
    } else {
        ((p.lon() - a.lon()) as f64 * dx + (p.lat() - a.lat()) as f64 * dy) / len2
    };
    if frac <= 0.0 {
        a.distance(p)
    } else if frac >= 1.0 {
        b.distance(p)
    } else {
        let cross = dx * (p.lat() - a.lat()) as f64 - dy * (p.lon() - a.lon()) as f64;
        cross.abs() / len2.sqrt()
    }
}

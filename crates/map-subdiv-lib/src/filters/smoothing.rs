use super::{Filter, FilterConfig, Flow, Next};
use crate::{Coord, Element, Result};

/// Minimum spacing between output points, in units of the current shift
const MIN_SPACING: i64 = 5;

/// Average out runs of points that are closer together than the level can show
///
/// Applies to lines and shapes. The first and last point always survive. Elements with five
/// points or fewer, and everything at the finest resolution, pass through unchanged.
#[derive(Debug, Default)]
pub struct SmoothingFilter {
    shift: u8,
}

impl SmoothingFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for SmoothingFilter {
    fn init(&mut self, config: &FilterConfig) {
        self.shift = config.shift();
    }

    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        element.expect_polyline("SmoothingFilter")?;
        let points = element.points();
        let n = points.len();
        if self.shift == 0 || n <= 5 {
            return next.proceed(element);
        }

        let step_size = MIN_SPACING << self.shift;
        let mut coords = Vec::with_capacity(n);
        let mut last = points[0];
        coords.push(last);

        let mut average = Average::new(last, step_size);
        let mut i = 1;
        while i < n {
            average.add(&points[i]);
            if average.is_more_than_step() {
                let co = average.coord();
                coords.push(co);
                // The point that tipped the step over starts the next run as well
                if average.count > 1 {
                    i -= 1;
                }
                last = co;
                average.reset(last);
            }
            i += 1;
        }

        let end = points[n - 1];
        if last != end {
            coords.push(end);
        }

        let smoothed = element.with_points(coords, "SmoothingFilter")?;
        next.proceed(smoothed)
    }
}

/// Running average of a run of points and their Manhattan spread from the run's start
struct Average {
    start: Coord,
    step_size: i64,
    count: i64,
    sum_lat: i64,
    sum_lon: i64,
    step: i64,
}

impl Average {
    fn new(start: Coord, step_size: i64) -> Self {
        Self {
            start,
            step_size,
            count: 0,
            sum_lat: 0,
            sum_lon: 0,
            step: 0,
        }
    }

    fn add(&mut self, co: &Coord) {
        self.count += 1;
        self.sum_lat += co.lat() as i64;
        self.sum_lon += co.lon() as i64;
        self.step += self.start.manhattan_distance(co);
    }

    fn reset(&mut self, start: Coord) {
        *self = Self::new(start, self.step_size);
    }

    fn is_more_than_step(&self) -> bool {
        self.step > self.step_size
    }

    fn coord(&self) -> Coord {
        Coord::new(
            (self.sum_lat / self.count) as i32,
            (self.sum_lon / self.count) as i32,
        )
    }
}

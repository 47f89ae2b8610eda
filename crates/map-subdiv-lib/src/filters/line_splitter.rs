use super::{Filter, Flow, Next};
use crate::{Element, Result};

/// Most points a single line record can hold
pub const MAX_POINTS_IN_LINE: usize = 250;

/// Cut lines with too many points into consecutive parts
///
/// Adjacent parts share their cut point. When a line is split, every part gets at least half of
/// the allowed number of points so later filters do not drop tiny leftovers.
#[derive(Debug)]
pub struct LineSplitterFilter {
    max_points: usize,
}

impl LineSplitterFilter {
    pub fn new() -> Self {
        Self::with_max_points(MAX_POINTS_IN_LINE)
    }

    /// Use a different point limit (at least 4)
    pub fn with_max_points(max_points: usize) -> Self {
        Self {
            max_points: max_points.max(4),
        }
    }

    /// Sizes of the consecutive parts a line of `npoints` points is cut into
    pub fn part_sizes(&self, npoints: usize) -> Vec<usize> {
        let max = self.max_points;
        if npoints <= max {
            return vec![npoints];
        }
        let mut sizes = Vec::new();
        let mut wanted = if npoints < 2 * max { npoints / 2 + 1 } else { max };
        let mut pos = 0;
        loop {
            sizes.push(wanted);
            pos += wanted - 1;
            let remaining = npoints - pos;
            if remaining <= max {
                sizes.push(remaining);
                return sizes;
            }
            if remaining < 2 * max {
                wanted = remaining / 2 + 1;
            }
        }
    }
}

impl Default for LineSplitterFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for LineSplitterFilter {
    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        let line = element.into_line("LineSplitterFilter")?;
        let npoints = line.len();
        if npoints <= self.max_points {
            return next.proceed(line.into());
        }

        tracing::debug!(
            points = npoints,
            type_code = line.attrs().type_code,
            road = line.is_road(),
            "line has too many points, splitting"
        );
        let mut flow = Flow::Emitted;
        let mut pos = 0;
        for size in self.part_sizes(npoints) {
            let part = line.with_points(line.points()[pos..pos + size].to_vec());
            flow = flow.and(next.proceed(part.into())?);
            pos += size - 1;
        }
        Ok(flow)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{line, run_filter, shape};
    use super::*;

    fn numbered_line(n: usize) -> Element {
        let pts: Vec<(i32, i32)> = (0..n as i32).map(|i| (i, i % 7)).collect();
        line(&pts).into()
    }

    #[test]
    fn test_short_line_passes() {
        let out = run_filter(LineSplitterFilter::new(), 24, vec![numbered_line(250)]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].points().len(), 250);
    }

    #[test]
    fn test_split_part_counts() {
        for n in [251, 300, 499, 500, 501, 600, 1000, 2345] {
            let out = run_filter(LineSplitterFilter::new(), 24, vec![numbered_line(n)]).unwrap();
            let expected = 1 + (n - MAX_POINTS_IN_LINE).div_ceil(MAX_POINTS_IN_LINE - 1);
            assert_eq!(out.len(), expected, "parts for {n} points");

            let total: usize = out.iter().map(|e| e.points().len()).sum();
            assert_eq!(total - (out.len() - 1), n);
            for part in &out {
                let len = part.points().len();
                assert!(len <= MAX_POINTS_IN_LINE);
                assert!(len >= MAX_POINTS_IN_LINE / 2, "part of {len} points for {n}");
            }
        }
    }

    #[test]
    fn test_parts_share_cut_points() {
        let input = numbered_line(600);
        let out = run_filter(LineSplitterFilter::new(), 24, vec![input.clone()]).unwrap();
        let mut rebuilt = out[0].points().to_vec();
        for part in &out[1..] {
            assert_eq!(rebuilt.last(), part.points().first());
            rebuilt.extend_from_slice(&part.points()[1..]);
        }
        assert_eq!(rebuilt, input.points());
        for part in &out {
            assert_eq!(part.attrs(), input.attrs());
        }
    }

    #[test]
    fn test_rejects_shapes() {
        let ring = shape(&[(0, 0), (0, 10), (10, 10)]);
        assert!(run_filter(LineSplitterFilter::new(), 24, vec![ring.into()]).is_err());
    }
}

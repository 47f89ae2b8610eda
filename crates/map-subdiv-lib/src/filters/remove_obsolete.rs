use super::{Filter, FilterConfig, Flow, Next};
use crate::geometry::{Straightness, is_straight};
use crate::{Coord, Element, Result};

/// Drop points that add nothing to a line or shape
///
/// Removes consecutive duplicates, middle points of strictly straight runs and, for shapes,
/// one-point spikes. Lines left with one point and shapes left with three points or fewer are
/// dropped. On routable level 0 data, preserved points of roads are kept even where they are
/// obsolete.
#[derive(Debug, Default)]
pub struct RemoveObsoletePointsFilter {
    check_preserved: bool,
}

impl RemoveObsoletePointsFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for RemoveObsoletePointsFilter {
    fn init(&mut self, config: &FilterConfig) {
        self.check_preserved = config.checks_routing();
    }

    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        element.expect_polyline("RemoveObsoletePointsFilter")?;
        let (is_shape, keep_preserved) = match &element {
            Element::Line(line) => (false, self.check_preserved && line.is_road()),
            _ => (true, false),
        };

        let Some(points) = remove_obsolete_points(element.points(), is_shape, keep_preserved)
        else {
            tracing::trace!(kind = %element.kind(), "dropped degenerate element");
            return Ok(Flow::Emitted);
        };
        if points.len() == element.points().len() {
            return next.proceed(element);
        }
        let element = element.with_points(points, "RemoveObsoletePointsFilter")?;
        next.proceed(element)
    }
}

/// Remove obsolete points from a line (`is_shape == false`) or closed ring
///
/// Returns `None` when what is left is degenerate. With `keep_preserved`, preserved points are
/// never merged away as colinear and a preserved duplicate replaces its plain twin.
pub fn remove_obsolete_points(
    points: &[Coord],
    is_shape: bool,
    keep_preserved: bool,
) -> Option<Vec<Coord>> {
    if points.len() <= 1 {
        return None;
    }
    let required = if is_shape { 4 } else { 2 };

    let mut current = points.to_vec();
    let mut out;
    loop {
        out = Vec::with_capacity(current.len());
        out.push(current[0]);
        let mut removed_spike = false;

        for &p in &current[1..] {
            let last = out.len() - 1;
            if out[last] == p {
                if keep_preserved && p.is_preserved() && !out[last].is_preserved() {
                    out[last] = p;
                }
                continue;
            }
            if last > 0 {
                match is_straight(&out[last - 1], &out[last], &p) {
                    Straightness::Strictly => {
                        if !(keep_preserved && out[last].is_preserved()) {
                            out[last] = p;
                            continue;
                        }
                    }
                    Straightness::Spike if is_shape => {
                        out.pop();
                        removed_spike = true;
                        if out[last - 1] == p {
                            continue;
                        }
                    }
                    _ => {}
                }
            }
            out.push(p);
        }

        // A removed spike can expose a new one, so go again
        if !removed_spike || out.len() < required {
            break;
        }
        current = std::mem::take(&mut out);
    }

    // The closing point is also a middle point of the ring
    let n = out.len();
    if is_shape && n > 3 && is_straight(&out[n - 2], &out[0], &out[1]) == Straightness::Strictly {
        out.remove(0);
        let first = out[0];
        if let Some(last) = out.last_mut() {
            *last = first;
        }
        let n = out.len();
        if n >= 2 && out[n - 2] == out[n - 1] {
            out.pop();
        }
    }

    if out.len() < required || (is_shape && out.len() <= 3) {
        return None;
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{coords, line, run_filter, shape};
    use super::*;
    use crate::{Attributes, Bounds, FilterChain, MapLine, filters::Collector};

    fn strip(points: &[(i32, i32)], is_shape: bool) -> Option<Vec<(i32, i32)>> {
        let pts: Vec<Coord> = points.iter().map(|&(a, b)| Coord::new(a, b)).collect();
        remove_obsolete_points(&pts, is_shape, false)
            .map(|v| v.iter().map(|c| (c.lat(), c.lon())).collect())
    }

    #[test]
    fn test_colinear_point_removed_from_ring() {
        let ring = [(0, 0), (10, 0), (20, 0), (20, 10), (0, 10), (0, 0)];
        assert_eq!(
            strip(&ring, true),
            Some(vec![(0, 0), (20, 0), (20, 10), (0, 10), (0, 0)])
        );
    }

    #[test]
    fn test_duplicates_removed() {
        let pts = [(0, 0), (0, 0), (5, 3), (5, 3), (5, 3), (9, 1)];
        assert_eq!(strip(&pts, false), Some(vec![(0, 0), (5, 3), (9, 1)]));
    }

    #[test]
    fn test_spike_kept_in_lines() {
        let pts = [(0, 0), (10, 0), (0, 0)];
        assert_eq!(strip(&pts, false), Some(vec![(0, 0), (10, 0), (0, 0)]));
    }

    #[test]
    fn test_spike_removed_from_shapes() {
        // (0,20) pokes out of the square and comes straight back
        let ring = [
            (0, 0),
            (0, 10),
            (0, 20),
            (0, 10),
            (10, 10),
            (10, 0),
            (0, 0),
        ];
        let result = strip(&ring, true).unwrap();
        assert!(!result.contains(&(0, 20)));
        assert_eq!(result.first(), result.last());
        assert_eq!(result.len(), 5);
    }

    #[test]
    fn test_start_point_colinear() {
        let ring = [(0, 5), (0, 10), (10, 10), (10, 0), (0, 0), (0, 5)];
        let result = strip(&ring, true).unwrap();
        assert_eq!(result, vec![(0, 10), (10, 10), (10, 0), (0, 0), (0, 10)]);
    }

    #[test]
    fn test_degenerate_elements_dropped() {
        assert_eq!(strip(&[(1, 1)], false), None);
        assert_eq!(strip(&[(1, 1), (1, 1), (1, 1)], false), None);
        assert_eq!(strip(&[(0, 0), (0, 10), (0, 20), (0, 0)], true), None);

        let out = run_filter(
            RemoveObsoletePointsFilter::new(),
            24,
            vec![line(&[(3, 3), (3, 3)]).into(), shape(&[(0, 0), (5, 5), (10, 10)]).into()],
        )
        .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_unchanged_element_passes_through() {
        let input = line(&[(0, 0), (5, 3), (9, 1)]);
        let out = run_filter(RemoveObsoletePointsFilter::new(), 24, vec![input.clone().into()])
            .unwrap();
        assert_eq!(out, vec![Element::Line(input)]);
    }

    #[test]
    fn test_preserved_road_points_kept_when_routing() {
        let road = MapLine::new(
            Attributes::new(0x02),
            vec![
                Coord::new(0, 0),
                Coord::new(0, 5).with_preserved(true),
                Coord::new(0, 10),
            ],
        )
        .into_road();

        let mut out = Vec::new();
        {
            let config =
                FilterConfig::new(24, Bounds::new(0, 0, 10, 10)).with_routable(true);
            let mut chain = FilterChain::new(config);
            chain.add(RemoveObsoletePointsFilter::new());
            chain.add(Collector::new(&mut out));
            let _ = chain.start(road.clone().into()).unwrap();
        }
        assert_eq!(coords(&out[0]), vec![(0, 0), (0, 5), (0, 10)]);

        // Without routing the same middle point is just colinear
        let out = run_filter(RemoveObsoletePointsFilter::new(), 24, vec![road.into()]).unwrap();
        assert_eq!(coords(&out[0]), vec![(0, 0), (0, 10)]);
    }
}

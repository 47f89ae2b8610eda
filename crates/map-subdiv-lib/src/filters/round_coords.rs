use super::{Filter, FilterConfig, Flow, Next};
use crate::{Coord, Element, Result};

/// Snap line and shape points to the grid of the current level
///
/// Consecutive points that land on the same grid position collapse into one, keeping the
/// `preserved` flag of any point that was dropped. When routing is checked, a node is never
/// merged into a plain point before it; elsewhere the node flag is cleared. Elements left with a
/// single point are dropped.
#[derive(Debug, Default)]
pub struct RoundCoordsFilter {
    shift: u8,
    check_routing: bool,
}

impl RoundCoordsFilter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Filter for RoundCoordsFilter {
    fn init(&mut self, config: &FilterConfig) {
        self.shift = config.shift();
        self.check_routing = config.checks_routing();
    }

    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow> {
        element.expect_polyline("RoundCoordsFilter")?;
        if self.shift == 0 {
            return next.proceed(element);
        }

        let points = round_points(element.points(), self.shift, self.check_routing);
        if points.len() <= 1 {
            tracing::trace!(kind = %element.kind(), "element collapsed to a single point");
            return Ok(Flow::Emitted);
        }
        let element = element.with_points(points, "RoundCoordsFilter")?;
        next.proceed(element)
    }
}

fn round_points(points: &[Coord], shift: u8, check_routing: bool) -> Vec<Coord> {
    let mut out: Vec<Coord> = Vec::with_capacity(points.len());
    for p in points {
        let mut rounded = p.rounded(shift);
        if !check_routing && rounded.is_node() {
            rounded = Coord::new(rounded.lat(), rounded.lon()).with_preserved(p.is_preserved());
        }
        match out.last_mut() {
            Some(last) if *last == rounded && !(rounded.is_node() && !last.is_node()) => {
                if rounded.is_preserved() {
                    *last = last.with_preserved(true);
                }
            }
            _ => out.push(rounded),
        }
    }
    out
}

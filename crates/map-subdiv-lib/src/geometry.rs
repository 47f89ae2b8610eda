//! Exact integer geometry helpers shared by the filters
//!
//! Everything here works on map-unit [`Coord`]s with `i64` arithmetic, so colinearity and
//! intersection tests have no floating point tolerance. Conversions to and from `geo` polygons
//! are used by the boolean clipping in the polygon splitters.

use crate::Coord;

use geo::{LineString, MultiPolygon, Polygon};

/// How three consecutive points relate to each other
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Straightness {
    /// The middle point bends the path
    NotStraight,
    /// The path goes to the middle point and comes back along the same line
    Spike,
    /// The middle point lies on the segment between its neighbours
    Strictly,
}

/// Classify the middle point `c2` of `c1 -> c2 -> c3`
pub fn is_straight(c1: &Coord, c2: &Coord, c3: &Coord) -> Straightness {
    if c1 == c3 {
        return Straightness::Spike;
    }
    let area = cross(c1, c2, c3);
    if area != 0 {
        return Straightness::NotStraight;
    }
    // Colinear: a direction reversal on either axis means the path doubles back
    let dlat1 = c2.lat() as i64 - c1.lat() as i64;
    let dlat2 = c3.lat() as i64 - c2.lat() as i64;
    let dlon1 = c2.lon() as i64 - c1.lon() as i64;
    let dlon2 = c3.lon() as i64 - c2.lon() as i64;
    if dlat1.signum() * dlat2.signum() < 0 || dlon1.signum() * dlon2.signum() < 0 {
        return Straightness::Spike;
    }
    Straightness::Strictly
}

/// Twice the signed area of the triangle `a, b, c` (positive when counter-clockwise)
#[inline]
pub fn cross(a: &Coord, b: &Coord, c: &Coord) -> i64 {
    let (ax, ay) = (a.lon() as i64, a.lat() as i64);
    let (bx, by) = (b.lon() as i64, b.lat() as i64);
    let (cx, cy) = (c.lon() as i64, c.lat() as i64);
    (bx - ax) * (cy - ay) - (by - ay) * (cx - ax)
}

/// Twice the signed area of a closed ring (positive when counter-clockwise)
pub fn signed_area2(ring: &[Coord]) -> i64 {
    ring.windows(2)
        .map(|w| {
            let (x1, y1) = (w[0].lon() as i64, w[0].lat() as i64);
            let (x2, y2) = (w[1].lon() as i64, w[1].lat() as i64);
            x1 * y2 - x2 * y1
        })
        .sum()
}

/// Check if two segments intersect or touch
pub fn segments_intersect(p1: &Coord, p2: &Coord, p3: &Coord, p4: &Coord) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);

    if ((d1 > 0 && d2 < 0) || (d1 < 0 && d2 > 0)) && ((d3 > 0 && d4 < 0) || (d3 < 0 && d4 > 0)) {
        return true;
    }

    (d1 == 0 && on_segment(p3, p4, p1))
        || (d2 == 0 && on_segment(p3, p4, p2))
        || (d3 == 0 && on_segment(p1, p2, p3))
        || (d4 == 0 && on_segment(p1, p2, p4))
}

/// Check if colinear point `p` lies within the box of segment (p1, p2)
fn on_segment(p1: &Coord, p2: &Coord, p: &Coord) -> bool {
    p.lon() >= p1.lon().min(p2.lon())
        && p.lon() <= p1.lon().max(p2.lon())
        && p.lat() >= p1.lat().min(p2.lat())
        && p.lat() <= p1.lat().max(p2.lat())
}

/// Whether joining `first` and `second` (where `first` ends where `second` starts) would make the
/// result cross or touch itself anywhere other than at the joint
pub fn pieces_cross(first: &[Coord], second: &[Coord]) -> bool {
    if first.len() < 2 || second.len() < 2 {
        return false;
    }
    let closes = first[0] == second[second.len() - 1];
    let last_a = first.len() - 2;
    for i in 0..first.len() - 1 {
        for j in 0..second.len() - 1 {
            // Adjacent at the joint
            if i == last_a && j == 0 {
                continue;
            }
            // Adjacent where the joined line closes into a loop
            if closes && i == 0 && j == second.len() - 2 {
                continue;
            }
            if segments_intersect(&first[i], &first[i + 1], &second[j], &second[j + 1]) {
                return true;
            }
        }
    }
    false
}

/// Drop consecutive points at the same position
pub fn dedup_consecutive(points: &mut Vec<Coord>) {
    points.dedup_by(|a, b| a == b);
}

/// Convert a closed ring to a `geo` polygon without holes
pub fn ring_to_polygon(ring: &[Coord]) -> Polygon<f64> {
    let exterior: LineString<f64> = ring.iter().map(Coord::to_geo).collect();
    Polygon::new(exterior, Vec::new())
}

/// Convert every polygon of a boolean operation result back to closed rings
///
/// Holes are threaded into their outer ring through the closest pair of vertices, so each
/// polygon yields exactly one ring. Rings that collapse below four points after rounding to
/// map units are skipped.
pub fn multipolygon_to_rings(result: &MultiPolygon<f64>) -> Vec<Vec<Coord>> {
    let mut rings = Vec::new();
    for polygon in result.iter() {
        let Some(mut outer) = line_string_to_ring(polygon.exterior()) else {
            continue;
        };
        for interior in polygon.interiors() {
            if let Some(hole) = line_string_to_ring(interior) {
                outer = join_hole(&outer, &hole);
            }
        }
        rings.push(outer);
    }
    rings
}

fn line_string_to_ring(ls: &LineString<f64>) -> Option<Vec<Coord>> {
    let mut ring: Vec<Coord> = ls.coords().map(|c| Coord::from_geo(*c)).collect();
    dedup_consecutive(&mut ring);
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    if ring.len() < 4 {
        None
    } else {
        Some(ring)
    }
}

/// Merge a hole into its outer ring through a zero-width channel
///
/// Both rings are closed. The channel connects the closest pair of vertices.
fn join_hole(outer: &[Coord], hole: &[Coord]) -> Vec<Coord> {
    let outer_open = &outer[..outer.len() - 1];
    let hole_open = &hole[..hole.len() - 1];

    let mut best = (0, 0);
    let mut best_dist = f64::MAX;
    for (i, o) in outer_open.iter().enumerate() {
        for (j, h) in hole_open.iter().enumerate() {
            let d = o.distance(h);
            if d < best_dist {
                best_dist = d;
                best = (i, j);
            }
        }
    }
    let (i, j) = best;

    let mut ring = Vec::with_capacity(outer.len() + hole.len() + 2);
    ring.extend_from_slice(&outer_open[..=i]);
    for k in 0..=hole_open.len() {
        ring.push(hole_open[(j + k) % hole_open.len()]);
    }
    ring.extend_from_slice(&outer_open[i..]);
    ring.push(outer_open[0]);
    ring
}

use super::polygon_splitter::MAX_POINT_IN_ELEMENT;
use super::remove_obsolete::remove_obsolete_points;
use crate::geometry::signed_area2;
use crate::{Attributes, Coord, MapShape};

use std::collections::{HashMap, HashSet};

/// Shapes with more points than this are passed through unmerged
const MAX_MERGE_POINTS: usize = 100;

/// Below this many points a shape without area is dropped
const MIN_CHECKED_POINTS: usize = 10;

/// Fuse shapes with identical attributes that share part of their boundary
///
/// Two rings are joined along the longest run of edges they share, which removes the seam. A
/// join that would leave the result touching itself (and so describe a hole) is skipped, as is
/// one that would need splitting again for having too many points.
#[derive(Debug)]
pub struct ShapeMergeFilter {
    resolution: u8,
}

/// Rings of one attribute set, merged as far as possible
struct Group {
    prototype: MapShape,
    rings: Vec<Vec<Coord>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl ShapeMergeFilter {
    /// Shapes not visible at `resolution` are left out of the result
    pub fn new(resolution: u8) -> Self {
        Self { resolution }
    }

    pub fn merge(&self, shapes: Vec<MapShape>) -> Vec<MapShape> {
        if shapes.len() <= 1 {
            return shapes;
        }
        let input = shapes.len();
        let mut result = Vec::new();
        let mut groups: Vec<Group> = Vec::new();
        let mut by_attrs: HashMap<Attributes, usize> = HashMap::new();

        for shape in shapes {
            if !shape.attrs().is_visible_at(self.resolution) {
                continue;
            }
            if shape.len() > MAX_MERGE_POINTS {
                result.push(shape);
                continue;
            }
            if shape.len() < MIN_CHECKED_POINTS && signed_area2(shape.points()) == 0 {
                tracing::warn!(
                    type_code = shape.attrs().type_code,
                    points = shape.len(),
                    "ignoring shape without area"
                );
                continue;
            }

            match by_attrs.get(shape.attrs()) {
                Some(&idx) => {
                    let group = &mut groups[idx];
                    let rings = std::mem::take(&mut group.rings);
                    group.rings = add_without_holes(rings, shape.points().to_vec());
                }
                None => {
                    by_attrs.insert(shape.attrs().clone(), groups.len());
                    groups.push(Group {
                        rings: vec![shape.points().to_vec()],
                        prototype: shape,
                    });
                }
            }
        }

        for group in groups {
            let Group { prototype, rings } = group;
            result.extend(rings.into_iter().map(|ring| prototype.with_points(ring)));
        }
        tracing::debug!(
            input,
            output = result.len(),
            resolution = self.resolution,
            "merged shapes"
        );
        result
    }
}

/// Merge `to_add` into every ring of `rings` it can absorb; the merged ring goes last
fn add_without_holes(rings: Vec<Vec<Coord>>, to_add: Vec<Coord>) -> Vec<Vec<Coord>> {
    let mut result = Vec::with_capacity(rings.len() + 1);
    let mut to_merge = to_add;
    for ring in rings {
        if ring.len() + to_merge.len() - 3 >= MAX_POINT_IN_ELEMENT {
            result.push(ring);
            continue;
        }
        if is_duplicate(&ring, &to_merge) {
            tracing::debug!(
                points = ring.len(),
                lat = ring[0].lat(),
                lon = ring[0].lon(),
                "ignoring duplicate shape"
            );
            continue;
        }
        match merge_rings(&ring, &to_merge) {
            Some(merged) => to_merge = merged,
            None => result.push(ring),
        }
    }
    result.push(to_merge);
    result
}

/// Same ring regardless of start point and direction
fn is_duplicate(a: &[Coord], b: &[Coord]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let points: HashSet<&Coord> = a.iter().collect();
    b.iter().all(|p| points.contains(p))
}

/// Join two closed rings along their longest run of shared edges
///
/// Returns `None` when they share no edge or the joined ring would touch itself.
fn merge_rings(a: &[Coord], b: &[Coord]) -> Option<Vec<Coord>> {
    let a_open = &a[..a.len() - 1];
    let mut b_open: Vec<Coord> = b[..b.len() - 1].to_vec();
    let (na, nb) = (a_open.len(), b_open.len());
    if na < 3 || nb < 3 {
        return None;
    }

    // With equal orientation a shared edge runs in opposite directions in the two rings
    if (signed_area2(a) > 0) != (signed_area2(b) > 0) {
        b_open.reverse();
    }
    let b_edges: HashMap<(Coord, Coord), usize> = (0..nb)
        .map(|j| ((b_open[j], b_open[(j + 1) % nb]), j))
        .collect();
    let shared: Vec<Option<usize>> = (0..na)
        .map(|i| b_edges.get(&(a_open[(i + 1) % na], a_open[i])).copied())
        .collect();

    // Start scanning just after an unshared edge so no run wraps around the scan start
    let free = shared.iter().position(Option::is_none)?;
    let mut best: Option<(usize, usize)> = None;
    let mut run: Option<(usize, usize, usize)> = None;
    for step in 1..=na {
        let i = (free + step) % na;
        run = match (shared[i], run) {
            (None, _) => None,
            (Some(j), Some((s, k, prev))) if j == (prev + nb - 1) % nb => Some((s, k + 1, j)),
            (Some(j), _) => Some((i, 1, j)),
        };
        if let Some((s, k, _)) = run {
            if best.is_none_or(|(_, best_k)| k > best_k) {
                best = Some((s, k));
            }
        }
    }
    let (s, k) = best?;
    let js = shared[s]?;

    let mut merged = Vec::with_capacity(na + nb - 2 * k + 1);
    for step in 0..=(na - k) {
        merged.push(a_open[(s + k + step) % na]);
    }
    for step in 0..(nb - k) {
        merged.push(b_open[(js + 2 + step) % nb]);
    }

    let open = &merged[..merged.len() - 1];
    let distinct: HashSet<&Coord> = open.iter().collect();
    if merged.len() < 4 || distinct.len() != open.len() || merged.first() != merged.last() {
        tracing::debug!(
            shared_edges = k,
            lat = a_open[s].lat(),
            lon = a_open[s].lon(),
            "shapes touch but cannot be merged"
        );
        return None;
    }
    remove_obsolete_points(&merged, true, false)
}

use crate::geometry::pieces_cross;
use crate::{Coord, MapLine};

use std::collections::HashMap;

/// Join lines with similar attributes whose ends meet
///
/// Works on a whole batch instead of one element at a time, so it sits in front of a filter
/// chain rather than inside it. Roads are never merged since their ends carry routing
/// information. A join that would make the result cross itself is skipped.
#[derive(Debug)]
pub struct LineMergeFilter {
    resolution: u8,
}

type EndIndex = HashMap<Coord, Vec<usize>>;

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl LineMergeFilter {
    /// Lines not visible at `resolution` are left out of the result
    pub fn new(resolution: u8) -> Self {
        Self { resolution }
    }

    pub fn merge(&self, lines: Vec<MapLine>) -> Vec<MapLine> {
        let input = lines.len();
        let mut merged: Vec<Option<MapLine>> = Vec::with_capacity(lines.len());
        let mut starts = EndIndex::new();
        let mut ends = EndIndex::new();

        for line in lines {
            if !line.attrs().is_visible_at(self.resolution) {
                continue;
            }
            let (Some(&start), Some(&end)) = (line.points().first(), line.points().last()) else {
                continue;
            };
            if line.is_road() || line.len() < 2 {
                merged.push(Some(line));
                continue;
            }

            // Our end meets the start of a line we already have
            if let Some((idx, target)) = take_match(&starts, &end, &mut merged, |_, other| {
                line.attrs().is_similar(other.attrs()) && !pieces_cross(line.points(), other.points())
            }) {
                unindex(&mut starts, &end, idx);
                let mut target = target.with_points(join(line.points(), target.points()));

                // Our start may now meet the end of another line
                if let Some((j, other)) = take_match(&ends, &start, &mut merged, |j, other| {
                    j != idx
                        && other.attrs().is_similar(target.attrs())
                        && !pieces_cross(other.points(), target.points())
                }) {
                    unindex(&mut ends, &start, j);
                    if let Some(other_start) = other.points().first() {
                        unindex(&mut starts, other_start, j);
                    }
                    target = target.with_points(join(other.points(), target.points()));
                }
                if let Some(&new_start) = target.points().first() {
                    starts.entry(new_start).or_default().push(idx);
                }
                merged[idx] = Some(target);
                continue;
            }

            // Our start meets the end of a line we already have
            if let Some((idx, target)) = take_match(&ends, &start, &mut merged, |_, other| {
                line.attrs().is_similar(other.attrs()) && !pieces_cross(other.points(), line.points())
            }) {
                unindex(&mut ends, &start, idx);
                ends.entry(end).or_default().push(idx);
                merged[idx] = Some(target.with_points(join(target.points(), line.points())));
                continue;
            }

            let idx = merged.len();
            starts.entry(start).or_default().push(idx);
            ends.entry(end).or_default().push(idx);
            merged.push(Some(line));
        }

        let result: Vec<MapLine> = merged.into_iter().flatten().collect();
        tracing::debug!(
            input,
            output = result.len(),
            resolution = self.resolution,
            "merged lines"
        );
        result
    }
}

/// Take the first indexed line at `at` that `accept` agrees to join with
fn take_match(
    index: &EndIndex,
    at: &Coord,
    merged: &mut [Option<MapLine>],
    accept: impl Fn(usize, &MapLine) -> bool,
) -> Option<(usize, MapLine)> {
    let idx = index.get(at)?.iter().copied().find(|&idx| {
        merged
            .get(idx)
            .and_then(Option::as_ref)
            .is_some_and(|other| accept(idx, other))
    })?;
    merged[idx].take().map(|line| (idx, line))
}

fn unindex(index: &mut EndIndex, at: &Coord, idx: usize) {
    if let Some(list) = index.get_mut(at) {
        list.retain(|&i| i != idx);
        if list.is_empty() {
            index.remove(at);
        }
    }
}

/// `first` followed by `second`, sharing the joint point
fn join(first: &[Coord], second: &[Coord]) -> Vec<Coord> {
    let mut points = Vec::with_capacity(first.len() + second.len() - 1);
    points.extend_from_slice(first);
    if let (Some(joint), Some(other)) = (points.last_mut(), second.first()) {
        if other.is_preserved() {
            *joint = joint.with_preserved(true);
        }
    }
    points.extend_from_slice(&second[1..]);
    points
}

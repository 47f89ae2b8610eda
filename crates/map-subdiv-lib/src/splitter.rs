//! Splitter - Refines one map level into subdivisions that satisfy the format limits
//!
//! The root [`Area`] is first cut into the smallest grid whose cells fit the 15-bit tile extent.
//! Every cell is then checked against the byte budgets and feature counts; cells over a limit are
//! halved across their longer side until they fit or reach the minimum size. A minimum-size cell
//! that still breaks a hard limit has its contents dealt out instead. Whatever cannot be fixed is
//! logged and kept as a [`LimitViolation`] on the leaf.

use crate::area::SizeKind;
use crate::{Area, Bounds, MapSource, Result, Zoom};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest subdivision extent in shifted units
pub const MAX_DIVISION_SIZE: i32 = 0x7fff;

/// Budget for the standard points, lines and shapes of one subdivision
///
/// Section offsets are 16 bits; a little room is left for the region pointers.
pub const MAX_RGN_SIZE: usize = 0xfff8;

pub const MAX_XT_POINTS_SIZE: usize = 0xff00;
pub const MAX_XT_LINES_SIZE: usize = 0xff00;
pub const MAX_XT_SHAPES_SIZE: usize = 0xff00;

/// Lines are referenced by a single byte from the road network
pub const MAX_NUM_LINES: usize = 0xff;

pub const MAX_NUM_POINTS: usize = 0xff;

/// Preferred upper bound for the total estimated size of a subdivision
pub const WANTED_SIZE: usize = 0x3fff;

/// Subdivisions are not split below this extent in shifted units
pub const MIN_DIMENSION: i32 = 10;

/// Format ceilings applied by the [`Splitter`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SplitLimits {
    /// Largest tile extent in shifted units
    pub max_division_size: i32,
    /// Byte budget shared by the standard points, lines and shapes
    pub max_region_size: usize,
    pub max_ext_points_size: usize,
    pub max_ext_lines_size: usize,
    pub max_ext_shapes_size: usize,
    /// Most active line records per tile
    pub max_lines: usize,
    /// Most active points per tile, indexed ones included
    pub max_points: usize,
    /// Soft total size target; ignored once a tile reaches `min_dimension`
    pub wanted_size: usize,
    /// Smallest extent in shifted units that may still be split
    pub min_dimension: i32,
}

impl Default for SplitLimits {
    fn default() -> Self {
        Self {
            max_division_size: MAX_DIVISION_SIZE,
            max_region_size: MAX_RGN_SIZE,
            max_ext_points_size: MAX_XT_POINTS_SIZE,
            max_ext_lines_size: MAX_XT_LINES_SIZE,
            max_ext_shapes_size: MAX_XT_SHAPES_SIZE,
            max_lines: MAX_NUM_LINES,
            max_points: MAX_NUM_POINTS,
            wanted_size: WANTED_SIZE,
            min_dimension: MIN_DIMENSION,
        }
    }
}

impl SplitLimits {
    fn ext_limit(&self, kind: SizeKind) -> usize {
        match kind {
            SizeKind::ExtPoint => self.max_ext_points_size,
            SizeKind::ExtLine => self.max_ext_lines_size,
            _ => self.max_ext_shapes_size,
        }
    }
}

/// A hard limit a leaf still breaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum LimitViolation {
    RegionSize { size: usize, limit: usize },
    ExtendedSize { kind: SizeKind, size: usize, limit: usize },
    TooManyLines { count: usize, limit: usize },
    TooManyPoints { count: usize, limit: usize },
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitViolation::RegionSize { size, limit } => {
                write!(f, "region size {size} exceeds {limit}")
            }
            LimitViolation::ExtendedSize { kind, size, limit } => {
                write!(f, "{kind} size {size} exceeds {limit}")
            }
            LimitViolation::TooManyLines { count, limit } => {
                write!(f, "{count} lines, at most {limit} allowed")
            }
            LimitViolation::TooManyPoints { count, limit } => {
                write!(f, "{count} points, at most {limit} allowed")
            }
        }
    }
}

/// Splits the contents of a map source into subdivisions for one zoom level
pub struct Splitter<'a, S: MapSource> {
    source: &'a S,
    zoom: Zoom,
    limits: SplitLimits,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'a, S: MapSource> Splitter<'a, S> {
    pub fn new(source: &'a S, zoom: Zoom) -> Self {
        Self {
            source,
            zoom,
            limits: SplitLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: SplitLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &SplitLimits {
        &self.limits
    }

    /// Split the source into leaves that fit the limits, dropping empty ones
    ///
    /// With `order_by_decreasing_area`, shapes are clipped to the source bounds and to every
    /// grid cell they straddle, and cell edges are aligned to the level's grid.
    pub fn split(&self, order_by_decreasing_area: bool) -> Result<Vec<Area>> {
        profiling::scope!("Splitter::split");
        let shift = self.zoom.shift();
        let root = Area::new(self.source, self.zoom.resolution(), order_by_decreasing_area)?;
        let bounds = root.bounds();
        tracing::debug!(
            ?bounds,
            resolution = self.zoom.resolution(),
            points = root.points().len(),
            lines = root.lines().len(),
            shapes = root.shapes().len(),
            "splitting level"
        );

        let (nx, ny) = max_size_grid(&bounds, shift, self.limits.max_division_size);
        let initial = if order_by_decreasing_area {
            match root.split_aligned(nx, ny, &bounds, shift) {
                Ok(areas) => areas,
                Err(root) => {
                    tracing::warn!(?bounds, nx, ny, "initial split failed, keeping the area whole");
                    vec![root]
                }
            }
        } else {
            root.split(nx, ny, &bounds, false)
        };

        let mut leaves = Vec::new();
        let mut stack: Vec<Area> = initial.into_iter().rev().collect();
        while let Some(mut area) = stack.pop() {
            if !area.has_data() {
                continue;
            }
            let bounds = area.bounds();
            let violations = self.violations(&area);
            let can_shrink = (bounds.max_dimension() >> shift) > self.limits.min_dimension;

            if can_shrink && (!violations.is_empty() || area.estimated_size() > self.limits.wanted_size)
            {
                let (nx, ny) = if bounds.width() > bounds.height() {
                    (2, 1)
                } else {
                    (1, 2)
                };
                let parts = if order_by_decreasing_area {
                    area.split_aligned(nx, ny, &bounds, shift)
                        .unwrap_or_else(|area| area.split(nx, ny, &bounds, false))
                } else {
                    area.split(nx, ny, &bounds, false)
                };
                stack.extend(parts.into_iter().rev());
                continue;
            }

            if !violations.is_empty() && area.element_count() > 1 {
                tracing::debug!(
                    ?bounds,
                    elements = area.element_count(),
                    "area at minimum size, splitting by contents"
                );
                stack.extend(area.split(1, 1, &bounds, true).into_iter().rev());
                continue;
            }

            if !violations.is_empty() {
                let (type_code, points) = area.largest_element().unwrap_or_default();
                for violation in &violations {
                    tracing::warn!(
                        ?bounds,
                        resolution = self.zoom.resolution(),
                        type_code,
                        points,
                        %violation,
                        "element too large for any subdivision"
                    );
                }
                area.set_limit_violations(violations);
            }
            leaves.push(area);
        }

        if order_by_decreasing_area {
            leaves.sort_by_key(|a| std::cmp::Reverse(area_of(&a.bounds())));
        }
        tracing::debug!(
            leaves = leaves.len(),
            resolution = self.zoom.resolution(),
            "level split done"
        );
        Ok(leaves)
    }

    /// Hard limits `area` breaks
    fn violations(&self, area: &Area) -> Vec<LimitViolation> {
        let limits = &self.limits;
        let sizes = area.estimated_sizes();
        let mut out = Vec::new();

        if sizes.standard_total() > limits.max_region_size {
            out.push(LimitViolation::RegionSize {
                size: sizes.standard_total(),
                limit: limits.max_region_size,
            });
        }
        for kind in SizeKind::ALL.into_iter().filter(SizeKind::is_extended) {
            let limit = limits.ext_limit(kind);
            if sizes.get(kind) > limit {
                out.push(LimitViolation::ExtendedSize {
                    kind,
                    size: sizes.get(kind),
                    limit,
                });
            }
        }
        if area.num_lines() > limits.max_lines {
            out.push(LimitViolation::TooManyLines {
                count: area.num_lines(),
                limit: limits.max_lines,
            });
        }
        if area.num_points() > limits.max_points {
            out.push(LimitViolation::TooManyPoints {
                count: area.num_points(),
                limit: limits.max_points,
            });
        }
        out
    }
}

/// Smallest grid whose cells fit `max_size` once shifted
pub fn max_size_grid(bounds: &Bounds, shift: u8, max_size: i32) -> (usize, usize) {
    let cells = |extent: i32| {
        let shifted = extent >> shift;
        if shifted > max_size {
            (shifted / max_size + 1) as usize
        } else {
            1
        }
    };
    (cells(bounds.width()), cells(bounds.height()))
}

fn area_of(bounds: &Bounds) -> i64 {
    i64::from(bounds.width()) * i64::from(bounds.height())
}

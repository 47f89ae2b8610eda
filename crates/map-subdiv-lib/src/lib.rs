//! Map Subdivision Library - Tiling and Geometry Preparation for Compact Map Formats
//!
//! This library turns classified vector features (points, lines and polygons tagged with a
//! device type code and a visibility resolution range) into a hierarchy of subdivisions that fit
//! the hard limits of a compact on-device map format: a 15-bit tile extent, per-kind byte budgets
//! and at most 255 points and lines per tile.
//!
//! # Architecture
//!
//! - **[`Coord`] / [`Bounds`]**: fixed-point coordinates and axis-aligned boxes in map units
//! - **[`Element`]**: points, open lines and closed shapes with their [`Attributes`]
//! - **[`filters`]**: a [`FilterChain`] of [`Filter`]s that simplify, quantize, split and clean
//!   geometry, with fan-out and an explicit [`Flow::NeedsSplit`] retry signal
//! - **[`Area`]**: a bounded container of elements with running size estimates and a grid split
//! - **[`Splitter`]**: refines one Area into leaves that satisfy every [`SplitLimits`] ceiling
//! - **[`MapBuilder`]**: drives the splitter and the filter pipelines per zoom level into a
//!   [`TileSink`]
//!
//! # Performance Characteristics
//!
//! - **Splitting**: O(N log N) element moves for N elements, bounded by the minimum tile size
//! - **Filters**: linear per element except Douglas-Peucker (O(n log n) typical) and merging
//! - **Levels**: independent zoom levels are built in parallel

mod area;
mod bounds;
mod builder;
mod coord;
mod element;
pub mod filters;
pub mod geometry;
mod source;
mod splitter;
mod zoom;

// Public API exports
pub use area::{Area, ElementSizes, SizeKind, estimate_polyline_size};
pub use bounds::Bounds;
pub use builder::{
    BuilderConfig, LevelSummary, MapBuilder, MemorySink, Tile, TileInfo, TileSink,
};
pub use coord::Coord;
pub use element::{
    Attributes, EXTENDED_TYPE_BASE, Element, ElementKind, MAX_RESOLUTION, MapLine, MapPoint,
    MapShape,
};
pub use filters::{Filter, FilterChain, FilterConfig, Flow, Next};
pub use source::{MapDetails, MapSource};
pub use splitter::{
    LimitViolation, MAX_DIVISION_SIZE, MAX_NUM_LINES, MAX_NUM_POINTS, MAX_RGN_SIZE,
    MAX_XT_LINES_SIZE, MAX_XT_POINTS_SIZE, MAX_XT_SHAPES_SIZE, MIN_DIMENSION, SplitLimits,
    Splitter, WANTED_SIZE, max_size_grid,
};
pub use zoom::Zoom;

/// Error types for the subdivision library
#[derive(Debug, thiserror::Error)]
pub enum SubdivError {
    #[error("{filter} expects a {expected}, got a {found}")]
    WrongElementKind {
        filter: &'static str,
        expected: &'static str,
        found: ElementKind,
    },

    #[error("Invalid resolution: {0} (must be at most 24)")]
    InvalidResolution(u8),

    #[error("Tile sink error: {0}")]
    Sink(String),
}

pub type Result<T> = std::result::Result<T, SubdivError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_exports() {
        // Verify that the main entry points are reachable from the crate root
        let _: fn(BuilderConfig) -> MapBuilder = MapBuilder::new;
        let _: fn() -> BuilderConfig = BuilderConfig::default;
        let _: fn() -> SplitLimits = SplitLimits::default;
        let _: fn(u8, Bounds) -> FilterConfig = FilterConfig::new;
    }

    #[test]
    fn test_error_display() {
        let err = SubdivError::WrongElementKind {
            filter: "LineSplitterFilter",
            expected: "line",
            found: ElementKind::Shape,
        };
        assert_eq!(
            err.to_string(),
            "LineSplitterFilter expects a line, got a shape"
        );
    }
}

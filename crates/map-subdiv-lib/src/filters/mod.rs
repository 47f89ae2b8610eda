//! Filter pipeline
//!
//! A [`FilterChain`] owns an ordered list of [`Filter`]s. Each filter receives an element and a
//! [`Next`] handle onto the filters behind it; it may forward the element unchanged, forward a
//! modified copy, drop it (forward zero times) or split it (forward several times). Every
//! forwarded element continues through the *remaining* filters only.
//!
//! The position in the chain is the slice held by `Next`, so there is no shared cursor to save
//! and restore: a filter can call [`Next::proceed`] any number of times and each call sees the
//! same tail of the chain, whether the previous call succeeded or failed.
//!
//! Downstream stages report a polygon that is still too large with [`Flow::NeedsSplit`]. Only
//! [`ReactivePolygonSplitterFilter`] acts on it; every other filter passes the flow it got back
//! from `proceed` up unchanged.

use crate::{Bounds, Element, MAX_RESOLUTION, Result};

mod douglas_peucker;
mod line_merge;
mod line_size_splitter;
mod line_splitter;
mod polygon_splitter;
mod remove_obsolete;
mod round_coords;
mod shape_merge;
mod smoothing;

pub use douglas_peucker::DouglasPeuckerFilter;
pub use line_merge::LineMergeFilter;
pub use line_size_splitter::LineSizeSplitterFilter;
pub use line_splitter::{LineSplitterFilter, MAX_POINTS_IN_LINE};
pub use polygon_splitter::{
    MAX_POINT_IN_ELEMENT, PolygonSizeSplitterFilter, PolygonSplitterFilter,
    PolygonSubdivSizeSplitterFilter, ReactivePolygonSplitterFilter, clip_shape, split_shape,
};
pub use remove_obsolete::{RemoveObsoletePointsFilter, remove_obsolete_points};
pub use round_coords::RoundCoordsFilter;
pub use shape_merge::ShapeMergeFilter;
pub use smoothing::SmoothingFilter;

/// Result of pushing an element down the rest of a chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum Flow {
    /// Every piece was accepted (or deliberately dropped)
    Emitted,
    /// A downstream stage found a polygon still too large; bisect it and retry
    NeedsSplit,
}

impl Flow {
    /// Combine the outcomes of sibling fragments
    #[inline]
    pub fn and(self, other: Flow) -> Flow {
        if self == Flow::NeedsSplit || other == Flow::NeedsSplit {
            Flow::NeedsSplit
        } else {
            Flow::Emitted
        }
    }

    #[inline]
    pub fn needs_split(&self) -> bool {
        *self == Flow::NeedsSplit
    }
}

/// Context every filter is initialized with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterConfig {
    resolution: u8,
    level: u8,
    bounds: Bounds,
    routable: bool,
}

impl FilterConfig {
    pub fn new(resolution: u8, bounds: Bounds) -> Self {
        Self {
            resolution: resolution.min(MAX_RESOLUTION),
            level: 0,
            bounds,
            routable: false,
        }
    }

    pub fn with_level(mut self, level: u8) -> Self {
        self.level = level;
        self
    }

    pub fn with_routable(mut self, routable: bool) -> Self {
        self.routable = routable;
        self
    }

    #[inline]
    pub fn resolution(&self) -> u8 {
        self.resolution
    }

    /// `24 - resolution`
    #[inline]
    pub fn shift(&self) -> u8 {
        MAX_RESOLUTION - self.resolution
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level
    }

    #[inline]
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    #[inline]
    pub fn routable(&self) -> bool {
        self.routable
    }

    /// Routing nodes and preserved points only matter on the most detailed level of a
    /// routable map
    #[inline]
    pub fn checks_routing(&self) -> bool {
        self.routable && self.level == 0
    }
}

/// One stage of a [`FilterChain`]
pub trait Filter {
    /// Called once when the filter is added to a chain
    fn init(&mut self, _config: &FilterConfig) {}

    /// Process one element, forwarding zero or more elements through `next`
    fn apply(&mut self, element: Element, next: &mut Next<'_, '_>) -> Result<Flow>;
}

/// Handle onto the filters behind the current one
pub struct Next<'c, 'f> {
    rest: &'c mut [Box<dyn Filter + 'f>],
}

impl Next<'_, '_> {
    /// Run `element` through the remaining filters
    ///
    /// Past the last filter the element is finished.
    pub fn proceed(&mut self, element: Element) -> Result<Flow> {
        match self.rest.split_first_mut() {
            None => Ok(Flow::Emitted),
            Some((filter, rest)) => filter.apply(element, &mut Next { rest }),
        }
    }

    /// Number of filters still ahead
    #[inline]
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// An ordered list of filters sharing one [`FilterConfig`]
pub struct FilterChain<'f> {
    config: FilterConfig,
    filters: Vec<Box<dyn Filter + 'f>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl<'f> FilterChain<'f> {
    pub fn new(config: FilterConfig) -> Self {
        Self {
            config,
            filters: Vec::new(),
        }
    }

    #[inline]
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Initialize `filter` with the chain's context and append it
    pub fn add(&mut self, mut filter: impl Filter + 'f) -> &mut Self {
        filter.init(&self.config);
        self.filters.push(Box::new(filter));
        self
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Run one element through the whole chain from the first filter
    pub fn start(&mut self, element: Element) -> Result<Flow> {
        Next {
            rest: &mut self.filters,
        }
        .proceed(element)
    }
}

/// Terminal filter that keeps everything reaching it
pub struct Collector<'v> {
    out: &'v mut Vec<Element>,
}

impl<'v> Collector<'v> {
    pub fn new(out: &'v mut Vec<Element>) -> Self {
        Self { out }
    }
}

impl Filter for Collector<'_> {
    fn apply(&mut self, element: Element, _next: &mut Next<'_, '_>) -> Result<Flow> {
        self.out.push(element);
        Ok(Flow::Emitted)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Attributes, Bounds, Coord, Element, MapLine, MapShape};

    use super::{Collector, Filter, FilterChain, FilterConfig};

    pub fn line(points: &[(i32, i32)]) -> MapLine {
        MapLine::new(
            Attributes::new(0x01),
            points.iter().map(|&(lat, lon)| Coord::new(lat, lon)).collect(),
        )
    }

    pub fn shape(points: &[(i32, i32)]) -> MapShape {
        MapShape::new(
            Attributes::new(0x50),
            points.iter().map(|&(lat, lon)| Coord::new(lat, lon)).collect(),
        )
    }

    pub fn coords(element: &Element) -> Vec<(i32, i32)> {
        element
            .points()
            .iter()
            .map(|c| (c.lat(), c.lon()))
            .collect()
    }

    /// Run a single filter at `resolution` and collect its output
    pub fn run_filter(
        filter: impl Filter,
        resolution: u8,
        elements: Vec<Element>,
    ) -> crate::Result<Vec<Element>> {
        let mut out = Vec::new();
        {
            let bounds = Bounds::new(-(1 << 23), -(1 << 23), 1 << 23, 1 << 23);
            let mut chain = FilterChain::new(FilterConfig::new(resolution, bounds));
            chain.add(filter);
            chain.add(Collector::new(&mut out));
            for element in elements {
                let _ = chain.start(element)?;
            }
        }
        Ok(out)
    }
}

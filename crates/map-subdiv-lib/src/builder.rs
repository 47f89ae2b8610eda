//! MapBuilder - Turns a map source into finished subdivisions, one zoom level at a time
//!
//! For each level the [`Splitter`] cuts the map into tiles. Every tile then sends its visible
//! points straight to the [`TileSink`], and its visible lines and shapes through a merge step and
//! a filter chain that quantizes, simplifies and splits them into records the format can hold.
//! Independent levels are built in parallel.

use crate::filters::{
    DouglasPeuckerFilter, LineMergeFilter, LineSplitterFilter, PolygonSplitterFilter,
    ReactivePolygonSplitterFilter, RemoveObsoletePointsFilter, RoundCoordsFilter,
    ShapeMergeFilter, SmoothingFilter,
};
use crate::{
    Area, Bounds, Element, Filter, FilterChain, FilterConfig, Flow, LimitViolation, MapLine,
    MapPoint, MapShape, MapSource, Next, Result, SplitLimits, Splitter, SubdivError, Zoom,
};

use rayon::prelude::*;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Settings for building the levels of a map
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct BuilderConfig {
    /// Douglas-Peucker tolerance for lines at the finest resolution, in map units.
    /// Zero or less disables simplification.
    pub line_filter_distance: f64,
    /// Douglas-Peucker tolerance for shapes
    pub shape_filter_distance: f64,
    /// Join line fragments with the same attributes before filtering
    pub merge_lines: bool,
    /// Fuse adjacent shapes with the same attributes before filtering
    pub merge_shapes: bool,
    /// Average out dense runs of line points on coarse levels
    pub smoothing: bool,
    /// Clip shapes to tile edges and hand out tiles largest first
    pub order_by_decreasing_area: bool,
    /// Keep routing nodes and preserved road points on level 0
    pub routable: bool,
    /// Format ceilings used when splitting
    pub limits: SplitLimits,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            line_filter_distance: 2.6,
            shape_filter_distance: 8.0,
            merge_lines: true,
            merge_shapes: true,
            smoothing: false,
            order_by_decreasing_area: false,
            routable: false,
            limits: SplitLimits::default(),
        }
    }
}

/// Where a tile sits in its level
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileInfo {
    /// Position among the level's tiles
    pub index: usize,
    pub level: u8,
    pub resolution: u8,
    pub bounds: Bounds,
    /// Hard limits the tile still breaks, see [`LimitViolation`]
    pub limit_violations: Vec<LimitViolation>,
}

/// Receiver of finished tiles
///
/// Elements arrive between [`TileSink::begin_tile`] and [`TileSink::end_tile`]. A sink that
/// cannot encode a shape answers [`Flow::NeedsSplit`]; the shape is bisected and both halves
/// are offered again.
pub trait TileSink {
    fn begin_tile(&mut self, info: &TileInfo) -> Result<()>;
    fn add_point(&mut self, point: MapPoint) -> Result<()>;
    fn add_line(&mut self, line: MapLine) -> Result<()>;
    fn add_shape(&mut self, shape: MapShape) -> Result<Flow>;
    fn end_tile(&mut self) -> Result<()>;
}

/// A finished tile held in memory
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tile {
    pub info: TileInfo,
    pub points: Vec<MapPoint>,
    pub lines: Vec<MapLine>,
    pub shapes: Vec<MapShape>,
}

/// Sink that keeps every tile in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    tiles: Vec<Tile>,
    current: Option<Tile>,
    max_shape_points: Option<usize>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse shapes with more than `max` points, asking for them to be split
    pub fn with_max_shape_points(max: usize) -> Self {
        Self {
            max_shape_points: Some(max),
            ..Self::default()
        }
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn into_tiles(self) -> Vec<Tile> {
        self.tiles
    }

    fn current(&mut self) -> Result<&mut Tile> {
        self.current
            .as_mut()
            .ok_or_else(|| SubdivError::Sink("element added outside of a tile".to_string()))
    }
}

impl TileSink for MemorySink {
    fn begin_tile(&mut self, info: &TileInfo) -> Result<()> {
        if self.current.is_some() {
            return Err(SubdivError::Sink(format!(
                "tile {} started before the previous one ended",
                info.index
            )));
        }
        self.current = Some(Tile {
            info: info.clone(),
            points: Vec::new(),
            lines: Vec::new(),
            shapes: Vec::new(),
        });
        Ok(())
    }

    fn add_point(&mut self, point: MapPoint) -> Result<()> {
        self.current()?.points.push(point);
        Ok(())
    }

    fn add_line(&mut self, line: MapLine) -> Result<()> {
        self.current()?.lines.push(line);
        Ok(())
    }

    fn add_shape(&mut self, shape: MapShape) -> Result<Flow> {
        if self.max_shape_points.is_some_and(|max| shape.len() > max) {
            return Ok(Flow::NeedsSplit);
        }
        self.current()?.shapes.push(shape);
        Ok(Flow::Emitted)
    }

    fn end_tile(&mut self) -> Result<()> {
        let tile = self
            .current
            .take()
            .ok_or_else(|| SubdivError::Sink("tile ended without being started".to_string()))?;
        self.tiles.push(tile);
        Ok(())
    }
}

/// What a level produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LevelSummary {
    pub level: u8,
    pub resolution: u8,
    pub tiles: usize,
    pub points: usize,
    pub lines: usize,
    pub shapes: usize,
    /// Tiles left breaking a hard limit
    pub oversized_tiles: usize,
}

/// Last stage of a line or shape chain, handing records to the sink
struct SinkFilter<'s, T: TileSink + ?Sized> {
    sink: &'s mut T,
    emitted: &'s mut usize,
}

impl<T: TileSink + ?Sized> Filter for SinkFilter<'_, T> {
    fn apply(&mut self, element: Element, _next: &mut Next<'_, '_>) -> Result<Flow> {
        match element {
            Element::Line(line) => self.sink.add_line(line)?,
            Element::Shape(shape) => {
                if self.sink.add_shape(shape)?.needs_split() {
                    return Ok(Flow::NeedsSplit);
                }
            }
            Element::Point(point) => self.sink.add_point(point)?,
        }
        *self.emitted += 1;
        Ok(Flow::Emitted)
    }
}

/// Builds map levels into tile sinks
#[derive(Debug, Clone, Default)]
pub struct MapBuilder {
    config: BuilderConfig,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl MapBuilder {
    pub fn new(config: BuilderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Split `source` for `zoom` and write every tile to `sink`
    pub fn build_level<S, T>(&self, source: &S, zoom: Zoom, sink: &mut T) -> Result<LevelSummary>
    where
        S: MapSource,
        T: TileSink + ?Sized,
    {
        profiling::scope!("MapBuilder::build_level");
        let tiles = Splitter::new(source, zoom)
            .with_limits(self.config.limits.clone())
            .split(self.config.order_by_decreasing_area)?;

        let mut summary = LevelSummary {
            level: zoom.level(),
            resolution: zoom.resolution(),
            tiles: tiles.len(),
            ..LevelSummary::default()
        };
        for (index, tile) in tiles.into_iter().enumerate() {
            if !tile.limit_violations().is_empty() {
                summary.oversized_tiles += 1;
            }
            self.build_tile(index, tile, zoom, sink, &mut summary)?;
        }

        tracing::info!(
            level = summary.level,
            resolution = summary.resolution,
            tiles = summary.tiles,
            points = summary.points,
            lines = summary.lines,
            shapes = summary.shapes,
            oversized_tiles = summary.oversized_tiles,
            "built level"
        );
        Ok(summary)
    }

    /// Build every level in parallel, each into its own sink from `make_sink`
    ///
    /// Results come back in the order of `levels`.
    pub fn build_levels<S, T, F>(
        &self,
        source: &S,
        levels: &[Zoom],
        make_sink: F,
    ) -> Result<Vec<(LevelSummary, T)>>
    where
        S: MapSource + Sync,
        T: TileSink + Send,
        F: Fn(&Zoom) -> T + Sync,
    {
        levels
            .par_iter()
            .map(|zoom| -> Result<(LevelSummary, T)> {
                let mut sink = make_sink(zoom);
                let summary = self.build_level(source, *zoom, &mut sink)?;
                Ok((summary, sink))
            })
            .collect()
    }

    fn build_tile<T: TileSink + ?Sized>(
        &self,
        index: usize,
        tile: Area,
        zoom: Zoom,
        sink: &mut T,
        summary: &mut LevelSummary,
    ) -> Result<()> {
        let resolution = zoom.resolution();
        let info = TileInfo {
            index,
            level: zoom.level(),
            resolution,
            bounds: tile.bounds(),
            limit_violations: tile.limit_violations().to_vec(),
        };
        let config = FilterConfig::new(resolution, info.bounds)
            .with_level(zoom.level())
            .with_routable(self.config.routable);
        let (points, lines, shapes) = tile.into_contents();

        sink.begin_tile(&info)?;
        for point in points {
            if point.attrs.is_visible_at(resolution) {
                sink.add_point(point)?;
                summary.points += 1;
            }
        }

        let mut lines: Vec<MapLine> = lines
            .into_iter()
            .filter(|l| l.attrs().is_visible_at(resolution))
            .collect();
        if self.config.merge_lines {
            lines = LineMergeFilter::new(resolution).merge(lines);
        }
        self.process_lines(config, lines, sink, &mut summary.lines)?;

        let mut shapes: Vec<MapShape> = shapes
            .into_iter()
            .filter(|s| s.attrs().is_visible_at(resolution))
            .collect();
        if self.config.merge_shapes {
            shapes = ShapeMergeFilter::new(resolution).merge(shapes);
        }
        self.process_shapes(config, shapes, sink, &mut summary.shapes)?;

        sink.end_tile()
    }

    fn process_lines<T: TileSink + ?Sized>(
        &self,
        config: FilterConfig,
        lines: Vec<MapLine>,
        sink: &mut T,
        emitted: &mut usize,
    ) -> Result<()> {
        let mut chain = FilterChain::new(config);
        chain.add(RoundCoordsFilter::new());
        if self.config.line_filter_distance > 0.0 {
            chain.add(DouglasPeuckerFilter::new(self.config.line_filter_distance));
        }
        if self.config.smoothing {
            chain.add(SmoothingFilter::new());
        }
        chain.add(LineSplitterFilter::new());
        chain.add(RemoveObsoletePointsFilter::new());
        chain.add(SinkFilter { sink, emitted });

        for line in lines {
            let _ = chain.start(line.into())?;
        }
        Ok(())
    }

    fn process_shapes<T: TileSink + ?Sized>(
        &self,
        config: FilterConfig,
        shapes: Vec<MapShape>,
        sink: &mut T,
        emitted: &mut usize,
    ) -> Result<()> {
        let mut chain = FilterChain::new(config);
        chain.add(RoundCoordsFilter::new());
        if self.config.shape_filter_distance > 0.0 {
            chain.add(DouglasPeuckerFilter::new(self.config.shape_filter_distance));
        }
        chain.add(PolygonSplitterFilter::new());
        chain.add(ReactivePolygonSplitterFilter::new());
        chain.add(RemoveObsoletePointsFilter::new());
        chain.add(SinkFilter { sink, emitted });

        for shape in shapes {
            let _ = chain.start(shape.into())?;
        }
        Ok(())
    }
}

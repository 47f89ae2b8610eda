use clap::Parser;
use map_subdiv_lib::{BuilderConfig, Zoom};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
/// Map Subdivider - Splits a classified JSON map into size-limited subdivisions per zoom level
pub struct Settings {
    /// JSON map with points, lines and shapes
    #[clap(value_name = "FILE")]
    pub input: PathBuf,

    /// Zoom levels to build, as level:resolution pairs
    #[clap(
        short,
        long,
        value_delimiter = ',',
        value_parser = parse_zoom,
        default_value = "0:24,1:22,2:20,3:18"
    )]
    pub levels: Vec<Zoom>,

    /// Douglas-Peucker tolerance for lines, in map units at the finest resolution (0 disables)
    #[clap(long, default_value = "2.6")]
    pub line_filter_distance: f64,

    /// Douglas-Peucker tolerance for shapes (0 disables)
    #[clap(long, default_value = "8.0")]
    pub shape_filter_distance: f64,

    /// Do not join line fragments with the same attributes
    #[clap(long, default_value = "false")]
    pub no_merge_lines: bool,

    /// Do not fuse adjacent shapes with the same attributes
    #[clap(long, default_value = "false")]
    pub no_merge_shapes: bool,

    /// Smooth dense lines on coarse levels
    #[clap(long, default_value = "false")]
    pub smoothing: bool,

    /// Clip shapes to tile edges and order tiles by decreasing area
    #[clap(long, default_value = "false")]
    pub order_by_decreasing_area: bool,

    /// Keep routing nodes and preserved road points on level 0
    #[clap(long, default_value = "false")]
    pub routable: bool,

    /// Write every tile of every level to this JSON file
    #[clap(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

impl Settings {
    pub fn builder_config(&self) -> BuilderConfig {
        BuilderConfig {
            line_filter_distance: self.line_filter_distance,
            shape_filter_distance: self.shape_filter_distance,
            merge_lines: !self.no_merge_lines,
            merge_shapes: !self.no_merge_shapes,
            smoothing: self.smoothing,
            order_by_decreasing_area: self.order_by_decreasing_area,
            routable: self.routable,
            ..BuilderConfig::default()
        }
    }
}

/// Parse `level:resolution`
fn parse_zoom(s: &str) -> Result<Zoom, String> {
    let (level, resolution) = s
        .split_once(':')
        .ok_or_else(|| format!("expected level:resolution, got {s:?}"))?;
    let level: u8 = level
        .trim()
        .parse()
        .map_err(|e| format!("bad level {level:?}: {e}"))?;
    let resolution: u8 = resolution
        .trim()
        .parse()
        .map_err(|e| format!("bad resolution {resolution:?}: {e}"))?;
    Zoom::new(level, resolution).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zoom() {
        let zoom = parse_zoom("2:20").unwrap();
        assert_eq!(zoom.level(), 2);
        assert_eq!(zoom.resolution(), 20);
        assert!(parse_zoom("2").is_err());
        assert!(parse_zoom("x:20").is_err());
        assert!(parse_zoom("0:25").is_err());
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::try_parse_from(["map-subdiv", "map.json"]).unwrap();
        assert_eq!(settings.levels.len(), 4);
        assert_eq!(settings.levels[0].resolution(), 24);
        assert_eq!(settings.builder_config(), BuilderConfig::default());
    }

    #[test]
    fn test_flags() {
        let settings = Settings::try_parse_from([
            "map-subdiv",
            "map.json",
            "--levels",
            "0:23,1:19",
            "--no-merge-shapes",
            "--routable",
            "-o",
            "out.json",
        ])
        .unwrap();
        assert_eq!(settings.levels[1].resolution(), 19);
        let config = settings.builder_config();
        assert!(config.merge_lines);
        assert!(!config.merge_shapes);
        assert!(config.routable);
        assert_eq!(settings.output, Some(PathBuf::from("out.json")));
    }
}

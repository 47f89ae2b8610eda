//! JSON map input
//!
//! ```json
//! {
//!   "bounds": [0, 0, 1000, 2000],
//!   "points": [{ "type": 11008, "at": [10, 20], "label": "Cafe" }],
//!   "lines": [{ "type": 6, "points": [[0, 0], [5, 9]], "road": true }],
//!   "shapes": [{ "type": 60, "points": [[0, 0], [0, 9], [9, 9]], "max_resolution": 22 }]
//! }
//! ```
//!
//! Coordinates are `[lat, lon]` in map units. `bounds` (`[min_lat, min_lon, max_lat, max_lon]`)
//! is optional and grows to cover every element.

use map_subdiv_lib::{
    Attributes, Bounds, Coord, MAX_RESOLUTION, MapDetails, MapLine, MapPoint, MapShape,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct InputMap {
    #[serde(default)]
    pub bounds: Option<[i32; 4]>,
    #[serde(default)]
    pub points: Vec<InputPoint>,
    #[serde(default)]
    pub lines: Vec<InputLine>,
    #[serde(default)]
    pub shapes: Vec<InputShape>,
}

#[derive(Debug, Deserialize)]
pub struct InputAttributes {
    #[serde(rename = "type")]
    pub type_code: u32,
    #[serde(default)]
    pub min_resolution: u8,
    #[serde(default = "finest_resolution")]
    pub max_resolution: u8,
    #[serde(default)]
    pub label: Option<String>,
}

fn finest_resolution() -> u8 {
    MAX_RESOLUTION
}

#[derive(Debug, Deserialize)]
pub struct InputPoint {
    #[serde(flatten)]
    pub attrs: InputAttributes,
    pub at: [i32; 2],
    #[serde(default)]
    pub indexed: bool,
}

#[derive(Debug, Deserialize)]
pub struct InputLine {
    #[serde(flatten)]
    pub attrs: InputAttributes,
    pub points: Vec<[i32; 2]>,
    #[serde(default)]
    pub road: bool,
}

#[derive(Debug, Deserialize)]
pub struct InputShape {
    #[serde(flatten)]
    pub attrs: InputAttributes,
    pub points: Vec<[i32; 2]>,
}

impl InputAttributes {
    fn into_attributes(self) -> Attributes {
        let attrs = Attributes::new(self.type_code)
            .with_resolutions(self.min_resolution, self.max_resolution);
        match self.label {
            Some(label) => attrs.with_label(label),
            None => attrs,
        }
    }
}

fn coords(points: &[[i32; 2]]) -> Vec<Coord> {
    points.iter().map(|&[lat, lon]| Coord::new(lat, lon)).collect()
}

impl InputMap {
    pub fn into_details(self) -> MapDetails {
        let mut details = match self.bounds {
            Some([min_lat, min_lon, max_lat, max_lon]) => {
                MapDetails::with_bounds(Bounds::new(min_lat, min_lon, max_lat, max_lon))
            }
            None => MapDetails::new(),
        };
        for p in self.points {
            let [lat, lon] = p.at;
            let point = MapPoint::new(p.attrs.into_attributes(), Coord::new(lat, lon));
            details.add_point(if p.indexed { point.indexed() } else { point });
        }
        for l in self.lines {
            let line = MapLine::new(l.attrs.into_attributes(), coords(&l.points));
            details.add_line(if l.road { line.into_road() } else { line });
        }
        for s in self.shapes {
            details.add_shape(MapShape::new(s.attrs.into_attributes(), coords(&s.points)));
        }
        details
    }
}

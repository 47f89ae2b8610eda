//! Fixed-point map coordinates
//!
//! Coordinates are stored in 24-bit map units (a full circle is `1 << 24` units). Equality and
//! hashing only look at the position; the `preserved` and `node` flags are metadata that travel
//! with a point through the filter pipeline.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

/// A fixed-point (lat, lon) position with structural flags
#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Coord {
    lat: i32,
    lon: i32,
    /// Structurally significant, must survive simplification
    #[cfg_attr(feature = "serde", serde(default))]
    preserved: bool,
    /// Routing-graph node
    #[cfg_attr(feature = "serde", serde(default))]
    node: bool,
}

impl Coord {
    #[inline]
    pub const fn new(lat: i32, lon: i32) -> Self {
        Self {
            lat,
            lon,
            preserved: false,
            node: false,
        }
    }

    /// Create a routing node at the given position. Nodes are always preserved.
    #[inline]
    pub const fn node(lat: i32, lon: i32) -> Self {
        Self {
            lat,
            lon,
            preserved: true,
            node: true,
        }
    }

    #[inline]
    pub fn lat(&self) -> i32 {
        self.lat
    }

    #[inline]
    pub fn lon(&self) -> i32 {
        self.lon
    }

    #[inline]
    pub fn is_preserved(&self) -> bool {
        self.preserved
    }

    #[inline]
    pub fn is_node(&self) -> bool {
        self.node
    }

    /// Copy of this coordinate with the preserved flag set to `preserved`
    #[inline]
    pub fn with_preserved(self, preserved: bool) -> Self {
        Self { preserved, ..self }
    }

    /// Copy of this coordinate moved to a new position, keeping its flags
    #[inline]
    pub fn moved_to(self, lat: i32, lon: i32) -> Self {
        Self { lat, lon, ..self }
    }

    /// Euclidean distance in map units
    pub fn distance(&self, other: &Coord) -> f64 {
        let dlat = (other.lat as f64) - (self.lat as f64);
        let dlon = (other.lon as f64) - (self.lon as f64);
        dlat.hypot(dlon)
    }

    /// Manhattan distance in map units
    #[inline]
    pub fn manhattan_distance(&self, other: &Coord) -> i64 {
        (self.lat as i64 - other.lat as i64).abs() + (self.lon as i64 - other.lon as i64).abs()
    }

    /// Point at `fraction` of the way from `self` to `other` (0.0 = self, 1.0 = other)
    pub fn between(&self, other: &Coord, fraction: f64) -> Coord {
        let lat = self.lat as f64 + (other.lat as f64 - self.lat as f64) * fraction;
        let lon = self.lon as f64 + (other.lon as f64 - self.lon as f64) * fraction;
        Coord::new(lat.round() as i32, lon.round() as i32)
    }

    /// Round both components to the grid implied by `shift`
    ///
    /// Uses round-half-up: `(v + half) & mask`. The flags are kept.
    pub fn rounded(self, shift: u8) -> Coord {
        if shift == 0 {
            return self;
        }
        let shift = u32::from(shift.min(24));
        let half = 1i32 << (shift - 1);
        let mask = !((1i32 << shift) - 1);
        self.moved_to(
            self.lat.wrapping_add(half) & mask,
            self.lon.wrapping_add(half) & mask,
        )
    }

    /// Convert to a `geo` coordinate (x = lon, y = lat)
    #[inline]
    pub fn to_geo(&self) -> geo::Coord<f64> {
        geo::Coord {
            x: self.lon as f64,
            y: self.lat as f64,
        }
    }

    /// Convert from a `geo` coordinate, rounding to the nearest map unit
    #[inline]
    pub fn from_geo(coord: geo::Coord<f64>) -> Coord {
        Coord::new(coord.y.round() as i32, coord.x.round() as i32)
    }
}

impl PartialEq for Coord {
    fn eq(&self, other: &Self) -> bool {
        self.lat == other.lat && self.lon == other.lon
    }
}

impl Eq for Coord {}

impl Hash for Coord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.lat.hash(state);
        self.lon.hash(state);
    }
}

//! Axis-aligned bounding boxes in map units

use crate::Coord;

use geo::Rect;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An axis-aligned box in map units
///
/// Both edges are inclusive. A box is never zero-sized: a degenerate dimension is widened by one
/// unit on construction, so a single point has a 1x1 box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    min_lat: i32,
    min_lon: i32,
    max_lat: i32,
    max_lon: i32,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl Bounds {
    pub fn new(min_lat: i32, min_lon: i32, max_lat: i32, max_lon: i32) -> Self {
        let (min_lat, max_lat) = (min_lat.min(max_lat), min_lat.max(max_lat));
        let (min_lon, max_lon) = (min_lon.min(max_lon), min_lon.max(max_lon));
        Self {
            min_lat,
            min_lon,
            max_lat: if max_lat == min_lat { max_lat + 1 } else { max_lat },
            max_lon: if max_lon == min_lon { max_lon + 1 } else { max_lon },
        }
    }

    /// Box of a single coordinate
    #[inline]
    pub fn of_point(co: &Coord) -> Self {
        Self::new(co.lat(), co.lon(), co.lat(), co.lon())
    }

    /// Smallest box covering every coordinate, `None` if there are none
    pub fn from_coords<'a>(coords: impl IntoIterator<Item = &'a Coord>) -> Option<Self> {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let (mut min_lat, mut min_lon) = (first.lat(), first.lon());
        let (mut max_lat, mut max_lon) = (min_lat, min_lon);
        for co in iter {
            min_lat = min_lat.min(co.lat());
            min_lon = min_lon.min(co.lon());
            max_lat = max_lat.max(co.lat());
            max_lon = max_lon.max(co.lon());
        }
        Some(Self::new(min_lat, min_lon, max_lat, max_lon))
    }

    #[inline]
    pub fn min_lat(&self) -> i32 {
        self.min_lat
    }

    #[inline]
    pub fn min_lon(&self) -> i32 {
        self.min_lon
    }

    #[inline]
    pub fn max_lat(&self) -> i32 {
        self.max_lat
    }

    #[inline]
    pub fn max_lon(&self) -> i32 {
        self.max_lon
    }

    /// Extent along the longitude axis
    #[inline]
    pub fn width(&self) -> i32 {
        self.max_lon - self.min_lon
    }

    /// Extent along the latitude axis
    #[inline]
    pub fn height(&self) -> i32 {
        self.max_lat - self.min_lat
    }

    #[inline]
    pub fn max_dimension(&self) -> i32 {
        self.width().max(self.height())
    }

    pub fn center(&self) -> Coord {
        Coord::new(
            self.min_lat + self.height() / 2,
            self.min_lon + self.width() / 2,
        )
    }

    pub fn contains_coord(&self, co: &Coord) -> bool {
        co.lat() >= self.min_lat
            && co.lat() <= self.max_lat
            && co.lon() >= self.min_lon
            && co.lon() <= self.max_lon
    }

    pub fn contains(&self, other: &Bounds) -> bool {
        other.min_lat >= self.min_lat
            && other.max_lat <= self.max_lat
            && other.min_lon >= self.min_lon
            && other.max_lon <= self.max_lon
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        !(other.max_lat < self.min_lat
            || other.min_lat > self.max_lat
            || other.max_lon < self.min_lon
            || other.min_lon > self.max_lon)
    }

    /// Smallest box covering both boxes
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_lat: self.min_lat.min(other.min_lat),
            min_lon: self.min_lon.min(other.min_lon),
            max_lat: self.max_lat.max(other.max_lat),
            max_lon: self.max_lon.max(other.max_lon),
        }
    }

    /// Grow the box by `margin` units on every side
    pub fn expanded(&self, margin: i32) -> Bounds {
        Bounds {
            min_lat: self.min_lat.saturating_sub(margin),
            min_lon: self.min_lon.saturating_sub(margin),
            max_lat: self.max_lat.saturating_add(margin),
            max_lon: self.max_lon.saturating_add(margin),
        }
    }

    /// Split into an `xsplit` by `ysplit` grid of equal cells
    ///
    /// The remainder of an uneven division goes to the last column/row. Cells are returned in
    /// column-major order: index `x * ysplit + y`.
    pub fn split(&self, xsplit: usize, ysplit: usize) -> Vec<Bounds> {
        let xsplit = xsplit.max(1);
        let ysplit = ysplit.max(1);
        let xsize = self.width() / xsplit as i32;
        let ysize = self.height() / ysplit as i32;
        let xextra = self.width() - xsize * xsplit as i32;
        let yextra = self.height() - ysize * ysplit as i32;

        let mut cells = Vec::with_capacity(xsplit * ysplit);
        for x in 0..xsplit {
            let xstart = self.min_lon + x as i32 * xsize;
            let mut xend = xstart + xsize;
            if x == xsplit - 1 {
                xend += xextra;
            }
            for y in 0..ysplit {
                let ystart = self.min_lat + y as i32 * ysize;
                let mut yend = ystart + ysize;
                if y == ysplit - 1 {
                    yend += yextra;
                }
                cells.push(Bounds::new(ystart, xstart, yend, xend));
            }
        }
        cells
    }

    /// Split into a grid whose inner cell edges are multiples of `1 << shift`
    ///
    /// Returns `None` when the rounding would leave a cell empty. With `shift == 0` this only
    /// fails for boxes narrower than the requested number of cells.
    pub fn split_aligned(&self, xsplit: usize, ysplit: usize, shift: u8) -> Option<Vec<Bounds>> {
        let xsplit = xsplit.max(1);
        let ysplit = ysplit.max(1);
        let mut cells = Vec::with_capacity(xsplit * ysplit);

        let mut xstart = self.min_lon;
        for x in 0..xsplit {
            let xend = if x == xsplit - 1 {
                self.max_lon
            } else {
                round_pow2(xstart + (self.max_lon - xstart) / (xsplit - x) as i32, shift)
            };
            let mut ystart = self.min_lat;
            for y in 0..ysplit {
                let yend = if y == ysplit - 1 {
                    self.max_lat
                } else {
                    round_pow2(ystart + (self.max_lat - ystart) / (ysplit - y) as i32, shift)
                };
                if xstart >= xend || ystart >= yend {
                    return None;
                }
                cells.push(Bounds::new(ystart, xstart, yend, xend));
                ystart = yend;
            }
            xstart = xend;
        }
        Some(cells)
    }

    /// Convert to a `geo` rectangle (x = lon, y = lat)
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            geo::Coord {
                x: self.min_lon as f64,
                y: self.min_lat as f64,
            },
            geo::Coord {
                x: self.max_lon as f64,
                y: self.max_lat as f64,
            },
        )
    }
}

/// Round `val` to the nearest multiple of `1 << shift`
fn round_pow2(val: i32, shift: u8) -> i32 {
    if shift == 0 {
        return val;
    }
    let shift = u32::from(shift.min(30));
    (((val >> (shift - 1)) + 1) >> 1) << shift
}

//! Zoom level descriptors

use crate::element::MAX_RESOLUTION;
use crate::{Result, SubdivError};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A zoom level and the map resolution it is drawn at
///
/// Coordinates at this level are quantized to multiples of `1 << shift()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Zoom {
    level: u8,
    resolution: u8,
}

impl Zoom {
    pub fn new(level: u8, resolution: u8) -> Result<Self> {
        if resolution > MAX_RESOLUTION {
            return Err(SubdivError::InvalidResolution(resolution));
        }
        Ok(Self { level, resolution })
    }

    #[inline]
    pub fn level(&self) -> u8 {
        self.level
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
}

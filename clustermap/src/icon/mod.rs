//! Badge images shown for clusters and the cache that keeps them.

use crate::error::ClusterError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

mod badge;
mod cache;

pub use badge::{draw_badge, BadgeStyle};
pub use cache::{IconCache, DEFAULT_ICON_CACHE_CAPACITY};

/// Default size buckets. Sizes below the first bucket are shown exactly.
pub const DEFAULT_SIZE_BUCKETS: [usize; 7] = [10, 20, 50, 100, 200, 500, 1000];

/// Rendered badge image in RGBA format.
#[derive(Debug, Clone, PartialEq)]
pub struct BadgeImage {
    bytes: Vec<u8>,
    dimensions: (u32, u32),
}

impl BadgeImage {
    /// Creates an image from raw RGBA bytes.
    pub fn from_rgba(bytes: Vec<u8>, width: u32, height: u32) -> Result<Self, ClusterError> {
        let expected = width as usize * height as usize * 4;
        if bytes.len() != expected {
            return Err(ClusterError::Render(format!(
                "expected {expected} bytes for {width}x{height} image, got {}",
                bytes.len()
            )));
        }

        Ok(Self {
            bytes,
            dimensions: (width, height),
        })
    }

    /// Decodes an image from a byte slice, e.g. a PNG badge shipped with the application.
    ///
    /// Non-RGBA images are converted to RGBA.
    pub fn decode(bytes: &[u8]) -> Result<Self, ClusterError> {
        let decoded = image::load_from_memory(bytes)
            .map_err(|err| ClusterError::Render(format!("failed to decode image: {err}")))?;
        let rgba = decoded.to_rgba8();
        let dimensions = rgba.dimensions();

        Ok(Self {
            bytes: rgba.into_raw(),
            dimensions,
        })
    }

    /// Raw RGBA bytes, row by row.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.dimensions.0
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.dimensions.1
    }

    /// Color of the pixel at the given position as `[r, g, b, a]`.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }

        let offset = (y as usize * self.width() as usize + x as usize) * 4;
        let px = self.bytes.get(offset..offset + 4)?;
        Some([px[0], px[1], px[2], px[3]])
    }
}

/// Size of a cluster as shown on its badge.
///
/// Small clusters are shown with their exact size. Larger ones are rounded down to the closest
/// bucket and labeled with a `+` suffix, so that all clusters of one bucket share a badge.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SizeBucket {
    value: usize,
    exact: bool,
}

impl SizeBucket {
    /// Bucket of the cluster with `size` items.
    ///
    /// `buckets` must be sorted in ascending order.
    pub fn for_size(size: usize, buckets: &[usize]) -> Self {
        match buckets.iter().rev().find(|bucket| **bucket <= size) {
            Some(bucket) => Self {
                value: *bucket,
                exact: false,
            },
            None => Self {
                value: size,
                exact: true,
            },
        }
    }

    /// Number shown on the badge.
    pub fn value(&self) -> usize {
        self.value
    }

    /// Returns true if the value is the exact cluster size.
    pub fn is_exact(&self) -> bool {
        self.exact
    }

    /// Text of the badge label.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl Display for SizeBucket {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.exact {
            write!(f, "{}", self.value)
        } else {
            write!(f, "{}+", self.value)
        }
    }
}

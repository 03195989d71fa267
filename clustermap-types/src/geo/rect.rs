use crate::error::ClusterTypesError;
use crate::geo::GeoPoint;
use serde::{Deserialize, Serialize};

/// Rectangle in geographic coordinates, e.g. the visible region of a map.
///
/// A rectangle crossing the antimeridian has `lon_min > lon_max`.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoRect {
    lat_min: f64,
    lon_min: f64,
    lat_max: f64,
    lon_max: f64,
}

impl GeoRect {
    /// Creates a new rectangle.
    pub fn new(lat_min: f64, lon_min: f64, lat_max: f64, lon_max: f64) -> Self {
        Self {
            lat_min,
            lon_min,
            lat_max,
            lon_max,
        }
    }

    /// Creates a new rectangle checking that all values are finite and the latitudes are not
    /// inverted.
    pub fn try_new(
        lat_min: f64,
        lon_min: f64,
        lat_max: f64,
        lon_max: f64,
    ) -> Result<Self, ClusterTypesError> {
        if ![lat_min, lon_min, lat_max, lon_max]
            .iter()
            .all(|v| v.is_finite())
        {
            return Err(ClusterTypesError::InvalidBounds(
                "coordinates must be finite".into(),
            ));
        }

        if lat_min > lat_max {
            return Err(ClusterTypesError::InvalidBounds(format!(
                "lat_min {lat_min} is greater than lat_max {lat_max}"
            )));
        }

        Ok(Self::new(lat_min, lon_min, lat_max, lon_max))
    }

    /// Smallest rectangle containing all the points. Returns `None` for an empty iterator.
    pub fn from_points<'a, P: GeoPoint<Num = f64> + 'a>(
        mut points: impl Iterator<Item = &'a P>,
    ) -> Option<Self> {
        let first = points.next()?;
        let mut rect = Self::new(first.lat(), first.lon(), first.lat(), first.lon());

        for p in points {
            rect.lat_min = rect.lat_min.min(p.lat());
            rect.lat_max = rect.lat_max.max(p.lat());
            rect.lon_min = rect.lon_min.min(p.lon());
            rect.lon_max = rect.lon_max.max(p.lon());
        }

        Some(rect)
    }

    /// Southern edge.
    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    /// Western edge.
    pub fn lon_min(&self) -> f64 {
        self.lon_min
    }

    /// Northern edge.
    pub fn lat_max(&self) -> f64 {
        self.lat_max
    }

    /// Eastern edge.
    pub fn lon_max(&self) -> f64 {
        self.lon_max
    }

    /// Returns true if the rectangle crosses the antimeridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.lon_min > self.lon_max
    }

    fn lon_span(&self) -> f64 {
        if self.crosses_antimeridian() {
            360.0 - self.lon_min + self.lon_max
        } else {
            self.lon_max - self.lon_min
        }
    }

    /// Returns true if the point lies inside the rectangle or on its border.
    pub fn contains(&self, point: &impl GeoPoint<Num = f64>) -> bool {
        if point.lat() < self.lat_min || point.lat() > self.lat_max {
            return false;
        }

        if self.crosses_antimeridian() {
            point.lon() >= self.lon_min || point.lon() <= self.lon_max
        } else {
            point.lon() >= self.lon_min && point.lon() <= self.lon_max
        }
    }

    /// Grows (or shrinks for `factor < 1`) the rectangle around its center. Latitudes are
    /// clamped to the poles, a longitude span reaching 360 degrees covers the whole globe.
    pub fn magnify(&self, factor: f64) -> Self {
        let lat_half = (self.lat_max - self.lat_min) * factor / 2.0;
        let lat_center = (self.lat_max + self.lat_min) / 2.0;

        let span = self.lon_span() * factor;
        let (lon_min, lon_max) = if span >= 360.0 {
            (-180.0, 180.0)
        } else {
            let center = self.lon_min + self.lon_span() / 2.0;
            (
                wrap_lon(center - span / 2.0),
                wrap_lon(center + span / 2.0),
            )
        };

        Self {
            lat_min: (lat_center - lat_half).max(-90.0),
            lat_max: (lat_center + lat_half).min(90.0),
            lon_min,
            lon_max,
        }
    }
}

fn wrap_lon(lon: f64) -> f64 {
    if lon > 180.0 {
        lon - 360.0
    } else if lon < -180.0 {
        lon + 360.0
    } else {
        lon
    }
}

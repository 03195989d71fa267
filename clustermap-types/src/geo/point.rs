use crate::error::ClusterTypesError;
use crate::geo::Datum;
use num_traits::{Float, NumCast, One};
use serde::{Deserialize, Serialize};

/// A point on the surface of a celestial body given by latitude and longitude.
pub trait GeoPoint {
    /// Numeric type used to represent coordinates.
    type Num: Float;

    /// Latitude in degrees.
    fn lat(&self) -> Self::Num;
    /// Longitude in degrees.
    fn lon(&self) -> Self::Num;

    /// Latitude in radians.
    fn lat_rad(&self) -> Self::Num {
        self.lat().to_radians()
    }

    /// Longitude in radians.
    fn lon_rad(&self) -> Self::Num {
        self.lon().to_radians()
    }

    /// Great-circle distance to the `other` point in meters, measured on the mean sphere of the
    /// `datum`.
    ///
    /// Returns `None` if the datum radius cannot be represented with `Self::Num`.
    fn distance(&self, other: &impl GeoPoint<Num = Self::Num>, datum: &Datum) -> Option<Self::Num> {
        let radius = <Self::Num as NumCast>::from(datum.mean_radius())?;
        let two = <Self::Num as NumCast>::from(2.0)?;

        let d_lat = (other.lat_rad() - self.lat_rad()) / two;
        let d_lon = (other.lon_rad() - self.lon_rad()) / two;

        let a = d_lat.sin().powi(2)
            + self.lat_rad().cos() * other.lat_rad().cos() * d_lon.sin().powi(2);
        let c = two * a.min(Self::Num::one()).sqrt().asin();

        Some(radius * c)
    }
}

/// Constructor of geographic points.
pub trait NewGeoPoint<N = f64>: GeoPoint<Num = N> + Sized {
    /// Creates a point from latitude and longitude in degrees.
    fn latlon(lat: N, lon: N) -> Self;
    /// Creates a point from longitude and latitude in degrees.
    fn lonlat(lon: N, lat: N) -> Self {
        Self::latlon(lat, lon)
    }
}

/// 2d point on the surface of a celestial body.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Deserialize, Serialize)]
pub struct GeoPoint2d {
    lat: f64,
    lon: f64,
}

impl GeoPoint for GeoPoint2d {
    type Num = f64;

    fn lat(&self) -> f64 {
        self.lat
    }

    fn lon(&self) -> f64 {
        self.lon
    }
}

impl NewGeoPoint<f64> for GeoPoint2d {
    fn latlon(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl GeoPoint2d {
    /// Creates a new point from another one.
    pub fn from(other: &impl GeoPoint<Num = f64>) -> Self {
        Self {
            lat: other.lat(),
            lon: other.lon(),
        }
    }

    /// Creates a point checking that the latitude is in `[-90, 90]` and the longitude in
    /// `[-180, 180]`.
    pub fn try_latlon(lat: f64, lon: f64) -> Result<Self, ClusterTypesError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(ClusterTypesError::InvalidCoordinates { lat, lon });
        }

        Ok(Self { lat, lon })
    }

    /// Great-circle distance in meters on the WGS84 mean sphere.
    pub fn distance_meters(&self, other: &GeoPoint2d) -> f64 {
        // f64 always holds the datum radius
        self.distance(other, &Datum::WGS84).unwrap_or(f64::INFINITY)
    }
}

/// Creates a new GeoPoint2d from latitude and longitude values (in degrees).
///
/// ```
/// use clustermap_types::GeoPoint;
/// use clustermap_types::latlon;
///
/// let point = latlon!(38.0, 52.0);
/// assert_eq!(point.lat(), 38.0);
/// ```
#[macro_export]
macro_rules! latlon {
    ($lat:expr, $lon:expr) => {
        <::clustermap_types::geo::GeoPoint2d as ::clustermap_types::geo::NewGeoPoint<f64>>::latlon(
            $lat, $lon,
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn distance_to_itself_is_zero() {
        let p = GeoPoint2d::latlon(55.75, 37.61);
        assert_eq!(p.distance_meters(&p), 0.0);
    }

    #[test]
    fn one_degree_of_longitude_at_equator() {
        let a = GeoPoint2d::latlon(0.0, 0.0);
        let b = GeoPoint2d::latlon(0.0, 1.0);
        assert_relative_eq!(a.distance_meters(&b), 111_195.08, epsilon = 1.0);
    }

    #[test]
    fn tiny_offsets_are_measured_in_meters() {
        let a = GeoPoint2d::latlon(0.0, 0.0);
        let b = GeoPoint2d::latlon(0.0, 0.00001);
        let distance = a.distance_meters(&b);
        assert!(distance > 1.0 && distance < 1.2, "distance is {distance}");
    }

    #[test]
    fn distance_is_symmetric() {
        let a = GeoPoint2d::latlon(10.0, 10.0);
        let b = GeoPoint2d::latlon(-33.9, 151.2);
        assert_relative_eq!(a.distance_meters(&b), b.distance_meters(&a), epsilon = 1e-6);
    }

    #[test]
    fn antipodal_points() {
        let a = GeoPoint2d::latlon(0.0, 0.0);
        let b = GeoPoint2d::latlon(0.0, 180.0);
        assert_relative_eq!(
            a.distance_meters(&b),
            std::f64::consts::PI * Datum::WGS84.mean_radius(),
            epsilon = 1e-3
        );
    }

    #[test]
    fn try_latlon_validates_range() {
        assert!(GeoPoint2d::try_latlon(45.0, 90.0).is_ok());
        assert_eq!(
            GeoPoint2d::try_latlon(91.0, 0.0),
            Err(ClusterTypesError::InvalidCoordinates { lat: 91.0, lon: 0.0 })
        );
        assert!(GeoPoint2d::try_latlon(0.0, f64::NAN).is_err());
    }

    #[test]
    fn deserializes_from_json() {
        let point: GeoPoint2d = serde_json::from_str(r#"{"lat": 1.5, "lon": -2.0}"#)
            .expect("valid json");
        assert_eq!(point, GeoPoint2d::latlon(1.5, -2.0));
    }
}

/// Reference ellipsoid used to measure distances on the surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Datum {
    semimajor: f64,
    inv_flattening: f64,
}

impl Datum {
    /// WGS84 ellipsoid.
    pub const WGS84: Self = Datum {
        semimajor: 6_378_137.0,
        inv_flattening: 298.257223563,
    };

    /// Equatorial radius in meters.
    pub fn semimajor(&self) -> f64 {
        self.semimajor
    }

    /// Inverse flattening of the ellipsoid.
    pub fn inv_flattening(&self) -> f64 {
        self.inv_flattening
    }

    /// Polar radius in meters.
    pub fn semiminor(&self) -> f64 {
        self.semimajor * (1.0 - 1.0 / self.inv_flattening)
    }

    /// Radius of the sphere with the same mean radius as the ellipsoid (IUGG `R1`).
    pub fn mean_radius(&self) -> f64 {
        (2.0 * self.semimajor + self.semiminor()) / 3.0
    }
}

impl Default for Datum {
    fn default() -> Self {
        Self::WGS84
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn wgs84_mean_radius() {
        assert_relative_eq!(Datum::WGS84.mean_radius(), 6_371_008.77, epsilon = 0.01);
    }
}

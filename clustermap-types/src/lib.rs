//! Geographic primitives shared by the `clustermap` crates.
//!
//! Positions of clustered items are stored as [`GeoPoint2d`] values (latitude and longitude in
//! degrees). Distances between them are measured along the surface of the [`Datum`] ellipsoid
//! approximated by its mean sphere, which is precise enough to decide whether two markers
//! overlap on the screen.

pub mod error;
pub mod geo;

pub use geo::{Datum, GeoPoint, GeoPoint2d, GeoRect, NewGeoPoint};

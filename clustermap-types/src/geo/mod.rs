//! Points and rectangles in geographic coordinates (latitude and longitude).

mod datum;
mod point;
mod rect;

pub use datum::Datum;
pub use point::{GeoPoint, GeoPoint2d, NewGeoPoint};
pub use rect::GeoRect;

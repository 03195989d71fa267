//! Error type used by the crate.

use thiserror::Error;

/// Error enum.
#[derive(Debug, Error, PartialEq)]
pub enum ClusterTypesError {
    /// Latitude or longitude is not a finite number or is out of range.
    #[error("invalid coordinates: lat {lat}, lon {lon}")]
    InvalidCoordinates {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },
    /// Rectangle bounds are inverted or not finite.
    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
}

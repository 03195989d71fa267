use crate::cluster::ClusterParams;
use crate::config::ClusterConfig;
use clustermap_types::{GeoPoint, GeoPoint2d, GeoRect};
use serde::{Deserialize, Serialize};

/// Resolution of the Web Mercator projection at zoom level 0, in meters per pixel at the equator
/// for 256-pixel tiles.
pub const WEB_MERCATOR_BASE_RESOLUTION: f64 = 156_543.033_928_000_14;

/// State of the map camera, as reported by the host when the camera stops moving.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    zoom: f64,
    meters_per_pixel: f64,
    bounds: Option<GeoRect>,
}

impl Viewport {
    /// Creates a viewport from the zoom level and the ground distance one screen pixel covers.
    pub fn new(zoom: f64, meters_per_pixel: f64) -> Self {
        Self {
            zoom,
            meters_per_pixel,
            bounds: None,
        }
    }

    /// Creates a viewport of a Web Mercator map centered at `center`.
    pub fn web_mercator(zoom: f64, center: &GeoPoint2d) -> Self {
        let resolution = WEB_MERCATOR_BASE_RESOLUTION / 2f64.powf(zoom);
        Self::new(zoom, resolution * center.lat_rad().cos())
    }

    /// Sets the visible region of the map.
    pub fn with_bounds(mut self, bounds: GeoRect) -> Self {
        self.bounds = Some(bounds);
        self
    }

    /// Zoom level of the map.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Ground distance in meters covered by one screen pixel.
    pub fn meters_per_pixel(&self) -> f64 {
        self.meters_per_pixel
    }

    /// Visible region of the map.
    pub fn bounds(&self) -> Option<GeoRect> {
        self.bounds
    }

    pub(crate) fn is_valid(&self) -> bool {
        self.zoom.is_finite() && self.meters_per_pixel.is_finite() && self.meters_per_pixel >= 0.0
    }
}

/// Turns camera changes into clustering parameters.
#[derive(Debug, Clone, Default)]
pub(crate) struct ViewportListener {
    viewport: Option<Viewport>,
}

impl ViewportListener {
    /// Stores the viewport. Returns false if the viewport is not usable and was ignored.
    pub(crate) fn on_camera_idle(&mut self, viewport: Viewport) -> bool {
        if !viewport.is_valid() {
            log::warn!("Ignoring invalid viewport {viewport:?}");
            return false;
        }

        self.viewport = Some(viewport);
        true
    }

    pub(crate) fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// Distance threshold and clustering switch for the current viewport.
    pub(crate) fn params(&self, config: &ClusterConfig) -> Option<ClusterParams> {
        let viewport = self.viewport?;
        Some(ClusterParams::new(
            viewport.meters_per_pixel * config.radius_pixels(),
            viewport.zoom < config.max_cluster_zoom(),
        ))
    }

    /// Region items must be inside to take part in clustering, if filtering is enabled.
    pub(crate) fn visible_region(&self, config: &ClusterConfig) -> Option<GeoRect> {
        let padding = config.visible_padding()?;
        let bounds = self.viewport?.bounds?;
        Some(bounds.magnify(1.0 + padding))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use clustermap_types::NewGeoPoint;

    #[test]
    fn threshold_is_scale_times_radius() {
        let mut listener = ViewportListener::default();
        let config = ClusterConfig::default().with_radius_pixels(50.0);
        assert!(listener.params(&config).is_none());

        listener.on_camera_idle(Viewport::new(12.0, 2.5));
        let params = listener.params(&config).expect("viewport is set");
        assert_relative_eq!(params.threshold, 125.0);
        assert!(params.clustering_enabled);
    }

    #[test]
    fn clustering_is_disabled_at_max_zoom() {
        let mut listener = ViewportListener::default();
        let config = ClusterConfig::default().with_max_cluster_zoom(19.0);

        listener.on_camera_idle(Viewport::new(19.0, 0.1));
        assert!(!listener.params(&config).expect("viewport is set").clustering_enabled);

        listener.on_camera_idle(Viewport::new(18.9, 0.1));
        assert!(listener.params(&config).expect("viewport is set").clustering_enabled);
    }

    #[test]
    fn invalid_viewport_is_ignored() {
        let mut listener = ViewportListener::default();
        assert!(!listener.on_camera_idle(Viewport::new(10.0, f64::NAN)));
        assert!(!listener.on_camera_idle(Viewport::new(10.0, -1.0)));
        assert!(listener.viewport().is_none());
    }

    #[test]
    fn web_mercator_scale() {
        let equator = Viewport::web_mercator(0.0, &GeoPoint2d::latlon(0.0, 0.0));
        assert_relative_eq!(equator.meters_per_pixel(), WEB_MERCATOR_BASE_RESOLUTION);

        let north = Viewport::web_mercator(1.0, &GeoPoint2d::latlon(60.0, 0.0));
        assert_relative_eq!(
            north.meters_per_pixel(),
            WEB_MERCATOR_BASE_RESOLUTION / 4.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn visible_region_requires_padding_and_bounds() {
        let mut listener = ViewportListener::default();
        let bounds = GeoRect::new(0.0, 0.0, 1.0, 1.0);
        listener.on_camera_idle(Viewport::new(10.0, 1.0).with_bounds(bounds));

        assert!(listener.visible_region(&ClusterConfig::default()).is_none());

        let config = ClusterConfig::default().with_visible_padding(Some(1.0));
        let region = listener.visible_region(&config).expect("filtering enabled");
        assert_relative_eq!(region.lat_min(), -0.5);
        assert_relative_eq!(region.lat_max(), 1.5);
    }
}

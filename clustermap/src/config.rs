use crate::error::ClusterError;
use crate::icon::{DEFAULT_ICON_CACHE_CAPACITY, DEFAULT_SIZE_BUCKETS};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_RADIUS_PIXELS: f64 = 100.0;
const DEFAULT_MAX_CLUSTER_ZOOM: f64 = 19.0;
const DEFAULT_FADE_DURATION: Duration = Duration::from_millis(300);

/// Configuration of a [`ClusterEngine`](crate::ClusterEngine).
///
/// Can be deserialized from any `serde` format; missing fields take default values and the
/// fade duration is given in milliseconds:
///
/// ```
/// use clustermap::ClusterConfig;
///
/// let config: ClusterConfig = serde_json::from_str(r#"{"radius_pixels": 60, "fade_duration": 0}"#).unwrap();
/// assert_eq!(config.radius_pixels(), 60.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    radius_pixels: f64,
    max_cluster_zoom: f64,
    icon_cache_capacity: usize,
    size_buckets: Vec<usize>,
    #[serde(with = "duration_ms")]
    fade_duration: Duration,
    visible_padding: Option<f64>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius_pixels: DEFAULT_RADIUS_PIXELS,
            max_cluster_zoom: DEFAULT_MAX_CLUSTER_ZOOM,
            icon_cache_capacity: DEFAULT_ICON_CACHE_CAPACITY,
            size_buckets: DEFAULT_SIZE_BUCKETS.to_vec(),
            fade_duration: DEFAULT_FADE_DURATION,
            visible_padding: None,
        }
    }
}

impl ClusterConfig {
    /// Creates a validated configuration with the given clustering parameters and default
    /// values for everything else.
    pub fn new(
        radius_pixels: f64,
        max_cluster_zoom: f64,
        icon_cache_capacity: usize,
        size_buckets: Vec<usize>,
    ) -> Result<Self, ClusterError> {
        let config = Self {
            radius_pixels,
            max_cluster_zoom,
            icon_cache_capacity,
            size_buckets,
            ..Default::default()
        };
        config.validate()?;

        Ok(config)
    }

    /// Checks that all the values are usable.
    pub fn validate(&self) -> Result<(), ClusterError> {
        if !(self.radius_pixels.is_finite() && self.radius_pixels > 0.0) {
            return Err(ClusterError::InvalidRadius(self.radius_pixels));
        }

        if self.icon_cache_capacity == 0 {
            return Err(ClusterError::InvalidCapacity(self.icon_cache_capacity));
        }

        if self.max_cluster_zoom.is_nan() {
            return Err(ClusterError::InvalidZoom(self.max_cluster_zoom));
        }

        if self.size_buckets.first() == Some(&0) {
            return Err(ClusterError::InvalidBuckets(
                "buckets must be positive".into(),
            ));
        }

        if self.size_buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(ClusterError::InvalidBuckets(format!(
                "buckets must be strictly increasing: {:?}",
                self.size_buckets
            )));
        }

        if let Some(padding) = self.visible_padding {
            if !(padding.is_finite() && padding >= 0.0) {
                return Err(ClusterError::InvalidPadding(padding));
            }
        }

        Ok(())
    }

    /// Radius of a cluster badge area in screen pixels. Items closer than this distance to a
    /// cluster center on the screen join the cluster.
    pub fn radius_pixels(&self) -> f64 {
        self.radius_pixels
    }

    /// Sets the cluster radius in screen pixels.
    pub fn with_radius_pixels(mut self, radius_pixels: f64) -> Self {
        self.radius_pixels = radius_pixels;
        self
    }

    /// Sets the cluster radius in screen pixels.
    pub fn set_radius_pixels(&mut self, radius_pixels: f64) {
        self.radius_pixels = radius_pixels;
    }

    /// Zoom level starting from which every item is shown separately.
    pub fn max_cluster_zoom(&self) -> f64 {
        self.max_cluster_zoom
    }

    /// Sets the zoom level starting from which every item is shown separately.
    pub fn with_max_cluster_zoom(mut self, zoom: f64) -> Self {
        self.max_cluster_zoom = zoom;
        self
    }

    /// Sets the zoom level starting from which every item is shown separately.
    pub fn set_max_cluster_zoom(&mut self, zoom: f64) {
        self.max_cluster_zoom = zoom;
    }

    /// Maximum number of badge images kept in memory.
    pub fn icon_cache_capacity(&self) -> usize {
        self.icon_cache_capacity
    }

    /// Sets the maximum number of badge images kept in memory.
    pub fn with_icon_cache_capacity(mut self, capacity: usize) -> Self {
        self.icon_cache_capacity = capacity;
        self
    }

    /// Sets the maximum number of badge images kept in memory.
    pub fn set_icon_cache_capacity(&mut self, capacity: usize) {
        self.icon_cache_capacity = capacity;
    }

    /// Cluster sizes at which badge labels are rounded, e.g. `[10, 20, 50]` shows a cluster of
    /// 37 items as `20+`.
    pub fn size_buckets(&self) -> &[usize] {
        &self.size_buckets
    }

    /// Sets the size buckets.
    pub fn with_size_buckets(mut self, buckets: Vec<usize>) -> Self {
        self.size_buckets = buckets;
        self
    }

    /// Sets the size buckets.
    pub fn set_size_buckets(&mut self, buckets: Vec<usize>) {
        self.size_buckets = buckets;
    }

    /// Duration of marker fade-in and fade-out. Zero duration adds and removes markers at once.
    pub fn fade_duration(&self) -> Duration {
        self.fade_duration
    }

    /// Sets the duration of marker fade-in and fade-out.
    pub fn with_fade_duration(mut self, duration: Duration) -> Self {
        self.fade_duration = duration;
        self
    }

    /// Sets the duration of marker fade-in and fade-out.
    pub fn set_fade_duration(&mut self, duration: Duration) {
        self.fade_duration = duration;
    }

    /// Portion the visible region is grown by before filtering items, or `None` if all items
    /// take part in clustering regardless of the visible region.
    pub fn visible_padding(&self) -> Option<f64> {
        self.visible_padding
    }

    /// Only cluster items inside the visible region grown by the given portion, e.g. `0.5`
    /// grows the region by a half in every dimension.
    pub fn with_visible_padding(mut self, padding: Option<f64>) -> Self {
        self.visible_padding = padding;
        self
    }

    /// Sets the visible region padding.
    pub fn set_visible_padding(&mut self, padding: Option<f64>) {
        self.visible_padding = padding;
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn default_config_is_valid() {
        assert!(ClusterConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_radius() {
        for radius in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert_matches!(
                ClusterConfig::new(radius, 19.0, 80, vec![]),
                Err(ClusterError::InvalidRadius(_))
            );
        }
    }

    #[test]
    fn rejects_zero_capacity() {
        assert_eq!(
            ClusterConfig::new(100.0, 19.0, 0, vec![]),
            Err(ClusterError::InvalidCapacity(0))
        );
    }

    #[test]
    fn rejects_bad_buckets() {
        assert_matches!(
            ClusterConfig::new(100.0, 19.0, 80, vec![10, 10]),
            Err(ClusterError::InvalidBuckets(_))
        );
        assert_matches!(
            ClusterConfig::new(100.0, 19.0, 80, vec![0, 10]),
            Err(ClusterError::InvalidBuckets(_))
        );
        assert!(ClusterConfig::new(100.0, 19.0, 80, vec![5, 10, 100]).is_ok());
    }

    #[test]
    fn rejects_bad_padding_and_zoom() {
        let config = ClusterConfig::default().with_visible_padding(Some(-0.5));
        assert_eq!(config.validate(), Err(ClusterError::InvalidPadding(-0.5)));

        assert_matches!(
            ClusterConfig::new(100.0, f64::NAN, 80, vec![]),
            Err(ClusterError::InvalidZoom(_))
        );
    }

    #[test]
    fn deserializes_partial_config() {
        let config: ClusterConfig = serde_json::from_str(
            r#"{"radius_pixels": 48.0, "size_buckets": [5, 25], "fade_duration": 150}"#,
        )
        .expect("valid config");

        assert_eq!(config.radius_pixels(), 48.0);
        assert_eq!(config.size_buckets(), &[5, 25]);
        assert_eq!(config.fade_duration(), Duration::from_millis(150));
        assert_eq!(config.icon_cache_capacity(), DEFAULT_ICON_CACHE_CAPACITY);
        assert_eq!(config.visible_padding(), None);
    }

    #[test]
    fn serializes_fade_duration_as_millis() {
        let config = ClusterConfig::default().with_fade_duration(Duration::from_millis(42));
        let json = serde_json::to_value(&config).expect("serializable");
        assert_eq!(json["fade_duration"], 42);
    }
}

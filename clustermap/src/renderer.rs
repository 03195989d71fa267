use crate::cluster::Cluster;
use crate::error::ClusterError;
use crate::icon::{draw_badge, BadgeImage, BadgeStyle, SizeBucket};
use crate::item::ClusterItem;
use maybe_sync::MaybeSend;

/// Pluggable badge drawing and default click behavior.
///
/// The renderer is called on the map thread only. Click methods return `true` if the click is
/// handled and the default UI (e.g. an info window) must not be shown.
pub trait ClusterRenderer<I: ClusterItem>: MaybeSend {
    /// Renders the badge for clusters in the given size bucket.
    fn icon_for(&self, bucket: SizeBucket) -> Result<BadgeImage, ClusterError>;

    /// Called when a marker of a cluster with more than one item is tapped and no cluster click
    /// handler is set.
    fn on_cluster_click(&self, _cluster: &Cluster<I>) -> bool {
        false
    }

    /// Called when a marker of a single item is tapped and no item click handler is set.
    fn on_item_click(&self, _item: &I) -> bool {
        false
    }
}

/// Renderer drawing colored circles with the cluster size in the middle.
#[derive(Debug, Default, Clone)]
pub struct DefaultClusterRenderer {
    style: Option<BadgeStyle>,
}

impl DefaultClusterRenderer {
    /// Creates a renderer that picks the badge color from the cluster size.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer that draws every badge with the same style.
    pub fn with_style(style: BadgeStyle) -> Self {
        Self { style: Some(style) }
    }
}

impl<I: ClusterItem> ClusterRenderer<I> for DefaultClusterRenderer {
    fn icon_for(&self, bucket: SizeBucket) -> Result<BadgeImage, ClusterError> {
        let style = self.style.unwrap_or_else(|| BadgeStyle::for_bucket(bucket));
        draw_badge(bucket, &style)
    }
}

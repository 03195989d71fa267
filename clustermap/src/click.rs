use crate::cluster::Cluster;
use crate::item::ClusterItem;
use crate::renderer::ClusterRenderer;
use maybe_sync::{MaybeSend, MaybeSync};

/// Callback invoked when a marker of a cluster with more than one item is tapped.
///
/// Returns true if the tap is handled and the default UI must not be shown.
pub trait ClusterClickHandler<I>: (Fn(&Cluster<I>) -> bool) + MaybeSend + MaybeSync {}

impl<I, T: Fn(&Cluster<I>) -> bool> ClusterClickHandler<I> for T where T: MaybeSend + MaybeSync {}

/// Callback invoked when a marker of a single item is tapped.
///
/// Returns true if the tap is handled and the default UI must not be shown.
pub trait ItemClickHandler<I>: (Fn(&I) -> bool) + MaybeSend + MaybeSync {}

impl<I, T: Fn(&I) -> bool> ItemClickHandler<I> for T where T: MaybeSend + MaybeSync {}

/// Dispatches taps on cluster markers to the caller callbacks.
pub(crate) struct ClickRouter<I> {
    cluster_handler: Option<Box<dyn ClusterClickHandler<I>>>,
    item_handler: Option<Box<dyn ItemClickHandler<I>>>,
}

impl<I> Default for ClickRouter<I> {
    fn default() -> Self {
        Self {
            cluster_handler: None,
            item_handler: None,
        }
    }
}

impl<I: ClusterItem> ClickRouter<I> {
    pub(crate) fn set_cluster_handler(&mut self, handler: Box<dyn ClusterClickHandler<I>>) {
        self.cluster_handler = Some(handler);
    }

    pub(crate) fn set_item_handler(&mut self, handler: Box<dyn ItemClickHandler<I>>) {
        self.item_handler = Some(handler);
    }

    /// Calls the cluster callback for clusters of several items and the item callback for
    /// single items. Without a callback the renderer's default behavior is used.
    pub(crate) fn route(&self, cluster: &Cluster<I>, renderer: &dyn ClusterRenderer<I>) -> bool {
        if cluster.size() > 1 {
            log::debug!("Cluster of {} items is clicked", cluster.size());
            match &self.cluster_handler {
                Some(handler) => handler(cluster),
                None => renderer.on_cluster_click(cluster),
            }
        } else {
            let item = cluster.founder();
            log::debug!("Item {:?} is clicked", item.id());
            match &self.item_handler {
                Some(handler) => handler(item.as_ref()),
                None => renderer.on_item_click(item.as_ref()),
            }
        }
    }
}

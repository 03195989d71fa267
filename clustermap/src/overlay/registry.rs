use crate::cluster::Cluster;
use crate::item::ClusterItem;
use crate::overlay::transition::{Fade, Transition};
use crate::overlay::MarkerId;
use std::collections::HashMap;
use web_time::Instant;

/// Marker shown on the map together with the cluster it represents.
pub struct RenderedMarker<I> {
    id: MarkerId,
    cluster: Cluster<I>,
    transition: Option<Transition>,
}

impl<I> RenderedMarker<I> {
    /// Id of the marker in the host map.
    pub fn id(&self) -> MarkerId {
        self.id
    }

    /// Cluster the marker represents.
    pub fn cluster(&self) -> &Cluster<I> {
        &self.cluster
    }

    /// Fade transition in progress, if any.
    pub fn transition(&self) -> Option<&Transition> {
        self.transition.as_ref()
    }

    /// Returns true if the marker is fading out and will be removed.
    pub fn is_leaving(&self) -> bool {
        matches!(
            self.transition,
            Some(transition) if transition.fade() == Fade::Out
        )
    }
}

/// All markers created by the overlay, owned by the map thread.
///
/// Markers that are fading out stay in the registry until their transition ends, but are no
/// longer reachable by the founder of their cluster.
pub(crate) struct MarkerRegistry<I: ClusterItem> {
    markers: HashMap<MarkerId, RenderedMarker<I>, ahash::RandomState>,
    by_founder: HashMap<I::Id, MarkerId, ahash::RandomState>,
}

impl<I: ClusterItem> Default for MarkerRegistry<I> {
    fn default() -> Self {
        Self {
            markers: HashMap::default(),
            by_founder: HashMap::default(),
        }
    }
}

impl<I: ClusterItem> MarkerRegistry<I> {
    /// Registers a new marker. Returns the live marker previously reachable by the same founder,
    /// which the caller must remove from the map.
    pub(crate) fn insert(
        &mut self,
        id: MarkerId,
        cluster: Cluster<I>,
        transition: Option<Transition>,
    ) -> Option<MarkerId> {
        let displaced = self
            .by_founder
            .insert(cluster.key(), id)
            .filter(|previous| *previous != id);
        self.markers.insert(
            id,
            RenderedMarker {
                id,
                cluster,
                transition,
            },
        );

        displaced
    }

    pub(crate) fn get(&self, id: MarkerId) -> Option<&RenderedMarker<I>> {
        self.markers.get(&id)
    }

    /// Marker of the cluster founded by the item with the given id, unless it is leaving.
    pub(crate) fn live_by_founder(&self, founder: &I::Id) -> Option<&RenderedMarker<I>> {
        self.by_founder
            .get(founder)
            .and_then(|id| self.markers.get(id))
    }

    /// Ids of the markers that are not leaving the map.
    pub(crate) fn live_ids(&self) -> Vec<MarkerId> {
        self.by_founder.values().copied().collect()
    }

    pub(crate) fn all_ids(&self) -> Vec<MarkerId> {
        self.markers.keys().copied().collect()
    }

    pub(crate) fn set_cluster(&mut self, id: MarkerId, cluster: Cluster<I>) {
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.cluster = cluster;
        }
    }

    /// Starts removing the marker. It stays registered until [`MarkerRegistry::remove`].
    pub(crate) fn start_leaving(&mut self, id: MarkerId, transition: Transition) {
        let Some(marker) = self.markers.get_mut(&id) else {
            return;
        };

        marker.transition = Some(transition);
        let founder = marker.cluster.key();
        if self.by_founder.get(&founder) == Some(&id) {
            self.by_founder.remove(&founder);
        }
    }

    pub(crate) fn remove(&mut self, id: MarkerId) -> Option<RenderedMarker<I>> {
        let marker = self.markers.remove(&id)?;
        let founder = marker.cluster.key();
        if self.by_founder.get(&founder) == Some(&id) {
            self.by_founder.remove(&founder);
        }

        Some(marker)
    }

    /// Markers with transitions and their current state.
    pub(crate) fn animated(&self, now: Instant) -> Vec<(MarkerId, Fade, f32, bool)> {
        self.markers
            .values()
            .filter_map(|marker| {
                let transition = marker.transition?;
                Some((
                    marker.id,
                    transition.fade(),
                    transition.opacity(now),
                    transition.is_finished(now),
                ))
            })
            .collect()
    }

    pub(crate) fn finish_transition(&mut self, id: MarkerId) {
        if let Some(marker) = self.markers.get_mut(&id) {
            marker.transition = None;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.markers.len()
    }

    pub(crate) fn live_len(&self) -> usize {
        self.by_founder.len()
    }

    pub(crate) fn clear(&mut self) {
        self.markers.clear();
        self.by_founder.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::PointItem;
    use clustermap_types::latlon;
    use std::sync::Arc;
    use std::time::Duration;

    fn cluster(id: u64) -> Cluster<PointItem<()>> {
        Cluster::found(Arc::new(PointItem::new(id, latlon!(0.0, 0.0), ())))
    }

    #[test]
    fn founder_reaches_latest_marker() {
        let mut registry = MarkerRegistry::default();
        assert_eq!(registry.insert(MarkerId(1), cluster(7), None), None);
        assert_eq!(registry.insert(MarkerId(2), cluster(7), None), Some(MarkerId(1)));

        assert_eq!(registry.live_by_founder(&7).map(|m| m.id()), Some(MarkerId(2)));
        assert_eq!(registry.live_len(), 1);

        registry.remove(MarkerId(1));
        assert_eq!(registry.live_by_founder(&7).map(|m| m.id()), Some(MarkerId(2)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn leaving_markers_are_not_live() {
        let mut registry = MarkerRegistry::default();
        registry.insert(MarkerId(1), cluster(7), None);
        registry.start_leaving(
            MarkerId(1),
            Transition::new(Fade::Out, Instant::now(), Duration::from_millis(100)),
        );

        assert!(registry.live_by_founder(&7).is_none());
        assert!(registry.get(MarkerId(1)).is_some_and(RenderedMarker::is_leaving));
        assert_eq!(registry.insert(MarkerId(2), cluster(7), None), None);
        assert_eq!(registry.all_ids().len(), 2);
    }
}

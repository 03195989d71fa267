//! Map-thread side of the engine: materializes cluster sets as markers on the host map.

use crate::click::{ClickRouter, ClusterClickHandler, ItemClickHandler};
use crate::cluster::{Cluster, ClusterSet, Generation};
use crate::config::ClusterConfig;
use crate::error::ClusterError;
use crate::icon::{BadgeImage, IconCache};
use crate::item::ClusterItem;
use crate::renderer::{ClusterRenderer, DefaultClusterRenderer};
use crate::state::{GenerationToken, StateCell};
use clustermap_types::GeoPoint2d;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use web_time::Instant;

mod registry;
mod transition;

pub use registry::RenderedMarker;
pub use transition::{Fade, Transition};

use registry::MarkerRegistry;

/// Identifier of a marker in the host map.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerId(pub u64);

/// Marker layer of the host map.
///
/// All methods are called on the thread that owns the [`ClusterOverlay`], which must be the
/// thread that owns the map.
pub trait MarkerOverlay {
    /// Adds a marker with the given icon and opacity and returns its id.
    fn add_marker(&mut self, position: GeoPoint2d, icon: Arc<BadgeImage>, opacity: f32) -> MarkerId;

    /// Removes the marker from the map.
    fn remove_marker(&mut self, id: MarkerId);

    /// Replaces the icon of the marker.
    fn set_marker_icon(&mut self, id: MarkerId, icon: Arc<BadgeImage>);

    /// Moves the marker.
    fn set_marker_position(&mut self, id: MarkerId, position: GeoPoint2d);

    /// Changes the marker opacity. Opacity is in `[0, 1]`.
    fn set_marker_opacity(&mut self, id: MarkerId, opacity: f32);
}

/// Why a recompute result did not reach the map.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscardReason {
    /// A newer request was made before the computation started.
    Superseded,
    /// The computation was aborted because a newer request was made.
    Cancelled,
    /// The computation failed.
    Failed(ClusterError),
    /// Incremental update was requested before any full result was computed.
    NotReady,
}

pub(crate) enum RenderMessage<I: ClusterItem> {
    Apply(Arc<ClusterSet<I>>),
    ApplySingle {
        set: Arc<ClusterSet<I>>,
        index: usize,
    },
    Discarded {
        generation: Generation,
        reason: DiscardReason,
    },
    SetRenderer(Box<dyn ClusterRenderer<I>>),
    SetClusterClickHandler(Box<dyn ClusterClickHandler<I>>),
    SetItemClickHandler(Box<dyn ItemClickHandler<I>>),
    Configure {
        icon_cache_capacity: usize,
        size_buckets: Vec<usize>,
        fade_duration: Duration,
    },
    Dispose,
}

/// Counters describing what happened to recompute results.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ClusterStats {
    /// Generation of the last applied cluster set.
    pub applied_generation: Option<Generation>,
    /// Number of applied full recomputes.
    pub full_applies: u64,
    /// Number of applied incremental updates.
    pub incremental_applies: u64,
    /// Results dropped on the map thread because a newer request was made.
    pub dropped_stale: u64,
    /// Requests skipped by the compute context because a newer request was made.
    pub superseded: u64,
    /// Computations aborted in the middle.
    pub cancelled: u64,
    /// Failed computations.
    pub failed: u64,
    /// Markers currently shown on the map, not counting the ones fading out.
    pub live_markers: usize,
}

/// Renders cluster sets computed in background as markers of a [`MarkerOverlay`].
///
/// The overlay is created together with [`ClusterEngine`](crate::ClusterEngine) and must live
/// on the thread that owns the map. The host calls [`ClusterOverlay::process_messages`] when
/// the [`Messenger`](crate::Messenger) requests a redraw, [`ClusterOverlay::animate`] every
/// frame while it returns `true`, and [`ClusterOverlay::handle_marker_tap`] when a marker is
/// tapped.
pub struct ClusterOverlay<I: ClusterItem, O: MarkerOverlay> {
    overlay: O,
    receiver: mpsc::UnboundedReceiver<RenderMessage<I>>,
    token: GenerationToken,
    state: StateCell,
    registry: MarkerRegistry<I>,
    icons: IconCache,
    renderer: Box<dyn ClusterRenderer<I>>,
    clicks: ClickRouter<I>,
    fade_duration: Duration,
    current: Option<Arc<ClusterSet<I>>>,
    stats: ClusterStats,
    disposed: bool,
}

impl<I: ClusterItem, O: MarkerOverlay> std::fmt::Debug for ClusterOverlay<I, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterOverlay")
            .field("markers", &self.registry.len())
            .field("icons", &self.icons.len())
            .field("fade_duration", &self.fade_duration)
            .field("stats", &self.stats())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl<I: ClusterItem, O: MarkerOverlay> ClusterOverlay<I, O> {
    pub(crate) fn new(
        overlay: O,
        receiver: mpsc::UnboundedReceiver<RenderMessage<I>>,
        token: GenerationToken,
        state: StateCell,
        config: &ClusterConfig,
    ) -> Self {
        Self {
            overlay,
            receiver,
            token,
            state,
            registry: MarkerRegistry::default(),
            icons: IconCache::new(config.icon_cache_capacity(), config.size_buckets().to_vec()),
            renderer: Box::new(DefaultClusterRenderer::new()),
            clicks: ClickRouter::default(),
            fade_duration: config.fade_duration(),
            current: None,
            stats: ClusterStats::default(),
            disposed: false,
        }
    }

    /// Handles all the messages posted by the engine and the compute context since the last
    /// call. Returns the number of handled messages.
    pub fn process_messages(&mut self) -> usize {
        self.process_messages_at(Instant::now())
    }

    /// Same as [`ClusterOverlay::process_messages`], but starts transitions at `now`.
    pub fn process_messages_at(&mut self, now: Instant) -> usize {
        let mut count = 0;
        while !self.disposed {
            let Ok(message) = self.receiver.try_recv() else {
                break;
            };

            self.handle(message, now);
            count += 1;
        }

        count
    }

    /// Advances fade transitions to `now`. Markers that finished fading out are removed.
    ///
    /// Returns true if some transitions are still running and the host should call this method
    /// again on the next frame.
    pub fn animate(&mut self, now: Instant) -> bool {
        let mut running = false;
        for (id, fade, opacity, finished) in self.registry.animated(now) {
            match (fade, finished) {
                (Fade::Out, true) => {
                    self.overlay.remove_marker(id);
                    self.registry.remove(id);
                }
                (Fade::In, true) => {
                    self.overlay.set_marker_opacity(id, 1.0);
                    self.registry.finish_transition(id);
                }
                _ => {
                    self.overlay.set_marker_opacity(id, opacity);
                    running = true;
                }
            }
        }

        running
    }

    /// Routes a tap on the marker to the click handlers.
    ///
    /// Returns true if the tap is handled and the host must not show its default UI. Taps on
    /// markers not created by this overlay or fading out are not handled.
    pub fn handle_marker_tap(&self, id: MarkerId) -> bool {
        match self.registry.get(id) {
            Some(marker) if !marker.is_leaving() => {
                self.clicks.route(marker.cluster(), self.renderer.as_ref())
            }
            _ => false,
        }
    }

    /// Marker layer of the host map.
    pub fn overlay(&self) -> &O {
        &self.overlay
    }

    /// Mutable access to the marker layer of the host map.
    pub fn overlay_mut(&mut self) -> &mut O {
        &mut self.overlay
    }

    /// Marker with the given id, including markers that are fading out.
    pub fn marker(&self, id: MarkerId) -> Option<&RenderedMarker<I>> {
        self.registry.get(id)
    }

    /// Number of markers on the map, including the ones fading out.
    pub fn marker_count(&self) -> usize {
        self.registry.len()
    }

    /// The last applied cluster set.
    pub fn current_clusters(&self) -> Option<&Arc<ClusterSet<I>>> {
        self.current.as_ref()
    }

    /// Cache of the rendered badges.
    pub fn icon_cache(&self) -> &IconCache {
        &self.icons
    }

    /// Counters of the handled results.
    pub fn stats(&self) -> ClusterStats {
        ClusterStats {
            live_markers: self.registry.live_len(),
            ..self.stats
        }
    }

    /// Returns true if the engine was disposed and the overlay was cleared.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    fn handle(&mut self, message: RenderMessage<I>, now: Instant) {
        match message {
            RenderMessage::Apply(set) => {
                self.state.set_applying(true);
                self.state.result_received();
                self.apply_clusters(set, now);
                self.state.set_applying(false);
            }
            RenderMessage::ApplySingle { set, index } => {
                self.state.set_applying(true);
                self.state.result_received();
                self.apply_single(set, index, now);
                self.state.set_applying(false);
            }
            RenderMessage::Discarded { generation, reason } => {
                self.state.result_received();
                match reason {
                    DiscardReason::Superseded => self.stats.superseded += 1,
                    DiscardReason::Cancelled => self.stats.cancelled += 1,
                    DiscardReason::Failed(err) => {
                        log::warn!("Recompute {generation} failed: {err}");
                        self.stats.failed += 1;
                    }
                    DiscardReason::NotReady => {
                        log::debug!("Incremental update for {generation} arrived before any cluster set");
                    }
                }
            }
            RenderMessage::SetRenderer(renderer) => self.set_renderer(renderer),
            RenderMessage::SetClusterClickHandler(handler) => {
                self.clicks.set_cluster_handler(handler)
            }
            RenderMessage::SetItemClickHandler(handler) => self.clicks.set_item_handler(handler),
            RenderMessage::Configure {
                icon_cache_capacity,
                size_buckets,
                fade_duration,
            } => {
                self.icons.set_capacity(icon_cache_capacity);
                if self.icons.set_buckets(size_buckets) {
                    self.refresh_icons();
                }
                self.fade_duration = fade_duration;
            }
            RenderMessage::Dispose => self.dispose(),
        }
    }

    fn apply_clusters(&mut self, set: Arc<ClusterSet<I>>, now: Instant) {
        if !self.token.is_current(set.generation()) {
            log::debug!("Dropping stale cluster set {}", set.generation());
            self.stats.dropped_stale += 1;
            return;
        }

        let mut kept = HashSet::new();
        let mut to_add = vec![];
        for cluster in set.clusters() {
            match self.registry.live_by_founder(&cluster.key()) {
                Some(marker) if marker.cluster().size() == cluster.size() => {
                    let (id, center) = (marker.id(), marker.cluster().center());
                    if center != cluster.center() {
                        self.overlay.set_marker_position(id, cluster.center());
                    }
                    self.registry.set_cluster(id, cluster.clone());
                    kept.insert(id);
                }
                _ => to_add.push(cluster),
            }
        }

        let mut removed = 0;
        for id in self.registry.live_ids() {
            if !kept.contains(&id) {
                self.fade_out(id, now);
                removed += 1;
            }
        }

        for cluster in &to_add {
            self.add_marker(cluster, now);
        }

        log::debug!(
            "Applied cluster set {}: {} added, {} kept, {removed} removed",
            set.generation(),
            to_add.len(),
            kept.len(),
        );

        self.stats.applied_generation = Some(set.generation());
        self.stats.full_applies += 1;
        self.current = Some(set);
    }

    fn apply_single(&mut self, set: Arc<ClusterSet<I>>, index: usize, now: Instant) {
        if !self.token.is_current(set.generation()) {
            log::debug!("Dropping stale incremental update {}", set.generation());
            self.stats.dropped_stale += 1;
            return;
        }

        let Some(cluster) = set.clusters().get(index) else {
            log::warn!("Incremental update refers to missing cluster {index}");
            return;
        };

        let existing = self
            .registry
            .live_by_founder(&cluster.key())
            .map(|marker| (marker.id(), marker.cluster().size(), marker.cluster().center()));
        match existing {
            Some((id, size, center)) => {
                if size != cluster.size() {
                    let icon = self.icon(cluster.size());
                    self.overlay.set_marker_icon(id, icon);
                }
                if center != cluster.center() {
                    self.overlay.set_marker_position(id, cluster.center());
                }
                self.registry.set_cluster(id, cluster.clone());
            }
            None => self.add_marker(cluster, now),
        }

        self.stats.applied_generation = Some(set.generation());
        self.stats.incremental_applies += 1;
        self.current = Some(set);
    }

    fn add_marker(&mut self, cluster: &Cluster<I>, now: Instant) {
        let icon = self.icon(cluster.size());
        let (opacity, transition) = if self.fade_duration.is_zero() {
            (1.0, None)
        } else {
            (0.0, Some(Transition::new(Fade::In, now, self.fade_duration)))
        };

        let id = self.overlay.add_marker(cluster.center(), icon, opacity);
        if let Some(displaced) = self.registry.insert(id, cluster.clone(), transition) {
            log::warn!("Marker {displaced:?} replaced by {id:?} for the same cluster");
            self.fade_out(displaced, now);
        }
    }

    fn fade_out(&mut self, id: MarkerId, now: Instant) {
        if self.fade_duration.is_zero() {
            self.overlay.remove_marker(id);
            self.registry.remove(id);
        } else {
            self.registry
                .start_leaving(id, Transition::new(Fade::Out, now, self.fade_duration));
        }
    }

    fn icon(&mut self, size: usize) -> Arc<BadgeImage> {
        let renderer = &self.renderer;
        self.icons.get(size, |bucket| renderer.icon_for(bucket))
    }

    fn set_renderer(&mut self, renderer: Box<dyn ClusterRenderer<I>>) {
        self.renderer = renderer;
        self.icons.evict_all();
        self.refresh_icons();
    }

    /// Redraws the badges of all live markers with the current renderer and buckets.
    fn refresh_icons(&mut self) {
        for id in self.registry.live_ids() {
            let Some(size) = self.registry.get(id).map(|marker| marker.cluster().size()) else {
                continue;
            };
            let icon = self.icon(size);
            self.overlay.set_marker_icon(id, icon);
        }
    }

    fn dispose(&mut self) {
        for id in self.registry.all_ids() {
            self.overlay.remove_marker(id);
        }

        self.registry.clear();
        self.icons.evict_all();
        self.current = None;
        self.disposed = true;

        self.receiver.close();
        while self.receiver.try_recv().is_ok() {}
        self.state.reset();

        log::info!("Cluster overlay disposed");
    }
}

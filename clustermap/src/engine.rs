use crate::click::{ClusterClickHandler, ItemClickHandler};
use crate::cluster::Generation;
use crate::compute::{ComputeRequest, ComputeWorker};
use crate::config::ClusterConfig;
use crate::error::ClusterError;
use crate::item::ClusterItem;
use crate::messenger::Messenger;
use crate::overlay::{ClusterOverlay, MarkerOverlay, RenderMessage};
use crate::renderer::ClusterRenderer;
use crate::state::{EngineState, GenerationToken, StateCell};
use crate::viewport::{Viewport, ViewportListener};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

/// Caller-side handle of the clustering engine.
///
/// The engine owns the item set and the configuration. Every change that affects the clusters
/// enqueues a recompute on the background compute context and returns immediately. Results are
/// delivered to the [`ClusterOverlay`] created together with the engine, which must be driven
/// from the thread that owns the map.
///
/// Only the result of the latest request is ever shown: when a new request is made while an
/// older one is still computing, the older one is cancelled and its result is dropped.
///
/// Item ids are unique within the engine. Adding an item with an id that is already present
/// replaces the stored item in place.
///
/// ```no_run
/// use clustermap::{ClusterConfig, ClusterEngine, MarkerOverlay, MarkerId, BadgeImage, PointItem, Viewport};
/// use clustermap_types::latlon;
/// use std::sync::Arc;
///
/// # struct Layer;
/// # impl MarkerOverlay for Layer {
/// #     fn add_marker(&mut self, _: clustermap_types::GeoPoint2d, _: Arc<BadgeImage>, _: f32) -> MarkerId { MarkerId(0) }
/// #     fn remove_marker(&mut self, _: MarkerId) {}
/// #     fn set_marker_icon(&mut self, _: MarkerId, _: Arc<BadgeImage>) {}
/// #     fn set_marker_position(&mut self, _: MarkerId, _: clustermap_types::GeoPoint2d) {}
/// #     fn set_marker_opacity(&mut self, _: MarkerId, _: f32) {}
/// # }
/// # #[tokio::main]
/// # async fn main() -> Result<(), clustermap::ClusterError> {
/// let (mut engine, mut overlay) = ClusterEngine::new(ClusterConfig::default(), Layer, None)?;
///
/// engine.set_items([
///     PointItem::new(1, latlon!(52.52, 13.40), "Berlin"),
///     PointItem::new(2, latlon!(52.53, 13.41), "Berlin, a bit north"),
/// ])?;
/// engine.on_viewport_changed(Viewport::web_mercator(10.0, &latlon!(52.52, 13.40)))?;
///
/// // on the map thread, when a redraw is requested
/// overlay.process_messages();
/// # Ok(())
/// # }
/// ```
pub struct ClusterEngine<I: ClusterItem> {
    config: ClusterConfig,
    items: Vec<Arc<I>>,
    positions: HashMap<I::Id, usize, ahash::RandomState>,
    viewport: ViewportListener,
    worker: ComputeWorker<I>,
    render_sender: mpsc::UnboundedSender<RenderMessage<I>>,
    token: GenerationToken,
    state: StateCell,
    disposed: bool,
}

impl<I: ClusterItem> std::fmt::Debug for ClusterEngine<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterEngine")
            .field("config", &self.config)
            .field("items", &self.items.len())
            .field("viewport", &self.viewport.viewport())
            .field("generation", &self.token.current())
            .field("state", &self.state.get())
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl<I: ClusterItem> ClusterEngine<I> {
    /// Creates a new engine and the overlay rendering its results into `overlay`.
    ///
    /// Must be called from within a tokio runtime, which will run the clustering passes. Use
    /// [`ClusterEngine::with_runtime`] to provide the runtime explicitly.
    pub fn new<O: MarkerOverlay>(
        config: ClusterConfig,
        overlay: O,
        messenger: Option<Arc<dyn Messenger>>,
    ) -> Result<(Self, ClusterOverlay<I, O>), ClusterError> {
        let handle = Handle::try_current().map_err(|_| ClusterError::NoRuntime)?;
        Self::with_runtime(&handle, config, overlay, messenger)
    }

    /// Creates a new engine running clustering passes on the given runtime.
    pub fn with_runtime<O: MarkerOverlay>(
        handle: &Handle,
        config: ClusterConfig,
        overlay: O,
        messenger: Option<Arc<dyn Messenger>>,
    ) -> Result<(Self, ClusterOverlay<I, O>), ClusterError> {
        config.validate()?;

        let token = GenerationToken::default();
        let state = StateCell::default();
        let (render_sender, render_receiver) = mpsc::unbounded_channel();
        let worker = ComputeWorker::spawn(handle, token.clone(), render_sender.clone(), messenger);
        let overlay = ClusterOverlay::new(
            overlay,
            render_receiver,
            token.clone(),
            state.clone(),
            &config,
        );

        let engine = Self {
            config,
            items: vec![],
            positions: HashMap::default(),
            viewport: ViewportListener::default(),
            worker,
            render_sender,
            token,
            state,
            disposed: false,
        };

        Ok((engine, overlay))
    }

    /// Changes the main clustering parameters.
    ///
    /// If any of the values is invalid, an error is returned and nothing changes. Otherwise the
    /// clusters are recomputed for the current viewport.
    pub fn configure(
        &mut self,
        radius_pixels: f64,
        max_cluster_zoom: f64,
        icon_cache_capacity: usize,
        size_buckets: Vec<usize>,
    ) -> Result<(), ClusterError> {
        let config = self
            .config
            .clone()
            .with_radius_pixels(radius_pixels)
            .with_max_cluster_zoom(max_cluster_zoom)
            .with_icon_cache_capacity(icon_cache_capacity)
            .with_size_buckets(size_buckets);

        self.set_config(config)
    }

    /// Replaces the whole configuration. See [`ClusterEngine::configure`].
    pub fn set_config(&mut self, config: ClusterConfig) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        config.validate()?;

        self.send(RenderMessage::Configure {
            icon_cache_capacity: config.icon_cache_capacity(),
            size_buckets: config.size_buckets().to_vec(),
            fade_duration: config.fade_duration(),
        });
        self.config = config;
        self.request_full();

        Ok(())
    }

    /// Current configuration.
    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Replaces all items and recomputes the clusters.
    ///
    /// If several items share an id, the last one wins.
    pub fn set_items(&mut self, items: impl IntoIterator<Item = I>) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        self.items.clear();
        self.positions.clear();
        for item in items {
            self.upsert(Arc::new(item));
        }
        self.request_full();

        Ok(())
    }

    /// Adds one item, placing it into the existing clusters without a full recompute.
    ///
    /// Before the first viewport is reported the item is only stored. If an item with the same
    /// id is already present, it is replaced and the clusters are recomputed in full.
    pub fn add_item(&mut self, item: I) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        let item = Arc::new(item);
        if self.upsert(item.clone()) {
            log::debug!("Item {:?} replaced", item.id());
            self.request_full();
            return Ok(());
        }

        if self.viewport.viewport().is_none() {
            log::debug!("No viewport yet, item {:?} is stored only", item.id());
            return Ok(());
        }

        if let Some(region) = self.viewport.visible_region(&self.config) {
            if !region.contains(&item.position()) {
                log::debug!("Item {:?} is outside of the visible region", item.id());
                return Ok(());
            }
        }

        let generation = self.token.current();
        self.state.request_submitted();
        if !self
            .worker
            .submit(ComputeRequest::Incremental { generation, item })
        {
            log::warn!("Compute worker is not running, incremental update is skipped");
            self.state.result_received();
        }

        Ok(())
    }

    /// Adds several items and recomputes the clusters. Items with known ids replace the stored
    /// ones.
    pub fn add_items(&mut self, items: impl IntoIterator<Item = I>) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        for item in items {
            self.upsert(Arc::new(item));
        }
        self.request_full();

        Ok(())
    }

    /// Removes the item with the given id. Returns false if there is no such item.
    pub fn remove_item(&mut self, id: &I::Id) -> Result<bool, ClusterError> {
        self.ensure_alive()?;
        let count = self.items.len();
        self.items.retain(|item| item.id() != *id);
        if self.items.len() == count {
            return Ok(false);
        }

        self.positions = self
            .items
            .iter()
            .enumerate()
            .map(|(index, item)| (item.id(), index))
            .collect();
        self.request_full();
        Ok(true)
    }

    /// Removes all items.
    pub fn clear_items(&mut self) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        self.items.clear();
        self.positions.clear();
        self.request_full();

        Ok(())
    }

    /// All items of the engine in the order they were added.
    pub fn items(&self) -> &[Arc<I>] {
        &self.items
    }

    /// Must be called by the host every time the map camera stops moving.
    ///
    /// Starts a recompute with the distance threshold derived from the new scale. An invalid
    /// viewport is ignored.
    pub fn on_viewport_changed(&mut self, viewport: Viewport) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        if self.viewport.on_camera_idle(viewport) {
            self.request_full();
        }

        Ok(())
    }

    /// The last valid viewport reported by the host.
    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.viewport()
    }

    /// Sets the callback for taps on markers of several items.
    pub fn set_cluster_click_handler(
        &mut self,
        handler: impl ClusterClickHandler<I> + 'static,
    ) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        self.send(RenderMessage::SetClusterClickHandler(Box::new(handler)));
        Ok(())
    }

    /// Sets the callback for taps on markers of single items.
    pub fn set_item_click_handler(
        &mut self,
        handler: impl ItemClickHandler<I> + 'static,
    ) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        self.send(RenderMessage::SetItemClickHandler(Box::new(handler)));
        Ok(())
    }

    /// Replaces the badge renderer. Cached badges are dropped and the markers on the map get
    /// new icons.
    pub fn set_renderer(
        &mut self,
        renderer: impl ClusterRenderer<I> + 'static,
    ) -> Result<(), ClusterError> {
        self.ensure_alive()?;
        self.send(RenderMessage::SetRenderer(Box::new(renderer)));
        Ok(())
    }

    /// Stops the engine.
    ///
    /// The running recompute is cancelled, all the markers are removed from the map and the
    /// badge cache is cleared next time the overlay processes its messages. Calling any
    /// mutating method after that returns [`ClusterError::Disposed`].
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }

        self.disposed = true;
        self.token.advance();
        self.worker.shutdown();
        self.send(RenderMessage::Dispose);
        self.state.reset();

        log::info!("Cluster engine disposed");
    }

    /// Returns true if [`ClusterEngine::dispose`] was called.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Current stage of the engine.
    pub fn state(&self) -> EngineState {
        self.state.get()
    }

    /// Generation of the latest full recompute request.
    pub fn generation(&self) -> Generation {
        self.token.current()
    }

    fn ensure_alive(&self) -> Result<(), ClusterError> {
        if self.disposed {
            return Err(ClusterError::Disposed);
        }

        Ok(())
    }

    /// Stores the item, replacing the one with the same id. Returns true if it was replaced.
    fn upsert(&mut self, item: Arc<I>) -> bool {
        match self.positions.entry(item.id()) {
            Entry::Occupied(entry) => {
                self.items[*entry.get()] = item;
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(self.items.len());
                self.items.push(item);
                false
            }
        }
    }

    fn send(&self, message: RenderMessage<I>) {
        if self.render_sender.send(message).is_err() {
            log::debug!("Cluster overlay is dropped, message is discarded");
        }
    }

    fn request_full(&mut self) {
        let Some(params) = self.viewport.params(&self.config) else {
            log::debug!("No viewport yet, recompute is postponed");
            return;
        };

        let items: Arc<[Arc<I>]> = match self.viewport.visible_region(&self.config) {
            Some(region) => self
                .items
                .iter()
                .filter(|item| region.contains(&item.position()))
                .cloned()
                .collect(),
            None => self.items.iter().cloned().collect(),
        };

        let generation = self.token.advance();
        log::debug!(
            "Requesting recompute {generation} of {} items out of {}",
            items.len(),
            self.items.len()
        );

        self.state.request_submitted();
        if !self.worker.submit(ComputeRequest::Full {
            generation,
            items,
            params,
        }) {
            log::warn!("Compute worker is not running, recompute {generation} is skipped");
            self.state.result_received();
        }
    }
}

impl<I: ClusterItem> Drop for ClusterEngine<I> {
    fn drop(&mut self) {
        self.dispose();
    }
}

//! Clustermap groups large sets of geo-positioned markers into clusters, so that a map shows one
//! badge with the number of items instead of a pile of overlapping pins.
//!
//! # Quick start
//!
//! ```no_run
//! use clustermap::{ClusterConfig, ClusterEngine, DummyMessenger, PointItem, Viewport};
//! use clustermap::{BadgeImage, MarkerId, MarkerOverlay};
//! use clustermap::clustermap_types::{latlon, GeoPoint2d};
//! use std::sync::Arc;
//!
//! #[derive(Default)]
//! struct Pins(u64);
//!
//! impl MarkerOverlay for Pins {
//!     fn add_marker(&mut self, position: GeoPoint2d, icon: Arc<BadgeImage>, opacity: f32) -> MarkerId {
//!         self.0 += 1;
//!         MarkerId(self.0)
//!     }
//!     fn remove_marker(&mut self, id: MarkerId) {}
//!     fn set_marker_icon(&mut self, id: MarkerId, icon: Arc<BadgeImage>) {}
//!     fn set_marker_position(&mut self, id: MarkerId, position: GeoPoint2d) {}
//!     fn set_marker_opacity(&mut self, id: MarkerId, opacity: f32) {}
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), clustermap::ClusterError> {
//! let config = ClusterConfig::default().with_radius_pixels(60.0);
//! let (mut engine, mut overlay) =
//!     ClusterEngine::new(config, Pins::default(), Some(Arc::new(DummyMessenger)))?;
//!
//! engine.set_items((0..1000).map(|i| {
//!     PointItem::new(i, latlon!(59.9 + i as f64 * 1e-4, 30.3), format!("shop #{i}"))
//! }))?;
//! engine.set_item_click_handler(|item: &PointItem<String>| {
//!     println!("{} is tapped", item.payload());
//!     true
//! })?;
//! engine.on_viewport_changed(Viewport::web_mercator(14.0, &latlon!(59.95, 30.3)))?;
//!
//! // Later, on the map thread:
//! overlay.process_messages();
//! overlay.animate(web_time::Instant::now());
//! # Ok(())
//! # }
//! ```
//!
//! # Main components
//!
//! The engine spans three execution contexts that only talk to each other by passing messages:
//!
//! * [`ClusterEngine`] lives on the caller side. It stores the items and the configuration, and
//!   turns every change into a recompute request. It never blocks.
//! * The compute context is a tokio task that runs [clustering passes](cluster::cluster_all) one
//!   after another. Every request is tagged with a [`Generation`]; when a newer request is made,
//!   the running pass is aborted and its result is never shown.
//! * [`ClusterOverlay`] lives on the thread owning the map. It receives computed
//!   [`ClusterSet`]s and creates, fades and removes markers of the host [`MarkerOverlay`],
//!   taking badge images from the [`IconCache`]. It also routes marker taps to the click
//!   handlers.
//!
//! The badges are drawn by a [`ClusterRenderer`]. The [`DefaultClusterRenderer`] draws colored
//! circles with the number of items, but any image can be provided instead.

#![warn(clippy::unwrap_used)]
#![warn(missing_docs)]

mod click;
pub mod cluster;
mod color;
mod compute;
mod config;
mod engine;
pub mod error;
pub mod icon;
mod item;
mod messenger;
pub mod overlay;
mod renderer;
mod state;
mod viewport;

pub use click::{ClusterClickHandler, ItemClickHandler};
pub use cluster::{Cluster, ClusterParams, ClusterSet, Generation};
pub use color::Color;
pub use config::ClusterConfig;
pub use engine::ClusterEngine;
pub use error::ClusterError;
pub use icon::{BadgeImage, BadgeStyle, IconCache, SizeBucket};
pub use item::{ClusterItem, PointItem};
pub use messenger::{DummyMessenger, Messenger};
pub use overlay::{ClusterOverlay, ClusterStats, MarkerId, MarkerOverlay};
pub use renderer::{ClusterRenderer, DefaultClusterRenderer};
pub use state::EngineState;
pub use viewport::{Viewport, WEB_MERCATOR_BASE_RESOLUTION};

// Reexport clustermap_types
pub use clustermap_types;

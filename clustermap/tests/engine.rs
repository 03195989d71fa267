use assert_matches::assert_matches;
use clustermap::cluster::cluster_all;
use clustermap::clustermap_types::{latlon, GeoPoint2d, GeoRect};
use clustermap::{
    BadgeImage, Cluster, ClusterConfig, ClusterEngine, ClusterError, ClusterItem, ClusterOverlay,
    ClusterRenderer, EngineState, MarkerId, MarkerOverlay, Messenger, PointItem, SizeBucket,
    Viewport,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use web_time::Instant;

type Item = PointItem<String>;

struct Pin {
    position: GeoPoint2d,
    icon: Arc<BadgeImage>,
    opacity: f32,
}

#[derive(Default)]
struct RecordingOverlay {
    next_id: u64,
    pins: HashMap<MarkerId, Pin>,
    added_total: usize,
    icon_changes: usize,
}

impl MarkerOverlay for RecordingOverlay {
    fn add_marker(&mut self, position: GeoPoint2d, icon: Arc<BadgeImage>, opacity: f32) -> MarkerId {
        self.next_id += 1;
        self.added_total += 1;
        let id = MarkerId(self.next_id);
        self.pins.insert(
            id,
            Pin {
                position,
                icon,
                opacity,
            },
        );

        id
    }

    fn remove_marker(&mut self, id: MarkerId) {
        assert!(self.pins.remove(&id).is_some(), "unknown marker {id:?}");
    }

    fn set_marker_icon(&mut self, id: MarkerId, icon: Arc<BadgeImage>) {
        self.icon_changes += 1;
        if let Some(pin) = self.pins.get_mut(&id) {
            pin.icon = icon;
        }
    }

    fn set_marker_position(&mut self, id: MarkerId, position: GeoPoint2d) {
        if let Some(pin) = self.pins.get_mut(&id) {
            pin.position = position;
        }
    }

    fn set_marker_opacity(&mut self, id: MarkerId, opacity: f32) {
        if let Some(pin) = self.pins.get_mut(&id) {
            pin.opacity = opacity;
        }
    }
}

#[derive(Default)]
struct CountingMessenger(AtomicUsize);

impl Messenger for CountingMessenger {
    fn request_redraw(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }
}

struct FailingRenderer;

impl ClusterRenderer<Item> for FailingRenderer {
    fn icon_for(&self, bucket: SizeBucket) -> Result<BadgeImage, ClusterError> {
        Err(ClusterError::Render(format!("no badge for {bucket}")))
    }
}

type Overlay = ClusterOverlay<Item, RecordingOverlay>;

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn config() -> ClusterConfig {
    ClusterConfig::default().with_fade_duration(Duration::ZERO)
}

fn engine(config: ClusterConfig) -> (ClusterEngine<Item>, Overlay) {
    init_logger();
    ClusterEngine::new(config, RecordingOverlay::default(), None).expect("valid config")
}

fn item(id: u64, lat: f64, lon: f64) -> Item {
    PointItem::new(id, latlon!(lat, lon), format!("item {id}"))
}

/// With the default radius of 100 px this gives a threshold of 50 m.
fn viewport() -> Viewport {
    Viewport::new(12.0, 0.5)
}

fn grid(count: u64) -> Vec<Item> {
    (0..count)
        .map(|i| item(i, (i / 100) as f64 * 0.01, (i % 100) as f64 * 0.01))
        .collect()
}

async fn settle(engine: &ClusterEngine<Item>, overlay: &mut Overlay, now: Instant) {
    for _ in 0..500 {
        overlay.process_messages_at(now);
        if engine.state() == EngineState::Idle {
            return;
        }

        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    panic!("engine did not become idle");
}

fn sizes(overlay: &Overlay) -> Vec<usize> {
    let mut sizes: Vec<_> = overlay
        .current_clusters()
        .expect("clusters are applied")
        .clusters()
        .iter()
        .map(Cluster::size)
        .collect();
    sizes.sort_unstable();
    sizes
}

#[tokio::test(flavor = "multi_thread")]
async fn close_items_are_grouped() {
    let (mut engine, mut overlay) = engine(config());
    engine
        .set_items([item(1, 0.0, 0.0), item(2, 0.0, 0.00001), item(3, 10.0, 10.0)])
        .expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;

    assert_eq!(sizes(&overlay), vec![1, 2]);
    assert_eq!(overlay.overlay().pins.len(), 2);
    assert_eq!(overlay.stats().live_markers, 2);

    let big = overlay
        .overlay()
        .pins
        .values()
        .find(|pin| pin.position == latlon!(0.0, 0.0))
        .expect("marker at the first item");
    assert_eq!(big.opacity, 1.0);
    assert!(big.icon.width() > 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn nothing_is_computed_before_viewport() {
    let (mut engine, mut overlay) = engine(config());
    engine.set_items(grid(10)).expect("engine is alive");
    engine.add_item(item(100, 0.0, 0.0)).expect("engine is alive");

    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(overlay.process_messages(), 0);
    assert!(overlay.current_clusters().is_none());
    assert_eq!(engine.items().len(), 11);
}

#[tokio::test(flavor = "multi_thread")]
async fn superseded_recompute_is_never_applied() {
    let (mut engine, mut overlay) = engine(config());
    engine.on_viewport_changed(viewport()).expect("engine is alive");

    engine.set_items(grid(10_000)).expect("engine is alive");
    engine.set_items(grid(5)).expect("engine is alive");
    assert_eq!(engine.state(), EngineState::Computing);

    settle(&engine, &mut overlay, Instant::now()).await;

    let applied = overlay.current_clusters().expect("clusters are applied");
    assert_eq!(applied.item_count(), 5);
    assert_eq!(applied.generation(), engine.generation());
    assert!(overlay.overlay().added_total <= 5);

    let stats = overlay.stats();
    assert_eq!(stats.full_applies, 1);
    assert_eq!(stats.applied_generation, Some(engine.generation()));
    assert_eq!(
        stats.dropped_stale + stats.superseded + stats.cancelled,
        2,
        "{stats:?}"
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn incremental_add_matches_full_recompute() {
    let (mut engine, mut overlay) = engine(config());
    let items = vec![
        item(1, 0.0, 0.0),
        item(2, 0.0, 0.0001),
        item(3, 1.0, 1.0),
        item(4, 2.0, 2.0),
    ];
    engine.set_items(items.clone()).expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(overlay.overlay().pins.len(), 3);

    let generation = engine.generation();
    engine.add_item(item(5, 1.0, 1.0001)).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(engine.generation(), generation);

    engine.add_item(item(6, 5.0, 5.0)).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;

    let applied = overlay.current_clusters().expect("clusters are applied");
    let mut all = items;
    all.push(item(5, 1.0, 1.0001));
    all.push(item(6, 5.0, 5.0));
    let all: Vec<_> = all.into_iter().map(Arc::new).collect();
    let expected = cluster_all(&all, applied.params());

    let membership = |clusters: &[Cluster<Item>]| {
        clusters
            .iter()
            .map(Cluster::member_ids)
            .collect::<Vec<_>>()
    };
    assert_eq!(membership(applied.clusters()), membership(expected.as_slice()));

    let stats = overlay.stats();
    assert_eq!(stats.incremental_applies, 2);
    assert_eq!(overlay.overlay().pins.len(), 4);
    assert_eq!(overlay.overlay().added_total, 4);
    assert_eq!(overlay.overlay().icon_changes, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn clustering_is_disabled_at_max_zoom() {
    let (mut engine, mut overlay) = engine(config().with_max_cluster_zoom(15.0));
    engine
        .set_items([item(1, 0.0, 0.0), item(2, 0.0, 0.0), item(3, 0.0, 0.0)])
        .expect("engine is alive");

    engine
        .on_viewport_changed(Viewport::new(15.0, 0.5))
        .expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(sizes(&overlay), vec![1, 1, 1]);

    engine
        .on_viewport_changed(Viewport::new(14.0, 0.5))
        .expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(sizes(&overlay), vec![3]);
    assert_eq!(overlay.overlay().pins.len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn unchanged_clusters_keep_their_markers() {
    let (mut engine, mut overlay) = engine(config());
    engine
        .set_items([item(1, 0.0, 0.0), item(2, 0.0, 0.0001), item(3, 10.0, 10.0)])
        .expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    let before: Vec<_> = overlay.overlay().pins.keys().copied().collect();

    assert!(engine.remove_item(&3).expect("engine is alive"));
    assert!(!engine.remove_item(&3).expect("engine is alive"));
    settle(&engine, &mut overlay, Instant::now()).await;

    let after: Vec<_> = overlay.overlay().pins.keys().copied().collect();
    assert_eq!(after.len(), 1);
    assert!(before.contains(&after[0]));
    assert_eq!(overlay.overlay().added_total, 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn taps_are_routed_by_cluster_size() {
    let (mut engine, mut overlay) = engine(config());
    let cluster_taps = Arc::new(Mutex::new(vec![]));
    let item_taps = Arc::new(Mutex::new(vec![]));

    let taps = cluster_taps.clone();
    engine
        .set_cluster_click_handler(move |cluster: &Cluster<Item>| {
            taps.lock().expect("not poisoned").push(cluster.member_ids());
            true
        })
        .expect("engine is alive");
    let taps = item_taps.clone();
    engine
        .set_item_click_handler(move |item: &Item| {
            taps.lock().expect("not poisoned").push(item.payload().clone());
            false
        })
        .expect("engine is alive");

    engine
        .set_items([item(1, 0.0, 0.0), item(2, 0.0, 0.00001), item(3, 10.0, 10.0)])
        .expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;

    let ids: Vec<_> = overlay.overlay().pins.keys().copied().collect();
    for id in ids {
        let size = overlay.marker(id).expect("marker is registered").cluster().size();
        assert_eq!(overlay.handle_marker_tap(id), size > 1);
    }

    assert!(!overlay.handle_marker_tap(MarkerId(u64::MAX)));
    assert_eq!(*cluster_taps.lock().expect("not poisoned"), vec![vec![1, 2]]);
    assert_eq!(*item_taps.lock().expect("not poisoned"), vec!["item 3".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn dispose_clears_the_map() {
    let (mut engine, mut overlay) = engine(config());
    engine.set_items(grid(20)).expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(overlay.overlay().pins.len(), 20);
    assert!(!overlay.icon_cache().is_empty());

    engine.dispose();
    overlay.process_messages();

    assert!(overlay.is_disposed());
    assert!(overlay.overlay().pins.is_empty());
    assert!(overlay.icon_cache().is_empty());
    assert!(overlay.current_clusters().is_none());
    assert_eq!(engine.state(), EngineState::Idle);
    assert_matches!(engine.set_items(grid(1)), Err(ClusterError::Disposed));
    assert_matches!(engine.add_item(item(1, 0.0, 0.0)), Err(ClusterError::Disposed));
}

#[tokio::test(flavor = "multi_thread")]
async fn dispose_discards_running_recompute() {
    let (mut engine, mut overlay) = engine(config());
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    engine.set_items(grid(10_000)).expect("engine is alive");
    engine.dispose();

    tokio::time::sleep(Duration::from_millis(50)).await;
    overlay.process_messages();
    assert!(overlay.overlay().pins.is_empty());
    assert_eq!(overlay.overlay().added_total, 0);
    assert_eq!(overlay.process_messages(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn markers_fade_in_and_out() {
    let fade = Duration::from_millis(300);
    let (mut engine, mut overlay) = engine(ClusterConfig::default().with_fade_duration(fade));
    engine
        .set_items([item(1, 0.0, 0.0), item(2, 0.0, 0.00001)])
        .expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");

    let start = Instant::now();
    settle(&engine, &mut overlay, start).await;
    let (&id, pin) = overlay.overlay().pins.iter().next().expect("one marker");
    assert_eq!(pin.opacity, 0.0);

    assert!(overlay.animate(start + fade / 2));
    let opacity = overlay.overlay().pins[&id].opacity;
    assert!((opacity - 0.5).abs() < 1e-3, "{opacity}");

    assert!(!overlay.animate(start + fade));
    assert_eq!(overlay.overlay().pins[&id].opacity, 1.0);

    // Size of the cluster changes, so its marker is replaced.
    engine.remove_item(&2).expect("engine is alive");
    let next = start + fade * 2;
    settle(&engine, &mut overlay, next).await;
    assert_eq!(overlay.overlay().pins.len(), 2);
    assert_eq!(overlay.marker_count(), 2);
    assert!(overlay.marker(id).expect("still registered").is_leaving());
    assert!(!overlay.handle_marker_tap(id));
    assert_eq!(overlay.stats().live_markers, 1);

    assert!(!overlay.animate(next + fade));
    assert_eq!(overlay.overlay().pins.len(), 1);
    assert!(!overlay.overlay().pins.contains_key(&id));
    assert!(overlay.marker(id).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn invalid_configuration_starts_nothing() {
    let (mut engine, mut overlay) = engine(config());
    engine.set_items(grid(3)).expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    let generation = engine.generation();

    assert_matches!(
        engine.configure(0.0, 19.0, 80, vec![10, 20]),
        Err(ClusterError::InvalidRadius(_))
    );
    assert_matches!(
        engine.configure(-5.0, 19.0, 80, vec![10, 20]),
        Err(ClusterError::InvalidRadius(_))
    );
    assert_matches!(
        engine.configure(100.0, 19.0, 0, vec![10, 20]),
        Err(ClusterError::InvalidCapacity(0))
    );
    assert_matches!(
        engine.configure(100.0, 19.0, 80, vec![20, 10]),
        Err(ClusterError::InvalidBuckets(_))
    );

    assert_eq!(engine.generation(), generation);
    assert_eq!(engine.state(), EngineState::Idle);
    assert_eq!(engine.config().radius_pixels(), 100.0);

    engine
        .configure(50.0, 10.0, 4, vec![2, 5])
        .expect("valid configuration");
    assert!(engine.generation() > generation);
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(overlay.icon_cache().capacity(), 4);
}

#[test]
fn engine_requires_runtime() {
    let result = ClusterEngine::<Item>::new(config(), RecordingOverlay::default(), None);
    assert_matches!(result, Err(ClusterError::NoRuntime));
}

#[tokio::test(flavor = "multi_thread")]
async fn render_failure_falls_back_to_default_badge() {
    let (mut engine, mut overlay) = engine(config());
    engine.set_renderer(FailingRenderer).expect("engine is alive");
    engine.set_items(grid(3)).expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;

    assert_eq!(overlay.overlay().pins.len(), 3);
    for pin in overlay.overlay().pins.values() {
        assert!(pin.icon.width() > 0);
    }
    assert!(overlay.icon_cache().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn items_outside_visible_region_are_skipped() {
    let (mut engine, mut overlay) = engine(config().with_visible_padding(Some(0.0)));
    engine.set_items(grid(200)).expect("engine is alive");
    let bounds = GeoRect::new(-0.001, -0.001, 0.0051, 0.505);
    engine
        .on_viewport_changed(viewport().with_bounds(bounds))
        .expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;

    // first row of the grid, longitudes 0.00..=0.50
    let applied = overlay.current_clusters().expect("clusters are applied");
    assert_eq!(applied.item_count(), 51);

    engine.add_item(item(1000, 10.0, 10.0)).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(overlay.stats().incremental_applies, 0);
    assert_eq!(engine.items().len(), 201);
}

#[tokio::test(flavor = "multi_thread")]
async fn messenger_is_notified_about_results() {
    init_logger();
    let messenger = Arc::new(CountingMessenger::default());
    let (mut engine, mut overlay) =
        ClusterEngine::new(config(), RecordingOverlay::default(), Some(messenger.clone()))
            .expect("valid config");
    engine.set_items(grid(3)).expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;

    assert!(messenger.0.load(Ordering::Relaxed) >= 1);

    engine.clear_items().expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert!(overlay.overlay().pins.is_empty());
    assert!(overlay.current_clusters().expect("applied").is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn moved_item_moves_its_marker() {
    let (mut engine, mut overlay) = engine(config());
    engine.set_items([item(1, 0.0, 0.0)]).expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    let id = *overlay.overlay().pins.keys().next().expect("one marker");

    engine.set_items([item(1, 5.0, 5.0)]).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;

    assert_eq!(overlay.overlay().pins.len(), 1);
    assert_eq!(overlay.overlay().added_total, 1);
    assert_eq!(overlay.overlay().pins[&id].position, latlon!(5.0, 5.0));
    assert_eq!(
        overlay.marker(id).expect("marker is registered").cluster().center(),
        latlon!(5.0, 5.0)
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn new_buckets_redraw_live_badges() {
    let (mut engine, mut overlay) = engine(config());
    engine
        .set_items((0..15).map(|id| item(id, 0.0, 0.0)))
        .expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(sizes(&overlay), vec![15]);
    assert_eq!(overlay.icon_cache().bucket(15).label(), "10+");
    let id = *overlay.overlay().pins.keys().next().expect("one marker");
    let before = overlay.overlay().pins[&id].icon.clone();

    engine
        .configure(100.0, 19.0, 80, vec![5, 15])
        .expect("valid configuration");
    settle(&engine, &mut overlay, Instant::now()).await;

    assert_eq!(overlay.icon_cache().bucket(15).label(), "15+");
    assert_eq!(overlay.overlay().added_total, 1);
    assert!(overlay.overlay().icon_changes >= 1);

    let icon = &overlay.overlay().pins[&id].icon;
    let expected = overlay.icon_cache().peek(15).expect("badge is cached");
    assert!(Arc::ptr_eq(icon, &expected));
    assert!(!Arc::ptr_eq(icon, &before));
}

#[tokio::test(flavor = "multi_thread")]
async fn duplicate_ids_replace_items() {
    let (mut engine, mut overlay) = engine(config());
    engine
        .set_items([item(1, 0.0, 0.0), item(2, 1.0, 1.0), item(1, 10.0, 10.0)])
        .expect("engine is alive");
    assert_eq!(engine.items().len(), 2);
    assert_eq!(engine.items()[0].position(), latlon!(10.0, 10.0));

    engine.on_viewport_changed(viewport()).expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(overlay.overlay().pins.len(), 2);

    let generation = engine.generation();
    engine.add_item(item(2, 2.0, 2.0)).expect("engine is alive");
    assert!(engine.generation() > generation);
    assert_eq!(engine.items().len(), 2);
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(overlay.stats().incremental_applies, 0);
    assert!(overlay
        .overlay()
        .pins
        .values()
        .any(|pin| pin.position == latlon!(2.0, 2.0)));

    engine
        .add_items([item(3, 3.0, 3.0), item(3, 4.0, 4.0)])
        .expect("engine is alive");
    assert_eq!(engine.items().len(), 3);
    assert!(engine.remove_item(&1).expect("engine is alive"));
    engine.add_item(item(3, 5.0, 5.0)).expect("engine is alive");
    assert_eq!(engine.items().len(), 2);
    assert_eq!(engine.items()[1].position(), latlon!(5.0, 5.0));
    settle(&engine, &mut overlay, Instant::now()).await;
    assert_eq!(overlay.overlay().pins.len(), 2);

    engine.clear_items().expect("engine is alive");
    settle(&engine, &mut overlay, Instant::now()).await;
    assert!(overlay.overlay().pins.is_empty());
    assert_eq!(overlay.stats().live_markers, 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn growing_cluster_keeps_fading_in() {
    let fade = Duration::from_millis(300);
    let (mut engine, mut overlay) = engine(ClusterConfig::default().with_fade_duration(fade));
    engine.set_items([item(1, 0.0, 0.0)]).expect("engine is alive");
    engine.on_viewport_changed(viewport()).expect("engine is alive");

    let start = Instant::now();
    settle(&engine, &mut overlay, start).await;
    let id = *overlay.overlay().pins.keys().next().expect("one marker");
    let before = overlay.overlay().pins[&id].icon.clone();

    engine.add_item(item(2, 0.0, 0.00001)).expect("engine is alive");
    settle(&engine, &mut overlay, start + fade / 3).await;

    assert_eq!(overlay.stats().incremental_applies, 1);
    assert_eq!(overlay.overlay().pins.len(), 1);
    assert_eq!(overlay.overlay().icon_changes, 1);
    assert!(!Arc::ptr_eq(&overlay.overlay().pins[&id].icon, &before));

    let marker = overlay.marker(id).expect("marker is registered");
    assert_eq!(marker.cluster().size(), 2);
    assert!(marker.transition().is_some());
    assert!(!marker.is_leaving());

    assert!(overlay.animate(start + fade / 2));
    assert!(!overlay.animate(start + fade));
    assert_eq!(overlay.overlay().pins[&id].opacity, 1.0);
    assert!(overlay.marker(id).expect("marker is registered").transition().is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn item_added_during_recompute_is_placed() {
    let (mut engine, mut overlay) = engine(config());
    engine.on_viewport_changed(viewport()).expect("engine is alive");
    engine.set_items(grid(5)).expect("engine is alive");
    engine.add_item(item(100, 0.0, 0.00001)).expect("engine is alive");
    assert_eq!(engine.state(), EngineState::Computing);

    settle(&engine, &mut overlay, Instant::now()).await;

    let stats = overlay.stats();
    assert_eq!(stats.full_applies, 1);
    assert_eq!(stats.incremental_applies, 1);

    let applied = overlay.current_clusters().expect("clusters are applied");
    assert_eq!(applied.generation(), engine.generation());
    let expected = cluster_all(engine.items(), applied.params());
    let membership = |clusters: &[Cluster<Item>]| {
        clusters
            .iter()
            .map(Cluster::member_ids)
            .collect::<Vec<_>>()
    };
    assert_eq!(membership(applied.clusters()), membership(expected.as_slice()));
    assert_eq!(sizes(&overlay), vec![1, 1, 1, 1, 2]);
    assert_eq!(overlay.overlay().pins.len(), 5);
    assert_eq!(overlay.overlay().added_total, 5);
}

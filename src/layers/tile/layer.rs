use std::any::Any;

use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::FutureExt;
use log::{debug, trace, warn};

use crate::{
    core::{config::TileLayerOptions, geo::TileKey, viewport::Viewport},
    layers::base::{Capabilities, Element, ElementContext, ElementProperties, ElementType},
    prelude::{Arc, Instant},
    runtime::{debounce::Debouncer, AsyncSpawner},
    scene::{NodeKind, SceneGraph},
    tiles::{fetch::BitmapFetcher, source::TileSource, UrlTemplate},
    Result,
};

use super::{
    grid::{TileGrid, TileRange},
    types::{FadingLevel, FetchResult, TileLevel, TileRecord, TileState},
};

/// Raster tile overlay kept consistent with the viewport.
///
/// Moves and zoom ends schedule a debounced recompute of the needed tile
/// set. Each frame the layer applies finished fetches, runs the recompute
/// once it is due and evicts zoom levels whose fade delay has passed.
pub struct TileLayer {
    properties: ElementProperties,
    options: TileLayerOptions,
    source: Box<dyn TileSource>,
    fetcher: Arc<dyn BitmapFetcher>,
    spawner: Arc<dyn AsyncSpawner>,
    /// The retained set
    current: Option<TileLevel>,
    fading: Vec<FadingLevel>,
    update: Debouncer<()>,
    results_tx: Sender<FetchResult>,
    results_rx: Receiver<FetchResult>,
    next_request_id: u64,
}

impl TileLayer {
    pub fn new(
        name: impl Into<String>,
        options: TileLayerOptions,
        fetcher: Arc<dyn BitmapFetcher>,
        spawner: Arc<dyn AsyncSpawner>,
    ) -> Result<Self> {
        options.validate()?;
        let source = UrlTemplate::new(options.url.clone(), &options.subdomains)?;
        let (results_tx, results_rx) = unbounded();
        Ok(Self {
            properties: ElementProperties::new(name, ElementType::Tile),
            update: Debouncer::trailing(options.update_debounce()),
            options,
            source: Box::new(source),
            fetcher,
            spawner,
            current: None,
            fading: Vec::new(),
            results_tx,
            results_rx,
            next_request_id: 0,
        })
    }

    /// Replaces the URL template with a custom source
    pub fn with_source(mut self, source: Box<dyn TileSource>) -> Self {
        self.source = source;
        self
    }

    pub fn options(&self) -> &TileLayerOptions {
        &self.options
    }

    pub fn tile_source(&self) -> &dyn TileSource {
        self.source.as_ref()
    }

    /// Tile zoom used for a viewport: its zoom rounded, clamped to the layer limits
    pub fn tile_zoom_for(&self, viewport: &Viewport) -> u8 {
        let zoom = viewport
            .zoom()
            .round()
            .clamp(self.options.min_zoom as f64, self.options.max_zoom as f64);
        zoom as u8
    }

    /// The tile set `viewport` needs, sorted like [`retained_keys`](Self::retained_keys)
    pub fn needed_keys(&self, viewport: &Viewport) -> Result<Vec<TileKey>> {
        let grid = TileGrid::new(self.tile_zoom_for(viewport))?;
        let mut keys: Vec<TileKey> = grid.range(viewport).keys().collect();
        keys.sort();
        Ok(keys)
    }

    /// Keys of the retained set, sorted
    pub fn retained_keys(&self) -> Vec<TileKey> {
        let mut keys: Vec<TileKey> = self
            .current
            .iter()
            .flat_map(|level| level.tiles.keys().copied())
            .collect();
        keys.sort();
        keys
    }

    /// Zoom of the retained set, `None` before the first recompute
    pub fn tile_zoom(&self) -> Option<u8> {
        self.current.as_ref().map(|level| level.zoom)
    }

    pub fn record(&self, key: &TileKey) -> Option<&TileRecord> {
        self.current.as_ref()?.tiles.get(key)
    }

    /// Retained tiles still waiting for their bitmap
    pub fn pending_fetches(&self) -> usize {
        self.current
            .iter()
            .flat_map(|level| level.tiles.values())
            .filter(|record| record.is_pending())
            .count()
    }

    /// Number of previous zoom levels still waiting for eviction
    pub fn fading_len(&self) -> usize {
        self.fading.len()
    }

    /// Whether a debounced recompute is scheduled
    pub fn is_update_pending(&self) -> bool {
        self.update.is_pending()
    }

    /// Recomputes the tile set right away, dropping any scheduled recompute
    pub fn refresh(&mut self, ctx: &mut ElementContext<'_>) {
        self.update.cancel();
        self.recompute(ctx);
    }

    fn schedule_update(&mut self, now: Instant) {
        if self.update.trigger(now, ()).is_some() {
            trace!("tile layer '{}': leading update", self.properties.name);
        }
    }

    fn recompute(&mut self, ctx: &mut ElementContext<'_>) {
        let Some(root) = self.properties.root else {
            return;
        };
        if !self.properties.visible {
            return;
        }
        let grid = match TileGrid::new(self.tile_zoom_for(ctx.viewport)) {
            Ok(grid) => grid,
            Err(e) => {
                warn!("tile layer '{}': {}", self.properties.name, e);
                return;
            }
        };
        let range = grid.range(ctx.viewport);

        let mut level = match self.current.take() {
            Some(mut level) if level.zoom == grid.zoom() => {
                let evicted = Self::evict_outside(&mut level, &range, ctx.scene);
                if evicted > 0 {
                    debug!(
                        "tile layer '{}': evicted {} tiles at z{}",
                        self.properties.name,
                        evicted,
                        level.zoom
                    );
                }
                level
            }
            Some(previous) => {
                debug!(
                    "tile layer '{}': zoom {} -> {}, fading {} tiles",
                    self.properties.name,
                    previous.zoom,
                    grid.zoom(),
                    previous.tiles.len()
                );
                self.fading.push(FadingLevel {
                    level: previous,
                    evict_at: ctx.now + self.options.zoom_fade(),
                });
                TileLevel::new(grid.zoom())
            }
            None => TileLevel::new(grid.zoom()),
        };

        let mut requested = 0usize;
        for key in range.keys() {
            let request_id = self.next_request_id;
            match level.tiles.get_mut(&key) {
                Some(record) if record.state == TileState::Failed => {
                    self.next_request_id += 1;
                    record.request_id = request_id;
                    record.state = TileState::Pending;
                    let url = record.url.clone();
                    if !self.spawn_fetch(key, request_id, url) {
                        record.state = TileState::Failed;
                    }
                    requested += 1;
                }
                Some(_) => {}
                None => {
                    self.next_request_id += 1;
                    let rect = grid.placement(&key);
                    let node = ctx.scene.add_node(
                        Some(root),
                        NodeKind::Image {
                            x: rect.min.x,
                            y: rect.max.y,
                            width: grid.tile_size(),
                            height: grid.tile_size(),
                            z: self.options.z_index,
                            flip_y: true,
                        },
                    );
                    let url = self.source.url(&key);
                    let spawned = self.spawn_fetch(key, request_id, url.clone());
                    level.tiles.insert(
                        key,
                        TileRecord {
                            key,
                            node,
                            rect,
                            url,
                            state: if spawned {
                                TileState::Pending
                            } else {
                                TileState::Failed
                            },
                            request_id,
                        },
                    );
                    requested += 1;
                }
            }
        }

        debug!(
            "tile layer '{}': z{} x[{}, {}) y[{}, {}), {} retained, {} requested",
            self.properties.name,
            range.zoom,
            range.min_x,
            range.max_x,
            range.min_y,
            range.max_y,
            level.tiles.len(),
            requested
        );
        self.current = Some(level);
    }

    /// Removes the records of `level` outside `range`, returning how many went
    fn evict_outside(
        level: &mut TileLevel,
        range: &TileRange,
        scene: &mut dyn SceneGraph,
    ) -> usize {
        let before = level.tiles.len();
        level.tiles.retain(|key, record| {
            let keep = range.contains(key);
            if !keep {
                scene.remove_node(record.node);
            }
            keep
        });
        before - level.tiles.len()
    }

    /// Hands one fetch to the spawner. Returns false if it could not be spawned.
    fn spawn_fetch(&self, key: TileKey, request_id: u64, url: String) -> bool {
        let fetcher = self.fetcher.clone();
        let tx = self.results_tx.clone();
        let future = async move {
            let bitmap = fetcher.fetch(&url).await;
            // The layer may be gone; nothing to deliver to then
            let _ = tx.send(FetchResult {
                key,
                request_id,
                bitmap,
            });
        };
        match self.spawner.spawn_boxed(future.boxed()) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "tile layer '{}': could not spawn fetch for {}: {}",
                    self.properties.name, key, e
                );
                false
            }
        }
    }

    /// Applies finished fetches. Results whose record has been evicted or
    /// re-requested since are dropped.
    fn drain_results(&mut self, scene: &mut dyn SceneGraph) {
        while let Ok(result) = self.results_rx.try_recv() {
            let record = self
                .current
                .as_mut()
                .and_then(|level| level.tiles.get_mut(&result.key))
                .filter(|record| record.request_id == result.request_id && record.is_pending());

            match (record, result.bitmap) {
                (Some(record), Ok(bitmap)) => {
                    scene.set_image(record.node, bitmap);
                    record.state = TileState::Loaded;
                }
                (Some(record), Err(e)) => {
                    debug!("tile {} failed: {}", result.key, e);
                    record.state = TileState::Failed;
                }
                (None, _) => {
                    trace!(
                        "discarding stale result for tile {} (request {})",
                        result.key,
                        result.request_id
                    );
                }
            }
        }
    }

    fn evict_faded(&mut self, now: Instant, scene: &mut dyn SceneGraph) {
        self.fading.retain(|fading| {
            if now < fading.evict_at {
                return true;
            }
            for node in fading.level.nodes() {
                scene.remove_node(node);
            }
            false
        });
    }
}

impl Element for TileLayer {
    fn properties(&self) -> &ElementProperties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut ElementProperties {
        &mut self.properties
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::ON_MOVE | Capabilities::ON_ZOOM_END | Capabilities::ON_FRAME
    }

    fn on_move(&mut self, ctx: &mut ElementContext<'_>) {
        self.schedule_update(ctx.now);
    }

    fn on_zoom_end(&mut self, ctx: &mut ElementContext<'_>) {
        self.schedule_update(ctx.now);
    }

    fn on_frame(&mut self, ctx: &mut ElementContext<'_>) {
        self.drain_results(ctx.scene);
        if self.update.poll(ctx.now).is_some() {
            self.recompute(ctx);
        }
        self.evict_faded(ctx.now, ctx.scene);
    }

    fn reset(&mut self) {
        self.current = None;
        self.fading.clear();
        self.update.cancel();
        while self.results_rx.try_recv().is_ok() {}
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        core::geo::{GeoPoint, Point},
        prelude::{Duration, Mutex},
        runtime::{DeferredSpawner, InlineSpawner},
        scene::{Bitmap, MemoryScene},
        MapError,
    };
    use async_trait::async_trait;

    /// Serves the URL as the bitmap, failing for URLs listed in `fail`
    #[derive(Default)]
    struct UrlFetcher {
        fail: Mutex<Vec<String>>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl BitmapFetcher for UrlFetcher {
        async fn fetch(&self, url: &str) -> Result<Bitmap> {
            self.calls.lock().unwrap().push(url.to_string());
            if self.fail.lock().unwrap().iter().any(|f| f == url) {
                return Err(MapError::Fetch(format!("refused {url}")));
            }
            Ok(Arc::new(url.as_bytes().to_vec()))
        }
    }

    fn options() -> TileLayerOptions {
        TileLayerOptions {
            url: "{s}/{z}/{x}/{y}".to_string(),
            ..Default::default()
        }
    }

    /// A layer attached to a scene by hand
    fn attached(
        spawner: Arc<dyn AsyncSpawner>,
        fetcher: Arc<UrlFetcher>,
    ) -> (TileLayer, MemoryScene, Viewport) {
        let mut scene = MemoryScene::new();
        let mut layer = TileLayer::new("tiles", options(), fetcher, spawner).unwrap();
        layer.properties.root = Some(scene.add_node(None, NodeKind::Group));
        let mut viewport = Viewport::new(Point::new(256.0, 256.0), 0.0, 18.0).unwrap();
        viewport.set_view(GeoPoint::new(0.0, 0.0), 2.0);
        (layer, scene, viewport)
    }

    fn frame(layer: &mut TileLayer, viewport: &Viewport, scene: &mut MemoryScene, now: Instant) {
        let mut ctx = ElementContext::new(viewport, scene, now);
        layer.on_frame(&mut ctx);
    }

    #[test]
    fn test_debounced_recompute() {
        let fetcher = Arc::new(UrlFetcher::default());
        let (mut layer, mut scene, viewport) = attached(Arc::new(InlineSpawner), fetcher.clone());
        let t0 = Instant::now();

        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.on_zoom_end(&mut ctx);
        layer.on_move(&mut ctx);
        assert!(layer.is_update_pending());

        frame(&mut layer, &viewport, &mut scene, t0 + Duration::from_millis(50));
        assert!(layer.retained_keys().is_empty());

        frame(&mut layer, &viewport, &mut scene, t0 + Duration::from_millis(100));
        assert_eq!(layer.tile_zoom(), Some(2));
        assert_eq!(layer.retained_keys(), layer.needed_keys(&viewport).unwrap());
        assert_eq!(fetcher.calls.lock().unwrap().len(), layer.retained_keys().len());
        // Inline fetches completed, results wait for the next frame
        assert_eq!(layer.pending_fetches(), layer.retained_keys().len());

        frame(&mut layer, &viewport, &mut scene, t0 + Duration::from_millis(116));
        assert_eq!(layer.pending_fetches(), 0);
        let key = layer.retained_keys()[0];
        let record = layer.record(&key).unwrap();
        assert!(record.is_loaded());
        assert_eq!(
            scene.node(record.node).unwrap().image.as_deref().map(Vec::as_slice),
            Some(record.url.as_bytes())
        );
    }

    #[test]
    fn test_pan_evicts_immediately() {
        let fetcher = Arc::new(UrlFetcher::default());
        let (mut layer, mut scene, mut viewport) = attached(Arc::new(InlineSpawner), fetcher);
        let t0 = Instant::now();
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        let before = layer.retained_keys();

        viewport.pan(Point::new(-300.0, 0.0));
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        let after = layer.retained_keys();

        assert_eq!(after, layer.needed_keys(&viewport).unwrap());
        assert_ne!(before, after);
        assert_eq!(layer.fading_len(), 0);
        // Only the root group and the retained images remain
        assert_eq!(scene.len(), 1 + after.len());
    }

    #[test]
    fn test_zoom_change_fades_previous_level() {
        let fetcher = Arc::new(UrlFetcher::default());
        let (mut layer, mut scene, mut viewport) = attached(Arc::new(InlineSpawner), fetcher);
        let t0 = Instant::now();
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        let old_count = layer.retained_keys().len();

        viewport.set_view(GeoPoint::new(0.0, 0.0), 3.0);
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        assert_eq!(layer.tile_zoom(), Some(3));
        assert_eq!(layer.fading_len(), 1);
        let new_count = layer.retained_keys().len();
        assert_eq!(scene.len(), 1 + old_count + new_count);

        frame(&mut layer, &viewport, &mut scene, t0 + Duration::from_millis(99));
        assert_eq!(layer.fading_len(), 1);
        frame(&mut layer, &viewport, &mut scene, t0 + Duration::from_millis(100));
        assert_eq!(layer.fading_len(), 0);
        assert_eq!(scene.len(), 1 + new_count);
    }

    #[test]
    fn test_late_result_is_discarded() {
        let spawner = DeferredSpawner::new();
        let fetcher = Arc::new(UrlFetcher::default());
        let (mut layer, mut scene, mut viewport) = attached(spawner.clone(), fetcher);
        let t0 = Instant::now();
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        let first = layer.retained_keys();

        // Pan far enough that nothing overlaps, then let the old fetches finish
        viewport.pan(Point::new(-2000.0, 0.0));
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        spawner.run_pending();
        frame(&mut layer, &viewport, &mut scene, t0);

        for key in &first {
            assert!(layer.record(key).is_none(), "{key} came back");
        }
        assert_eq!(layer.retained_keys(), layer.needed_keys(&viewport).unwrap());
        assert_eq!(layer.pending_fetches(), 0);
    }

    #[test]
    fn test_failed_tiles_are_retried() {
        let fetcher = Arc::new(UrlFetcher::default());
        let (mut layer, mut scene, viewport) = attached(Arc::new(InlineSpawner), fetcher.clone());
        let needed = layer.needed_keys(&viewport).unwrap();
        let victim = needed[0];
        let victim_url = layer.tile_source().url(&victim);
        fetcher.fail.lock().unwrap().push(victim_url.clone());

        let t0 = Instant::now();
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        frame(&mut layer, &viewport, &mut scene, t0);
        assert_eq!(layer.record(&victim).unwrap().state, TileState::Failed);
        let node = layer.record(&victim).unwrap().node;
        assert!(scene.node(node).unwrap().image.is_none());

        fetcher.fail.lock().unwrap().clear();
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        frame(&mut layer, &viewport, &mut scene, t0);
        assert!(layer.record(&victim).unwrap().is_loaded());
        let calls = fetcher.calls.lock().unwrap();
        assert_eq!(calls.iter().filter(|u| **u == victim_url).count(), 2);
        // Loaded tiles were not fetched again
        assert_eq!(calls.len(), needed.len() + 1);
    }

    #[test]
    fn test_reset_drops_state() {
        let spawner = DeferredSpawner::new();
        let fetcher = Arc::new(UrlFetcher::default());
        let (mut layer, mut scene, viewport) = attached(spawner.clone(), fetcher);
        let t0 = Instant::now();
        let mut ctx = ElementContext::new(&viewport, &mut scene, t0);
        layer.refresh(&mut ctx);
        layer.on_move(&mut ctx);
        assert!(!layer.retained_keys().is_empty());

        layer.reset();
        assert!(layer.retained_keys().is_empty());
        assert!(layer.tile_zoom().is_none());
        assert!(!layer.is_update_pending());

        // Fetches issued before the reset resolve into nothing
        let nodes = scene.len();
        assert_eq!(spawner.run_pending(), 4);
        frame(&mut layer, &viewport, &mut scene, t0 + Duration::from_millis(500));
        assert_eq!(layer.pending_fetches(), 0);
        assert!(layer.retained_keys().is_empty());
        assert_eq!(scene.len(), nodes);
    }

    #[test]
    fn test_tile_zoom_clamped_to_layer_limits() {
        let fetcher = Arc::new(UrlFetcher::default());
        let (layer, _scene, mut viewport) = attached(Arc::new(InlineSpawner), fetcher);
        viewport.set_view(GeoPoint::new(0.0, 0.0), 0.2);
        assert_eq!(layer.tile_zoom_for(&viewport), 1);
        viewport.set_view(GeoPoint::new(0.0, 0.0), 4.6);
        assert_eq!(layer.tile_zoom_for(&viewport), 5);
        viewport.set_view(GeoPoint::new(0.0, 0.0), 18.0);
        assert_eq!(layer.tile_zoom_for(&viewport), 18);
    }
}

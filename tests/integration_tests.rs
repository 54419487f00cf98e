//! Map interaction driving the tile and boundary layers end to end

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use slippymap::{
    data::GeoJson,
    layers::{base::handle, boundary::BoundaryLayer, tile::TileState},
    prelude::{Duration, Instant},
    runtime::{DeferredSpawner, InlineSpawner},
    scene::{Bitmap, NodeKind},
    tiles::BitmapFetcher,
    constants::MAX_EXTENT,
    BoundaryOptions, GeoPoint, InputEvent, Map, MapError, MapOptions, MemoryScene, Point,
    TileKey, TileLayer, TileLayerOptions,
};

#[derive(Default)]
struct RecordingFetcher {
    urls: Mutex<Vec<String>>,
}

#[async_trait]
impl BitmapFetcher for RecordingFetcher {
    async fn fetch(&self, url: &str) -> slippymap::Result<Bitmap> {
        self.urls.lock().unwrap().push(url.to_string());
        Ok(Arc::new(url.as_bytes().to_vec()))
    }
}

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

fn instant_zoom_options() -> MapOptions {
    MapOptions {
        center: GeoPoint::new(0.0, 0.0),
        zoom: 3.0,
        min_zoom: 0.0,
        zoom_animation_ms: 0,
        ..Default::default()
    }
}

fn tile_options() -> TileLayerOptions {
    TileLayerOptions {
        url: "https://{s}.tiles.test/{z}/{x}/{y}.png".to_string(),
        ..Default::default()
    }
}

fn with_tiles(options: MapOptions, fetcher: Arc<RecordingFetcher>) -> Map<MemoryScene> {
    let mut map = Map::headless(Point::new(256.0, 256.0), options).unwrap();
    let layer = TileLayer::new("tiles", tile_options(), fetcher, Arc::new(InlineSpawner)).unwrap();
    map.add_element(handle(layer), Instant::now()).unwrap();
    map
}

/// Reads a value off the tile layer
fn tiles<R>(map: &Map<MemoryScene>, f: impl FnOnce(&TileLayer) -> R) -> R {
    let handle = map.element("tiles").unwrap();
    let el = handle.borrow();
    f(el.as_any().downcast_ref::<TileLayer>().unwrap())
}

fn assert_settled(map: &Map<MemoryScene>) {
    tiles(map, |layer| {
        assert_eq!(layer.retained_keys(), layer.needed_keys(map.viewport()).unwrap());
        assert_eq!(layer.fading_len(), 0);
    });
}

#[test]
fn test_tiles_load_after_debounce() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut map = with_tiles(instant_zoom_options(), fetcher.clone());
    let t0 = Instant::now();

    map.tick(t0 + ms(10));
    assert!(tiles(&map, |l| l.retained_keys().is_empty()));

    map.tick(t0 + ms(120));
    map.tick(t0 + ms(136));
    assert_settled(&map);

    let (count, loaded) = tiles(&map, |l| {
        let keys = l.retained_keys();
        let loaded = keys
            .iter()
            .all(|k| l.record(k).map(|r| r.state) == Some(TileState::Loaded));
        (keys.len(), loaded)
    });
    assert!(loaded);
    assert_eq!(fetcher.urls.lock().unwrap().len(), count);

    // Images hang below the element root, which hangs below the world group
    let images = map
        .scene()
        .descendants(map.root())
        .into_iter()
        .filter(|id| {
            let node = map.scene().node(*id).unwrap();
            matches!(node.kind, NodeKind::Image { flip_y: true, .. }) && node.image.is_some()
        })
        .count();
    assert_eq!(images, count);
}

#[test]
fn test_tile_set_follows_interaction() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut map = with_tiles(instant_zoom_options(), fetcher);
    let mut now = Instant::now();

    let drag = |x, y| InputEvent::Drag {
        delta: Point::new(x, y),
    };
    let scroll = |delta, x, y| InputEvent::Scroll {
        delta,
        position: Point::new(x, y),
    };
    let script = vec![
        drag(120.0, -40.0),
        drag(300.0, 10.0),
        InputEvent::DragEnd,
        scroll(2.0, 30.0, 200.0),
        scroll(1.0, 128.0, 128.0),
        drag(-700.0, 500.0),
        InputEvent::DragEnd,
        scroll(-5.0, 250.0, 10.0),
        InputEvent::Resize {
            size: Point::new(500.0, 300.0),
        },
    ];

    for event in script {
        map.handle_input(event, now);
        // A burst of frames inside the debounce window changes nothing
        now += ms(40);
        map.tick(now);
        // Settle: recompute, deliver fetches, let the faded level go
        now += ms(100);
        map.tick(now);
        now += ms(150);
        map.tick(now);
        assert_settled(&map);
    }

    let unloaded = tiles(&map, |l| {
        l.retained_keys()
            .iter()
            .filter(|k| l.record(k).map(|r| r.is_loaded()) != Some(true))
            .count()
    });
    assert_eq!(unloaded, 0);
}

/// Every tile of zoom `z` whose square overlaps the visible area, found by
/// scanning the grid rather than through the layer's range computation
fn overlapping_tiles(map: &Map<MemoryScene>, z: u8) -> Vec<TileKey> {
    let bounds = map.viewport().visible_projected_bounds();
    let mag = 1i64 << z;
    let size = 2.0 * MAX_EXTENT / mag as f64;
    let mut keys = Vec::new();
    for y in 0..mag {
        let top = MAX_EXTENT - size * y as f64;
        let bottom = top - size;
        if bottom >= bounds.max.y || top <= bounds.min.y {
            continue;
        }
        for x in -2 * mag..3 * mag {
            let left = size * x as f64 - MAX_EXTENT;
            let right = left + size;
            if left < bounds.max.x && right > bounds.min.x {
                keys.push(TileKey::new(x, y, z));
            }
        }
    }
    keys.sort();
    keys
}

#[test]
fn test_retained_tiles_match_the_view() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut map = with_tiles(instant_zoom_options(), fetcher);
    let mut now = Instant::now();

    let views = [
        (Point::new(256.0, 256.0), GeoPoint::new(0.0, 0.0), 3.0),
        (Point::new(256.0, 256.0), GeoPoint::new(179.9, 10.0), 3.2),
        (Point::new(640.0, 200.0), GeoPoint::new(-179.3, -33.0), 2.4),
        (Point::new(900.0, 300.0), GeoPoint::new(12.5, 41.9), 1.3),
        (Point::new(333.0, 517.0), GeoPoint::new(-122.42, 37.77), 11.6),
        (Point::new(512.0, 512.0), GeoPoint::new(100.0, 84.0), 4.0),
    ];
    for (size, center, zoom) in views {
        map.resize(size, now);
        map.set_view(center, zoom, now);
        now += ms(100);
        map.tick(now);
        now += ms(150);
        map.tick(now);

        let z = (map.zoom().round() as u8).clamp(1, 18);
        let expected = overlapping_tiles(&map, z);
        assert!(!expected.is_empty());
        tiles(&map, |l| {
            assert_eq!(l.tile_zoom(), Some(z));
            assert_eq!(l.retained_keys(), expected, "{center:?} at {zoom}");
            for key in &expected {
                let url = &l.record(key).unwrap().url;
                assert!(url.ends_with(&format!("/{z}/{}/{}.png", key.wrapped_x(), key.y)), "{url}");
            }
        });
    }
}

#[test]
fn test_urls_wrap_columns() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let options = MapOptions {
        center: GeoPoint::new(179.5, 0.0),
        zoom: 2.0,
        min_zoom: 0.0,
        ..Default::default()
    };
    let mut map = with_tiles(options, fetcher.clone());
    let t0 = Instant::now();
    map.tick(t0 + ms(100));

    let keys = tiles(&map, |l| l.retained_keys());
    assert!(keys.iter().any(|k| k.x >= 4), "{keys:?}");
    for url in fetcher.urls.lock().unwrap().iter() {
        let parts: Vec<&str> = url.trim_end_matches(".png").rsplit('/').take(3).collect();
        let (y, x, z): (i64, i64, u8) = (
            parts[0].parse().unwrap(),
            parts[1].parse().unwrap(),
            parts[2].parse().unwrap(),
        );
        assert_eq!(z, 2);
        assert!((0..4).contains(&x), "{url}");
        assert!((0..4).contains(&y), "{url}");
    }
    let wrapped = TileKey::new(4, 1, 2);
    let record = tiles(&map, |l| l.record(&wrapped).cloned()).unwrap();
    assert!(record.url.ends_with("/2/0/1.png"), "{}", record.url);
}

#[test]
fn test_late_results_never_resurrect_tiles() {
    let spawner = DeferredSpawner::new();
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut map = Map::headless(Point::new(256.0, 256.0), instant_zoom_options()).unwrap();
    let layer = TileLayer::new("tiles", tile_options(), fetcher, spawner.clone()).unwrap();
    map.add_element(handle(layer), Instant::now()).unwrap();

    let t0 = Instant::now();
    map.tick(t0 + ms(100));
    let first = tiles(&map, |l| l.retained_keys());
    assert!(!first.is_empty());

    // Zoom away before any fetch finished, then let the old fetches land
    map.zoom_about(Point::new(128.0, 128.0), 4.0, Duration::ZERO, t0 + ms(110));
    map.tick(t0 + ms(210));
    spawner.run_pending();
    map.tick(t0 + ms(400));

    tiles(&map, |l| {
        for key in &first {
            assert!(l.record(key).is_none());
        }
        assert_eq!(l.pending_fetches(), 0);
        assert_eq!(l.fading_len(), 0);
    });
    assert_settled(&map);
    let images = map
        .scene()
        .descendants(map.root())
        .into_iter()
        .filter(|id| map.scene().node(*id).unwrap().image.is_some())
        .count();
    assert_eq!(images, tiles(&map, |l| l.retained_keys().len()));
}

#[test]
fn test_remove_and_reattach_tile_layer() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut first = with_tiles(instant_zoom_options(), fetcher);
    let t0 = Instant::now();
    first.tick(t0 + ms(100));
    let nodes_with_tiles = first.scene().len();

    let layer = first.remove_element("tiles").unwrap().unwrap();
    assert!(first.scene().len() < nodes_with_tiles);
    assert_eq!(first.scene().descendants(first.root()).len(), 0);
    {
        let el = layer.borrow();
        let tile_layer = el.as_any().downcast_ref::<TileLayer>().unwrap();
        assert!(tile_layer.retained_keys().is_empty());
    }

    let mut second = Map::headless(Point::new(512.0, 512.0), instant_zoom_options()).unwrap();
    second.add_element(layer.clone(), t0).unwrap();
    second.tick(t0 + ms(100));
    assert_settled(&second);

    // Still attached to the second map
    assert!(matches!(
        first.add_element(layer, t0),
        Err(MapError::AlreadyOwned { .. })
    ));
}

#[test]
fn test_duplicate_names_rejected() {
    let fetcher = Arc::new(RecordingFetcher::default());
    let mut map = with_tiles(instant_zoom_options(), fetcher.clone());
    let other = TileLayer::new("tiles", tile_options(), fetcher, Arc::new(InlineSpawner)).unwrap();
    let result = map.add_element(handle(other), Instant::now());
    assert!(matches!(result, Err(MapError::DuplicateName { name }) if name == "tiles"));
    assert_eq!(map.elements().len(), 1);
}

fn boundary_visible(map: &mut Map<MemoryScene>, now: Instant) -> bool {
    map.with_element_mut("borders", now, |b: &mut BoundaryLayer, _| b.paths_visible())
        .unwrap()
}

#[test]
fn test_boundary_layer_on_map() {
    let geo = GeoJson::parse(
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "a"},
             "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [5, 0], [5, 5], [0, 0]]]}}
        ]}"#,
    )
    .unwrap();
    let options = BoundaryOptions {
        min_zoom_level: 2.0,
        max_zoom_level: 6.0,
        ..Default::default()
    };
    let boundary = BoundaryLayer::new("borders", options).unwrap().with_data(&geo).unwrap();

    let mut map = Map::headless(Point::new(256.0, 256.0), instant_zoom_options()).unwrap();
    let t0 = Instant::now();
    map.add_element(handle(boundary), t0).unwrap();
    assert!(boundary_visible(&mut map, t0));

    map.set_view(GeoPoint::new(0.0, 0.0), 9.0, t0);
    assert!(!boundary_visible(&mut map, t0));

    let replacement = GeoJson::parse(
        r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"name": "b"},
             "geometry": {"type": "MultiPolygon", "coordinates": [[[[1, 1], [2, 1], [2, 2], [1, 1]]]]}}
        ]}"#,
    )
    .unwrap();
    let names = map
        .with_element_mut("borders", t0, |b: &mut BoundaryLayer, ctx| {
            b.set_data(&replacement, ctx).map(|_| b.feature_names().join(","))
        })
        .unwrap()
        .unwrap();
    assert_eq!(names, "b");
}

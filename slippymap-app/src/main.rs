//! Headless map driver.
//!
//! Drives a map with an OpenStreetMap tile layer through a scripted tour of
//! pans and wheel zooms, fetching tiles over HTTP on the tokio runtime, and
//! logs what the tile layer retains. Set `RUST_LOG=debug` to see every
//! recompute. An optional first argument names a JSON file with map options.

use std::{sync::Arc, time::Duration};

use log::{info, warn};
use slippymap::{
    layers::base::{handle, Element},
    prelude::{Instant, TokioSpawner},
    GeoPoint, HttpFetcher, InputEvent, Map, MapOptions, MemoryScene, Point, TileLayer,
    TileLayerOptions,
};

const FRAME: Duration = Duration::from_millis(16);
const CANVAS: Point = Point { x: 1024.0, y: 768.0 };

fn load_options() -> slippymap::Result<MapOptions> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .map_err(|e| slippymap::MapError::InvalidConfig(format!("{path}: {e}")))?;
            MapOptions::from_json(&json)
        }
        None => Ok(MapOptions::default()),
    }
}

/// Ticks the map for `duration`, returning false if interrupted
async fn run_frames(map: &mut Map<MemoryScene>, duration: Duration) -> bool {
    let end = Instant::now() + duration;
    while Instant::now() < end {
        tokio::select! {
            _ = tokio::time::sleep(FRAME) => map.tick(Instant::now()),
            _ = tokio::signal::ctrl_c() => return false,
        }
    }
    true
}

fn report(map: &Map<MemoryScene>, step: &str) {
    let center = map.center();
    let Some(osm) = map.element("osm") else {
        return;
    };
    let el = osm.borrow();
    let Some(tiles) = el.as_any().downcast_ref::<TileLayer>() else {
        return;
    };
    info!(
        "{step}: center ({:.4}, {:.4}) zoom {:.2} | tile z{:?}, {} retained, {} pending, {} fading, {} scene nodes",
        center.lon,
        center.lat,
        map.zoom(),
        tiles.tile_zoom(),
        tiles.retained_keys().len(),
        tiles.pending_fetches(),
        tiles.fading_len(),
        map.scene().len()
    );
}

#[tokio::main]
async fn main() -> slippymap::Result<()> {
    env_logger::init();

    let options = load_options()?;
    info!("starting with {}", serde_json::to_string(&options)?);

    let mut map = Map::headless(CANVAS, options)?;
    let fetcher = Arc::new(HttpFetcher::new()?);
    let spawner = Arc::new(TokioSpawner::current()?);
    let osm = TileLayer::new("osm", TileLayerOptions::default(), fetcher, spawner)?;
    map.add_element(handle(osm), Instant::now())?;

    let center = Point::new(CANVAS.x / 2.0, CANVAS.y / 2.0);
    let tour: Vec<(&str, Vec<InputEvent>)> = vec![
        ("initial view", vec![]),
        (
            "drag east",
            (0..10)
                .map(|_| InputEvent::Drag {
                    delta: Point::new(-30.0, 0.0),
                })
                .chain(std::iter::once(InputEvent::DragEnd))
                .collect(),
        ),
        (
            "zoom in",
            vec![InputEvent::Scroll {
                delta: 2.0,
                position: center,
            }],
        ),
        (
            "zoom out at corner",
            vec![InputEvent::Scroll {
                delta: -4.0,
                position: Point::new(100.0, 100.0),
            }],
        ),
        (
            "resize",
            vec![InputEvent::Resize {
                size: Point::new(640.0, 480.0),
            }],
        ),
    ];

    for (step, events) in tour {
        for event in events {
            if !map.handle_input(event.clone(), Instant::now()).is_handled() {
                warn!("{step}: {event:?} was ignored");
            }
        }
        if !run_frames(&mut map, Duration::from_millis(1500)).await {
            info!("interrupted");
            break;
        }
        report(&map, step);
    }

    map.set_view(GeoPoint::new(2.3522, 48.8566), 12.0, Instant::now());
    run_frames(&mut map, Duration::from_millis(1500)).await;
    report(&map, "jump to Paris");
    Ok(())
}

//! End-to-end scenarios driving a `VectorMap` through its public API.
//!
//! Run with: RUST_LOG=vectormap=debug cargo test --features tracing -- --nocapture

use std::collections::BTreeMap;
use std::time::Duration;

use futures::executor::block_on;
use glam::DVec2;
use vectormap::objects::MapObject;
use vectormap::{
    AttrValue, BackendKind, Collection, FocusRequest, MapError, MapEvent, MapParams, MapRegistry,
    MarkerSpec, TransitionOutcome, VectorMap,
};

/// One Miller inset covering planar `[-50, 50]` on both axes, drawn into a
/// 200x200 canvas. Geographic `(0, 0)` projects to the planar origin.
const GLOBE: &str = r#"{
    "width": 200,
    "height": 200,
    "projection": { "type": "mill", "centralMeridian": 0 },
    "insets": [{
        "bbox": [{ "x": -50, "y": -50 }, { "x": 50, "y": 50 }],
        "left": 0, "top": 0, "width": 200, "height": 200
    }],
    "paths": {
        "NW": { "path": "M0,0L100,0L100,100L0,100Z", "name": "North West" },
        "SE": { "path": "M100,100L200,100L200,200L100,200Z", "name": "South East" },
        "C": { "path": "M90,90L110,90L110,110L90,110Z", "name": "Center" }
    }
}"#;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn registry() -> MapRegistry {
    let mut registry = MapRegistry::new();
    registry.register_json("globe", GLOBE).unwrap();
    registry
}

fn globe(params: MapParams) -> VectorMap {
    init_tracing();
    VectorMap::new(&registry(), params, 200.0, 200.0).unwrap()
}

fn close(a: DVec2, b: DVec2) -> bool {
    (a - b).length() < 1e-6
}

#[test]
fn inset_point_lands_on_screen() {
    let map = globe(MapParams::new("globe"));
    assert_eq!(map.viewport().base_scale, 1.0);

    let point = map.lat_lng_to_point(0.0, 0.0).unwrap().unwrap();
    assert!(close(point, DVec2::new(100.0, 100.0)), "got {point}");

    let back = map.point_to_lat_lng(100.0, 100.0).unwrap().unwrap();
    assert!(back.lat.abs() < 1e-9 && back.lng.abs() < 1e-9);

    // far outside the inset's projected box
    assert_eq!(map.lat_lng_to_point(60.0, 100.0).unwrap(), None);
}

#[test]
fn oversized_zoom_request_clamps_to_max() {
    let mut map = globe(MapParams::new("globe"));
    let scale = map.viewport().scale;
    let transition = map.set_scale(scale * 1000.0, None, false, false);
    assert_eq!(block_on(transition), TransitionOutcome::Finished);
    assert_eq!(map.viewport().scale, 8.0);

    let events = map.drain_events();
    assert_eq!(events.last(), Some(&MapEvent::Zoom { zoom: 8.0 }));
}

#[test]
fn animated_zoom_resolves_after_frames() {
    let mut map = globe(MapParams::new("globe"));
    map.drain_events();

    let transition = map.zoom_in();
    assert!(map.is_animating());
    map.advance(Duration::from_millis(35));
    assert!(map.viewport().scale > 1.0 && map.viewport().scale < 1.6);

    map.finish_animation();
    assert!(!map.is_animating());
    assert!((map.viewport().scale - 1.6).abs() < 1e-9);
    assert_eq!(block_on(transition), TransitionOutcome::Finished);

    let events = map.drain_events();
    let changes = events
        .iter()
        .filter(|e| matches!(e, MapEvent::ViewportChange { .. }))
        .count();
    // frame_count(1.0, 1.6) = round(0.6 * 60 / 1.6)
    assert_eq!(changes, 23);
    assert!(matches!(events.last(), Some(MapEvent::Zoom { zoom }) if (zoom - 1.6).abs() < 1e-9));
}

#[test]
fn superseded_zoom_keeps_last_frame() {
    let mut map = globe(MapParams::new("globe"));
    let first = map.zoom_in();
    map.advance(Duration::from_millis(20));
    let partial = map.viewport().scale;

    map.pan_by(-10.0, 0.0);
    assert_eq!(map.viewport().scale, partial);
    let second = map.zoom_out();
    assert_eq!(block_on(first), TransitionOutcome::Superseded);

    map.finish_animation();
    assert_eq!(block_on(second), TransitionOutcome::Finished);
    assert!((map.viewport().scale - 1.0).abs() < 1e-9);
}

#[test]
fn zoom_buttons_keep_the_center_fixed() {
    let mut params = MapParams::new("globe");
    params.zoom_animate = false;
    let mut map = globe(params);

    let _ = map.zoom_in();
    assert!((map.viewport().scale - 1.6).abs() < 1e-9);
    let center = map.transform().invert(DVec2::new(100.0, 100.0));
    assert!(close(center, DVec2::new(100.0, 100.0)), "got {center}");

    let _ = map.zoom_out();
    assert!((map.viewport().scale - 1.0).abs() < 1e-9);
}

#[test]
fn focus_on_lat_lng_centers_the_point() {
    let mut map = globe(MapParams::new("globe"));
    let _ = map.set_focus(FocusRequest::lat_lng(0.0, 0.0, 4.0)).unwrap();
    assert_eq!(map.viewport().scale, 4.0);
    let point = map.lat_lng_to_point(0.0, 0.0).unwrap().unwrap();
    assert!(close(point, DVec2::new(100.0, 100.0)), "got {point}");

    assert!(matches!(
        map.set_focus(FocusRequest::lat_lng(60.0, 100.0, 2.0)),
        Err(MapError::OffMap { .. })
    ));
}

#[test]
fn focus_on_regions_fits_their_union() {
    let mut map = globe(MapParams::new("globe"));
    let _ = map.set_focus(FocusRequest::regions(["NW", "C"])).unwrap();
    // union is 110x110
    assert!((map.viewport().scale - 200.0 / 110.0).abs() < 1e-9);

    let _ = map.set_focus(FocusRequest::point(0.5, 0.5, 2.0)).unwrap();
    assert_eq!(map.viewport().scale, 2.0);
    let center = map.transform().invert(DVec2::new(100.0, 100.0));
    assert!(close(center, DVec2::new(100.0, 100.0)), "got {center}");
}

#[test]
fn initial_focus_and_selection_come_from_params() {
    let params = MapParams::from_json(
        r#"{
            "map": "globe",
            "focusOn": { "x": 0.5, "y": 0.5, "scale": 2 },
            "selectedRegions": ["C"],
            "regionsSelectable": true,
            "regionsSelectableOne": true
        }"#,
    )
    .unwrap();
    let mut map = globe(params);
    assert_eq!(map.viewport().scale, 2.0);
    assert_eq!(map.selected_regions(), ["C"]);

    map.drain_events();
    assert!(map.toggle_region("NW").unwrap());
    assert_eq!(map.selected_regions(), ["NW"]);
    let events = map.drain_events();
    assert_eq!(
        events,
        vec![
            MapEvent::RegionSelected {
                code: "C".to_string(),
                selected: false,
                selection: Vec::new(),
            },
            MapEvent::RegionSelected {
                code: "NW".to_string(),
                selected: true,
                selection: vec!["NW".to_string()],
            },
        ]
    );
}

#[test]
fn markers_project_and_skip_off_map_positions() {
    let mut map = globe(MapParams::new("globe"));
    map.add_markers(
        BTreeMap::from([
            ("origin".to_string(), MarkerSpec::at_lat_lng(0.0, 0.0).with_name("Origin")),
            ("away".to_string(), MarkerSpec::at_lat_lng(60.0, 100.0)),
        ]),
        Vec::new(),
    )
    .unwrap();
    assert!(map.marker("away").is_none());

    let origin = map.marker("origin").unwrap();
    assert_eq!(origin.name(), Some("Origin"));
    let shape = origin.shape();
    let cx = map.canvas().get(shape, "cx").and_then(AttrValue::as_f64);
    assert_eq!(cx, Some(100.0));

    let mut params = MapParams::new("globe");
    params.zoom_animate = false;
    let mut map = globe(params);
    map.add_marker("origin", MarkerSpec::at_lat_lng(0.0, 0.0), &[])
        .unwrap();
    let _ = map.set_scale(2.0, Some(DVec2::new(0.0, 0.0)), false, false);
    let shape = map.marker("origin").unwrap().shape();
    let cx = map.canvas().get(shape, "cx").and_then(AttrValue::as_f64);
    assert_eq!(cx, Some(200.0));
}

#[test]
fn marker_series_drive_radius() {
    let params = MapParams::from_json(
        r#"{
            "map": "globe",
            "series": { "markers": [{ "attribute": "r", "scale": [5, 15] }] }
        }"#,
    )
    .unwrap();
    let mut map = globe(params);
    map.add_markers(
        vec![
            MarkerSpec::at_lat_lng(0.0, 0.0),
            MarkerSpec::at_lat_lng(0.0, 0.0).with_name("Twin"),
        ],
        vec![BTreeMap::from([
            ("0".to_string(), AttrValue::from(0)),
            ("1".to_string(), AttrValue::from(10)),
        ])],
    )
    .unwrap();

    let radius = |map: &VectorMap, key: &str| {
        let shape = map.marker(key).unwrap().shape();
        map.canvas().get(shape, "r").and_then(AttrValue::as_f64)
    };
    assert_eq!(radius(&map, "0"), Some(5.0));
    assert_eq!(radius(&map, "1"), Some(15.0));

    map.clear_series(Collection::Markers, 0).unwrap();
    assert_eq!(radius(&map, "1"), Some(5.0));

    assert!(matches!(
        map.clear_series(Collection::Markers, 3),
        Err(MapError::UnknownSeries { collection: "markers", index: 3 })
    ));
}

#[test]
fn region_series_with_ordinal_table() {
    let params = MapParams::from_json(
        r##"{
            "map": "globe",
            "series": { "regions": [{
                "scale": { "hot": "#ff0000", "cold": "#0000ff" },
                "values": { "NW": "hot", "SE": "cold" }
            }] }
        }"##,
    )
    .unwrap();
    let mut map = globe(params);
    let fill = |map: &VectorMap, code: &str| {
        let shape = map.region(code).unwrap().shape();
        map.canvas().get(shape, "fill").cloned()
    };
    assert_eq!(fill(&map, "NW"), Some(AttrValue::from("#ff0000")));
    assert_eq!(fill(&map, "SE"), Some(AttrValue::from("#0000ff")));
    assert_eq!(fill(&map, "C"), Some(AttrValue::from("white")));

    map.set_series_values(
        Collection::Regions,
        0,
        BTreeMap::from([("C".to_string(), AttrValue::from("hot"))]),
    )
    .unwrap();
    assert_eq!(fill(&map, "C"), Some(AttrValue::from("#ff0000")));
    assert_eq!(map.series(Collection::Regions, 0).unwrap().values().len(), 3);
}

#[test]
fn unknown_keys_leave_state_untouched() {
    let mut map = globe(MapParams::new("globe"));
    assert!(matches!(
        map.set_selected_regions(vec!["NW", "XX"]),
        Err(MapError::UnknownRegion { .. })
    ));
    assert!(map.selected_regions().is_empty());
    assert!(matches!(
        map.get_region_name("XX"),
        Err(MapError::UnknownRegion { .. })
    ));
    assert_eq!(map.get_region_name("SE").unwrap(), "South East");
}

#[test]
fn vml_backend_renders_legacy_markup() {
    let mut params = MapParams::new("globe");
    params.backend = BackendKind::Vml;
    let map = globe(params);
    let out = map.render();
    assert!(out.contains("rvml:group"));
    assert!(out.contains("rvml:shape"));
    assert!(!out.contains("<path"));
}

#[test]
fn reset_returns_to_base_after_resize() {
    let mut params = MapParams::new("globe");
    params.zoom_animate = false;
    let mut map = globe(params);
    let _ = map.zoom_in();
    map.update_size(400.0, 200.0);
    assert_eq!(map.viewport().base_scale, 1.0);
    assert_eq!(map.viewport().base_trans_x, 100.0);

    map.reset();
    assert_eq!(map.viewport().scale, 1.0);
    assert_eq!(map.viewport().trans_x, 100.0);
    assert_eq!(map.viewport().trans_y, 0.0);
}

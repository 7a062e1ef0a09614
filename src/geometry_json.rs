//! Purpose: Shared JSON serializers for loaded geometry and token dumps.
//! Exports: `geometry_json`, `check_json`, `token_json`.
//! Role: Keep CLI output envelope shapes consistent across commands.
//! Invariants: Stable key names/order for v0 payloads.
//! Invariants: Location arrays are emitted in their flat, coordinate-major storage order.

use markergeom::api::{LoadOutcome, LocationField, Token};
use serde_json::{Map, Value, json};
use std::path::Path;

pub(crate) fn geometry_json(path: &Path, outcome: &LoadOutcome) -> Value {
    let geometry = &outcome.geometry;
    let dims = geometry.dims();
    let mut map = Map::new();
    map.insert("path".to_string(), json!(path.display().to_string()));
    map.insert("num_angles".to_string(), json!(dims.num_angles));
    map.insert("num_markers".to_string(), json!(dims.num_markers));
    map.insert("coords_per_angle".to_string(), json!(dims.coords_per_angle()));
    map.insert("angles".to_string(), json!(geometry.angles));
    map.insert("marker_color".to_string(), json!(geometry.marker_color));
    for field in LocationField::ALL {
        map.insert(field.key().to_string(), json!(geometry.locations(field)));
    }
    map.insert("notices".to_string(), json!(outcome.notices.len()));
    Value::Object(map)
}

pub(crate) fn check_json(path: &Path, outcome: &LoadOutcome) -> Value {
    let dims = outcome.geometry.dims();
    json!({
        "ok": true,
        "path": path.display().to_string(),
        "num_angles": dims.num_angles,
        "num_markers": dims.num_markers,
        "notices": outcome.notices.len(),
    })
}

pub(crate) fn token_json(index: usize, token: &Token) -> Value {
    json!({
        "index": index,
        "kind": token.kind.as_str(),
        "start": token.start,
        "end": token.end,
        "size": token.size,
        "extent": token.extent,
    })
}

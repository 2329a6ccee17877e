// HTML map output: a self-contained Leaflet page with clustered markers

use std::path::Path;

use sabana_engine::points::MapPoint;
use sabana_engine::profile::MapConfig;
use serde::Serialize;

const LEAFLET_VERSION: &str = "1.9.4";
const MARKERCLUSTER_VERSION: &str = "1.5.3";

#[derive(Serialize)]
struct Marker {
    lat: f64,
    lon: f64,
    popup: String,
}

#[derive(Serialize)]
struct MapSettings<'a> {
    center: [f64; 2],
    zoom: u8,
    tiles: &'a str,
    attribution: &'a str,
}

/// Build the page. The map is centered on the first point.
pub fn render_html(points: &[MapPoint], config: &MapConfig, title: &str) -> Result<String, String> {
    let first = points
        .first()
        .ok_or_else(|| "no rows with coordinates to draw".to_string())?;

    let markers: Vec<Marker> = points
        .iter()
        .map(|p| Marker {
            lat: p.lat,
            lon: p.lon,
            popup: popup_html(p),
        })
        .collect();
    let settings = MapSettings {
        center: [first.lat, first.lon],
        zoom: config.zoom,
        tiles: &config.tiles,
        attribution: &config.attribution,
    };

    let markers_json = script_json(&markers)?;
    let settings_json = script_json(&settings)?;
    let title = escape_html(title);

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <link rel="stylesheet" href="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.css">
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@{cluster}/dist/MarkerCluster.css">
    <link rel="stylesheet" href="https://unpkg.com/leaflet.markercluster@{cluster}/dist/MarkerCluster.Default.css">
    <script src="https://unpkg.com/leaflet@{leaflet}/dist/leaflet.js"></script>
    <script src="https://unpkg.com/leaflet.markercluster@{cluster}/dist/leaflet.markercluster.js"></script>
    <style>
        html, body {{ height: 100%; margin: 0; }}
        #map {{ height: 100%; }}
    </style>
</head>
<body>
<div id="map"></div>
<script>
    const settings = {settings_json};
    const markers = {markers_json};
    const map = L.map('map').setView(settings.center, settings.zoom);
    L.tileLayer(settings.tiles, {{ attribution: settings.attribution, maxZoom: 20 }}).addTo(map);
    const cluster = L.markerClusterGroup();
    for (const m of markers) {{
        L.marker([m.lat, m.lon]).bindPopup(m.popup).addTo(cluster);
    }}
    map.addLayer(cluster);
</script>
</body>
</html>
"#,
        leaflet = LEAFLET_VERSION,
        cluster = MARKERCLUSTER_VERSION,
    ))
}

/// Render and write the page to `path`.
pub fn export(points: &[MapPoint], config: &MapConfig, title: &str, path: &Path) -> Result<(), String> {
    let html = render_html(points, config, title)?;
    std::fs::write(path, html).map_err(|e| e.to_string())?;
    log::info!("wrote map with {} markers to {}", points.len(), path.display());
    Ok(())
}

fn popup_html(point: &MapPoint) -> String {
    point
        .popup
        .iter()
        .map(|(label, value)| format!("<b>{}:</b> {}", escape_html(label), escape_html(value)))
        .collect::<Vec<_>>()
        .join("<br>")
}

/// JSON safe to inline in a `<script>` block.
fn script_json<T: Serialize>(value: &T) -> Result<String, String> {
    let json = serde_json::to_string(value).map_err(|e| e.to_string())?;
    Ok(json.replace('<', "\\u003c"))
}

/// Escape HTML special characters
fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

//! GeoJSON coastline / border overlay

use std::path::Path;
use thiserror::Error;

use super::LngLat;

#[derive(Error, Debug)]
pub enum BordersError {
    #[error("Failed to read borders file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid GeoJSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GeoJSON has no features array")]
    NoFeatures,
}

/// Load polylines from a GeoJSON file
pub fn load_borders(path: &Path) -> Result<Vec<Vec<LngLat>>, BordersError> {
    let json = std::fs::read_to_string(path)?;
    let lines = parse_geojson_borders(&json)?;
    tracing::info!("Loaded {} border polylines from {:?}", lines.len(), path);
    Ok(lines)
}

/// Extract every line and polygon ring as a polyline
pub fn parse_geojson_borders(json: &str) -> Result<Vec<Vec<LngLat>>, BordersError> {
    let v: serde_json::Value = serde_json::from_str(json)?;
    let features = v["features"].as_array().ok_or(BordersError::NoFeatures)?;

    let mut polylines = Vec::new();
    for feat in features {
        let geom = &feat["geometry"];
        let coords = &geom["coordinates"];
        match geom["type"].as_str() {
            Some("LineString") => polylines.extend(extract_line(coords)),
            Some("MultiLineString") | Some("Polygon") => {
                for line in coords.as_array().into_iter().flatten() {
                    polylines.extend(extract_line(line));
                }
            }
            Some("MultiPolygon") => {
                for polygon in coords.as_array().into_iter().flatten() {
                    for ring in polygon.as_array().into_iter().flatten() {
                        polylines.extend(extract_line(ring));
                    }
                }
            }
            other => tracing::debug!("Skipping geometry type {:?}", other),
        }
    }
    Ok(polylines)
}

fn extract_line(arr: &serde_json::Value) -> Option<Vec<LngLat>> {
    let points = arr.as_array()?;
    let coords: Vec<LngLat> = points
        .iter()
        .filter_map(|p| {
            let a = p.as_array()?;
            Some(LngLat::new(a.first()?.as_f64()?, a.get(1)?.as_f64()?))
        })
        .collect();
    if coords.len() < 2 {
        None
    } else {
        Some(coords)
    }
}

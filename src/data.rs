use crate::config::{self, AppConfig};
use crate::types::{District, DistrictLayer, HospitalLayer, HospitalSite};
use anyhow::{anyhow, Context, Result};
use geo::algorithm::map_coords::MapCoords;
use geo::{Coord, MultiPolygon, Point};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::f64::consts::FRAC_PI_2;

const EARTH_RADIUS_M: f64 = 6_378_137.0;

/// Coordinate reference system declared by a (legacy) GeoJSON document.
/// RFC 7946 documents carry no `crs` member and are WGS84 by definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceCrs {
    Wgs84,
    WebMercator,
}

pub async fn load_layers(config: &AppConfig) -> Result<(DistrictLayer, HospitalLayer)> {
    let client = reqwest::Client::new();

    let districts = load_district_layer(&client, &config.input.district_url).await?;
    tracing::info!(count = districts.districts.len(), "loaded district layer");

    let hospitals = load_hospital_layer(&client, &config.input.hospital_url).await?;
    tracing::info!(count = hospitals.sites.len(), "loaded hospital layer");

    Ok((districts, hospitals))
}

pub async fn load_district_layer(client: &reqwest::Client, url: &str) -> Result<DistrictLayer> {
    let text = fetch_text(client, url).await?;
    parse_district_layer(&text).with_context(|| format!("Bad district layer from {}", url))
}

pub async fn load_hospital_layer(client: &reqwest::Client, url: &str) -> Result<HospitalLayer> {
    let text = fetch_text(client, url).await?;
    parse_hospital_layer(&text).with_context(|| format!("Bad hospital layer from {}", url))
}

async fn fetch_text(client: &reqwest::Client, url: &str) -> Result<String> {
    tracing::info!(url, "fetching layer");
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .with_context(|| format!("Failed to fetch {}", url))?;
    response
        .text()
        .await
        .with_context(|| format!("Failed to read body from {}", url))
}

pub fn parse_district_layer(text: &str) -> Result<DistrictLayer> {
    let collection = parse_collection(text)?;
    let crs = declared_crs(&collection)?;

    let mut districts = Vec::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        // geojson crate Value -> geo types -> MultiPolygon
        let geometry = match feature.geometry {
            Some(geometry) => {
                let geometry: geo::Geometry<f64> = geometry.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert district geometry {}: {:?}", index, e))?;
                match geometry {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue, // Skip points/lines
                }
            }
            None => continue,
        };
        let geometry = to_wgs84_polygons(geometry, crs);

        let counts = district_counts(feature.properties.as_ref(), index)?;

        districts.push(District { geometry, counts });
    }

    Ok(DistrictLayer { districts })
}

pub fn parse_hospital_layer(text: &str) -> Result<HospitalLayer> {
    let collection = parse_collection(text)?;
    let crs = declared_crs(&collection)?;

    let mut sites = Vec::new();

    for (index, feature) in collection.features.into_iter().enumerate() {
        let point = match &feature.geometry {
            Some(geometry) => match &geometry.value {
                geojson::Value::Point(position) => {
                    Point::new(position[0], position[1])
                }
                _ => continue, // Skip non-point shapes
            },
            None => continue,
        };
        let point = to_wgs84_point(point, crs);

        let name = institution_name(&feature, index)?;

        sites.push(HospitalSite { name, point });
    }

    Ok(HospitalLayer { sites })
}

fn parse_collection(text: &str) -> Result<FeatureCollection> {
    let geojson: GeoJson = text.parse().context("Failed to parse GeoJSON")?;
    match geojson {
        GeoJson::FeatureCollection(fc) => Ok(fc),
        _ => Err(anyhow!("GeoJSON must be a FeatureCollection")),
    }
}

/// Per-district patient counts, renamed from the raw source labels to the
/// display names. Every configured column must be present and numeric.
fn district_counts(
    properties: Option<&serde_json::Map<String, JsonValue>>,
    index: usize,
) -> Result<HashMap<String, f64>> {
    let properties = properties
        .ok_or_else(|| anyhow!("District feature {} has no properties", index))?;

    let mut counts = HashMap::new();
    for (raw, display) in config::HOSPITAL_COLUMNS {
        // The rename is a no-op when the source already uses the display name.
        let value = properties
            .get(*raw)
            .or_else(|| properties.get(*display))
            .and_then(JsonValue::as_f64)
            .ok_or_else(|| {
                anyhow!("District feature {} is missing numeric column '{}'", index, raw)
            })?;
        counts.insert((*display).to_string(), value);
    }
    Ok(counts)
}

fn institution_name(feature: &Feature, index: usize) -> Result<String> {
    let name = feature
        .properties
        .as_ref()
        .and_then(|props| {
            props
                .get(config::HOSPITAL_NAME_RAW)
                .or_else(|| props.get(config::HOSPITAL_NAME))
        })
        .and_then(JsonValue::as_str)
        .ok_or_else(|| {
            anyhow!(
                "Hospital feature {} is missing name column '{}'",
                index,
                config::HOSPITAL_NAME_RAW
            )
        })?;
    Ok(name.to_string())
}

fn declared_crs(collection: &FeatureCollection) -> Result<SourceCrs> {
    let name = collection
        .foreign_members
        .as_ref()
        .and_then(|members| members.get("crs"))
        .and_then(|crs| crs.get("properties"))
        .and_then(|properties| properties.get("name"))
        .and_then(JsonValue::as_str);

    match name {
        None => Ok(SourceCrs::Wgs84),
        Some(name) if name.contains("4326") || name.contains("CRS84") => Ok(SourceCrs::Wgs84),
        Some(name) if name.contains("3857") => Ok(SourceCrs::WebMercator),
        Some(other) => Err(anyhow!("Unsupported coordinate reference system: {}", other)),
    }
}

fn to_wgs84_polygons(geometry: MultiPolygon<f64>, crs: SourceCrs) -> MultiPolygon<f64> {
    match crs {
        SourceCrs::Wgs84 => geometry,
        SourceCrs::WebMercator => geometry.map_coords(mercator_to_wgs84),
    }
}

fn to_wgs84_point(point: Point<f64>, crs: SourceCrs) -> Point<f64> {
    match crs {
        SourceCrs::Wgs84 => point,
        SourceCrs::WebMercator => point.map_coords(mercator_to_wgs84),
    }
}

// Spherical Web Mercator (EPSG:3857) meters to lon/lat degrees.
fn mercator_to_wgs84(coord: Coord<f64>) -> Coord<f64> {
    Coord {
        x: (coord.x / EARTH_RADIUS_M).to_degrees(),
        y: (2.0 * (coord.y / EARTH_RADIUS_M).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DISTRICTS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"서울불면": 100.0, "아산불면": 40.0, "삼성불면예": 7.5},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[126.9, 37.5], [127.1, 37.5], [127.1, 37.6], [126.9, 37.6], [126.9, 37.5]]]
                }
            }
        ]
    }"#;

    const HOSPITALS: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"요양기": "서울대학교병원"},
                "geometry": {"type": "Point", "coordinates": [126.99, 37.58]}
            },
            {
                "type": "Feature",
                "properties": {"요양기관명": "삼성서울병원"},
                "geometry": {"type": "Point", "coordinates": [127.08, 37.49]}
            }
        ]
    }"#;

    #[test]
    fn parses_district_layer_with_renamed_columns() {
        let layer = parse_district_layer(DISTRICTS).unwrap();
        assert_eq!(layer.districts.len(), 1);
        let counts = &layer.districts[0].counts;
        assert_eq!(counts["서울대학교병원"], 100.0);
        assert_eq!(counts["서울아산병원"], 40.0);
        assert_eq!(counts["삼성서울병원"], 7.5);
    }

    #[test]
    fn missing_count_column_is_an_error() {
        let text = r#"{
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "properties": {"서울불면": 100.0},
                    "geometry": {
                        "type": "Polygon",
                        "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]
                    }
                }
            ]
        }"#;
        let err = parse_district_layer(text).unwrap_err();
        assert!(err.to_string().contains("아산불면"));
    }

    #[test]
    fn parses_hospital_layer_under_either_name_column() {
        let layer = parse_hospital_layer(HOSPITALS).unwrap();
        assert_eq!(layer.sites.len(), 2);
        assert_eq!(layer.sites[0].name, "서울대학교병원");
        assert_eq!(layer.sites[1].name, "삼성서울병원");
        assert_eq!(layer.sites[0].point.x(), 126.99);
    }

    #[test]
    fn non_feature_collection_is_an_error() {
        let err = parse_hospital_layer(r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("FeatureCollection"));
    }

    #[test]
    fn mercator_coordinates_are_normalized_to_degrees() {
        let origin = mercator_to_wgs84(Coord { x: 0.0, y: 0.0 });
        assert!(origin.x.abs() < 1e-9);
        assert!(origin.y.abs() < 1e-9);

        // Forward-project a known point and round-trip it.
        let lon = 126.978_f64;
        let lat = 37.566_f64;
        let x = lon.to_radians() * EARTH_RADIUS_M;
        let y = (lat.to_radians() / 2.0 + std::f64::consts::FRAC_PI_4).tan().ln() * EARTH_RADIUS_M;
        let back = mercator_to_wgs84(Coord { x, y });
        assert!((back.x - lon).abs() < 1e-9);
        assert!((back.y - lat).abs() < 1e-9);
    }

    #[test]
    fn web_mercator_documents_are_reprojected() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
            "features": [
                {
                    "type": "Feature",
                    "properties": {"요양기": "서울대학교병원"},
                    "geometry": {"type": "Point", "coordinates": [0.0, 0.0]}
                }
            ]
        }"#;
        let layer = parse_hospital_layer(text).unwrap();
        assert!(layer.sites[0].point.x().abs() < 1e-9);
        assert!(layer.sites[0].point.y().abs() < 1e-9);
    }

    #[test]
    fn unknown_crs_is_an_error() {
        let text = r#"{
            "type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::2097"}},
            "features": []
        }"#;
        let err = parse_hospital_layer(text).unwrap_err();
        assert!(err.to_string().contains("2097"));
    }
}

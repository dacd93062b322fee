use crate::config;
use crate::processing::Revenue;
use crate::types::{DistrictLayer, HospitalSite, MapCenter};
use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// A Plotly-compatible figure description: one choropleth trace colored by
/// the per-district revenue, one scatter trace for the hospital markers.
#[derive(Debug, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Choroplethmapbox {
        geojson: JsonValue,
        locations: Vec<u64>,
        z: Vec<f64>,
        hovertext: Vec<String>,
        colorscale: Vec<ColorStop>,
        marker: PolygonMarker,
    },
    Scattermapbox {
        lat: Vec<f64>,
        lon: Vec<f64>,
        mode: &'static str,
        text: Vec<String>,
        marker: PointMarker,
        textfont: TextFont,
    },
}

#[derive(Debug, Serialize)]
pub struct ColorStop(pub f64, pub &'static str);

#[derive(Debug, Serialize)]
pub struct PolygonMarker {
    pub opacity: f64,
}

#[derive(Debug, Serialize)]
pub struct PointMarker {
    pub color: &'static str,
    pub size: u32,
    pub opacity: f64,
}

#[derive(Debug, Serialize)]
pub struct TextFont {
    pub color: &'static str,
    pub size: u32,
}

#[derive(Debug, Serialize)]
pub struct Layout {
    pub title: Title,
    pub mapbox: Mapbox,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Serialize)]
pub struct Title {
    pub text: String,
    pub font: Font,
}

#[derive(Debug, Serialize)]
pub struct Font {
    pub size: u32,
}

#[derive(Debug, Serialize)]
pub struct Mapbox {
    pub style: String,
    pub center: MapCenter,
    pub zoom: u32,
}

/// The district geometries as a GeoJSON FeatureCollection whose feature
/// ids are the layer indices, matching the choropleth `locations`.
/// Prepared once per load and reused by every figure.
pub fn district_feature_collection(layer: &DistrictLayer) -> Result<JsonValue> {
    let features = layer
        .districts
        .iter()
        .enumerate()
        .map(|(index, district)| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(
                &district.geometry,
            ))),
            id: Some(geojson::feature::Id::Number(index.into())),
            properties: None,
            foreign_members: None,
        })
        .collect();

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    serde_json::to_value(collection).context("Failed to serialize district geometry")
}

pub fn build_figure(
    district_geojson: &JsonValue,
    revenue: &Revenue,
    points: &[&HospitalSite],
    hospital: &str,
    center: MapCenter,
    opacity: f64,
    basemap: &str,
) -> Figure {
    let locations: Vec<u64> = (0..revenue.per_district.len() as u64).collect();
    let hovertext = locations.iter().map(u64::to_string).collect();

    let choropleth = Trace::Choroplethmapbox {
        geojson: district_geojson.clone(),
        locations,
        z: revenue.per_district.clone(),
        hovertext,
        colorscale: config::COLOR_SCALE
            .iter()
            .map(|(stop, color)| ColorStop(*stop, color))
            .collect(),
        marker: PolygonMarker { opacity },
    };

    let markers = Trace::Scattermapbox {
        lat: points.iter().map(|site| site.point.y()).collect(),
        lon: points.iter().map(|site| site.point.x()).collect(),
        mode: "markers+text",
        text: points.iter().map(|site| site.name.clone()).collect(),
        marker: PointMarker {
            color: config::MARKER_COLOR,
            size: config::MARKER_SIZE,
            opacity,
        },
        textfont: TextFont {
            color: config::LABEL_COLOR,
            size: config::LABEL_SIZE,
        },
    };

    Figure {
        data: vec![choropleth, markers],
        layout: Layout {
            title: Title {
                text: figure_title(hospital, revenue.total),
                font: Font {
                    size: config::TITLE_FONT_SIZE,
                },
            },
            mapbox: Mapbox {
                style: basemap.to_string(),
                center,
                zoom: config::MAP_ZOOM,
            },
            width: config::MAP_WIDTH,
            height: config::MAP_HEIGHT,
        },
    }
}

pub fn figure_title(hospital: &str, total: f64) -> String {
    format!(">> {} :   {}", hospital, format_won(total))
}

/// Currency display: thousands separators, zero decimal places. Rounding
/// happens only here, never in the derived values.
pub fn format_won(total: f64) -> String {
    let rounded = round_half_to_even(total) as i64;
    let digits = rounded.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0 {
        format!("₩ -{}", grouped)
    } else {
        format!("₩ {}", grouped)
    }
}

// f64::round ties away from zero; the currency display ties to even.
fn round_half_to_even(value: f64) -> f64 {
    let floor = value.floor();
    match value - floor {
        diff if diff > 0.5 => floor + 1.0,
        diff if diff < 0.5 => floor,
        _ if (floor as i64) % 2 == 0 => floor,
        _ => floor + 1.0,
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// The single disease the dashboard currently covers.
pub const DISEASES: &[&str] = &["불면증"];

/// Per-district count columns: (raw source label, display name).
/// The raw labels are how the columns arrive in the district GeoJSON;
/// everything downstream uses the display name.
pub const HOSPITAL_COLUMNS: &[(&str, &str)] = &[
    ("서울불면", "서울대학교병원"),
    ("아산불면", "서울아산병원"),
    ("삼성불면예", "삼성서울병원"),
];

/// Institution name attribute on the hospital point layer. The source
/// file carries the truncated label, renamed on load.
pub const HOSPITAL_NAME_RAW: &str = "요양기";
pub const HOSPITAL_NAME: &str = "요양기관명";

pub const BASEMAP_STYLES: &[&str] = &["carto-positron", "open-street-map"];

// Choropleth color scale: low -> white, mid -> yellow, high -> red.
pub const COLOR_SCALE: &[(f64, &str)] = &[
    (0.0, "white"),
    (0.5, "yellow"),
    (1.0, "rgb(255, 0, 0)"),
];

pub const MARKER_COLOR: &str = "darkgreen";
pub const MARKER_SIZE: u32 = 3;
pub const LABEL_COLOR: &str = "black";
pub const LABEL_SIZE: u32 = 12;

pub const TITLE_FONT_SIZE: u32 = 25;
pub const MAP_ZOOM: u32 = 10;
pub const MAP_WIDTH: u32 = 1200;
pub const MAP_HEIGHT: u32 = 800;

pub const DEFAULT_UNIT_PRICE: f64 = 0.0;
pub const DEFAULT_OPACITY: f64 = 1.0;

// Display strings for the page and sidebar.
pub const PAGE_TITLE: &str = "의약품_매출액추정맵";
pub const APP_TITLE: &str = "환자수 예측을 통한 해당 의약품 매출액 추정";
pub const SIDEBAR_TITLE: &str = "질병 예측 발생률을 활용한 매출액 추정맵";
pub const SIDEBAR_SUBTITLE: &str =
    "(Market Share and Revenue Estimation Maps with Disease Prediction Micromaps)";
pub const SIDEBAR_CREDIT: &str = "ⓒ 2023-24 Eden AllLiVE HEALTHCARE R&D. All rights reserved.";
pub const DISEASE_LABEL: &str = "⦿ 질병 선택";
pub const HOSPITAL_LABEL: &str = "⦿ 병원선택";
pub const PRICE_LABEL: &str = "⦿ 약품단가 ₩";
pub const TOTAL_LABEL: &str = "⦿ 추정 매출액";
pub const OPACITY_LABEL: &str = "⌘ 지도 투명도";
pub const BASEMAP_LABEL: &str = "⌘ 배경지도 선택";

pub fn default_hospital() -> &'static str {
    HOSPITAL_COLUMNS[0].1
}

pub fn hospital_names() -> Vec<&'static str> {
    HOSPITAL_COLUMNS.iter().map(|(_, display)| *display).collect()
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    pub district_url: String,
    pub hospital_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_toml() {
        let config = AppConfig::from_toml_str(
            r#"
            [input]
            district_url = "http://example.com/districts.geojson"
            hospital_url = "http://example.com/hospitals.geojson"

            [server]
            port = 8080
            static_dir = "static"
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.input.district_url, "http://example.com/districts.geojson");
    }

    #[test]
    fn hospital_display_names_are_fixed() {
        assert_eq!(default_hospital(), "서울대학교병원");
        assert_eq!(
            hospital_names(),
            vec!["서울대학교병원", "서울아산병원", "삼성서울병원"]
        );
    }
}

use crate::config::{self, AppConfig};
use crate::figure::{self, Figure};
use crate::processing;
use crate::types::{DistrictLayer, HospitalLayer, MapCenter};
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

pub struct AppState {
    pub districts: DistrictLayer,
    pub hospitals: HospitalLayer,
    pub district_geojson: serde_json::Value,
    pub center: MapCenter,
}

/// Control values for one figure request. Missing parameters take the
/// original defaults: first hospital, price 0, full opacity, first basemap.
#[derive(Debug, Deserialize)]
pub struct FigureParams {
    #[serde(default = "default_disease")]
    pub disease: String,
    #[serde(default = "default_hospital")]
    pub hospital: String,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default = "default_opacity")]
    pub opacity: f64,
    #[serde(default = "default_basemap")]
    pub basemap: String,
}

fn default_disease() -> String {
    config::DISEASES[0].to_string()
}

fn default_hospital() -> String {
    config::default_hospital().to_string()
}

fn default_opacity() -> f64 {
    config::DEFAULT_OPACITY
}

fn default_basemap() -> String {
    config::BASEMAP_STYLES[0].to_string()
}

#[derive(Debug, Serialize)]
pub struct FigureResponse {
    pub figure: Figure,
    pub total: f64,
    pub total_display: String,
}

#[derive(Debug, Serialize)]
pub struct ControlsResponse {
    pub page_title: &'static str,
    pub app_title: &'static str,
    pub sidebar_title: &'static str,
    pub sidebar_subtitle: &'static str,
    pub credit: &'static str,
    pub disease_label: &'static str,
    pub diseases: Vec<&'static str>,
    pub hospital_label: &'static str,
    pub hospitals: Vec<&'static str>,
    pub unit_price_label: &'static str,
    pub unit_price_default: f64,
    pub total_label: &'static str,
    pub opacity_label: &'static str,
    pub opacity: OpacityRange,
    pub basemap_label: &'static str,
    pub basemap_styles: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct OpacityRange {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

pub async fn start_server(
    config: AppConfig,
    districts: DistrictLayer,
    hospitals: HospitalLayer,
) -> Result<()> {
    let center = processing::compute_bounds(&districts)
        .context("District layer has no polygon features")?
        .center();
    let district_geojson = figure::district_feature_collection(&districts)?;

    let state = Arc::new(AppState {
        districts,
        hospitals,
        district_geojson,
        center,
    });

    let addr = SocketAddr::from(([127, 0, 0, 1], config.server.port));
    tracing::info!("starting server on http://{}", addr);

    let app = Router::new()
        .route("/api/controls", get(controls_handler))
        .route("/api/figure", get(figure_handler))
        .fallback_service(ServeDir::new(&config.server.static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn controls_handler() -> Json<ControlsResponse> {
    Json(ControlsResponse {
        page_title: config::PAGE_TITLE,
        app_title: config::APP_TITLE,
        sidebar_title: config::SIDEBAR_TITLE,
        sidebar_subtitle: config::SIDEBAR_SUBTITLE,
        credit: config::SIDEBAR_CREDIT,
        disease_label: config::DISEASE_LABEL,
        diseases: config::DISEASES.to_vec(),
        hospital_label: config::HOSPITAL_LABEL,
        hospitals: config::hospital_names(),
        unit_price_label: config::PRICE_LABEL,
        unit_price_default: config::DEFAULT_UNIT_PRICE,
        total_label: config::TOTAL_LABEL,
        opacity_label: config::OPACITY_LABEL,
        opacity: OpacityRange {
            min: 0.0,
            max: 1.0,
            default: config::DEFAULT_OPACITY,
        },
        basemap_label: config::BASEMAP_LABEL,
        basemap_styles: config::BASEMAP_STYLES.to_vec(),
    })
}

/// The request/response core: current control values in, one freshly
/// computed figure description out.
pub async fn figure_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<FigureParams>,
) -> Result<Json<FigureResponse>, (StatusCode, String)> {
    if !config::DISEASES.contains(&params.disease.as_str()) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Unknown disease: {}", params.disease),
        ));
    }
    if !config::BASEMAP_STYLES.contains(&params.basemap.as_str()) {
        return Err((
            StatusCode::BAD_REQUEST,
            format!("Unknown basemap style: {}", params.basemap),
        ));
    }

    // An unknown hospital has no count column, so this also rejects it.
    let revenue = processing::compute_revenue(&state.districts, &params.hospital, params.unit_price)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let points = processing::select_hospital_points(&state.hospitals, &params.hospital);

    // The slider only produces values in range; direct calls get the same clamp.
    let opacity = params.opacity.clamp(0.0, 1.0);

    let figure = figure::build_figure(
        &state.district_geojson,
        &revenue,
        &points,
        &params.hospital,
        state.center,
        opacity,
        &params.basemap,
    );

    let total_display = figure::format_won(revenue.total);
    Ok(Json(FigureResponse {
        figure,
        total: revenue.total,
        total_display,
    }))
}

pub mod types;
pub mod config;
pub mod data;
pub mod processing;
pub mod figure;
pub mod server;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Fetch the layers and print one figure as JSON
    Render {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
        #[arg(long)]
        hospital: Option<String>,
        #[arg(long, default_value_t = config::DEFAULT_UNIT_PRICE)]
        unit_price: f64,
        #[arg(long, default_value_t = config::DEFAULT_OPACITY)]
        opacity: f64,
        #[arg(long, default_value = "carto-positron")]
        basemap: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { config } => {
            let app_config = config::AppConfig::load_from_file(&config)?;

            // 1. Load both layers up front
            let (districts, hospitals) = data::load_layers(&app_config).await?;

            // 2. Answer figure requests until shutdown
            server::start_server(app_config, districts, hospitals).await?;
        }
        Commands::Render {
            config,
            hospital,
            unit_price,
            opacity,
            basemap,
        } => {
            let app_config = config::AppConfig::load_from_file(&config)?;
            let (districts, hospitals) = data::load_layers(&app_config).await?;

            let hospital =
                hospital.unwrap_or_else(|| config::default_hospital().to_string());
            let center = processing::compute_bounds(&districts)
                .context("District layer has no polygon features")?
                .center();
            let revenue = processing::compute_revenue(&districts, &hospital, unit_price)?;
            let points = processing::select_hospital_points(&hospitals, &hospital);
            let district_geojson = figure::district_feature_collection(&districts)?;

            let fig = figure::build_figure(
                &district_geojson,
                &revenue,
                &points,
                &hospital,
                center,
                opacity.clamp(0.0, 1.0),
                &basemap,
            );

            println!("{}", serde_json::to_string_pretty(&fig)?);
        }
    }

    Ok(())
}

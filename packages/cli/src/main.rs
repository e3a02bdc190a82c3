#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for DENUE radius searches.
//!
//! `search` scores query points against a registry, `sample` draws query
//! points from a polygon layer, and `categories` lists the activity codes
//! present in a registry.
//!
//! Uses `indicatif-log-bridge` (via [`denue_radius_cli_utils::init_logger`])
//! so that log lines and the search progress bar share the terminal.

mod config;
mod selection;

use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use denue_radius_cli_utils::IndicatifProgress;
use denue_radius_proximity::{DistanceMode, SearchOptions, search_batch};
use denue_radius_registry::Registry;
use denue_radius_routing::distance_matrix::DistanceMatrixClient;
use denue_radius_sampling::{layer, points, sample};

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "denue_radius",
    about = "Counts and nearest distances of DENUE establishments around points"
)]
struct Cli {
    /// Configuration file (defaults to `denue_radius.toml` when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count establishments around points and measure the nearest one
    Search {
        /// Registry name from the config, or a path to a .shp/.csv/.geojson layer
        #[arg(long)]
        registry: Option<String>,
        /// Activity code, optionally labelled (e.g. "462111=supermercado"). Repeatable.
        #[arg(long = "code")]
        codes: Vec<String>,
        /// Name substring, matched case-insensitively. Repeatable.
        #[arg(long = "keyword")]
        keywords: Vec<String>,
        /// Query point as "LAT,LON". Repeatable.
        #[arg(long = "point", allow_hyphen_values = true)]
        points: Vec<String>,
        /// CSV of query points (`id`, `latitude`, `longitude` columns)
        #[arg(long)]
        points_csv: Option<PathBuf>,
        /// Buffer radius in meters (overrides `[search] radius_m`)
        #[arg(long)]
        radius: Option<f64>,
        /// Report driving minutes to the nearest establishment instead of meters
        #[arg(long)]
        driving: bool,
        /// Write the table as CSV to this file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Sample polygon centroids from a layer as query points
    Sample {
        /// Polygon layer (.shp or .geojson)
        #[arg(long)]
        layer: PathBuf,
        /// Keep only features where FIELD equals VALUE (e.g. "`CVE_MUN=050`")
        #[arg(long)]
        filter: Option<String>,
        /// Number of features to draw
        #[arg(long, default_value = "100")]
        count: usize,
        /// Random seed
        #[arg(long, default_value_t = sample::DEFAULT_SEED)]
        seed: u64,
        /// Attribute used as the point id
        #[arg(long, default_value = "CVEGEO")]
        id_field: String,
        /// Output CSV path
        #[arg(long)]
        output: PathBuf,
    },
    /// List the most common activity codes in a registry
    Categories {
        /// Registry name from the config, or a path to a layer
        #[arg(long)]
        registry: Option<String>,
        /// Number of codes to show
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[allow(clippy::too_many_lines)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = denue_radius_cli_utils::init_logger();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;
    let start = Instant::now();

    match cli.command {
        Commands::Search {
            registry,
            codes,
            keywords,
            points,
            points_csv,
            radius,
            driving,
            output,
        } => {
            let categories = selection::selector(&codes, &keywords)?.categories();
            let query_points = selection::query_points(&points, points_csv.as_deref())?;

            let registry_path = config.registry_path(registry.as_deref())?;
            let registry = Registry::load(&registry_path, &config.fields)?;

            let options = SearchOptions {
                radius_m: radius.unwrap_or(config.search.radius_m),
                scale: config.scale()?,
            };
            log::info!(
                "Searching {} categories around {} points within {} m",
                categories.len(),
                query_points.len(),
                options.radius_m
            );

            let progress = IndicatifProgress::search_bar(&multi, "Searching");
            let table = if driving {
                let router = DistanceMatrixClient::new(
                    reqwest::Client::new(),
                    config.api_key()?,
                    &config.routing,
                );
                search_batch(
                    &registry,
                    &categories,
                    &query_points,
                    &options,
                    DistanceMode::Driving(&router),
                    &progress,
                )
                .await?
            } else {
                search_batch(
                    &registry,
                    &categories,
                    &query_points,
                    &options,
                    DistanceMode::Linear,
                    &progress,
                )
                .await?
            };

            println!("{table}");

            if let Some(path) = output {
                let file = std::fs::File::create(&path)?;
                table.write_csv(BufWriter::new(file))?;
                log::info!("Wrote {} rows to {}", table.points().len(), path.display());
            }
        }
        Commands::Sample {
            layer: layer_path,
            filter,
            count,
            seed,
            id_field,
            output,
        } => {
            let mut features = layer::load(&layer_path)?;

            if let Some(filter) = filter {
                let Some((field, value)) = filter.split_once('=') else {
                    return Err(format!("--filter must be FIELD=VALUE, got '{filter}'").into());
                };
                features = layer::filter_by_attribute(features, field.trim(), value);
                log::info!("{} features match {filter}", features.len());
            }

            let drawn = sample::sample(&features, count, seed);
            let query_points = sample::centroids(&drawn, &id_field);

            let file = std::fs::File::create(&output)?;
            points::write_points_csv(&query_points, BufWriter::new(file))?;
            log::info!(
                "Wrote {} sampled points to {}",
                query_points.len(),
                output.display()
            );
        }
        Commands::Categories { registry, limit } => {
            let registry_path = config.registry_path(registry.as_deref())?;
            let registry = Registry::load(&registry_path, &config.fields)?;

            println!("{:<10} COUNT", "CODE");
            println!("{}", "-".repeat(20));
            for (code, count) in registry.code_counts().into_iter().take(limit) {
                println!("{code:<10} {count}");
            }
        }
    }

    let elapsed = start.elapsed();
    log::info!("Finished in {:.1}s", elapsed.as_secs_f64());

    Ok(())
}

#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for `RegionIQ`.
//!
//! ```text
//! regioniq serve
//! regioniq overlay ITL1 population_total 2030 [--scenario upside] [--growth-years 5] [--ranking]
//! regioniq levels
//! regioniq metrics
//! ```
//!
//! `serve` and `overlay` read the datastore and boundary configuration
//! from the environment (`SUPABASE_URL`, `SUPABASE_ANON_KEY`,
//! `BOUNDARY_BASE_URL`, `BOUNDARY_FALLBACK_BASE_URL`).

use std::sync::Arc;

use clap::{Parser, Subcommand};
use regioniq_boundary::{
    cache::GeometryCache,
    fetch::{BoundarySource, HttpBoundarySource},
    registry::all_levels,
};
use regioniq_choropleth::ramp::color_for;
use regioniq_choropleth_models::{Overlay, OverlayMode};
use regioniq_metrics::{
    catalogue::all_metrics,
    fetcher::{MetricFetcher, MetricRowCache},
    store::MetricStore,
    supabase::SupabaseRestClient,
};
use regioniq_metrics_models::Scenario;
use regioniq_overlay::{ApplyOutcome, OverlayController, OverlayRequest};
use regioniq_region_models::RegionLevel;

#[derive(Parser)]
#[command(name = "regioniq", about = "RegionIQ regional economics overlays")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve,
    /// Render one overlay and print it as JSON
    Overlay {
        /// Region level (national, ITL1, ITL2, ITL3, LAD)
        level: RegionLevel,
        /// Metric id, e.g. `population_total`
        metric: String,
        /// Year to display
        year: i32,
        /// Forecast scenario (baseline, upside, downside)
        #[arg(long, default_value = "baseline")]
        scenario: String,
        /// Show compound annual growth over this many years instead of values
        #[arg(long)]
        growth_years: Option<u32>,
        /// Selected region code
        #[arg(long)]
        selected: Option<String>,
        /// Print only the ranking summary
        #[arg(long)]
        summary_only: bool,
        /// Print a ranked table of regions instead of JSON
        #[arg(long, conflicts_with = "summary_only")]
        ranking: bool,
    },
    /// List the registered region levels
    Levels,
    /// List the metric catalogue
    Metrics,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve => {
            // actix-web brings its own runtime; keep it off the tokio workers.
            tokio::task::spawn_blocking(|| {
                actix_web::rt::System::new().block_on(regioniq_server::run_server())
            })
            .await??;
        }
        Commands::Overlay {
            level,
            metric,
            year,
            scenario,
            growth_years,
            selected,
            summary_only,
            ranking,
        } => {
            let client = reqwest::Client::new();
            let store: Arc<dyn MetricStore> = Arc::new(SupabaseRestClient::from_env(client.clone())?);
            let boundaries: Arc<dyn BoundarySource> = Arc::new(HttpBoundarySource::from_env(client));
            let controller = OverlayController::new(
                Arc::new(MetricFetcher::new(store, Arc::new(MetricRowCache::new()))),
                Arc::new(GeometryCache::new(boundaries)),
            );

            let mut request = OverlayRequest::new(level, metric, year);
            request.scenario = Scenario::parse_or_baseline(&scenario);
            if let Some(years) = growth_years.filter(|y| *y > 0) {
                request.mode = OverlayMode::Growth { years };
            }
            request.selected = selected;

            let frame = match controller.apply(request).await {
                ApplyOutcome::Ready(frame) => frame,
                ApplyOutcome::NoGeometry => {
                    return Err(format!("Boundary geometry for {level} could not be loaded").into());
                }
                ApplyOutcome::Superseded => return Err("Overlay request was superseded".into()),
            };
            log::info!(
                "Rendered {level} overlay: {}/{} regions with data",
                frame.overlay.summary.n,
                frame.overlay.summary.total
            );

            if ranking {
                print_ranking(&frame.overlay);
                return Ok(());
            }

            let output = if summary_only {
                serde_json::to_string_pretty(&frame.overlay.summary)?
            } else {
                serde_json::to_string_pretty(&serde_json::json!({
                    "domain": frame.overlay.domain,
                    "paint": frame.overlay.paint,
                    "summary": frame.overlay.summary,
                    "camera": frame.camera,
                    "features": frame.overlay.feature_collection(),
                }))?
            };
            println!("{output}");
        }
        Commands::Levels => {
            println!("{:<10} {:<18} {:<10} BOUNDARY", "LEVEL", "TABLE", "CODE");
            println!("{}", "-".repeat(80));
            for def in all_levels() {
                println!(
                    "{:<10} {:<18} {:<10} {}",
                    def.level.to_string(),
                    def.table,
                    def.code_property,
                    def.boundary_path
                );
            }
        }
        Commands::Metrics => {
            println!("{:<22} {:<10} {:<8} NAME", "METRIC", "UNIT", "GROWTH");
            println!("{}", "-".repeat(80));
            for m in all_metrics() {
                let growth = if m.growth_always_positive {
                    "positive"
                } else {
                    "signed"
                };
                println!("{:<22} {:<10} {growth:<8} {}", m.metric_id, m.unit, m.name);
            }
        }
    }

    Ok(())
}

fn print_ranking(overlay: &Overlay) {
    let column = if overlay.mode.is_growth() { "GROWTH %" } else { "VALUE" };
    println!("{:<8} {:<12} {:>14} {:<8} NAME", "RANK", "CODE", column, "COLOR");
    println!("{}", "-".repeat(80));

    let mut rows: Vec<_> = overlay
        .features
        .iter()
        .map(|f| (overlay.summary.position(&f.code), f))
        .collect();
    rows.sort_by_key(|(position, f)| (position.map_or(usize::MAX, |(rank, _)| rank), f.code.clone()));

    for (position, feature) in rows {
        let rank = position.map_or_else(|| "-".to_string(), |(rank, n)| format!("{rank}/{n}"));
        let value = feature.value.map_or_else(|| "no data".to_string(), |v| format!("{v:.2}"));
        println!(
            "{rank:<8} {:<12} {value:>14} {:<8} {}",
            feature.code,
            color_for(feature.value, overlay.domain.as_ref()),
            feature.name.as_deref().unwrap_or("")
        );
    }
    if let Some(median) = overlay.summary.median {
        println!("\nMedian of {} regions: {median:.2}", overlay.summary.n);
    }
}

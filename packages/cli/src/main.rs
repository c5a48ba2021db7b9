#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the county enrichment pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use elections_census::config::EnrichConfig;
use elections_census::fetcher::CensusFetcher;
use elections_census::merge::FlatSources;
use elections_census::pacing::{NoopPacer, Pacer, TokioPacer};
use elections_census::pipeline::{enrich, fetch_census};
use elections_census::snapshot::SnapshotStore;
use elections_census::sources::{MarginTable, UnemploymentTable};
use elections_census::GeoKeyStore as _;
use elections_geography_models::fips;
use elections_results::ResultsStore;

#[derive(Parser)]
#[command(name = "elections_cli", about = "County census and history enrichment")]
struct Cli {
    /// TOML configuration file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Results database (overrides `paths.results_db`)
    #[arg(long, global = true)]
    results_db: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the stored election results with a results CSV
    ImportResults {
        /// CSV with at least `statepostal` and `fipscode` columns
        csv: PathBuf,
    },
    /// List the states present in the results
    States,
    /// Fetch census tables for every county into per-state caches
    FetchCensus {
        /// Resume after this state (the last one that finished)
        #[arg(long)]
        start_state: Option<String>,
        /// Skip the pause between requests (only for a local mirror)
        #[arg(long)]
        no_throttle: bool,
    },
    /// Merge cached census data with margin and unemployment files
    Enrich {
        /// Resume after this state (the last one that finished)
        #[arg(long)]
        start_state: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init();
    let cli = Cli::parse();

    let config = EnrichConfig::load(cli.config.as_deref())?;
    let results_db = cli.results_db.unwrap_or_else(|| config.paths.results_db.clone());
    let store = ResultsStore::open(&results_db)?;
    let snapshots = SnapshotStore::new(&config.paths.census_dir, &config.paths.output_dir);

    match cli.command {
        Commands::ImportResults { csv } => {
            let rows = store.import_csv(&csv)?;
            log::info!("Imported {rows} rows into {}", results_db.display());
        }
        Commands::States => {
            println!("{:<6} {:<6} NAME", "CODE", "FIPS");
            println!("{}", "-".repeat(40));
            for code in store.state_codes()? {
                let (fips, name) =
                    fips::by_abbr(&code).map_or(("??", "Unknown"), |s| (s.fips, s.name));
                println!("{code:<6} {fips:<6} {name}");
            }
        }
        Commands::FetchCensus {
            start_state,
            no_throttle,
        } => {
            let pacer: Arc<dyn Pacer> = if no_throttle {
                Arc::new(NoopPacer)
            } else {
                Arc::new(TokioPacer)
            };
            let fetcher = CensusFetcher::new(config.census_api.clone(), pacer)?;

            let start = Instant::now();
            let report = fetch_census(&store, &fetcher, &snapshots, start_state.as_deref()).await?;

            let failures: Vec<_> = report.failures().collect();
            for failure in &failures {
                log::warn!("not fetched: {} ({})", failure.fipscode, failure.reason);
            }
            log::info!(
                "Census fetch complete: {} counties cached, {} failed, {} states in {:.1}s",
                report.total_fetched(),
                failures.len(),
                report.states.len(),
                start.elapsed().as_secs_f64()
            );
            if let Some(last) = report.last_state() {
                log::info!("Last state finished: {last} (pass --start-state {last} to resume after it)");
            }
        }
        Commands::Enrich { start_state } => {
            let sources = FlatSources {
                margins: MarginTable::from_path(&config.paths.margin_csv)?,
                candidates: config.margin.clone(),
                unemployment: UnemploymentTable::from_path(&config.paths.unemployment_csv)?,
            };

            let start = Instant::now();
            let report = enrich(&store, &snapshots, &sources, start_state.as_deref())?;
            let counties: usize = report.states.iter().map(|s| s.counties).sum();
            log::info!(
                "Enrichment complete: {counties} counties across {} states in {:.1}s",
                report.states.len(),
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}

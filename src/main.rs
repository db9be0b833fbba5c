use clap::Parser;
use performer_sync::apis::PerformersApi;
use performer_sync::config::{self, CliOverrides, Credentials, FileConfig, SyncSettings};
use performer_sync::constants::{DEFAULT_CONFIG_PATH, DEFAULT_ENV_FILE, ENV_API_URL};
use performer_sync::logging;
use performer_sync::metrics;
use performer_sync::reconcile::{ReconcileOptions, Reconciler, SyncReport};
use performer_sync::storage::ArtifactStore;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "performer-sync")]
#[command(about = "Sync the performer catalog from the upstream listing API")]
#[command(version)]
struct Cli {
    /// Maximum number of performers in the catalog
    #[arg(long)]
    max: Option<usize>,

    /// Records requested per upstream page (1-100)
    #[arg(long)]
    page_size: Option<u32>,

    /// Brands to sync (comma-separated). Defaults to the config file, then the built-in set
    #[arg(long)]
    brands: Option<String>,

    /// Rebuild the catalog order from scratch
    #[arg(long)]
    reseed: bool,

    /// Where to write the catalog id list
    #[arg(long)]
    catalog_out: Option<PathBuf>,

    /// Where to write the performer table
    #[arg(long)]
    performers_out: Option<PathBuf>,

    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Optional KEY=value file; never overrides variables already set
    #[arg(long, default_value = DEFAULT_ENV_FILE)]
    env_file: PathBuf,

    /// Write Prometheus metrics for this run to a file
    #[arg(long)]
    metrics_out: Option<PathBuf>,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            max: self.max,
            page_size: self.page_size,
            brands: self.brands.clone(),
            reseed: self.reseed,
            catalog_out: self.catalog_out.clone(),
            performers_out: self.performers_out.clone(),
            url_template: std::env::var(ENV_API_URL).ok().filter(|v| !v.trim().is_empty()),
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<SyncReport> {
    // Credentials are checked before anything touches the network
    let credentials = Credentials::from_env()?;
    let file_config = FileConfig::load(&cli.config)?;
    let settings = SyncSettings::resolve(cli.overrides(), file_config)?;

    let api = PerformersApi::new(settings.upstream.clone(), credentials)?;
    let store = ArtifactStore::new(&settings.catalog_path, &settings.performers_path);
    let reconciler = Reconciler::new(
        api,
        store,
        ReconcileOptions {
            max: settings.max,
            page_size: settings.page_size,
            brands: settings.brands.clone(),
            reseed: settings.reseed,
            delay: settings.delay,
        },
    );

    let report = reconciler.run().await?;

    if let Some(path) = &cli.metrics_out {
        metrics::write_textfile(path)?;
    }
    Ok(report)
}

fn print_report(report: &SyncReport) {
    println!("\n📊 Sync results (run {}):", report.run_id);
    if let Some(reason) = report.reseed {
        println!("   Reseeded: {:?}", reason);
    }
    for fetch in &report.fetches {
        println!(
            "   {:<12} {:>5}/{:<5} in {:>3} pages ({:?})",
            fetch.brand, fetch.fetched, fetch.quota, fetch.pages, fetch.stop
        );
    }
    println!("   Fetched: {}", report.fetched_total());
    println!("   Catalog size: {}", report.catalog_ids.len());
    for (brand, count) in &report.composition {
        println!("     {}: {}", brand, count);
    }
    if report.catalog_written {
        println!("   Catalog: updated");
    } else {
        println!("   Catalog: unchanged");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let env_file = config::load_env_file(&cli.env_file);

    logging::init_logging();
    metrics::init_metrics();

    if env_file? {
        info!("Loaded environment from {}", cli.env_file.display());
    }

    match run(cli).await {
        Ok(report) => {
            print_report(&report);
            Ok(())
        }
        Err(e) => {
            error!("Sync failed: {:#}", e);
            Err(e)
        }
    }
}
